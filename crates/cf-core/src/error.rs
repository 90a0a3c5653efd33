use thiserror::Error;

pub type CfResult<T> = Result<T, CfError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CfError {
    #[error("Non-finite numeric value for {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Index out of bounds: {what} (index={index}, len={len})")]
    IndexOob {
        what: &'static str,
        index: usize,
        len: usize,
    },

    #[error("Invariant violated: {what}")]
    Invariant { what: String },
}

/// Reject a geometric or rate parameter that must be strictly positive.
///
/// ```
/// assert_eq!(cf_core::ensure_positive(2.0, "area"), Ok(2.0));
/// assert!(cf_core::ensure_positive(0.0, "area").is_err());
/// ```
pub fn ensure_positive(value: f64, what: &'static str) -> CfResult<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(CfError::InvalidArg { what })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_positive_rejects_zero_and_nan() {
        assert!(ensure_positive(0.5, "distance").is_ok());
        assert!(ensure_positive(0.0, "distance").is_err());
        assert!(ensure_positive(-1.0, "distance").is_err());
        let err = ensure_positive(f64::NAN, "distance").unwrap_err();
        assert!(err.to_string().contains("distance"));
    }
}
