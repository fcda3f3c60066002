use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EstimatorError {
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfBounds {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("downpayment share {fraction:.3} is below the required minimum of {minimum:.3}")]
    DownpaymentTooLow { fraction: f64, minimum: f64 },

    #[error(
        "inconsistent rate configuration: blended rate {blended:.4} exceeds target {target:.4} by more than {tolerance}"
    )]
    BlendedRateExceedsTarget {
        blended: f64,
        target: f64,
        tolerance: f64,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl EstimatorError {
    /// Bad user input, as opposed to a defect in the compiled-in configuration.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            EstimatorError::OutOfBounds { .. } | EstimatorError::DownpaymentTooLow { .. }
        )
    }
}
