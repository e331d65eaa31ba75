use thiserror::Error;

#[derive(Debug, Error)]
pub enum CcrMarginError {
    #[error("Invalid input at '{field}': {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// A numeric degeneracy that valid input can never produce.
    #[error("Calculation error: {0}")]
    Calculation(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl CcrMarginError {
    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        CcrMarginError::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for CcrMarginError {
    fn from(e: serde_json::Error) -> Self {
        CcrMarginError::SerializationError(e.to_string())
    }
}
