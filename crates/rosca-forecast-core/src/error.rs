use thiserror::Error;

#[derive(Debug, Error)]
pub enum RoscaError {
    #[error("Invalid input for {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Date error: {0}")]
    DateError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for RoscaError {
    fn from(e: serde_json::Error) -> Self {
        RoscaError::SerializationError(e.to_string())
    }
}
