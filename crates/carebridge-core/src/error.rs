use thiserror::Error;

/// Core error types shared by CareBridge services
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid {field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("Invalid patient ID: {0}")]
    InvalidId(String),

    #[error("UUID error: {0}")]
    UuidError(#[from] uuid::Error),

    #[error("Event decoding error: {0}")]
    Decode(#[from] prost::DecodeError),
}

impl CoreError {
    /// Create a new Validation error
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Create a new InvalidId error
    pub fn invalid_id(id: impl Into<String>) -> Self {
        Self::InvalidId(id.into())
    }

    /// Returns `true` if the error was caused by caller input.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. } | Self::InvalidId(_))
    }
}

/// Result alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
