use std::io;

/// Everything the catalog, the calculator and the stores can fail with.
#[derive(Debug, thiserror::Error)]
pub enum ShowroomError {
    #[error("invalid {field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("bike {0} not found")]
    BikeNotFound(u64),

    #[error("unauthorized")]
    Unauthorized,

    #[error("invalid loan terms: {0}")]
    InvalidLoan(String),

    #[error("storage error: {0}")]
    Io(#[from] io::Error),

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("poisoned lock")]
    Poisoned,
}

impl ShowroomError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        ShowroomError::Validation { field, message: message.into() }
    }

    /// Field name for validation failures, surfaced in API error bodies.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            ShowroomError::Validation { field, .. } => Some(*field),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ShowroomError>;
