use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorefrontError {
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Not authenticated: session expired or missing")]
    Unauthorized,
    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Unsupported schema version {found} (this build reads up to {supported})")]
    SchemaVersionError { found: u32, supported: u32 },
    #[cfg(feature = "storage-rocksdb")]
    #[error("Storage error: {0}")]
    StorageError(#[from] rocksdb::Error),
    #[error("Internal error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T> = std::result::Result<T, StorefrontError>;

impl StorefrontError {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            status,
            message: message.into(),
        }
    }

    /// The backend answers a repeated payment confirmation with 404/409 or an
    /// "already confirmed" message. Callers treat this as success.
    pub fn is_already_confirmed(&self) -> bool {
        match self {
            Self::ApiError { status, message } => {
                matches!(status, 404 | 409)
                    || message.to_ascii_lowercase().contains("already confirmed")
            }
            _ => false,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
            || matches!(self, Self::ApiError { status: 401, .. })
    }

    /// Short text suitable for an operator-facing notification.
    pub fn user_message(&self) -> String {
        match self {
            Self::ValidationError(msg) => msg.clone(),
            Self::ApiError { message, .. } if !message.is_empty() => message.clone(),
            Self::ApiError { status, .. } => format!("Request failed with status {status}"),
            Self::Unauthorized => "Please sign in again".to_string(),
            Self::HttpError(_) => "Network error, please try again".to_string(),
            other => other.to_string(),
        }
    }
}
