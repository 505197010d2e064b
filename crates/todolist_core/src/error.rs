use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    /// The database could not be opened or reached at all.
    #[error("storage_unavailable - {0}")]
    StorageUnavailable(String),
    /// A single insert, update or delete failed.
    #[error("write_failed - {0}")]
    WriteFailed(String),
    #[error("record_not_found - item {0} not found")]
    RecordNotFound(i64),
    #[error("invalid_input - {0}")]
    InvalidInput(String),
    #[error("invalid_data - {0}")]
    InvalidData(String),
    #[error("io_error - {0}")]
    Io(String),
}

impl AppError {
    pub fn storage_unavailable<M: Into<String>>(message: M) -> Self {
        Self::StorageUnavailable(message.into())
    }

    pub fn write_failed<M: Into<String>>(message: M) -> Self {
        Self::WriteFailed(message.into())
    }

    pub fn invalid_input<M: Into<String>>(message: M) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn invalid_data<M: Into<String>>(message: M) -> Self {
        Self::InvalidData(message.into())
    }

    pub fn io<M: Into<String>>(message: M) -> Self {
        Self::Io(message.into())
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::StorageUnavailable(_) => "storage_unavailable",
            Self::WriteFailed(_) => "write_failed",
            Self::RecordNotFound(_) => "record_not_found",
            Self::InvalidInput(_) => "invalid_input",
            Self::InvalidData(_) => "invalid_data",
            Self::Io(_) => "io_error",
        }
    }

    /// Only an unreachable store stops the application from working.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::StorageUnavailable(_))
    }
}
