use clip_core::{ClipError, ErrorKind};
use thiserror::Error;

/// Result type for the upload pipeline
pub type UploadResult<T> = Result<T, UploadError>;

/// Result type for asset store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Terminal failures of a single upload. None are retried.
///
/// The `Display` text is what clients see in the `error` field.
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("No file was uploaded.")]
    MissingFile,

    #[error("File too large. Maximum allowed size is {max} bytes.")]
    TooLarge { size: u64, max: u64 },

    #[error("Could not save the uploaded file.")]
    Staging {
        #[source]
        source: std::io::Error,
    },

    #[error("External storage handler failed.")]
    ExternalHandler {
        handler: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The default backend's own message is surfaced as-is.
    #[error("{message}")]
    Backend {
        message: String,
        #[source]
        source: Option<StoreError>,
    },
}

impl UploadError {
    pub fn staging(source: std::io::Error) -> Self {
        Self::Staging { source }
    }

    pub fn external<S: Into<String>>(handler: S, error: anyhow::Error) -> Self {
        Self::ExternalHandler {
            handler: handler.into(),
            source: error.into(),
        }
    }

    pub fn backend(error: StoreError) -> Self {
        Self::Backend {
            message: error.to_string(),
            source: Some(error),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            UploadError::MissingFile => ErrorKind::BadRequest,
            UploadError::TooLarge { .. } => ErrorKind::PayloadTooLarge,
            UploadError::Staging { .. }
            | UploadError::ExternalHandler { .. }
            | UploadError::Backend { .. } => ErrorKind::GeneralError,
        }
    }

    /// Short machine-readable tag, used in logs.
    pub fn tag(&self) -> &'static str {
        match self {
            UploadError::MissingFile => "missing_file",
            UploadError::TooLarge { .. } => "too_large",
            UploadError::Staging { .. } => "staging",
            UploadError::ExternalHandler { .. } => "external_handler",
            UploadError::Backend { .. } => "backend",
        }
    }

    /// Whether a staged file existed when this error happened.
    pub fn after_staging(&self) -> bool {
        !matches!(self, UploadError::MissingFile | UploadError::TooLarge { .. })
    }

    /// Client-facing structured error.
    pub fn to_clip_error(&self) -> ClipError {
        ClipError::new(self.kind(), self.to_string())
    }
}

/// Errors raised by an asset store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("Could not write asset metadata: {source}")]
    Metadata {
        #[from]
        source: serde_json::Error,
    },

    #[error("Invalid storage request: {message}")]
    Invalid { message: String },

    #[error("Storage backend error: {source}")]
    Backend {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl StoreError {
    pub fn invalid<S: Into<String>>(message: S) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    pub fn backend<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend {
            source: Box::new(error),
        }
    }
}
