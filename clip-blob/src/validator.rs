//! Presence and size checks, run before anything touches the disk.

use crate::UploadError;

/// Why an upload was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    MissingFile,
    TooLarge { size: u64, max: u64 },
}

impl Rejection {
    pub fn into_error(self) -> UploadError {
        match self {
            Rejection::MissingFile => UploadError::MissingFile,
            Rejection::TooLarge { size, max } => UploadError::TooLarge { size, max },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validation {
    Accept,
    Reject(Rejection),
}

/// Decide whether an upload may proceed to staging.
///
/// `declared_size` is whatever the transport reported. It is a fast backstop,
/// not a replacement for the transport's own body limit.
pub fn validate(present: bool, declared_size: u64, max_bytes: u64) -> Validation {
    if !present {
        return Validation::Reject(Rejection::MissingFile);
    }
    if declared_size > max_bytes {
        return Validation::Reject(Rejection::TooLarge {
            size: declared_size,
            max: max_bytes,
        });
    }
    Validation::Accept
}
