//! # Errors
//!
//! Structured errors shared by the upload stack. Goals:
//! - every failure maps to a stable status code + class name
//! - can be carried through `anyhow::Error` (handler and guard seams)
//! - transport-agnostic (the HTTP crate decides how to serialize)
//!
//! With feature `serde` you also get `to_json()`, producing the
//! `{ "ok": false, "error": ... }` body the intake endpoint returns.

use std::fmt;

use anyhow::Error as AnyError;

/// A convenience result type for seams that return `anyhow` errors.
pub type ClipResult<T> = std::result::Result<T, AnyError>;

/// Error categories + the status code each one is reported with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BadRequest,       // 400
    NotAuthenticated, // 401
    Forbidden,        // 403
    PayloadTooLarge,  // 413
    GeneralError,     // 500
}

impl ErrorKind {
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::BadRequest => 400,
            ErrorKind::NotAuthenticated => 401,
            ErrorKind::Forbidden => 403,
            ErrorKind::PayloadTooLarge => 413,
            ErrorKind::GeneralError => 500,
        }
    }

    /// Error `name` (e.g. "PayloadTooLarge")
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "BadRequest",
            ErrorKind::NotAuthenticated => "NotAuthenticated",
            ErrorKind::Forbidden => "Forbidden",
            ErrorKind::PayloadTooLarge => "PayloadTooLarge",
            ErrorKind::GeneralError => "GeneralError",
        }
    }

    /// Kebab-cased class name
    pub fn class_name(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "bad-request",
            ErrorKind::NotAuthenticated => "not-authenticated",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::PayloadTooLarge => "payload-too-large",
            ErrorKind::GeneralError => "general-error",
        }
    }

    pub fn is_client_error(&self) -> bool {
        self.status_code() < 500
    }
}

/// A structured error that can live inside `anyhow::Error`.
#[derive(Debug)]
pub struct ClipError {
    pub kind: ErrorKind,
    pub message: String,
    pub source: Option<AnyError>,
}

impl ClipError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: AnyError) -> Self {
        self.source = Some(source);
        self
    }

    pub fn code(&self) -> u16 {
        self.kind.status_code()
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn class_name(&self) -> &'static str {
        self.kind.class_name()
    }

    /// Convert into `anyhow::Error` so it flows through handler and guard seams.
    pub fn into_anyhow(self) -> AnyError {
        AnyError::new(self)
    }

    /// Downcast an `anyhow::Error` to a `ClipError` if possible.
    pub fn from_anyhow(err: &AnyError) -> Option<&ClipError> {
        err.downcast_ref::<ClipError>()
    }

    /// Turn any error into a ClipError:
    /// - if it's already a ClipError (anywhere in the chain), keep kind and message
    /// - otherwise wrap as GeneralError
    pub fn normalize(err: AnyError) -> ClipError {
        if let Some(clip) = err.chain().find_map(|e| e.downcast_ref::<ClipError>()) {
            return ClipError::new(clip.kind, clip.message.clone()).with_source(err);
        }
        ClipError::new(ErrorKind::GeneralError, err.to_string()).with_source(err)
    }

    /// Client-safe copy: keeps kind and message, drops the inner `source`.
    pub fn sanitize_for_client(&self) -> ClipError {
        ClipError {
            kind: self.kind,
            message: self.message.clone(),
            source: None,
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, msg)
    }
    pub fn not_authenticated(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotAuthenticated, msg)
    }
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, msg)
    }
    pub fn payload_too_large(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::PayloadTooLarge, msg)
    }
    pub fn general_error(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::GeneralError, msg)
    }
}

impl fmt::Display for ClipError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.name(), self.code(), self.message)
    }
}

impl std::error::Error for ClipError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

#[cfg(feature = "serde")]
impl ClipError {
    /// Failure body in the intake response shape.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "ok": false,
            "error": self.message,
        })
    }
}

/// Convenience helper for "bail with ClipError".
#[macro_export]
macro_rules! bail_clip {
    ($ctor:ident, $msg:expr) => {
        return Err($crate::errors::ClipError::$ctor($msg).into_anyhow());
    };
    ($ctor:ident, $fmt:expr, $($arg:tt)*) => {
        return Err($crate::errors::ClipError::$ctor(format!($fmt, $($arg)*)).into_anyhow());
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_report_expected_status_codes() {
        assert_eq!(ErrorKind::BadRequest.status_code(), 400);
        assert_eq!(ErrorKind::PayloadTooLarge.status_code(), 413);
        assert_eq!(ErrorKind::GeneralError.status_code(), 500);
        assert!(ErrorKind::Forbidden.is_client_error());
        assert!(!ErrorKind::GeneralError.is_client_error());
    }

    #[test]
    fn normalize_keeps_wrapped_clip_error() {
        let err = ClipError::forbidden("nope")
            .into_anyhow()
            .context("guard rejected request");
        let normalized = ClipError::normalize(err);
        assert_eq!(normalized.kind, ErrorKind::Forbidden);
        assert_eq!(normalized.message, "nope");
    }

    #[test]
    fn normalize_wraps_foreign_errors_as_general() {
        let normalized = ClipError::normalize(anyhow::anyhow!("disk on fire"));
        assert_eq!(normalized.kind, ErrorKind::GeneralError);
        assert_eq!(normalized.message, "disk on fire");
        assert!(normalized.sanitize_for_client().source.is_none());
    }

    #[test]
    fn bail_macro_produces_clip_error() {
        fn guarded(ok: bool) -> ClipResult<()> {
            if !ok {
                bail_clip!(not_authenticated, "login required for {}", "uploads");
            }
            Ok(())
        }

        let err = guarded(false).unwrap_err();
        let clip = ClipError::from_anyhow(&err).unwrap();
        assert_eq!(clip.code(), 401);
        assert_eq!(clip.message, "login required for uploads");
        assert!(guarded(true).is_ok());
    }
}
