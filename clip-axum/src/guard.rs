//! The authentication seam in front of the upload route.
//!
//! Identity is owned by the host. A guard only answers "who is uploading,
//! and did the form carry the nonce we handed out", and fails with a
//! [`ClipError`] the HTTP layer can render.

use async_trait::async_trait;
use axum::http::HeaderMap;
use clip_core::{bail_clip, Actor, ClipConfigSnapshot, ClipError, ClipResult};
use subtle::ConstantTimeEq;

pub const NONCE_MESSAGE: &str = "Invalid or missing upload nonce.";
pub const AUTH_MESSAGE: &str = "You must be signed in to upload recordings.";

/// Resolves the acting user for an upload request.
#[async_trait]
pub trait UploadGuard: Send + Sync {
    /// `nonce` is the `upload_nonce` form field, if the client sent one.
    ///
    /// Return a [`ClipError`] (via `into_anyhow`) to pick the status code;
    /// any other error is reported as a 500.
    async fn authorize(&self, headers: &HeaderMap, nonce: Option<&str>) -> ClipResult<Actor>;
}

/// Trusts identity headers set by an authenticating reverse proxy and
/// checks the form nonce against a shared secret.
#[derive(Debug, Clone)]
pub struct ProxyHeaderGuard {
    nonce: String,
    user_header: String,
    name_header: String,
}

impl ProxyHeaderGuard {
    pub fn new(nonce: impl Into<String>) -> Self {
        Self {
            nonce: nonce.into(),
            user_header: "x-user-id".to_string(),
            name_header: "x-user-name".to_string(),
        }
    }

    /// Build from `auth.nonce` and `auth.user_header`.
    pub fn from_snapshot(snapshot: &ClipConfigSnapshot) -> anyhow::Result<Self> {
        let nonce = snapshot
            .get_string("auth.nonce")
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("auth.nonce must be set"))?;

        let mut guard = Self::new(nonce);
        if let Some(header) = snapshot.get_string("auth.user_header") {
            guard = guard.with_user_header(header);
        }
        Ok(guard)
    }

    pub fn with_user_header(mut self, header: impl Into<String>) -> Self {
        self.user_header = header.into().to_ascii_lowercase();
        self
    }

    pub fn with_name_header(mut self, header: impl Into<String>) -> Self {
        self.name_header = header.into().to_ascii_lowercase();
        self
    }

    fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }
}

fn nonce_matches(given: &str, expected: &str) -> bool {
    if given.len() != expected.len() {
        return false;
    }
    given.as_bytes().ct_eq(expected.as_bytes()).into()
}

#[async_trait]
impl UploadGuard for ProxyHeaderGuard {
    async fn authorize(&self, headers: &HeaderMap, nonce: Option<&str>) -> ClipResult<Actor> {
        if !nonce.is_some_and(|n| nonce_matches(n.trim(), &self.nonce)) {
            bail_clip!(forbidden, NONCE_MESSAGE);
        }

        let Some(id) = Self::header(headers, &self.user_header) else {
            return Err(ClipError::not_authenticated(AUTH_MESSAGE).into_anyhow());
        };
        let name = Self::header(headers, &self.name_header).unwrap_or(id);

        Ok(Actor::new(id, name))
    }
}
