//! clip-axum: Axum adapter for the clip upload pipeline.
//!
//! Exposes `POST /uploads` (multipart intake behind an [`UploadGuard`]) and
//! `GET /health`, with request ids and HTTP tracing on every route.

pub mod app;
pub mod guard;
pub mod intake;
pub mod state;
mod error;

pub use app::{ClipApp, UPLOAD_PATH};
pub use error::{ClipAxumError, UploadResponse};
pub use guard::{ProxyHeaderGuard, UploadGuard};
pub use intake::{read_upload, IntakeForm};
pub use state::ClipAxumState;
