//! # clip-blob: upload intake and storage routing for voice clips
//!
//! `clip-blob` takes a recorded clip from the transport layer and sees it
//! through to storage:
//!
//! ```text
//! UploadRequest
//!     │
//!     ▼
//! validate ──► stage ──► StorageRouter ──► external handler (first claim wins)
//!                              │
//!                              └─────────► AssetStore (default)
//!                                               │
//!                              cleanup ◄────────┘
//!                                 │
//!                                 ▼
//!                       ResultNormalizer ──► UploadOutcome (+ notification)
//! ```
//!
//! The crate has no HTTP coupling: `clip-axum` parses multipart bodies into
//! [`UploadRequest`]s and renders [`UploadOutcome`]s.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use clip_blob::prelude::*;
//! use clip_core::Actor;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let store = LocalAssetStore::new("./media", "https://example.com/media").await?;
//! let pipeline = UploadPipeline::new(UploadConfig::default(), store);
//!
//! let request = UploadRequest::new(
//!     UploadFile::from_bytes(&b"...webm bytes..."[..]).with_filename("clip.webm"),
//! );
//! let outcome = pipeline.process(request, &Actor::new("7", "Ada")).await;
//! assert!(outcome.ok);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod naming;
pub mod outcome;
pub mod pipeline;
pub mod receipt;
pub mod router;
pub mod staging;
pub mod store;
pub mod types;
pub mod validator;

pub use config::UploadConfig;
pub use error::{StoreError, StoreResult, UploadError, UploadResult};
pub use handlers::{sanitize_folder, DirectoryHandler};
pub use outcome::{ResultNormalizer, SaveListener, SaveNotifier, SavedUpload, UploadOutcome};
pub use pipeline::UploadPipeline;
pub use receipt::{StorageResult, EXTERNAL_PROVIDER};
pub use router::{RouteOutcome, StorageHandler, StorageRouter};
pub use staging::{StagedFile, Stager};
pub use store::{
    AssetKeyStrategy, AssetRecord, AssetStore, DefaultKeyStrategy, LocalAssetStore,
    DEFAULT_PROVIDER,
};
pub use types::{stream_from_bytes, ByteStream, FileMeta, UploadContext, UploadFile, UploadRequest};
pub use validator::{validate, Rejection, Validation};

/// Convenience re-exports for embedding the pipeline
pub mod prelude {
    pub use crate::{
        AssetStore, DirectoryHandler, FileMeta, LocalAssetStore, SaveNotifier, StagedFile,
        StorageHandler, StorageResult, UploadConfig, UploadContext, UploadError, UploadFile,
        UploadOutcome, UploadPipeline, UploadRequest,
    };
}
