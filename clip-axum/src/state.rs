use std::sync::Arc;

use clip_blob::UploadPipeline;

use crate::UploadGuard;

/// Shared state behind the upload routes.
#[derive(Clone)]
pub struct ClipAxumState {
    pub pipeline: Arc<UploadPipeline>,
    pub guard: Arc<dyn UploadGuard>,
}

impl ClipAxumState {
    pub fn new<G: UploadGuard + 'static>(pipeline: UploadPipeline, guard: G) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            guard: Arc::new(guard),
        }
    }
}
