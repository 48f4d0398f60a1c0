use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::{FileMeta, StagedFile, StorageResult, UploadContext, UploadError, UploadResult};

/// An external storage backend that may claim an upload before the default
/// store sees it.
///
/// Return `Ok(None)` to decline. Returning `Ok(Some(..))` means the handler
/// has stored the content itself; the staged copy is still deleted by the
/// pipeline afterwards. An `Err` fails the whole upload.
#[async_trait]
pub trait StorageHandler: Send + Sync {
    /// Name used in logs and error reports.
    fn name(&self) -> &str;

    async fn handle(
        &self,
        staged: &StagedFile,
        context: &UploadContext,
        meta: &FileMeta,
    ) -> anyhow::Result<Option<StorageResult>>;
}

/// Result of offering an upload to the registered handlers.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteOutcome {
    ExternalHandled(StorageResult),
    UseDefault,
}

/// Offers staged uploads to an ordered list of handlers.
///
/// Handlers are asked in registration order. The first one to return a
/// result wins and the rest are never called.
#[derive(Clone, Default)]
pub struct StorageRouter {
    handlers: Vec<Arc<dyn StorageHandler>>,
}

impl StorageRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_handlers(handlers: Vec<Arc<dyn StorageHandler>>) -> Self {
        Self { handlers }
    }

    /// Append a handler after the ones already registered.
    pub fn with_handler<H: StorageHandler + 'static>(mut self, handler: H) -> Self {
        self.handlers.push(Arc::new(handler));
        self
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    pub fn handler_names(&self) -> Vec<String> {
        self.handlers.iter().map(|h| h.name().to_string()).collect()
    }

    /// Ask each handler in turn. No retries: a failing handler fails the route.
    pub async fn route(
        &self,
        staged: &StagedFile,
        context: &UploadContext,
        meta: &FileMeta,
    ) -> UploadResult<RouteOutcome> {
        for handler in &self.handlers {
            match handler.handle(staged, context, meta).await {
                Ok(Some(result)) => {
                    info!(
                        handler = handler.name(),
                        provider = %result.provider,
                        "upload claimed by external handler"
                    );
                    return Ok(RouteOutcome::ExternalHandled(result));
                }
                Ok(None) => {
                    debug!(handler = handler.name(), "handler declined upload");
                }
                Err(e) => {
                    warn!(handler = handler.name(), error = %e, "external handler failed");
                    return Err(UploadError::external(handler.name(), e));
                }
            }
        }

        Ok(RouteOutcome::UseDefault)
    }
}

impl std::fmt::Debug for StorageRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageRouter")
            .field("handlers", &self.handler_names())
            .finish()
    }
}
