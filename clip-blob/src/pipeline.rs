use std::sync::Arc;

use chrono::Utc;
use clip_core::Actor;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::naming;
use crate::{
    validate, AssetStore, FileMeta, ResultNormalizer, RouteOutcome, SaveNotifier, StagedFile,
    Stager, StorageHandler, StorageResult, StorageRouter, UploadConfig, UploadContext,
    UploadError, UploadFile, UploadOutcome, UploadRequest, UploadResult, Validation,
};

/// The upload pipeline - this is what the transport layer embeds.
///
/// One call to [`UploadPipeline::process`] per upload. The pipeline holds no
/// per-upload state, so a single instance can serve concurrent requests.
#[derive(Clone)]
pub struct UploadPipeline {
    config: UploadConfig,
    stager: Stager,
    router: StorageRouter,
    store: Arc<dyn AssetStore>,
    normalizer: ResultNormalizer,
}

impl UploadPipeline {
    /// Create a pipeline with no external handlers and no notifier
    pub fn new<S: AssetStore + 'static>(config: UploadConfig, store: S) -> Self {
        Self::with_store(config, Arc::new(store))
    }

    /// Create with a shared default store
    pub fn with_store(config: UploadConfig, store: Arc<dyn AssetStore>) -> Self {
        Self {
            stager: Stager::new(config.staging_dir.clone()),
            config,
            router: StorageRouter::new(),
            store,
            normalizer: ResultNormalizer::new(),
        }
    }

    /// Register an external handler after the ones already registered
    pub fn with_handler<H: StorageHandler + 'static>(mut self, handler: H) -> Self {
        self.router = self.router.with_handler(handler);
        self
    }

    /// Replace the handler list wholesale
    pub fn with_router(mut self, router: StorageRouter) -> Self {
        self.router = router;
        self
    }

    /// Announce successful saves to `notifier`
    pub fn with_notifier(mut self, notifier: SaveNotifier) -> Self {
        self.normalizer = self.normalizer.with_notifier(notifier);
        self
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    pub fn router(&self) -> &StorageRouter {
        &self.router
    }

    /// Run one upload to completion.
    ///
    /// Never returns an error: every failure is folded into the outcome. The
    /// staged file, if one was created, is gone by the time this returns.
    pub async fn process(&self, request: UploadRequest, actor: &Actor) -> UploadOutcome {
        let UploadRequest { file, context } = request;

        let span = info_span!(
            "upload",
            actor = %actor.id,
            consumer = context.consumer.as_deref().unwrap_or("-"),
            declared_size = file.as_ref().map_or(0, |f| f.declared_size),
        );

        let result = self
            .run(file, &context, actor)
            .instrument(span.clone())
            .await;

        span.in_scope(|| {
            match &result {
                Ok(stored) => info!(
                    provider = %stored.provider,
                    locator = stored.locator.as_deref().unwrap_or("-"),
                    "upload stored"
                ),
                Err(e) => warn!(error = e.tag(), message = %e, "upload failed"),
            }
            self.normalizer.normalize(result, &context)
        })
    }

    async fn run(
        &self,
        file: Option<UploadFile>,
        context: &UploadContext,
        actor: &Actor,
    ) -> UploadResult<StorageResult> {
        let max_bytes = self.config.max_upload_bytes;
        let declared_size = file.as_ref().map_or(0, |f| f.declared_size);

        if let Validation::Reject(rejection) = validate(file.is_some(), declared_size, max_bytes) {
            return Err(rejection.into_error());
        }
        let Some(UploadFile {
            body,
            filename,
            content_type,
            ..
        }) = file
        else {
            return Err(UploadError::MissingFile);
        };

        let name = naming::sanitize_filename(filename.as_deref().unwrap_or_default());
        let mime_type = naming::resolve_mime(content_type.as_deref(), &name);

        let staged = self.stager.stage(body, &name, max_bytes).await?;
        let meta = FileMeta {
            name,
            mime_type,
            size: staged.size_bytes(),
        };
        debug!(name = %meta.name, mime_type = %meta.mime_type, size = meta.size, "upload staged");

        let stored = self.persist(&staged, context, &meta, actor).await;

        // runs on every branch, handled or not
        if let Err(e) = staged.cleanup() {
            warn!(error = %e, "could not remove staged upload");
        }

        stored
    }

    async fn persist(
        &self,
        staged: &StagedFile,
        context: &UploadContext,
        meta: &FileMeta,
        actor: &Actor,
    ) -> UploadResult<StorageResult> {
        match self.router.route(staged, context, meta).await? {
            RouteOutcome::ExternalHandled(result) => Ok(result),
            RouteOutcome::UseDefault => {
                let title = naming::recording_title(actor, Utc::now());
                self.store
                    .store(staged, &title, meta, context)
                    .await
                    .map_err(UploadError::backend)
            }
        }
    }
}

impl std::fmt::Debug for UploadPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadPipeline")
            .field("config", &self.config)
            .field("router", &self.router)
            .field("normalizer", &self.normalizer)
            .finish_non_exhaustive()
    }
}
