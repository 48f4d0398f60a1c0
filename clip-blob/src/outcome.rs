//! Result normalization and the post-save notification.

use std::sync::Arc;

use clip_core::ErrorKind;
use futures_util::future::BoxFuture;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::debug;

use crate::{StorageResult, UploadContext, UploadError};

/// The externally visible result of one upload.
///
/// Exactly one of `result` / `error` is set. On success `attachment_id` and
/// `url` mirror the result for clients written against the older
/// single-backend response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UploadOutcome {
    pub ok: bool,
    #[serde(default, rename = "storage")]
    pub result: Option<StorageResult>,
    #[serde(default)]
    pub attachment_id: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(skip)]
    pub error_kind: Option<ErrorKind>,
}

impl UploadOutcome {
    pub fn success(result: StorageResult) -> Self {
        Self {
            ok: true,
            attachment_id: result.backend_id.clone(),
            url: result.locator.clone(),
            result: Some(result),
            error: None,
            error_kind: None,
        }
    }

    pub fn failure(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            result: None,
            attachment_id: None,
            url: None,
            error: Some(message.into()),
            error_kind: Some(kind),
        }
    }

    pub fn from_error(err: &UploadError) -> Self {
        Self::failure(err.kind(), err.to_string())
    }

    /// Transport status: 200 on success, the error kind's code otherwise.
    pub fn status_code(&self) -> u16 {
        match (self.ok, self.error_kind) {
            (true, _) => 200,
            (false, Some(kind)) => kind.status_code(),
            (false, None) => ErrorKind::GeneralError.status_code(),
        }
    }

    pub fn provider(&self) -> Option<&str> {
        self.result.as_ref().map(|r| r.provider.as_str())
    }

    /// Wire shape of the intake response.
    pub fn to_json(&self) -> Value {
        match (&self.result, self.ok) {
            (Some(result), true) => json!({
                "ok": true,
                "attachment_id": self.attachment_id,
                "url": self.url,
                "storage": result.to_json(),
            }),
            _ => json!({
                "ok": false,
                "error": self.error.as_deref().unwrap_or("Upload failed."),
            }),
        }
    }
}

/// Payload of the post-save notification.
#[derive(Debug, Clone)]
pub struct SavedUpload {
    pub result: StorageResult,
    pub context: UploadContext,
}

/// Async listener for saved uploads.
pub type SaveListener = Arc<dyn Fn(SavedUpload) -> BoxFuture<'static, ()> + Send + Sync>;

/// Where post-save notifications go.
#[derive(Clone)]
pub enum SaveNotifier {
    /// Run a listener on its own task
    Listener(SaveListener),
    /// Push onto a channel some consumer drains
    Channel(mpsc::UnboundedSender<SavedUpload>),
}

impl SaveNotifier {
    pub fn listener<F, Fut>(f: F) -> Self
    where
        F: Fn(SavedUpload) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        Self::Listener(Arc::new(move |saved| Box::pin(f(saved))))
    }

    pub fn channel(sender: mpsc::UnboundedSender<SavedUpload>) -> Self {
        Self::Channel(sender)
    }

    /// Fire and forget. Never blocks and never reports failure to the caller.
    fn notify(&self, saved: SavedUpload) {
        match self {
            SaveNotifier::Listener(listener) => {
                let fut = listener(saved);
                tokio::spawn(fut);
            }
            SaveNotifier::Channel(sender) => {
                if sender.send(saved).is_err() {
                    debug!("save notification dropped, receiver is gone");
                }
            }
        }
    }
}

impl std::fmt::Debug for SaveNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SaveNotifier::Listener(_) => f.write_str("SaveNotifier::Listener"),
            SaveNotifier::Channel(_) => f.write_str("SaveNotifier::Channel"),
        }
    }
}

/// Builds [`UploadOutcome`]s and announces successful saves.
#[derive(Debug, Clone, Default)]
pub struct ResultNormalizer {
    notifiers: Vec<SaveNotifier>,
}

impl ResultNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_notifier(mut self, notifier: SaveNotifier) -> Self {
        self.notifiers.push(notifier);
        self
    }

    /// Normalize a finished upload. Successful results are announced to every
    /// notifier before the outcome is returned; nothing is awaited.
    pub fn normalize(
        &self,
        result: Result<StorageResult, UploadError>,
        context: &UploadContext,
    ) -> UploadOutcome {
        match result {
            Ok(result) => {
                for notifier in &self.notifiers {
                    notifier.notify(SavedUpload {
                        result: result.clone(),
                        context: context.clone(),
                    });
                }
                UploadOutcome::success(result)
            }
            Err(err) => UploadOutcome::from_error(&err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_shape_keeps_legacy_fields() {
        let outcome = UploadOutcome::success(
            StorageResult::new("default")
                .with_locator("https://x/a.webm")
                .with_backend_id("a"),
        );
        let json = outcome.to_json();

        assert_eq!(outcome.status_code(), 200);
        assert_eq!(json["ok"], true);
        assert_eq!(json["attachment_id"], "a");
        assert_eq!(json["url"], "https://x/a.webm");
        assert_eq!(json["storage"]["provider"], "default");
        assert!(json.get("error").is_none());
    }

    #[test]
    fn external_result_without_id_serializes_null() {
        let outcome = UploadOutcome::success(
            StorageResult::new("external-x").with_locator("https://cdn.example/v.webm"),
        );
        let json = outcome.to_json();

        assert!(json["attachment_id"].is_null());
        assert_eq!(json["storage"]["provider"], "external-x");

        let parsed: UploadOutcome = serde_json::from_value(json).unwrap();
        assert!(parsed.ok);
        assert_eq!(parsed.attachment_id, None);
        assert_eq!(parsed.provider(), Some("external-x"));
    }

    #[test]
    fn failure_shape_has_only_ok_and_error() {
        let outcome = UploadOutcome::from_error(&UploadError::MissingFile);
        let json = outcome.to_json();

        assert_eq!(outcome.status_code(), 400);
        assert_eq!(json, json!({ "ok": false, "error": "No file was uploaded." }));
    }

    #[tokio::test]
    async fn channel_notifier_receives_result_and_context() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let normalizer = ResultNormalizer::new().with_notifier(SaveNotifier::channel(tx));
        let context = UploadContext::new().with_reference_id("post-9");

        let outcome = normalizer.normalize(Ok(StorageResult::new("default")), &context);
        assert!(outcome.ok);

        let saved = rx.recv().await.unwrap();
        assert_eq!(saved.result.provider, "default");
        assert_eq!(saved.context.reference_id.as_deref(), Some("post-9"));
    }

    #[tokio::test]
    async fn failures_are_not_announced() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let normalizer = ResultNormalizer::new().with_notifier(SaveNotifier::channel(tx));

        let outcome = normalizer.normalize(Err(UploadError::MissingFile), &UploadContext::new());
        assert!(!outcome.ok);
        drop(normalizer);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn closed_channel_does_not_fail_the_upload() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let normalizer = ResultNormalizer::new().with_notifier(SaveNotifier::channel(tx));

        let outcome = normalizer.normalize(Ok(StorageResult::new("default")), &UploadContext::new());
        assert!(outcome.ok);
    }
}
