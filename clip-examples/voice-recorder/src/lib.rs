//! Voice recorder backend: the upload intake wired up from environment
//! configuration.
//!
//! ```bash
//! VOICE__AUTH__NONCE=change-me \
//! VOICE__STORE__ROOT=./media \
//! VOICE__ARCHIVE__ROOT=./archive \
//! RUST_LOG=info cargo run -p voice-recorder
//! ```

use clip_axum::{ClipApp, ProxyHeaderGuard, UPLOAD_PATH};
use clip_blob::{
    DirectoryHandler, LocalAssetStore, SaveNotifier, SavedUpload, UploadConfig, UploadPipeline,
};
use clip_core::{ClipConfig, ClipConfigSnapshot};
use tower_http::services::ServeDir;
use tracing::info;

/// Prefix for environment overrides (`VOICE__HTTP__PORT` -> `http.port`).
pub const ENV_PREFIX: &str = "VOICE";

pub struct VoiceRecorder {
    pub app: ClipApp,
    pub config: ClipConfigSnapshot,
}

impl VoiceRecorder {
    pub fn addr(&self) -> String {
        let host = self
            .config
            .get_string("http.host")
            .unwrap_or_else(|| "127.0.0.1".to_string());
        let port = self
            .config
            .get_string("http.port")
            .unwrap_or_else(|| "3030".to_string());
        format!("{host}:{port}")
    }
}

const RESERVED_PATHS: [&str; 2] = [UPLOAD_PATH, "/health"];

/// Route prefix for a site-relative base URL (`/files/` -> `/files`).
fn mount_path(base_url: &str) -> Option<String> {
    let path = base_url.trim().trim_end_matches('/');
    if !path.starts_with('/') || path.starts_with("//") {
        return None;
    }
    Some(path.to_string())
}

fn defaults(config: &mut ClipConfig) {
    config.set_default("store.root", "./media");
    config.set_default("store.base_url", "/media");
    config.set_default("archive.name", "archive");
    config.set_default("archive.base_url", "/archive");
}

/// Build from the process environment.
pub async fn build() -> anyhow::Result<VoiceRecorder> {
    let mut config = ClipConfig::new();
    config.load_env(ENV_PREFIX);
    build_with(config).await
}

/// Build from an explicit configuration.
pub async fn build_with(mut config: ClipConfig) -> anyhow::Result<VoiceRecorder> {
    defaults(&mut config);
    let snapshot = config.snapshot();

    let store = LocalAssetStore::from_snapshot(&snapshot).await?;
    let media_root = store.root().to_path_buf();
    let guard = ProxyHeaderGuard::from_snapshot(&snapshot)?;

    let mut pipeline = UploadPipeline::new(UploadConfig::from_snapshot(&snapshot), store)
        .with_notifier(SaveNotifier::listener(log_saved));

    let mut mounts = vec![(
        snapshot.get_string("store.base_url").unwrap_or_default(),
        media_root,
    )];
    if let Some(root) = snapshot.get_string("archive.root") {
        let name = snapshot.get_string("archive.name").unwrap_or_default();
        let base_url = snapshot.get_string("archive.base_url").unwrap_or_default();
        info!(handler = %name, root = %root, "archive handler enabled");
        pipeline = pipeline.with_handler(DirectoryHandler::new(name, &root, &base_url));
        mounts.push((base_url, root.into()));
    }

    let mut app = ClipApp::new(pipeline, guard);
    let mut mounted: Vec<String> = Vec::new();
    for (base_url, root) in mounts {
        // absolute base URLs are served by someone else
        let Some(path) = mount_path(&base_url) else {
            continue;
        };
        if RESERVED_PATHS.contains(&path.as_str()) || mounted.contains(&path) {
            anyhow::bail!("cannot serve stored files at {path}: path already in use");
        }
        info!(path = %path, root = %root.display(), "serving stored files");
        app.router = app.router.nest_service(&path, ServeDir::new(root));
        mounted.push(path);
    }

    Ok(VoiceRecorder {
        app,
        config: snapshot,
    })
}

async fn log_saved(saved: SavedUpload) {
    info!(
        provider = %saved.result.provider,
        locator = saved.result.locator.as_deref().unwrap_or("-"),
        consumer = saved.context.consumer.as_deref().unwrap_or("-"),
        reference_id = saved.context.reference_id.as_deref().unwrap_or("-"),
        "voice recording saved"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mount_path_follows_relative_base_urls() {
        assert_eq!(mount_path("/media").as_deref(), Some("/media"));
        assert_eq!(mount_path("/files/").as_deref(), Some("/files"));
        assert_eq!(mount_path("/a/b").as_deref(), Some("/a/b"));
        assert_eq!(mount_path("https://cdn.example/media"), None);
        assert_eq!(mount_path("//cdn.example/media"), None);
        assert_eq!(mount_path("/"), None);
        assert_eq!(mount_path(""), None);
    }
}
