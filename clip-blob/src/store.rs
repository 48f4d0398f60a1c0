use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};
use clip_core::ClipConfigSnapshot;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::naming;
use crate::{FileMeta, StagedFile, StorageResult, StoreError, StoreResult, UploadContext};

/// Provider tag reported by the primary asset store.
pub const DEFAULT_PROVIDER: &str = "default";

/// The primary asset store: persists whatever no external handler claimed.
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Persist the staged file under `title` and return its canonical locator.
    ///
    /// Must copy out of the staged path; the pipeline deletes it afterwards.
    async fn store(
        &self,
        staged: &StagedFile,
        title: &str,
        meta: &FileMeta,
        context: &UploadContext,
    ) -> StoreResult<StorageResult>;
}

/// Strategy for laying out stored assets
pub trait AssetKeyStrategy: Send + Sync {
    /// Relative key for a new asset
    fn object_key(&self, asset_id: &str, extension: Option<&str>, at: DateTime<Utc>) -> String;

    /// Key of the metadata record stored next to an asset
    fn metadata_key(&self, object_key: &str) -> String {
        format!("{object_key}.meta.json")
    }
}

/// Default key strategy: year/month/asset_id.ext
#[derive(Debug, Clone)]
pub struct DefaultKeyStrategy;

impl AssetKeyStrategy for DefaultKeyStrategy {
    fn object_key(&self, asset_id: &str, extension: Option<&str>, at: DateTime<Utc>) -> String {
        let file = match extension {
            Some(ext) => format!("{asset_id}.{ext}"),
            None => asset_id.to_string(),
        };
        format!("{:04}/{:02}/{}", at.year(), at.month(), file)
    }
}

/// Metadata record written next to every stored asset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssetRecord {
    pub id: String,
    pub title: String,
    pub filename: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub context: BTreeMap<String, String>,
}

/// Filesystem-backed asset store.
///
/// Files land under `root` and are served from `base_url`, so the locator of
/// `root/2024/03/abc.webm` is `{base_url}/2024/03/abc.webm`.
#[derive(Clone)]
pub struct LocalAssetStore {
    root: PathBuf,
    base_url: String,
    keys: Arc<dyn AssetKeyStrategy>,
}

impl LocalAssetStore {
    /// Create the store, making sure `root` exists.
    pub async fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> StoreResult<Self> {
        Self::with_key_strategy(root, base_url, DefaultKeyStrategy).await
    }

    pub async fn with_key_strategy<K: AssetKeyStrategy + 'static>(
        root: impl Into<PathBuf>,
        base_url: impl Into<String>,
        keys: K,
    ) -> StoreResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await.map_err(|e| {
            StoreError::invalid(format!(
                "Failed to create storage directory {}: {}",
                root.display(),
                e
            ))
        })?;

        Ok(Self {
            root,
            base_url: base_url.into(),
            keys: Arc::new(keys),
        })
    }

    /// Build from `store.root` and `store.base_url` (defaults `./media`, `/media`).
    pub async fn from_snapshot(snapshot: &ClipConfigSnapshot) -> StoreResult<Self> {
        let root = snapshot
            .get_string("store.root")
            .unwrap_or_else(|| "./media".to_string());
        let base_url = snapshot
            .get_string("store.base_url")
            .unwrap_or_else(|| "/media".to_string());
        Self::new(root, base_url).await
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Read back the metadata record for a stored key.
    pub async fn record(&self, object_key: &str) -> StoreResult<AssetRecord> {
        let path = self.root.join(self.keys.metadata_key(object_key));
        let bytes = fs::read(&path).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn locator(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }

    async fn write_record(&self, key: &str, record: &AssetRecord) -> StoreResult<()> {
        let path = self.root.join(self.keys.metadata_key(key));
        let json = serde_json::to_vec_pretty(record)?;
        fs::write(&path, json).await?;
        Ok(())
    }
}

#[async_trait]
impl AssetStore for LocalAssetStore {
    async fn store(
        &self,
        staged: &StagedFile,
        title: &str,
        meta: &FileMeta,
        context: &UploadContext,
    ) -> StoreResult<StorageResult> {
        let now = Utc::now();
        let id = Uuid::new_v4().simple().to_string();
        let ext = naming::extension(&meta.name);
        let key = self.keys.object_key(&id, ext.as_deref(), now);
        let target = self.root.join(&key);

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }
        let size_bytes = staged.copy_to(&target).await?;

        let record = AssetRecord {
            id: id.clone(),
            title: title.to_string(),
            filename: meta.name.clone(),
            mime_type: meta.mime_type.clone(),
            size_bytes,
            created_at: now,
            context: context.to_map(),
        };

        if let Err(e) = self.write_record(&key, &record).await {
            // no half-stored assets
            if let Err(rm) = fs::remove_file(&target).await {
                warn!(key = %key, error = %rm, "could not remove asset after metadata failure");
            }
            return Err(e);
        }

        debug!(key = %key, size_bytes, "asset stored");

        Ok(StorageResult::new(DEFAULT_PROVIDER)
            .with_locator(self.locator(&key))
            .with_backend_id(id)
            .with_field("key", &key)
            .with_field("title", title)
            .with_field("mime_type", &meta.mime_type)
            .with_field("size_bytes", size_bytes))
    }
}

impl std::fmt::Debug for LocalAssetStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalAssetStore")
            .field("root", &self.root)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}
