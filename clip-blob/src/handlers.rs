//! Ready-made external handlers.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

use crate::naming;
use crate::{FileMeta, StagedFile, StorageHandler, StorageResult, UploadContext};

/// Copies uploads into a directory tree when the request asks for it by name.
///
/// Claims an upload only when `requested_storage` equals the handler name.
/// The `folder` hint becomes a sub-directory after sanitizing; it can never
/// point outside `root`.
#[derive(Debug, Clone)]
pub struct DirectoryHandler {
    name: String,
    root: PathBuf,
    base_url: String,
}

impl DirectoryHandler {
    pub fn new(
        name: impl Into<String>,
        root: impl Into<PathBuf>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
            base_url: base_url.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn claims(&self, context: &UploadContext) -> bool {
        context
            .requested_storage
            .as_deref()
            .is_some_and(|requested| requested.trim() == self.name)
    }
}

/// Turn a client folder hint into relative, safe path segments.
pub fn sanitize_folder(folder: &str) -> PathBuf {
    folder
        .split(|c: char| c == '/' || c == '\\')
        .filter_map(|segment| {
            let segment = segment.trim();
            match Path::new(segment).components().next() {
                Some(Component::Normal(_)) => {
                    let cleaned = naming::sanitize_filename(segment);
                    (cleaned != naming::FALLBACK_FILENAME).then_some(cleaned)
                }
                _ => None,
            }
        })
        .collect()
}

#[async_trait]
impl StorageHandler for DirectoryHandler {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(
        &self,
        staged: &StagedFile,
        context: &UploadContext,
        meta: &FileMeta,
    ) -> anyhow::Result<Option<StorageResult>> {
        if !self.claims(context) {
            return Ok(None);
        }

        let folder = context
            .folder
            .as_deref()
            .map(sanitize_folder)
            .unwrap_or_default();
        let file_name = format!("{}-{}", Uuid::new_v4().simple(), meta.name);
        let relative = folder.join(&file_name);
        let target = self.root.join(&relative);

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }
        let size_bytes = staged.copy_to(&target).await?;

        let relative_url = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");
        debug!(handler = %self.name, path = %target.display(), "upload copied");

        Ok(Some(
            StorageResult::new(self.name.clone())
                .with_locator(format!(
                    "{}/{}",
                    self.base_url.trim_end_matches('/'),
                    relative_url
                ))
                .with_field("path", relative_url)
                .with_field("size_bytes", size_bytes),
        ))
    }
}
