//! Temp staging: puts upload bytes on disk at a unique, process-private path
//! so storage backends work from a stable file instead of a request buffer.

use std::io;
use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use tempfile::TempPath;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::naming;
use crate::{ByteStream, UploadError, UploadResult};

const STAGED_PREFIX: &str = "clip-upload-";

/// An uploaded file materialized on disk.
///
/// Owned exclusively by the pipeline. The path is removed exactly once: by
/// [`StagedFile::cleanup`], or on drop if cleanup never ran.
#[derive(Debug)]
pub struct StagedFile {
    path: TempPath,
    size_bytes: u64,
    suggested_filename: String,
}

impl StagedFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    pub fn suggested_filename(&self) -> &str {
        &self.suggested_filename
    }

    /// Copy the staged bytes to `target`, which must not exist yet.
    ///
    /// A copy that fails after `target` was created removes it again.
    pub async fn copy_to(&self, target: &Path) -> io::Result<u64> {
        copy_file(&self.path, target).await
    }

    /// Delete the staged copy now.
    ///
    /// A file a handler already moved away counts as cleaned up.
    pub fn cleanup(self) -> io::Result<()> {
        let shown = self.path.display().to_string();
        match self.path.close() {
            Ok(()) => {
                debug!(path = %shown, "staged file removed");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %shown, "staged file already gone");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

async fn copy_file(source: &Path, target: &Path) -> io::Result<u64> {
    let mut reader = tokio::fs::File::open(source).await?;
    let mut writer = tokio::fs::File::create(target).await?;

    let copied = async {
        let size = tokio::io::copy(&mut reader, &mut writer).await?;
        writer.flush().await?;
        writer.sync_all().await?;
        Ok::<_, io::Error>(size)
    }
    .await;

    if copied.is_err() {
        drop(writer);
        if let Err(e) = tokio::fs::remove_file(target).await {
            warn!(path = %target.display(), error = %e, "could not remove partial copy");
        }
    }
    copied
}

/// Writes upload streams into the staging directory.
#[derive(Debug, Clone)]
pub struct Stager {
    dir: PathBuf,
}

impl Stager {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Stream `body` into a fresh staged file.
    ///
    /// Fails with [`UploadError::Staging`] on any read or write error and with
    /// [`UploadError::TooLarge`] if the stream carries more than `max_bytes`.
    /// Partial files are removed before returning an error.
    pub async fn stage(
        &self,
        mut body: ByteStream,
        suggested_filename: &str,
        max_bytes: u64,
    ) -> UploadResult<StagedFile> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(UploadError::staging)?;

        let suffix = naming::extension(suggested_filename)
            .map(|ext| format!(".{ext}"))
            .unwrap_or_default();

        let named = tempfile::Builder::new()
            .prefix(STAGED_PREFIX)
            .suffix(&suffix)
            .tempfile_in(&self.dir)
            .map_err(UploadError::staging)?;

        // `path` deletes the file if we bail out below
        let (file, path) = named.into_parts();
        let mut file = tokio::fs::File::from_std(file);
        let mut size_bytes = 0u64;

        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| {
                warn!(path = %path.display(), error = %e, "upload stream failed while staging");
                UploadError::staging(e)
            })?;

            size_bytes += chunk.len() as u64;
            if size_bytes > max_bytes {
                return Err(UploadError::TooLarge {
                    size: size_bytes,
                    max: max_bytes,
                });
            }

            file.write_all(&chunk).await.map_err(UploadError::staging)?;
        }

        file.flush().await.map_err(UploadError::staging)?;
        file.sync_all().await.map_err(UploadError::staging)?;
        drop(file);

        debug!(path = %path.display(), size_bytes, "upload staged");

        Ok(StagedFile {
            path,
            size_bytes,
            suggested_filename: suggested_filename.to_string(),
        })
    }
}
