use std::path::PathBuf;

use clip_core::ClipConfigSnapshot;

/// Configuration for upload intake
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Max accepted size for a single clip, checked against the declared size
    pub max_upload_bytes: u64,

    /// Directory staged files are written into (must be process-private)
    pub staging_dir: PathBuf,

    /// Extra bytes the transport allows on top of `max_upload_bytes` for
    /// multipart framing and text fields before it rejects a body outright
    pub body_slack_bytes: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: 10 * 1024 * 1024, // 10MB
            staging_dir: std::env::temp_dir(),
            body_slack_bytes: 64 * 1024,
        }
    }
}

impl UploadConfig {
    /// Create a new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Read `upload.max_bytes`, `upload.staging_dir` and
    /// `upload.body_slack_bytes`, keeping defaults for anything missing.
    pub fn from_snapshot(snapshot: &ClipConfigSnapshot) -> Self {
        let defaults = Self::default();
        Self {
            max_upload_bytes: snapshot
                .get_u64("upload.max_bytes")
                .unwrap_or(defaults.max_upload_bytes),
            staging_dir: snapshot
                .get_string("upload.staging_dir")
                .map(PathBuf::from)
                .unwrap_or(defaults.staging_dir),
            body_slack_bytes: snapshot
                .get_u64("upload.body_slack_bytes")
                .unwrap_or(defaults.body_slack_bytes),
        }
    }

    /// Set max upload size
    pub fn with_max_upload_bytes(mut self, bytes: u64) -> Self {
        self.max_upload_bytes = bytes;
        self
    }

    /// Set staging directory
    pub fn with_staging_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.staging_dir = dir.into();
        self
    }

    /// Set framing allowance on top of the file limit
    pub fn with_body_slack_bytes(mut self, bytes: u64) -> Self {
        self.body_slack_bytes = bytes;
        self
    }

    /// Hard ceiling the transport should enforce on the whole request body.
    pub fn body_limit_bytes(&self) -> u64 {
        self.max_upload_bytes.saturating_add(self.body_slack_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clip_core::ClipConfig;

    #[test]
    fn snapshot_overrides_defaults() {
        let mut config = ClipConfig::new();
        config.set("upload.max_bytes", "1000");
        config.set("upload.staging_dir", "/var/tmp/clips");

        let upload = UploadConfig::from_snapshot(&config.snapshot());
        assert_eq!(upload.max_upload_bytes, 1000);
        assert_eq!(upload.staging_dir, PathBuf::from("/var/tmp/clips"));
        assert_eq!(upload.body_limit_bytes(), 1000 + 64 * 1024);
    }
}
