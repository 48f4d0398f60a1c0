use bytes::Bytes;
use futures_core::Stream;
use std::collections::BTreeMap;
use std::pin::Pin;

/// Stream of bytes for uploaded content
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// Wrap an in-memory buffer as a [`ByteStream`].
pub fn stream_from_bytes(data: impl Into<Bytes>) -> ByteStream {
    let data = data.into();
    Box::pin(futures_util::stream::once(async move { Ok(data) }))
}

/// The file part of an upload, as handed over by the transport.
pub struct UploadFile {
    pub body: ByteStream,
    /// Name the client declared for the part (possibly overridden by a `filename` field)
    pub filename: Option<String>,
    pub content_type: Option<String>,
    /// Size reported by the transport layer
    pub declared_size: u64,
}

impl UploadFile {
    pub fn new(body: ByteStream, declared_size: u64) -> Self {
        Self {
            body,
            filename: None,
            content_type: None,
            declared_size,
        }
    }

    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        let data = data.into();
        let size = data.len() as u64;
        Self::new(stream_from_bytes(data), size)
    }

    pub fn with_filename<S: Into<String>>(mut self, filename: S) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn with_content_type<S: Into<String>>(mut self, content_type: S) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

impl std::fmt::Debug for UploadFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadFile")
            .field("filename", &self.filename)
            .field("content_type", &self.content_type)
            .field("declared_size", &self.declared_size)
            .finish_non_exhaustive()
    }
}

/// Request-supplied hints. Informs routing and annotates results; never
/// trusted for security decisions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadContext {
    pub consumer: Option<String>,
    pub reference_id: Option<String>,
    pub requested_storage: Option<String>,
    pub folder: Option<String>,
}

impl UploadContext {
    /// Wire names accepted by [`UploadContext::set`].
    pub const FIELDS: [&'static str; 4] = ["consumer", "reference_id", "requested_storage", "folder"];

    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_field(key: &str) -> bool {
        Self::FIELDS.contains(&key)
    }

    pub fn with_consumer<S: Into<String>>(mut self, consumer: S) -> Self {
        self.consumer = Some(consumer.into());
        self
    }

    pub fn with_reference_id<S: Into<String>>(mut self, reference_id: S) -> Self {
        self.reference_id = Some(reference_id.into());
        self
    }

    pub fn with_requested_storage<S: Into<String>>(mut self, storage: S) -> Self {
        self.requested_storage = Some(storage.into());
        self
    }

    pub fn with_folder<S: Into<String>>(mut self, folder: S) -> Self {
        self.folder = Some(folder.into());
        self
    }

    /// Set a field by its wire name. Unknown keys and blank values are ignored.
    pub fn set(&mut self, key: &str, value: impl Into<String>) -> bool {
        let value = value.into();
        let value = value.trim();
        if value.is_empty() {
            return false;
        }
        let slot = match key {
            "consumer" => &mut self.consumer,
            "reference_id" => &mut self.reference_id,
            "requested_storage" => &mut self.requested_storage,
            "folder" => &mut self.folder,
            _ => return false,
        };
        *slot = Some(value.to_string());
        true
    }

    /// Present fields keyed by wire name.
    pub fn to_map(&self) -> BTreeMap<String, String> {
        let fields = [
            ("consumer", &self.consumer),
            ("reference_id", &self.reference_id),
            ("requested_storage", &self.requested_storage),
            ("folder", &self.folder),
        ];
        fields
            .into_iter()
            .filter_map(|(k, v)| v.as_ref().map(|v| (k.to_string(), v.clone())))
            .collect()
    }
}

/// A complete upload as it enters the pipeline.
#[derive(Debug, Default)]
pub struct UploadRequest {
    pub file: Option<UploadFile>,
    pub context: UploadContext,
}

impl UploadRequest {
    pub fn new(file: UploadFile) -> Self {
        Self {
            file: Some(file),
            context: UploadContext::default(),
        }
    }

    /// A request whose `file` part never arrived.
    pub fn without_file() -> Self {
        Self::default()
    }

    pub fn with_context(mut self, context: UploadContext) -> Self {
        self.context = context;
        self
    }
}

/// File facts handed to storage handlers alongside the staged path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMeta {
    /// Sanitized file name
    pub name: String,
    pub mime_type: String,
    pub size: u64,
}
