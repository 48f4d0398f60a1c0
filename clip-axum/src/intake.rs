//! Multipart intake: turns a `POST /uploads` body into an [`UploadRequest`].

use axum::body::Body;
use axum::http::{header, HeaderMap};
use bytes::Bytes;
use clip_blob::{UploadConfig, UploadContext, UploadFile, UploadRequest};
use clip_core::ClipError;
use http_body_util::LengthLimitError;
use tracing::debug;

/// Form field carrying the file.
pub const FILE_FIELD: &str = "file";
/// Optional text field that overrides the file part's own name.
pub const FILENAME_FIELD: &str = "filename";
/// Text field checked by the upload guard.
pub const NONCE_FIELD: &str = "upload_nonce";

/// A parsed upload form.
#[derive(Debug)]
pub struct IntakeForm {
    pub request: UploadRequest,
    pub nonce: Option<String>,
}

fn too_large(config: &UploadConfig) -> ClipError {
    ClipError::payload_too_large(format!(
        "File too large. Maximum allowed size is {} bytes.",
        config.max_upload_bytes
    ))
}

fn malformed(detail: impl std::fmt::Display) -> ClipError {
    debug!(error = %detail, "rejecting malformed upload body");
    ClipError::bad_request("Malformed multipart upload.")
}

fn hit_length_limit(err: &axum::Error) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = source {
        if e.is::<LengthLimitError>() {
            return true;
        }
        source = e.source();
    }
    false
}

/// Read and parse a multipart upload body.
///
/// The whole body is capped at [`UploadConfig::body_limit_bytes`]; going over
/// is a 413 before any field is looked at. A missing or empty `file` part is
/// not an error here, the pipeline reports it.
pub async fn read_upload(
    headers: &HeaderMap,
    body: Body,
    config: &UploadConfig,
) -> Result<IntakeForm, ClipError> {
    let limit = config.body_limit_bytes();

    let declared_len = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    if declared_len.is_some_and(|len| len > limit) {
        return Err(too_large(config));
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let boundary = multer::parse_boundary(content_type).map_err(malformed)?;

    let limit = usize::try_from(limit).unwrap_or(usize::MAX);
    let bytes = axum::body::to_bytes(body, limit).await.map_err(|e| {
        if hit_length_limit(&e) {
            too_large(config)
        } else {
            malformed(e)
        }
    })?;

    parse_form(bytes, &boundary).await
}

async fn parse_form(bytes: Bytes, boundary: &str) -> Result<IntakeForm, ClipError> {
    let stream = futures::stream::once(async move { Ok::<Bytes, std::io::Error>(bytes) });
    let mut multipart = multer::Multipart::new(stream, boundary);

    let mut file: Option<UploadFile> = None;
    let mut filename_override: Option<String> = None;
    let mut nonce: Option<String> = None;
    let mut context = UploadContext::new();

    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let name = field.name().unwrap_or_default().to_string();

        if name == FILE_FIELD {
            let part_name = field.file_name().map(str::to_string);
            let content_type = field.content_type().map(|m| m.to_string());
            let data = field.bytes().await.map_err(malformed)?;

            // browsers send an empty nameless part when nothing was picked
            if data.is_empty() && part_name.as_deref().map_or(true, str::is_empty) {
                continue;
            }

            let mut upload = UploadFile::from_bytes(data);
            upload.filename = part_name;
            upload.content_type = content_type;
            file = Some(upload);
            continue;
        }

        let wanted = name == FILENAME_FIELD || name == NONCE_FIELD || UploadContext::is_field(&name);
        if !wanted {
            // dropped unread, multer skips the rest of the part
            debug!(field = %name, "ignoring form field");
            continue;
        }

        let value = field.text().await.map_err(malformed)?;
        match name.as_str() {
            FILENAME_FIELD => {
                filename_override = Some(value.trim().to_string()).filter(|v| !v.is_empty());
            }
            NONCE_FIELD => nonce = Some(value),
            other => {
                context.set(other, value);
            }
        }
    }

    if let (Some(file), Some(name)) = (file.as_mut(), filename_override) {
        file.filename = Some(name);
    }

    let request = match file {
        Some(file) => UploadRequest::new(file),
        None => UploadRequest::without_file(),
    }
    .with_context(context);

    Ok(IntakeForm { request, nonce })
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOUNDARY: &str = "clip-test-boundary";

    fn form(parts: &[(&str, Option<&str>, &[u8])]) -> (HeaderMap, Body) {
        let mut body = Vec::new();
        for (name, filename, data) in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            match filename {
                Some(f) => body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{f}\"\r\nContent-Type: audio/webm\r\n\r\n"
                    )
                    .as_bytes(),
                ),
                None => body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                ),
            }
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}").parse().unwrap(),
        );
        (headers, Body::from(body))
    }

    #[tokio::test]
    async fn fields_land_in_request_and_context() {
        let (headers, body) = form(&[
            ("upload_nonce", None, &b"n0nce"[..]),
            ("folder", None, &b"demo"[..]),
            ("reference_id", None, &b"42"[..]),
            ("filename", None, &b"standup.webm"[..]),
            ("file", Some("blob"), &b"0123456789"[..]),
        ]);

        let parsed = read_upload(&headers, body, &UploadConfig::new()).await.unwrap();

        assert_eq!(parsed.nonce.as_deref(), Some("n0nce"));
        assert_eq!(parsed.request.context.folder.as_deref(), Some("demo"));
        assert_eq!(parsed.request.context.reference_id.as_deref(), Some("42"));
        let file = parsed.request.file.unwrap();
        assert_eq!(file.filename.as_deref(), Some("standup.webm"));
        assert_eq!(file.content_type.as_deref(), Some("audio/webm"));
        assert_eq!(file.declared_size, 10);
    }

    #[tokio::test]
    async fn unknown_binary_parts_are_skipped() {
        let (headers, body) = form(&[
            ("upload_nonce", None, &b"n0nce"[..]),
            ("waveform", None, &[0xff, 0xfe, 0x00, 0x9f][..]),
            ("file", Some("clip.webm"), &b"0123456789"[..]),
            ("folder", None, &b"demo"[..]),
        ]);

        let parsed = read_upload(&headers, body, &UploadConfig::new()).await.unwrap();

        assert_eq!(parsed.nonce.as_deref(), Some("n0nce"));
        assert_eq!(parsed.request.context.folder.as_deref(), Some("demo"));
        assert_eq!(parsed.request.file.unwrap().declared_size, 10);
    }

    #[tokio::test]
    async fn empty_file_part_counts_as_missing() {
        let (headers, body) = form(&[("file", Some(""), &b""[..])]);

        let parsed = read_upload(&headers, body, &UploadConfig::new()).await.unwrap();

        assert!(parsed.request.file.is_none());
    }

    #[tokio::test]
    async fn body_over_hard_ceiling_is_413() {
        let config = UploadConfig::new()
            .with_max_upload_bytes(8)
            .with_body_slack_bytes(0);
        let (headers, body) = form(&[("file", Some("a.webm"), &[1u8; 64][..])]);

        let err = read_upload(&headers, body, &config).await.unwrap_err();

        assert_eq!(err.code(), 413);
    }

    #[tokio::test]
    async fn non_multipart_body_is_400() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, "application/json".parse().unwrap());

        let err = read_upload(&headers, Body::from("{}"), &UploadConfig::new())
            .await
            .unwrap_err();

        assert_eq!(err.code(), 400);
    }
}
