//! File name hygiene, MIME inference and recording titles.

use chrono::{DateTime, Utc};
use clip_core::Actor;

/// Used when the client sent no usable name.
pub const FALLBACK_FILENAME: &str = "recording.webm";

pub const OCTET_STREAM: &str = "application/octet-stream";

const AUDIO_TYPES: &[(&str, &str)] = &[
    ("webm", "audio/webm"),
    ("ogg", "audio/ogg"),
    ("oga", "audio/ogg"),
    ("opus", "audio/ogg"),
    ("mp3", "audio/mpeg"),
    ("wav", "audio/wav"),
    ("m4a", "audio/mp4"),
    ("mp4", "audio/mp4"),
    ("aac", "audio/aac"),
    ("flac", "audio/flac"),
];

/// Reduce a client-supplied name to a safe single path segment.
///
/// Directory components are dropped and anything outside `[A-Za-z0-9._-]`
/// becomes `-`. Names that end up empty or dot-only fall back to
/// [`FALLBACK_FILENAME`].
pub fn sanitize_filename(raw: &str) -> String {
    let base = raw
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or_default()
        .trim();

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '-'
            }
        })
        .collect();
    let cleaned = cleaned.trim_matches(|c: char| c == '.' || c == '-');

    if cleaned.is_empty() {
        FALLBACK_FILENAME.to_string()
    } else {
        cleaned.to_string()
    }
}

/// Lower-cased extension of a file name, if any.
pub fn extension(filename: &str) -> Option<String> {
    let (stem, ext) = filename.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// MIME type for a known audio extension.
pub fn mime_for_extension(ext: &str) -> Option<&'static str> {
    let ext = ext.to_ascii_lowercase();
    AUDIO_TYPES
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, mime)| *mime)
}

/// Keep the declared type unless it is blank or generic, otherwise infer it
/// from the file name.
pub fn resolve_mime(declared: Option<&str>, filename: &str) -> String {
    let declared = declared
        .map(|d| d.split(';').next().unwrap_or_default().trim().to_ascii_lowercase())
        .filter(|d| !d.is_empty() && d != OCTET_STREAM);

    if let Some(mime) = declared {
        return mime;
    }

    extension(filename)
        .and_then(|ext| mime_for_extension(&ext))
        .unwrap_or(OCTET_STREAM)
        .to_string()
}

/// Title the default store files a recording under.
pub fn recording_title(actor: &Actor, at: DateTime<Utc>) -> String {
    format!(
        "Voice Recording - {} - {} UTC",
        actor.label(),
        at.format("%Y-%m-%d %H:%M:%S")
    )
}
