//! Binary attachments (images and audio clips) sent with completion requests.
//!
//! [`Attachment`] owns the raw bytes plus the resolved media type.  The media
//! type is resolved from the file extension against a fixed whitelist; when
//! the extension is unknown, a caller-declared type (e.g. the MIME string a
//! drag-and-drop source reports) is accepted as a fallback.  Anything else is
//! rejected at construction, so a constructed `Attachment` is always safe to
//! encode into a request.

use std::path::Path;

use thiserror::Error;

// ---------------------------------------------------------------------------
// AttachmentError
// ---------------------------------------------------------------------------

/// Errors raised while constructing or loading an [`Attachment`].
#[derive(Debug, Error)]
pub enum AttachmentError {
    /// Neither the file extension nor the declared type identified a
    /// supported image or audio format.
    #[error("unsupported file type: {0}")]
    UnsupportedType(String),

    /// Reading the file from disk failed.
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// MediaKind
// ---------------------------------------------------------------------------

/// Broad category of an attachment, derived from its media type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Audio,
}

impl MediaKind {
    /// Classify a full media type string by its prefix.
    fn of(media_type: &str) -> Option<Self> {
        if media_type.starts_with("image/") {
            Some(MediaKind::Image)
        } else if media_type.starts_with("audio/") {
            Some(MediaKind::Audio)
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Extension whitelist
// ---------------------------------------------------------------------------

/// Media type for a known file extension (already lowercased).
///
/// The table covers exactly the formats both module flows accept: jpg / jpeg
/// / png / gif / webp images and mp3 / wav / aac / ogg / flac / m4a audio.
fn media_type_for_extension(ext: &str) -> Option<&'static str> {
    match ext {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "mp3" => Some("audio/mp3"),
        "wav" => Some("audio/wav"),
        "aac" => Some("audio/aac"),
        "ogg" => Some("audio/ogg"),
        "flac" => Some("audio/flac"),
        "m4a" => Some("audio/m4a"),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Attachment
// ---------------------------------------------------------------------------

/// An image or audio payload ready to be inlined into a completion request.
///
/// Owned exclusively by the receiving module's session: a new selection
/// replaces it wholesale, a clear drops it.
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    /// Raw file bytes (base64-encoded at the wire boundary, not here).
    pub bytes: Vec<u8>,
    /// Resolved media type, e.g. `"image/jpeg"`.
    pub media_type: String,
    /// Image or audio, derived from `media_type`.
    pub kind: MediaKind,
    /// Original file name, shown in the UI.
    pub file_name: String,
}

impl Attachment {
    /// Build an attachment from in-memory bytes.
    ///
    /// The media type is resolved from `file_name`'s extension; when the
    /// extension is not in the whitelist, `declared_type` (if any) is used
    /// instead.  Types outside `image/*` and `audio/*` are rejected.
    ///
    /// # Errors
    ///
    /// [`AttachmentError::UnsupportedType`] when no supported media type can
    /// be resolved.
    pub fn from_bytes(
        file_name: &str,
        bytes: Vec<u8>,
        declared_type: Option<&str>,
    ) -> Result<Self, AttachmentError> {
        let ext = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        let media_type = media_type_for_extension(&ext)
            .map(|t| t.to_string())
            .or_else(|| {
                declared_type
                    .filter(|t| !t.is_empty())
                    .map(|t| t.to_string())
            })
            .ok_or_else(|| AttachmentError::UnsupportedType(file_name.to_string()))?;

        let kind = MediaKind::of(&media_type)
            .ok_or_else(|| AttachmentError::UnsupportedType(media_type.clone()))?;

        Ok(Self {
            bytes,
            media_type,
            kind,
            file_name: file_name.to_string(),
        })
    }

    /// Read `path` from disk and build an attachment from its contents.
    ///
    /// The read happens on the async runtime (`tokio::fs`), so callers can
    /// await it from an orchestrator without blocking other pipelines.
    pub async fn load(
        path: impl AsRef<Path>,
        declared_type: Option<&str>,
    ) -> Result<Self, AttachmentError> {
        let path = path.as_ref();

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| AttachmentError::Read {
                path: path.display().to_string(),
                source,
            })?;

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("attachment")
            .to_string();

        Self::from_bytes(&file_name, bytes, declared_type)
    }

    /// `"name.jpg (12.3 KB)"` line for the selected-file display.
    pub fn summary(&self) -> String {
        let kb = self.bytes.len() as f32 / 1024.0;
        format!("{} ({:.1} KB)", self.file_name, kb)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jpeg_extension_resolves_image_type() {
        let att = Attachment::from_bytes("wound.JPG", vec![1, 2, 3], None).unwrap();
        assert_eq!(att.media_type, "image/jpeg");
        assert_eq!(att.kind, MediaKind::Image);
        assert_eq!(att.file_name, "wound.JPG");
    }

    #[test]
    fn audio_extensions_resolve_audio_kind() {
        for name in ["a.mp3", "b.wav", "c.aac", "d.ogg", "e.flac", "f.m4a"] {
            let att = Attachment::from_bytes(name, vec![0], None).unwrap();
            assert_eq!(att.kind, MediaKind::Audio, "{name}");
        }
    }

    #[test]
    fn m4a_keeps_its_own_media_type() {
        // The completion service expects the literal container name here,
        // not the IANA audio/mp4 registration.
        let att = Attachment::from_bytes("consult.m4a", vec![0], None).unwrap();
        assert_eq!(att.media_type, "audio/m4a");
    }

    #[test]
    fn unknown_extension_falls_back_to_declared_type() {
        let att = Attachment::from_bytes("photo.heic", vec![0], Some("image/heic")).unwrap();
        assert_eq!(att.media_type, "image/heic");
        assert_eq!(att.kind, MediaKind::Image);
    }

    #[test]
    fn whitelist_wins_over_declared_type() {
        // A known extension ignores whatever the source declared.
        let att = Attachment::from_bytes("scan.png", vec![0], Some("application/pdf")).unwrap();
        assert_eq!(att.media_type, "image/png");
    }

    #[test]
    fn unknown_extension_without_declared_type_is_rejected() {
        let err = Attachment::from_bytes("notes.pdf", vec![0], None).unwrap_err();
        assert!(matches!(err, AttachmentError::UnsupportedType(_)));
    }

    #[test]
    fn empty_declared_type_does_not_satisfy_fallback() {
        let err = Attachment::from_bytes("clip.xyz", vec![0], Some("")).unwrap_err();
        assert!(matches!(err, AttachmentError::UnsupportedType(_)));
    }

    #[test]
    fn non_media_declared_type_is_rejected() {
        let err = Attachment::from_bytes("doc.bin", vec![0], Some("application/zip")).unwrap_err();
        assert!(matches!(err, AttachmentError::UnsupportedType(_)));
    }

    #[test]
    fn summary_shows_name_and_size() {
        let att = Attachment::from_bytes("x.png", vec![0u8; 2048], None).unwrap();
        assert_eq!(att.summary(), "x.png (2.0 KB)");
    }

    #[tokio::test]
    async fn load_missing_file_reports_read_error() {
        let err = Attachment::load("/nonexistent/wound.jpg", None)
            .await
            .unwrap_err();
        match err {
            AttachmentError::Read { path, .. } => assert!(path.contains("wound.jpg")),
            other => panic!("expected Read error, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn load_reads_bytes_and_file_name() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("rx.png");
        std::fs::write(&path, b"fake-png").expect("write");

        let att = Attachment::load(&path, None).await.unwrap();
        assert_eq!(att.bytes, b"fake-png");
        assert_eq!(att.file_name, "rx.png");
        assert_eq!(att.kind, MediaKind::Image);
    }
}
