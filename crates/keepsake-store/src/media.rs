//! Upload embedding.
//!
//! Turns an uploaded file into the inline `data:<mime>;base64,<payload>`
//! form stored on each record, and back again. Embedding runs on Tokio's
//! blocking pool and resolves exactly once with either the embedded file or
//! the reason it failed; there is no retry.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use keepsake_types::{EmbeddedMedia, MediaFile, MediaKind, ValidationError};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Errors raised while embedding or extracting media.
#[derive(Error, Debug)]
pub enum MediaError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Not a base64 data URL")]
    NotADataUrl,
    #[error("Invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("Embedding task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// A file handed over by the upload collaborator, not yet embedded.
#[derive(Debug, Clone)]
pub struct UploadCandidate {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub name: String,
    pub size: u64,
}

impl UploadCandidate {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        let size = bytes.len() as u64;
        Self {
            bytes,
            mime_type: mime_type.into(),
            name: name.into(),
            size,
        }
    }

    /// Read a file from disk, guessing its MIME type from the extension.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, MediaError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let mime_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        debug!(file = %name, mime = %mime_type, bytes = bytes.len(), "upload candidate read");
        Ok(Self::new(name, mime_type, bytes))
    }

    pub fn kind(&self) -> Option<MediaKind> {
        MediaKind::from_mime(&self.mime_type)
    }
}

/// Keep only image and video files.
///
/// Fails with [`ValidationError::UnsupportedMedia`] when nothing survives,
/// naming the first rejected MIME type.
pub fn select_supported(
    candidates: Vec<UploadCandidate>,
) -> Result<Vec<UploadCandidate>, ValidationError> {
    let first_mime = candidates.first().map(|c| c.mime_type.clone());
    let supported: Vec<UploadCandidate> =
        candidates.into_iter().filter(|c| c.kind().is_some()).collect();
    if supported.is_empty() {
        return Err(match first_mime {
            Some(mime) => ValidationError::UnsupportedMedia(mime),
            None => ValidationError::NoMedia,
        });
    }
    Ok(supported)
}

/// Encode bytes as a data URL.
pub fn encode_data_url(mime_type: &str, bytes: &[u8]) -> EmbeddedMedia {
    EmbeddedMedia::from_data_url(format!("data:{mime_type};base64,{}", BASE64.encode(bytes)))
}

/// Split a data URL back into its MIME type and raw bytes.
pub fn decode_data_url(media: &EmbeddedMedia) -> Result<(String, Vec<u8>), MediaError> {
    let rest = media.as_str().strip_prefix("data:").ok_or(MediaError::NotADataUrl)?;
    let (header, payload) = rest.split_once(',').ok_or(MediaError::NotADataUrl)?;
    let mime = header.strip_suffix(";base64").ok_or(MediaError::NotADataUrl)?;
    let bytes = BASE64.decode(payload.trim())?;
    Ok((mime.to_string(), bytes))
}

/// Embed an upload. The encoding runs off the calling task.
pub async fn embed(candidate: UploadCandidate) -> Result<MediaFile, MediaError> {
    let UploadCandidate { bytes, mime_type, name, size } = candidate;
    let mime_for_task = mime_type.clone();
    let media = tokio::task::spawn_blocking(move || encode_data_url(&mime_for_task, &bytes)).await?;
    debug!(file = %name, encoded_len = media.encoded_len(), "upload embedded");
    Ok(MediaFile { name, mime_type, size, media })
}

/// Write a record's media back to disk.
pub async fn extract_to(media: &EmbeddedMedia, path: impl AsRef<Path>) -> Result<u64, MediaError> {
    let (_, bytes) = decode_data_url(media)?;
    tokio::fs::write(path, &bytes).await?;
    Ok(bytes.len() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_url_roundtrip_preserves_bytes() {
        let media = encode_data_url("image/png", &[0x89, 0x50, 0x4e, 0x47]);
        assert!(media.as_str().starts_with("data:image/png;base64,"));
        let (mime, bytes) = decode_data_url(&media).unwrap();
        assert_eq!(mime, "image/png");
        assert_eq!(bytes, vec![0x89, 0x50, 0x4e, 0x47]);
    }

    #[test]
    fn decode_rejects_plain_text() {
        let media = EmbeddedMedia::from_data_url("hello");
        assert!(matches!(decode_data_url(&media), Err(MediaError::NotADataUrl)));
    }

    #[test]
    fn select_supported_drops_documents() {
        let files = vec![
            UploadCandidate::new("a.pdf", "application/pdf", vec![1]),
            UploadCandidate::new("b.jpg", "image/jpeg", vec![2]),
            UploadCandidate::new("c.mp4", "video/mp4", vec![3]),
        ];
        let kept = select_supported(files).unwrap();
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].name, "b.jpg");
    }

    #[test]
    fn select_supported_errors_when_nothing_left() {
        let files = vec![UploadCandidate::new("a.txt", "text/plain", vec![1])];
        assert_eq!(
            select_supported(files).unwrap_err(),
            ValidationError::UnsupportedMedia("text/plain".into())
        );
        assert_eq!(select_supported(vec![]).unwrap_err(), ValidationError::NoMedia);
    }

    #[tokio::test]
    async fn embed_keeps_file_metadata() {
        let candidate = UploadCandidate::new("clip.webm", "video/webm", vec![1, 2, 3]);
        let file = embed(candidate).await.unwrap();
        assert_eq!(file.name, "clip.webm");
        assert_eq!(file.size, 3);
        assert_eq!(file.media.mime_type(), Some("video/webm"));
    }

    #[tokio::test]
    async fn from_path_guesses_mime_and_extract_restores_file() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let src = dir.path().join("photo.jpg");
        tokio::fs::write(&src, b"jpegbytes").await.unwrap();

        let candidate = UploadCandidate::from_path(&src).await.unwrap();
        assert_eq!(candidate.mime_type, "image/jpeg");
        assert_eq!(candidate.name, "photo.jpg");
        assert_eq!(candidate.size, 9);

        let file = embed(candidate).await.unwrap();
        let out = dir.path().join("restored.jpg");
        let written = extract_to(&file.media, &out).await.unwrap();
        assert_eq!(written, 9);
        assert_eq!(tokio::fs::read(&out).await.unwrap(), b"jpegbytes");
    }
}
