//! Binary content ingestion for image and audio results.
//!
//! Bytes come from exactly one source (buffer, file or URL), the MIME type is
//! sniffed from the bytes themselves and the payload is base64 encoded into a
//! content item.

use {
    crate::content_types::McpContent,
    base64::{engine::general_purpose::STANDARD as BASE64, Engine as _},
    std::path::PathBuf,
    thiserror::Error,
    tracing::{debug, warn},
};

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Failed to read file {path}: {source}")]
    File {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to fetch {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("Exactly one of buffer, path or url must be provided")]
    NoSource,
}

/// Where binary content comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentSource {
    Buffer(Vec<u8>),
    Path(PathBuf),
    Url(String),
}

impl ContentSource {
    /// Build from optional inputs, as a loosely typed caller would supply them.
    pub fn from_parts(
        buffer: Option<Vec<u8>>,
        path: Option<PathBuf>,
        url: Option<String>,
    ) -> Result<Self, CodecError> {
        match (buffer, path, url) {
            (Some(buffer), None, None) => Ok(Self::Buffer(buffer)),
            (None, Some(path), None) => Ok(Self::Path(path)),
            (None, None, Some(url)) => Ok(Self::Url(url)),
            _ => Err(CodecError::NoSource),
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Buffer(b) => format!("buffer ({} bytes)", b.len()),
            Self::Path(p) => p.display().to_string(),
            Self::Url(u) => u.clone(),
        }
    }

    /// Read all bytes from the source.
    pub async fn load(&self) -> Result<Vec<u8>, CodecError> {
        match self {
            Self::Buffer(bytes) => Ok(bytes.clone()),
            Self::Path(path) => tokio::fs::read(path).await.map_err(|source| CodecError::File {
                path: path.display().to_string(),
                source,
            }),
            Self::Url(url) => {
                let fetch_err = |message: String| CodecError::Fetch {
                    url: url.clone(),
                    message,
                };
                let response = reqwest::get(url).await.map_err(|e| fetch_err(e.to_string()))?;
                let status = response.status();
                if !status.is_success() {
                    return Err(fetch_err(format!("HTTP {status}")));
                }
                let bytes = response.bytes().await.map_err(|e| fetch_err(e.to_string()))?;
                debug!(url = %url, size = bytes.len(), "📥 Fetched binary content");
                Ok(bytes.to_vec())
            }
        }
    }
}

/// Sniff a MIME type from magic bytes.
pub fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    let starts = |sig: &[u8]| bytes.starts_with(sig);
    let at = |offset: usize, sig: &[u8]| bytes.get(offset..offset + sig.len()) == Some(sig);

    if starts(b"\x89PNG\r\n\x1a\n") {
        Some("image/png")
    } else if starts(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if starts(b"GIF87a") || starts(b"GIF89a") {
        Some("image/gif")
    } else if starts(b"RIFF") && at(8, b"WEBP") {
        Some("image/webp")
    } else if starts(b"RIFF") && at(8, b"WAVE") {
        Some("audio/wav")
    } else if starts(b"BM") && bytes.len() > 14 {
        Some("image/bmp")
    } else if starts(b"ID3") || (bytes.len() > 1 && bytes[0] == 0xFF && bytes[1] & 0xE0 == 0xE0) {
        Some("audio/mpeg")
    } else if starts(b"OggS") {
        Some("audio/ogg")
    } else if starts(b"fLaC") {
        Some("audio/flac")
    } else if at(4, b"ftypM4A") {
        Some("audio/mp4")
    } else {
        None
    }
}

/// Unrecognised bytes fall back to `fallback` with a warning.
async fn encode(source: &ContentSource, category: &str, fallback: &'static str) -> Result<(String, String), CodecError> {
    let bytes = source.load().await?;
    let mime = match sniff_mime(&bytes) {
        Some(mime) => mime,
        None => {
            warn!(
                source = %source.describe(),
                fallback = %fallback,
                "⚠️ Unrecognised content type, using fallback"
            );
            fallback
        }
    };
    if !mime.starts_with(category) {
        warn!(
            source = %source.describe(),
            mime = %mime,
            expected = %category,
            "⚠️ Content type does not match expected category"
        );
    }
    Ok((BASE64.encode(&bytes), mime.to_string()))
}

/// Produce an image content item.
pub async fn image_content(source: ContentSource) -> Result<McpContent, CodecError> {
    let (data, mime_type) = encode(&source, "image/", "image/png").await?;
    Ok(McpContent::Image { data, mime_type })
}

/// Produce an audio content item.
pub async fn audio_content(source: ContentSource) -> Result<McpContent, CodecError> {
    let (data, mime_type) = encode(&source, "audio/", "audio/mpeg").await?;
    Ok(McpContent::Audio { data, mime_type })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    #[test]
    fn test_sniff_known_types() {
        assert_eq!(sniff_mime(PNG), Some("image/png"));
        assert_eq!(sniff_mime(&[0xFF, 0xD8, 0xFF, 0xE0]), Some("image/jpeg"));
        assert_eq!(sniff_mime(b"RIFF\0\0\0\0WAVEfmt "), Some("audio/wav"));
        assert_eq!(sniff_mime(b"ID3\x03\0"), Some("audio/mpeg"));
        assert_eq!(sniff_mime(b"plain text"), None);
    }

    #[test]
    fn test_exactly_one_source() {
        assert!(matches!(
            ContentSource::from_parts(None, None, None),
            Err(CodecError::NoSource)
        ));
        assert!(matches!(
            ContentSource::from_parts(Some(vec![1]), None, Some("http://x".into())),
            Err(CodecError::NoSource)
        ));
        assert_eq!(
            ContentSource::from_parts(Some(vec![1]), None, None).unwrap(),
            ContentSource::Buffer(vec![1])
        );
    }

    #[tokio::test]
    async fn test_image_from_buffer() {
        let item = image_content(ContentSource::Buffer(PNG.to_vec())).await.unwrap();
        match item {
            McpContent::Image { data, mime_type } => {
                assert_eq!(mime_type, "image/png");
                assert_eq!(BASE64.decode(data).unwrap(), PNG);
            }
            other => panic!("unexpected content {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_category_mismatch_is_not_fatal() {
        let item = audio_content(ContentSource::Buffer(PNG.to_vec())).await.unwrap();
        assert!(matches!(item, McpContent::Audio { ref mime_type, .. } if mime_type == "image/png"));
    }

    #[tokio::test]
    async fn test_unknown_bytes_use_category_default() {
        let bytes = b"not a known format at all".to_vec();
        let image = image_content(ContentSource::Buffer(bytes.clone())).await.unwrap();
        assert!(matches!(image, McpContent::Image { ref mime_type, .. } if mime_type == "image/png"));
        let audio = audio_content(ContentSource::Buffer(bytes)).await.unwrap();
        assert!(matches!(audio, McpContent::Audio { ref mime_type, .. } if mime_type == "audio/mpeg"));
    }

    #[tokio::test]
    async fn test_image_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(PNG).unwrap();
        let item = image_content(ContentSource::Path(file.path().to_path_buf())).await.unwrap();
        assert!(matches!(item, McpContent::Image { .. }));
    }

    #[tokio::test]
    async fn test_missing_file_names_path() {
        let err = image_content(ContentSource::Path("/definitely/not/here.png".into()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.png"));
    }
}
