/// `data:image/<subtype>;base64,<payload>` parsing and construction.

use crate::error::AppError;
use base64::{engine::general_purpose::STANDARD, Engine};

#[derive(Debug)]
pub struct ImageDataUri {
    /// Full media type, e.g. `image/jpeg`.
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl ImageDataUri {
    /// Subtype part of the media type (`jpeg` for `image/jpeg`).
    pub fn subtype(&self) -> &str {
        self.media_type
            .strip_prefix("image/")
            .unwrap_or(&self.media_type)
    }

    /// File extension for storing the original as uploaded.
    pub fn extension(&self) -> String {
        let subtype = self.subtype().to_ascii_lowercase();
        let base = subtype.split('+').next().unwrap_or_default();
        match base {
            "jpeg" | "pjpeg" => "jpg".to_string(),
            other => {
                let ext: String = other.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
                if ext.is_empty() {
                    "bin".to_string()
                } else {
                    ext
                }
            }
        }
    }
}

/// Parse an image data URI into media type and raw bytes.
pub fn parse_data_uri(uri: &str) -> Result<ImageDataUri, AppError> {
    let rest = uri
        .trim()
        .strip_prefix("data:image/")
        .ok_or_else(|| malformed("missing `data:image/` prefix"))?;

    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| malformed("missing `,` before payload"))?;

    let subtype = header
        .strip_suffix(";base64")
        .ok_or_else(|| malformed("payload is not base64 encoded"))?;

    let valid_subtype = !subtype.is_empty()
        && subtype
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '+' | '-'));
    if !valid_subtype {
        return Err(malformed("invalid image subtype"));
    }

    if payload.is_empty() {
        return Err(malformed("empty payload"));
    }

    let bytes = STANDARD.decode(payload)?;

    Ok(ImageDataUri {
        media_type: format!("image/{subtype}"),
        bytes,
    })
}

/// Build a data URI from raw image bytes.
pub fn to_data_uri(media_type: &str, bytes: &[u8]) -> String {
    format!("data:{media_type};base64,{}", STANDARD.encode(bytes))
}

/// Sniff the image media type from magic bytes.
pub fn sniff_media_type(bytes: &[u8]) -> Option<&'static str> {
    let format = image::guess_format(bytes).ok()?;
    Some(format.to_mime_type())
}

fn malformed(reason: &str) -> AppError {
    AppError::BadRequest(format!(
        "Malformed image data URI ({reason}); expected data:image/<type>;base64,<payload>"
    ))
}
