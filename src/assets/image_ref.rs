use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use crate::foundation::error::{ForgeError, ForgeResult};

pub(crate) const SVG_MIME: &str = "image/svg+xml";

/// Reference to image bytes, stored as an embeddable `data:` URI.
///
/// References are opaque to the history model; only the decoder looks inside. Anything that is
/// not a `data:` URI is treated as unresolvable.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRef(String);

/// Decoded view of a `data:` URI.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataUri {
    pub mime: String,
    pub payload: Vec<u8>,
}

impl ImageRef {
    /// Wrap an existing reference string without checking it.
    pub fn from_raw(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Build a reference from raw image bytes, sniffing the MIME type.
    pub fn from_bytes(bytes: &[u8]) -> ForgeResult<Self> {
        let mime = sniff_mime(bytes)?;
        Ok(Self::from_bytes_with_mime(mime, bytes))
    }

    /// Build a reference from PNG bytes.
    pub fn from_png(bytes: &[u8]) -> Self {
        Self::from_bytes_with_mime("image/png", bytes)
    }

    pub fn from_bytes_with_mime(mime: &str, bytes: &[u8]) -> Self {
        Self(format!("data:{mime};base64,{}", STANDARD.encode(bytes)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resolve the reference into its MIME type and payload bytes.
    pub fn resolve(&self) -> ForgeResult<DataUri> {
        let rest = self
            .0
            .strip_prefix("data:")
            .ok_or_else(|| ForgeError::decode("image reference is not a data URI"))?;
        let (header, body) = rest
            .split_once(',')
            .ok_or_else(|| ForgeError::decode("data URI has no payload separator"))?;

        let (mime, is_base64) = match header.strip_suffix(";base64") {
            Some(mime) => (mime, true),
            None => (header, false),
        };
        let mime = if mime.is_empty() {
            "text/plain"
        } else {
            mime.split(';').next().unwrap_or(mime)
        };

        let payload = if is_base64 {
            STANDARD
                .decode(body.trim())
                .map_err(|e| ForgeError::decode(format!("invalid base64 payload: {e}")))?
        } else {
            body.as_bytes().to_vec()
        };
        if payload.is_empty() {
            return Err(ForgeError::decode("data URI payload is empty"));
        }

        Ok(DataUri {
            mime: mime.to_ascii_lowercase(),
            payload,
        })
    }

    /// Payload bytes of the reference.
    pub fn bytes(&self) -> ForgeResult<Vec<u8>> {
        Ok(self.resolve()?.payload)
    }

    /// Stable 64-bit key of the reference string.
    pub(crate) fn cache_key(&self) -> u64 {
        xxhash_rust::xxh3::xxh3_64(self.0.as_bytes())
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Data URIs are huge; keep logs readable.
        const MAX: usize = 48;
        if self.0.len() <= MAX {
            f.write_str(&self.0)
        } else {
            let cut = (0..=MAX)
                .rev()
                .find(|i| self.0.is_char_boundary(*i))
                .unwrap_or(0);
            write!(f, "{}... ({} bytes)", &self.0[..cut], self.0.len())
        }
    }
}

fn sniff_mime(bytes: &[u8]) -> ForgeResult<&'static str> {
    if looks_like_svg(bytes) {
        return Ok(SVG_MIME);
    }
    let format = image::guess_format(bytes)
        .map_err(|e| ForgeError::decode(format!("unrecognized image bytes: {e}")))?;
    Ok(format.to_mime_type())
}

fn looks_like_svg(bytes: &[u8]) -> bool {
    let head = String::from_utf8_lossy(&bytes[..bytes.len().min(512)]);
    let text = head.trim_start_matches('\u{feff}').trim_start();
    text.starts_with("<svg") || (text.starts_with("<?xml") && text.contains("<svg"))
}

#[cfg(test)]
#[path = "../../tests/unit/assets/image_ref.rs"]
mod tests;
