use crate::error::{Result, ShootError};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageMime {
    #[serde(rename = "image/png")]
    Png,
    #[serde(rename = "image/jpeg")]
    Jpeg,
    #[serde(rename = "image/webp")]
    Webp,
}

impl ImageMime {
    pub const ALL: [ImageMime; 3] = [ImageMime::Png, ImageMime::Jpeg, ImageMime::Webp];

    pub fn as_str(&self) -> &'static str {
        match self {
            ImageMime::Png => "image/png",
            ImageMime::Jpeg => "image/jpeg",
            ImageMime::Webp => "image/webp",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ImageMime::Png => "png",
            ImageMime::Jpeg => "jpg",
            ImageMime::Webp => "webp",
        }
    }

    /// Allow-list lookup; parameters such as `; charset=` are ignored.
    pub fn parse(mime_type: &str) -> Option<Self> {
        let essence = mime_type.split(';').next().unwrap_or("").trim();
        Self::ALL
            .into_iter()
            .find(|mime| mime.as_str().eq_ignore_ascii_case(essence))
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(ImageMime::Png),
            "jpg" | "jpeg" => Some(ImageMime::Jpeg),
            "webp" => Some(ImageMime::Webp),
            _ => None,
        }
    }
}

impl fmt::Display for ImageMime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An unvalidated upload: name, declared type, and raw bytes.
#[derive(Debug, Clone)]
pub struct RawFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl RawFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Reads a file from disk. The declared type comes from the extension;
    /// unknown extensions are declared as `application/octet-stream`.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .map_err(|e| ShootError::Io(format!("{}: {}", path.display(), e)))?;
        let mime_type = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(ImageMime::from_extension)
            .map(|mime| mime.as_str().to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self::new(name, mime_type, bytes))
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// A reference photo owned by the active session. Uploads carry an
/// allow-listed type; a generated result fed back for refinement keeps
/// whatever type the service reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInput {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    bytes: Vec<u8>,
    base64: String,
}

impl ImageInput {
    pub fn new(name: impl Into<String>, mime_type: ImageMime, bytes: Vec<u8>) -> Self {
        Self::with_mime_type(name, mime_type.as_str(), bytes)
    }

    fn with_mime_type(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        let base64 = STANDARD.encode(&bytes);
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
            base64,
        }
    }

    /// Builds an input from a `data:<mime>;base64,<payload>` string. The
    /// type is taken as-is; the upload allow-list does not apply here.
    pub fn from_data_url(name: impl Into<String>, data_url: &str) -> Result<Self> {
        let (mime_type, payload) = split_data_url(data_url)?;
        if mime_type.trim().is_empty() {
            return Err(ShootError::InvalidImage("missing image type".into()));
        }
        let bytes = STANDARD
            .decode(payload)
            .map_err(|e| ShootError::InvalidImage(e.to_string()))?;
        Ok(Self::with_mime_type(name, mime_type, bytes))
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Raw base64 payload, no header.
    pub fn base64(&self) -> &str {
        &self.base64
    }

    pub fn preview_url(&self) -> String {
        data_url(&self.mime_type, &self.base64)
    }
}

pub fn data_url(mime_type: &str, base64: &str) -> String {
    format!("data:{};base64,{}", mime_type, base64)
}

/// Splits a base64 data URL into `(mime_type, payload)`.
pub fn split_data_url(data_url: &str) -> Result<(&str, &str)> {
    let rest = data_url
        .strip_prefix("data:")
        .ok_or_else(|| ShootError::InvalidImage("missing data: prefix".into()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| ShootError::InvalidImage("missing payload separator".into()))?;
    let mime_type = header
        .strip_suffix(";base64")
        .ok_or_else(|| ShootError::InvalidImage("payload is not base64".into()))?;
    Ok((mime_type, payload))
}
