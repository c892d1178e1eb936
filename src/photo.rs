//! Captured photo bytes plus their MIME type.

use std::path::Path;

use crate::gateway::Part;

const DEFAULT_MIME_TYPE: &str = "image/jpeg";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Photo {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl Photo {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    /// Sniff the MIME type from magic bytes, defaulting to JPEG.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        let mime_type = infer::get(&bytes)
            .map(|kind| kind.mime_type())
            .unwrap_or(DEFAULT_MIME_TYPE);
        Self::new(bytes, mime_type)
    }

    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        Ok(Self::from_bytes(std::fs::read(path)?))
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn to_part(&self) -> Part {
        Part::image(self.mime_type.clone(), self.bytes.clone())
    }
}
