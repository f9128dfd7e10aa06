//! Upload jobs and their derived identity.

use std::fmt;

use bytes::Bytes;

/// Stable handle for a job/image pair: file name followed by owner id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(String);

impl JobId {
    pub fn derive(file_name: &str, owner_id: &str) -> Self {
        Self(format!("{file_name}{owner_id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for JobId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

/// Encoding of the image payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ImageFormat {
    #[default]
    Png,
    Jpeg,
}

impl ImageFormat {
    pub fn mime(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Geolocation {
    pub latitude: f64,
    pub longitude: f64,
    pub city: String,
}

/// An image the UI wants uploaded.
#[derive(Debug, Clone)]
pub struct PendingImage {
    pub file_name: String,
    pub caption: String,
    pub width: u32,
    pub height: u32,
    pub location: Geolocation,
    pub owner_id: String,
    pub format: ImageFormat,
    pub data: Bytes,
}

/// One queued upload. Fields are fixed at construction.
#[derive(Debug, Clone)]
pub struct UploadJob {
    id: JobId,
    image: PendingImage,
}

impl UploadJob {
    pub fn new(image: PendingImage) -> Self {
        Self {
            id: JobId::derive(&image.file_name, &image.owner_id),
            image,
        }
    }

    pub fn id(&self) -> &JobId {
        &self.id
    }

    pub fn file_name(&self) -> &str {
        &self.image.file_name
    }

    pub fn caption(&self) -> &str {
        &self.image.caption
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.image.width, self.image.height)
    }

    pub fn location(&self) -> &Geolocation {
        &self.image.location
    }

    pub fn owner_id(&self) -> &str {
        &self.image.owner_id
    }

    pub fn format(&self) -> ImageFormat {
        self.image.format
    }

    /// The image payload. Cloning is a reference-count bump.
    pub fn data(&self) -> &Bytes {
        &self.image.data
    }
}
