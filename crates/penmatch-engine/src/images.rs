use std::io::Cursor;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::{DynamicImage, ImageFormat};

pub const DEFAULT_MAX_IMAGE_DIM: u32 = 800;

/// A base64 image payload plus the MIME type needed to make it
/// self-describing inside a prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub mime_type: String,
    pub base64: String,
}

impl EncodedImage {
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64)
    }
}

/// Turns a sample identifier into an embeddable image payload.
pub trait ImageEncoder: Send + Sync {
    fn encode(&self, identifier: &str) -> Result<EncodedImage>;
}

/// Reads samples from a directory and shrinks them to fit a square bound,
/// keeping the aspect ratio. Images already inside the bound are re-encoded
/// at their original size. JPEG sources stay JPEG; everything else is sent
/// as PNG.
#[derive(Debug, Clone)]
pub struct ResizingImageEncoder {
    source_dir: PathBuf,
    max_dim: u32,
}

impl ResizingImageEncoder {
    pub fn new(source_dir: impl Into<PathBuf>, max_dim: u32) -> Self {
        Self {
            source_dir: source_dir.into(),
            max_dim: max_dim.max(1),
        }
    }

    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    fn bounded(&self, image: DynamicImage) -> DynamicImage {
        if image.width() <= self.max_dim && image.height() <= self.max_dim {
            return image;
        }
        image.thumbnail(self.max_dim, self.max_dim)
    }
}

impl ImageEncoder for ResizingImageEncoder {
    fn encode(&self, identifier: &str) -> Result<EncodedImage> {
        let path = self.source_dir.join(identifier);
        let image = image::open(&path)
            .with_context(|| format!("failed loading sample image {}", path.display()))?;
        let resized = self.bounded(image);

        let (format, mime_type, encodable) = match ImageFormat::from_path(&path) {
            Ok(ImageFormat::Jpeg) => (
                ImageFormat::Jpeg,
                "image/jpeg",
                DynamicImage::ImageRgb8(resized.to_rgb8()),
            ),
            _ => (ImageFormat::Png, "image/png", resized),
        };
        let mut bytes = Vec::new();
        encodable
            .write_to(&mut Cursor::new(&mut bytes), format)
            .with_context(|| format!("failed re-encoding sample image {}", path.display()))?;

        Ok(EncodedImage {
            mime_type: mime_type.to_string(),
            base64: BASE64.encode(bytes),
        })
    }
}
