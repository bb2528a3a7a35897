use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use super::Anchor;
use crate::error::{Error, Result};

/// Width and height used when an image carries no readable dimensions
pub const DEFAULT_IMAGE_SIZE_PX: u32 = 100;

/// Supported raster formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
}

impl ImageFormat {
    /// Detect the format from the leading magic bytes
    pub fn detect(data: &[u8]) -> Option<Self> {
        if data.starts_with(b"\x89PNG") {
            Some(ImageFormat::Png)
        } else if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(ImageFormat::Jpeg)
        } else if data.starts_with(b"GIF8") {
            Some(ImageFormat::Gif)
        } else {
            None
        }
    }

    /// Infer the format from a file extension (defaults to PNG)
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => ImageFormat::Jpeg,
            "gif" => ImageFormat::Gif,
            _ => ImageFormat::Png,
        }
    }

    /// File extension used for media parts
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Gif => "gif",
        }
    }

    /// MIME content type
    pub fn content_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Gif => "image/gif",
        }
    }
}

/// An image embedded in a worksheet
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    data: Vec<u8>,
    format: ImageFormat,
    width: Option<u32>,
    height: Option<u32>,
    /// Where the image sits on the sheet
    pub anchor: Anchor,
    /// Name, unique within the owning sheet once added to a collection
    pub name: Option<String>,
    /// Alt text
    pub description: Option<String>,
}

impl Image {
    /// Create an image from raw bytes, detecting format and pixel size
    ///
    /// Unrecognised payloads are treated as PNG without dimensions.
    pub fn from_bytes(data: Vec<u8>) -> Self {
        let format = ImageFormat::detect(&data).unwrap_or(ImageFormat::Png);
        Self::with_format(data, format)
    }

    /// Create an image with an explicit format
    pub fn with_format(data: Vec<u8>, format: ImageFormat) -> Self {
        let (width, height) = match read_dimensions(&data, format) {
            Some((w, h)) => (Some(w), Some(h)),
            None => (None, None),
        };
        Self {
            data,
            format,
            width,
            height,
            anchor: Anchor::default(),
            name: None,
            description: None,
        }
    }

    /// Create an image from base64 text
    ///
    /// Text that is not valid base64 is kept as its raw UTF-8 bytes.
    pub fn from_base64(text: &str) -> Self {
        let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        let data = BASE64
            .decode(compact.as_bytes())
            .unwrap_or_else(|_| text.as_bytes().to_vec());
        Self::from_bytes(data)
    }

    /// Load an image file; the file stem becomes the image name
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        if data.is_empty() {
            return Err(Error::InvalidImage(format!("{} is empty", path.display())));
        }
        let format = ImageFormat::detect(&data).unwrap_or_else(|| {
            ImageFormat::from_extension(
                path.extension().and_then(|e| e.to_str()).unwrap_or_default(),
            )
        });
        let mut image = Self::with_format(data, format);
        image.name = path.file_stem().map(|s| s.to_string_lossy().into_owned());
        Ok(image)
    }

    /// Raw payload
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// Width in pixels, if known
    pub fn width(&self) -> Option<u32> {
        self.width
    }

    /// Height in pixels, if known
    pub fn height(&self) -> Option<u32> {
        self.height
    }

    /// Width used for layout (falls back to [`DEFAULT_IMAGE_SIZE_PX`])
    pub fn display_width(&self) -> u32 {
        self.width.unwrap_or(DEFAULT_IMAGE_SIZE_PX)
    }

    /// Height used for layout (falls back to [`DEFAULT_IMAGE_SIZE_PX`])
    pub fn display_height(&self) -> u32 {
        self.height.unwrap_or(DEFAULT_IMAGE_SIZE_PX)
    }

    /// Override the pixel size
    pub fn resize(&mut self, width: Option<u32>, height: Option<u32>) {
        if width.is_some() {
            self.width = width;
        }
        if height.is_some() {
            self.height = height;
        }
    }

    /// Builder-style anchor setter
    pub fn with_anchor(mut self, anchor: Anchor) -> Self {
        self.anchor = anchor;
        self
    }

    /// Builder-style name setter
    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Builder-style alt-text setter
    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = Some(description.into());
        self
    }
}

fn read_dimensions(data: &[u8], format: ImageFormat) -> Option<(u32, u32)> {
    match format {
        ImageFormat::Png => {
            if data.len() < 24 || &data[12..16] != b"IHDR" {
                return None;
            }
            let w = u32::from_be_bytes([data[16], data[17], data[18], data[19]]);
            let h = u32::from_be_bytes([data[20], data[21], data[22], data[23]]);
            Some((w, h))
        }
        ImageFormat::Jpeg => {
            if data.len() < 10 {
                return None;
            }
            // SOF0 (baseline) or SOF2 (progressive) frame header
            (2..data.len() - 8)
                .find(|&i| data[i] == 0xFF && (data[i + 1] == 0xC0 || data[i + 1] == 0xC2))
                .map(|i| {
                    let h = u16::from_be_bytes([data[i + 5], data[i + 6]]) as u32;
                    let w = u16::from_be_bytes([data[i + 7], data[i + 8]]) as u32;
                    (w, h)
                })
        }
        ImageFormat::Gif => {
            if data.len() < 10 {
                return None;
            }
            let w = u16::from_le_bytes([data[6], data[7]]) as u32;
            let h = u16::from_le_bytes([data[8], data[9]]) as u32;
            Some((w, h))
        }
    }
}
