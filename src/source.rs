//! Images as the UI holds them: a data URL plus the decoded pixels.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::{DynamicImage, GenericImageView, ImageFormat};

use crate::error::{Result, UpscalerError};

/// Extensions offered by the open dialog.
pub const IMAGE_EXTENSIONS: [&str; 8] = ["jpg", "jpeg", "png", "bmp", "webp", "gif", "tif", "tiff"];

const DATA_PREFIX: &str = "data:";
const BASE64_MARKER: &str = ";base64,";

/// A parsed `data:<mime>;base64,<payload>` string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl<'a> {
    pub mime: &'a str,
    pub payload: &'a str,
}

impl<'a> DataUrl<'a> {
    pub fn parse(url: &'a str) -> Result<Self> {
        let rest = url
            .strip_prefix(DATA_PREFIX)
            .ok_or_else(|| UpscalerError::MalformedDataUrl("missing `data:` prefix".to_string()))?;
        let (mime, payload) = rest
            .split_once(BASE64_MARKER)
            .ok_or_else(|| UpscalerError::MalformedDataUrl("missing `;base64,` marker".to_string()))?;
        if mime.is_empty() || !mime.contains('/') {
            return Err(UpscalerError::MalformedDataUrl(format!("bad MIME type {mime:?}")));
        }
        if payload.is_empty() {
            return Err(UpscalerError::MalformedDataUrl("empty payload".to_string()));
        }
        Ok(Self { mime, payload })
    }

    pub fn decode(&self) -> Result<Vec<u8>> {
        Ok(STANDARD.decode(self.payload)?)
    }

    pub fn encode(mime: &str, bytes: &[u8]) -> String {
        format!("{DATA_PREFIX}{mime}{BASE64_MARKER}{}", STANDARD.encode(bytes))
    }
}

pub fn is_well_formed(url: &str) -> bool {
    DataUrl::parse(url).and_then(|d| d.decode()).is_ok()
}

#[derive(Debug, Clone)]
pub struct ImageSource {
    data_url: String,
    image: Arc<DynamicImage>,
    origin: Option<PathBuf>,
}

impl ImageSource {
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes, Some(path.to_path_buf()))
    }

    pub fn from_bytes(bytes: &[u8], origin: Option<PathBuf>) -> Result<Self> {
        let format = image::guess_format(bytes)?;
        let image = image::load_from_memory_with_format(bytes, format)?;
        if image.width() == 0 || image.height() == 0 {
            return Err(UpscalerError::EmptyImage);
        }
        Ok(Self {
            data_url: DataUrl::encode(format.to_mime_type(), bytes),
            image: Arc::new(image),
            origin,
        })
    }

    pub fn from_data_url(url: &str) -> Result<Self> {
        let bytes = DataUrl::parse(url)?.decode()?;
        Self::from_bytes(&bytes, None)
    }

    /// Encode an in-memory image as PNG and wrap it.
    pub fn from_image(image: DynamicImage) -> Result<Self> {
        if image.width() == 0 || image.height() == 0 {
            return Err(UpscalerError::EmptyImage);
        }
        let mut png = Vec::new();
        image.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
        Ok(Self {
            data_url: DataUrl::encode(ImageFormat::Png.to_mime_type(), &png),
            image: Arc::new(image),
            origin: None,
        })
    }

    pub fn data_url(&self) -> &str {
        &self.data_url
    }

    pub fn image(&self) -> &Arc<DynamicImage> {
        &self.image
    }

    pub fn origin(&self) -> Option<&Path> {
        self.origin.as_deref()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Raw bytes behind the data URL, in their original encoding.
    pub fn encoded_bytes(&self) -> Result<Vec<u8>> {
        DataUrl::parse(&self.data_url)?.decode()
    }

    pub fn mime(&self) -> &str {
        DataUrl::parse(&self.data_url).map(|d| d.mime).unwrap_or("application/octet-stream")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn png_bytes(w: u32, h: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(w, h, |x, y| Rgb([x as u8, y as u8, 7]));
        let mut out = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
            .unwrap();
        out
    }

    #[test]
    fn from_bytes_builds_png_data_url() {
        let src = ImageSource::from_bytes(&png_bytes(5, 3), None).unwrap();
        assert!(src.data_url().starts_with("data:image/png;base64,"));
        assert!(is_well_formed(src.data_url()));
        assert_eq!(src.dimensions(), (5, 3));
        assert_eq!(src.mime(), "image/png");
    }

    #[test]
    fn data_url_keeps_original_bytes() {
        let bytes = png_bytes(4, 4);
        let src = ImageSource::from_bytes(&bytes, None).unwrap();
        assert_eq!(src.encoded_bytes().unwrap(), bytes);
        let again = ImageSource::from_data_url(src.data_url()).unwrap();
        assert_eq!(again.dimensions(), (4, 4));
    }

    #[test]
    fn rejects_non_image_bytes() {
        assert!(ImageSource::from_bytes(b"definitely not an image", None).is_err());
    }

    #[test]
    fn parse_errors() {
        assert!(matches!(DataUrl::parse("image/png;base64,AAAA"), Err(UpscalerError::MalformedDataUrl(_))));
        assert!(matches!(DataUrl::parse("data:image/png,AAAA"), Err(UpscalerError::MalformedDataUrl(_))));
        assert!(matches!(DataUrl::parse("data:;base64,AAAA"), Err(UpscalerError::MalformedDataUrl(_))));
        assert!(matches!(DataUrl::parse("data:image/png;base64,"), Err(UpscalerError::MalformedDataUrl(_))));
        assert!(!is_well_formed("data:image/png;base64,@@@"));
    }

    #[test]
    fn parse_splits_mime_and_payload() {
        let url = DataUrl::parse("data:image/jpeg;base64,AAAA").unwrap();
        assert_eq!(url.mime, "image/jpeg");
        assert_eq!(url.payload, "AAAA");
    }
}
