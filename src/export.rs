use std::path::{Path, PathBuf};

use image::ImageFormat;

use crate::error::Result;
use crate::logging::log_message;
use crate::source::ImageSource;

pub const DEFAULT_FILE_NAME: &str = "upscaled_image.png";

pub fn default_file_name() -> &'static str {
    DEFAULT_FILE_NAME
}

/// Write `source` to `path`. The extension picks the format; no or unknown extension means PNG.
pub fn save_image(source: &ImageSource, path: &Path) -> Result<PathBuf> {
    let (path, format) = match ImageFormat::from_path(path) {
        Ok(format) if format.writing_enabled() => (path.to_path_buf(), format),
        _ if path.extension().is_none() => (path.with_extension("png"), ImageFormat::Png),
        _ => (path.to_path_buf(), ImageFormat::Png),
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let image = source.image();
    if format.to_mime_type() == source.mime() {
        // already in the target encoding
        std::fs::write(&path, source.encoded_bytes()?)?;
    } else if format == ImageFormat::Jpeg {
        // JPEG has no alpha channel
        image.to_rgb8().save_with_format(&path, format)?;
    } else {
        image.save_with_format(&path, format)?;
    }

    let (w, h) = source.dimensions();
    log_message(&format!("Saved {}x{} image to {}", w, h, path.display()));
    Ok(path)
}
