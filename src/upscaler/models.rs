use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{fs, io};

use anyhow::Context;

use crate::error::{Result, UpscalerError};
use crate::logging::{log_error, log_message};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    Lanczos,
    Onnx,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelInfo {
    pub name: String,
    pub url: String,
    pub backend: Backend,
    pub scale: u32,
    /// Spatial dims fed to the model must be a multiple of this.
    pub window_size: u32,
    pub description: String,
    pub category: String,
}

impl std::fmt::Display for ModelInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {} ({}x)", self.category, self.description, self.scale)
    }
}

impl ModelInfo {
    fn onnx(name: &str, url: &str, scale: u32, window_size: u32, description: &str, category: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            backend: Backend::Onnx,
            scale,
            window_size,
            description: description.to_string(),
            category: category.to_string(),
        }
    }

    pub fn builtin() -> Self {
        Self {
            name: "Lanczos-2x".to_string(),
            url: "builtin".to_string(),
            backend: Backend::Lanczos,
            scale: 2,
            window_size: 1,
            description: "Lanczos resampling, no model".to_string(),
            category: "Built-in".to_string(),
        }
    }

    pub fn catalog() -> Vec<ModelInfo> {
        vec![
            Self::builtin(),
            ModelInfo {
                name: "Lanczos-4x".to_string(),
                scale: 4,
                ..Self::builtin()
            },
            Self::onnx(
                "RealESRGAN-2x",
                "https://huggingface.co/TensorStack/Upscale-amuse/resolve/main/RealESRGAN-2x/model.onnx",
                2,
                1,
                "Real-world SR",
                "RealESRGAN",
            ),
            Self::onnx(
                "RealESRGAN-4x",
                "https://huggingface.co/TensorStack/Upscale-amuse/resolve/main/RealESRGAN-4x/model.onnx",
                4,
                1,
                "Real-world SR",
                "RealESRGAN",
            ),
            Self::onnx(
                "RealESR-General-4x",
                "https://huggingface.co/TensorStack/Upscale-amuse/resolve/main/RealESR-General-4x/model.onnx",
                4,
                1,
                "General purpose",
                "RealESRGAN",
            ),
            Self::onnx(
                "swin2SR-lightweight-x2-64",
                "https://huggingface.co/Xenova/swin2SR-lightweight-x2-64/resolve/main/onnx/model.onnx",
                2,
                8,
                "Lightweight",
                "Swin2SR",
            ),
        ]
    }

    pub fn find(name: &str) -> Option<ModelInfo> {
        Self::catalog().into_iter().find(|m| m.name.eq_ignore_ascii_case(name))
    }

    pub fn file_name(&self) -> String {
        format!("{}.onnx", self.name)
    }
}

/// Path of the model's weights in `dir`, downloading them first if missing.
pub fn ensure_model(model: &ModelInfo, dir: &Path) -> Result<PathBuf> {
    let path = dir.join(model.file_name());
    if path.exists() {
        return Ok(path);
    }
    log_message(&format!("Model not found locally, downloading: {}", model.name));
    download_model(&model.url, &path).map_err(|e| {
        log_error(&format!("Failed to download model: {:#}", e));
        UpscalerError::ModelDownload(format!("{:#}", e))
    })?;
    log_message("Model downloaded successfully");
    Ok(path)
}

fn download_model(url: &str, path: &Path) -> anyhow::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(600))
        .user_agent("patch-upscaler/0.1")
        .build()?;

    log_message(&format!("Downloading from: {}", url));
    let mut resp = client.get(url).send()?;

    if !resp.status().is_success() {
        return Err(anyhow::anyhow!("HTTP {} for {}", resp.status(), url));
    }

    // Each download gets its own temp file, so concurrent downloads of the
    // same model never interleave writes. Last one to finish wins the rename.
    let mut out = tempfile::Builder::new()
        .prefix(&model_stem(path))
        .suffix(".part")
        .tempfile_in(dir)
        .with_context(|| format!("creating temp file in {}", dir.display()))?;
    io::copy(&mut resp, out.as_file_mut())?;
    out.persist(path).with_context(|| format!("moving download to {}", path.display()))?;

    log_message(&format!("Model saved to: {}", path.display()));
    Ok(())
}

fn model_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| format!("{}.", s.to_string_lossy()))
        .unwrap_or_else(|| "model.".to_string())
}
