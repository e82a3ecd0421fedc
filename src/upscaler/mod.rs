//! Upscaling backends. The tiling loop only ever sees a `PatchEngine`.

use std::path::Path;

use image::{imageops::FilterType, DynamicImage, GenericImageView};

use crate::error::Result;
use crate::logging::log_message;

pub mod models;
pub mod onnx;

pub use models::{ensure_model, Backend, ModelInfo};
pub use onnx::OnnxEngine;

pub trait PatchEngine: Send {
    fn name(&self) -> &str;
    fn scale(&self) -> u32;
    /// Upscale one patch. The output must be exactly `scale()` times the input.
    fn upscale_patch(&mut self, patch: &DynamicImage) -> Result<DynamicImage>;
}

/// Model-free resampler, always available.
#[derive(Debug, Clone)]
pub struct LanczosEngine {
    name: String,
    scale: u32,
}

impl LanczosEngine {
    pub fn new(scale: u32) -> Self {
        let scale = scale.max(1);
        Self {
            name: format!("Lanczos-{}x", scale),
            scale,
        }
    }
}

impl PatchEngine for LanczosEngine {
    fn name(&self) -> &str {
        &self.name
    }

    fn scale(&self) -> u32 {
        self.scale
    }

    fn upscale_patch(&mut self, patch: &DynamicImage) -> Result<DynamicImage> {
        let (w, h) = patch.dimensions();
        Ok(patch.resize_exact(w * self.scale, h * self.scale, FilterType::Lanczos3))
    }
}

/// Build the engine for `model`, downloading its weights into `models_dir` if needed.
pub fn engine_for(model: &ModelInfo, models_dir: &Path) -> Result<Box<dyn PatchEngine>> {
    match model.backend {
        Backend::Lanczos => {
            log_message(&format!("Using built-in resampler: {}", model.name));
            Ok(Box::new(LanczosEngine::new(model.scale)))
        }
        Backend::Onnx => {
            let path = ensure_model(model, models_dir)?;
            Ok(Box::new(OnnxEngine::load(model, &path)?))
        }
    }
}
