use std::path::Path;

use anyhow::Context;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, GrayImage, ImageBuffer, Luma, RgbImage};
use ndarray::Array4;
use ort::{session::Session, value::Value};
use rayon::prelude::*;

use super::{ModelInfo, PatchEngine};
use crate::error::{Result, UpscalerError};
use crate::logging::{log_error, log_message};

/// ONNX super-resolution model run through ONNX Runtime.
pub struct OnnxEngine {
    name: String,
    scale: u32,
    window_size: u32,
    session: Session,
    input_name: String,
    output_name: String,
}

impl OnnxEngine {
    pub fn load(model: &ModelInfo, model_path: &Path) -> Result<Self> {
        Self::try_load(model, model_path).map_err(|e| {
            log_error(&format!("Failed to load model from {}: {:#}", model_path.display(), e));
            UpscalerError::Inference(format!("{:#}", e))
        })
    }

    fn try_load(model: &ModelInfo, model_path: &Path) -> anyhow::Result<Self> {
        log_message("Initializing ONNX Runtime...");
        ort::init().commit().context("initializing ONNX Runtime")?;

        log_message("Creating ONNX session...");
        let session = Session::builder()?
            .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)?
            .with_intra_threads(num_cpus::get())?
            .with_execution_providers([ort::execution_providers::DirectMLExecutionProvider::default().build()])?
            .commit_from_file(model_path)
            .with_context(|| format!("loading {}", model_path.display()))?;

        let input_name = session.inputs[0].name.to_string();
        let output_name = session.outputs[0].name.to_string();
        log_message(&format!("Model input: '{}', output: '{}'", input_name, output_name));

        Ok(Self {
            name: model.name.clone(),
            scale: model.scale,
            window_size: model.window_size.max(1),
            session,
            input_name,
            output_name,
        })
    }

    fn run(&mut self, patch: &DynamicImage) -> anyhow::Result<DynamicImage> {
        let (w, h) = patch.dimensions();
        let padded = pad_to_multiple(&patch.to_rgb8(), self.window_size);

        let input_value = Value::from_array(to_nchw(&padded))?;
        let outputs = self
            .session
            .run(ort::inputs![self.input_name.as_str() => input_value])
            .context("running inference")?;

        let (output_shape, output_data) = outputs[self.output_name.as_str()]
            .try_extract_tensor::<f32>()
            .context("extracting output tensor")?;
        let shape: Vec<usize> = output_shape.as_ref().iter().map(|&d| d as usize).collect();
        if shape.len() != 4 || shape[1] != 3 {
            anyhow::bail!("unexpected output shape {:?}", shape);
        }
        let output = Array4::from_shape_vec((shape[0], shape[1], shape[2], shape[3]), output_data.to_vec())?;

        let img = from_nchw(&output)?;
        Ok(restore_alpha(img.crop_imm(0, 0, w * self.scale, h * self.scale), patch))
    }
}

impl PatchEngine for OnnxEngine {
    fn name(&self) -> &str {
        &self.name
    }

    fn scale(&self) -> u32 {
        self.scale
    }

    fn upscale_patch(&mut self, patch: &DynamicImage) -> Result<DynamicImage> {
        self.run(patch).map_err(|e| {
            log_error(&format!("Inference failed: {:#}", e));
            UpscalerError::Inference(format!("{:#}", e))
        })
    }
}

/// HWC u8 → NCHW f32 in [0, 1].
pub(crate) fn to_nchw(rgb: &RgbImage) -> Array4<f32> {
    let (w, h) = rgb.dimensions();
    let mut tensor = Array4::<f32>::zeros((1, 3, h as usize, w as usize));
    for (x, y, p) in rgb.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = p[c] as f32 / 255.0;
        }
    }
    tensor
}

/// NCHW f32 in [0, 1] → RGB image, rows converted in parallel.
pub(crate) fn from_nchw(tensor: &Array4<f32>) -> anyhow::Result<DynamicImage> {
    let shape = tensor.shape();
    let (h, w) = (shape[2], shape[3]);
    let mut buf = vec![0u8; h * w * 3];
    buf.par_chunks_mut(w * 3).enumerate().for_each(|(y, row)| {
        for x in 0..w {
            for c in 0..3 {
                row[x * 3 + c] = (tensor[[0, c, y, x]] * 255.0).round().clamp(0.0, 255.0) as u8;
            }
        }
    });
    let img: RgbImage = ImageBuffer::from_raw(w as u32, h as u32, buf).context("output buffer size mismatch")?;
    Ok(DynamicImage::ImageRgb8(img))
}

/// The models only see RGB. Carry `source`'s alpha plane over, resized to
/// the output, so transparency survives.
pub(crate) fn restore_alpha(rgb: DynamicImage, source: &DynamicImage) -> DynamicImage {
    if !source.color().has_alpha() {
        return rgb;
    }
    let (w, h) = rgb.dimensions();
    let src = source.to_rgba8();
    let alpha = GrayImage::from_fn(src.width(), src.height(), |x, y| Luma([src.get_pixel(x, y)[3]]));
    let alpha = DynamicImage::ImageLuma8(alpha).resize_exact(w, h, FilterType::Lanczos3).to_luma8();

    let mut out = rgb.to_rgba8();
    for (px, a) in out.pixels_mut().zip(alpha.pixels()) {
        px[3] = a[0];
    }
    DynamicImage::ImageRgba8(out)
}

/// Mirror-pad right and bottom edges up to a multiple of `multiple`.
pub(crate) fn pad_to_multiple(img: &RgbImage, multiple: u32) -> RgbImage {
    let (w, h) = img.dimensions();
    let pad_w = w.div_ceil(multiple) * multiple;
    let pad_h = h.div_ceil(multiple) * multiple;
    if pad_w == w && pad_h == h {
        return img.clone();
    }

    ImageBuffer::from_fn(pad_w, pad_h, |x, y| {
        let src_x = if x < w { x } else { w - 1 - (x - w).min(w - 1) };
        let src_y = if y < h { y } else { h - 1 - (y - h).min(h - 1) };
        *img.get_pixel(src_x, src_y)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn pad_reflects_edges() {
        let img = RgbImage::from_fn(3, 2, |x, y| Rgb([x as u8, y as u8, 0]));
        let padded = pad_to_multiple(&img, 4);
        assert_eq!(padded.dimensions(), (4, 4));
        assert_eq!(padded.get_pixel(3, 0), &Rgb([2, 0, 0]));
        assert_eq!(padded.get_pixel(0, 2), &Rgb([0, 1, 0]));
        assert_eq!(padded.get_pixel(0, 3), &Rgb([0, 0, 0]));
    }

    #[test]
    fn alpha_is_carried_to_model_output() {
        let source = DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(4, 3, image::Rgba([9, 9, 9, 77])));
        let output = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 6, Rgb([200, 100, 50])));
        let merged = restore_alpha(output, &source).to_rgba8();
        assert_eq!(merged.dimensions(), (8, 6));
        assert!(merged.pixels().all(|p| p.0 == [200, 100, 50, 77]));
    }

    #[test]
    fn opaque_sources_stay_rgb() {
        let source = DynamicImage::ImageRgb8(RgbImage::new(2, 2));
        let output = DynamicImage::ImageRgb8(RgbImage::new(4, 4));
        assert!(!restore_alpha(output, &source).color().has_alpha());
    }

    #[test]
    fn pad_noop_when_aligned() {
        let img = RgbImage::new(8, 16);
        assert_eq!(pad_to_multiple(&img, 8).dimensions(), (8, 16));
    }

    #[test]
    fn tensor_conversion_is_lossless_for_u8() {
        let img = RgbImage::from_fn(5, 4, |x, y| Rgb([(x * 50) as u8, (y * 60) as u8, 255]));
        let tensor = to_nchw(&img);
        assert_eq!(tensor.shape(), &[1, 3, 4, 5]);
        let back = from_nchw(&tensor).unwrap().to_rgb8();
        assert_eq!(back, img);
    }
}
