//! Split an image into padded patches, upscale each one, stitch the result.

use image::{imageops, DynamicImage, GenericImageView, RgbaImage};

use crate::cancel::CancellationToken;
use crate::error::{Result, UpscalerError};
use crate::logging::log_message;
use crate::progress::{PatchEvent, PatchThumbnail};
use crate::upscaler::PatchEngine;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TilingOptions {
    /// 0 processes the whole image as a single patch.
    pub patch_size: u32,
    /// Context pixels added on each side, clamped at the image border.
    pub padding: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Patch {
    pub row: u32,
    pub col: u32,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub pad_left: u32,
    pub pad_top: u32,
    pub pad_right: u32,
    pub pad_bottom: u32,
}

impl Patch {
    /// `(x, y, width, height)` of the patch including its padding.
    pub fn padded_rect(&self) -> (u32, u32, u32, u32) {
        (
            self.x - self.pad_left,
            self.y - self.pad_top,
            self.width + self.pad_left + self.pad_right,
            self.height + self.pad_top + self.pad_bottom,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchGrid {
    width: u32,
    height: u32,
    patch_w: u32,
    patch_h: u32,
    padding: u32,
    rows: u32,
    columns: u32,
}

impl PatchGrid {
    pub fn new(width: u32, height: u32, opts: TilingOptions) -> Self {
        let (patch_w, patch_h, padding) = if opts.patch_size == 0 {
            (width.max(1), height.max(1), 0)
        } else {
            (opts.patch_size, opts.patch_size, opts.padding)
        };
        Self {
            width,
            height,
            patch_w,
            patch_h,
            padding,
            rows: height.div_ceil(patch_h),
            columns: width.div_ceil(patch_w),
        }
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn columns(&self) -> u32 {
        self.columns
    }

    pub fn len(&self) -> u32 {
        self.rows * self.columns
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn patch(&self, row: u32, col: u32) -> Patch {
        let x = col * self.patch_w;
        let y = row * self.patch_h;
        let width = self.patch_w.min(self.width - x);
        let height = self.patch_h.min(self.height - y);
        Patch {
            row,
            col,
            x,
            y,
            width,
            height,
            pad_left: self.padding.min(x),
            pad_top: self.padding.min(y),
            pad_right: self.padding.min(self.width - (x + width)),
            pad_bottom: self.padding.min(self.height - (y + height)),
        }
    }

    /// Patches in row-major order.
    pub fn patches(&self) -> impl Iterator<Item = Patch> + '_ {
        (0..self.rows).flat_map(move |r| (0..self.columns).map(move |c| self.patch(r, c)))
    }
}

/// Upscale `image` patch by patch, calling `on_patch` after each one is stitched.
pub fn upscale_tiled(
    image: &DynamicImage,
    opts: TilingOptions,
    engine: &mut dyn PatchEngine,
    cancel: &CancellationToken,
    on_patch: &mut dyn FnMut(PatchEvent),
) -> Result<DynamicImage> {
    let (w, h) = image.dimensions();
    let grid = PatchGrid::new(w, h, opts);
    if grid.is_empty() {
        return Err(UpscalerError::EmptyImage);
    }
    log_message(&format!(
        "Tiling {}x{} into {}x{} patches (patch size {}, padding {})",
        w,
        h,
        grid.rows(),
        grid.columns(),
        opts.patch_size,
        opts.padding
    ));

    let mut scale: Option<u32> = None;
    let mut canvas: Option<RgbaImage> = None;

    for (index, patch) in grid.patches().enumerate() {
        if cancel.is_cancelled() {
            return Err(UpscalerError::Cancelled);
        }

        let (px, py, pw, ph) = patch.padded_rect();
        let input = image.crop_imm(px, py, pw, ph);
        let output = engine.upscale_patch(&input)?;

        let (ow, oh) = output.dimensions();
        let got = ow / pw;
        let expected = *scale.get_or_insert(got);
        if got == 0 || got != expected || ow != pw * got || oh != ph * got {
            return Err(UpscalerError::ScaleMismatch {
                row: patch.row,
                col: patch.col,
                expected,
                got,
            });
        }
        let s = expected;

        let core = output.crop_imm(patch.pad_left * s, patch.pad_top * s, patch.width * s, patch.height * s);
        let target = canvas.get_or_insert_with(|| RgbaImage::new(w * s, h * s));
        imageops::replace(target, &core.to_rgba8(), (patch.x * s) as i64, (patch.y * s) as i64);

        on_patch(PatchEvent {
            row: patch.row,
            col: patch.col,
            rows: grid.rows(),
            columns: grid.columns(),
            index: index as u32,
            total: grid.len(),
            thumbnail: PatchThumbnail::from_patch(patch.row, patch.col, &core),
        });
    }

    let canvas = canvas.ok_or(UpscalerError::EmptyImage)?;
    if image.color().has_alpha() {
        Ok(DynamicImage::ImageRgba8(canvas))
    } else {
        Ok(DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(canvas).to_rgb8()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upscaler::LanczosEngine;
    use image::{Rgb, RgbImage};

    fn gradient(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(w, h, |x, y| Rgb([(x * 7) as u8, (y * 5) as u8, 40])))
    }

    #[test]
    fn grid_counts_partial_patches() {
        let grid = PatchGrid::new(50, 33, TilingOptions { patch_size: 16, padding: 2 });
        assert_eq!(grid.columns(), 4);
        assert_eq!(grid.rows(), 3);
        assert_eq!(grid.len(), 12);

        let last = grid.patch(2, 3);
        assert_eq!((last.x, last.y, last.width, last.height), (48, 32, 2, 1));
        assert_eq!((last.pad_right, last.pad_bottom), (0, 0));
        assert_eq!((last.pad_left, last.pad_top), (2, 2));
    }

    #[test]
    fn padding_clamped_at_borders() {
        let grid = PatchGrid::new(32, 32, TilingOptions { patch_size: 16, padding: 20 });
        let first = grid.patch(0, 0);
        assert_eq!((first.pad_left, first.pad_top), (0, 0));
        assert_eq!((first.pad_right, first.pad_bottom), (16, 16));
        assert_eq!(first.padded_rect(), (0, 0, 32, 32));
    }

    #[test]
    fn zero_patch_size_is_one_patch() {
        let grid = PatchGrid::new(70, 20, TilingOptions { patch_size: 0, padding: 5 });
        assert_eq!((grid.rows(), grid.columns()), (1, 1));
        let only = grid.patch(0, 0);
        assert_eq!(only.padded_rect(), (0, 0, 70, 20));
    }

    #[test]
    fn patches_are_row_major() {
        let grid = PatchGrid::new(30, 30, TilingOptions { patch_size: 10, padding: 0 });
        let order: Vec<(u32, u32)> = grid.patches().map(|p| (p.row, p.col)).collect();
        assert_eq!(order[..4], [(0, 0), (0, 1), (0, 2), (1, 0)]);
        assert_eq!(order.len(), 9);
    }

    #[test]
    fn stitched_size_is_scaled_input() {
        let img = gradient(37, 21);
        let mut engine = LanczosEngine::new(2);
        let mut events = Vec::new();
        let out = upscale_tiled(
            &img,
            TilingOptions { patch_size: 16, padding: 3 },
            &mut engine,
            &CancellationToken::new(),
            &mut |e| events.push(e),
        )
        .unwrap();
        assert_eq!(out.dimensions(), (74, 42));
        assert_eq!(events.len(), 6);
        assert!(events.iter().all(|e| e.rows == 2 && e.columns == 3 && e.total == 6));
        assert_eq!(events.last().map(|e| (e.row, e.col, e.index)), Some((1, 2, 5)));
    }

    #[test]
    fn tiled_matches_untiled_for_nearest_scaling() {
        struct Nearest;
        impl PatchEngine for Nearest {
            fn name(&self) -> &str {
                "nearest"
            }
            fn scale(&self) -> u32 {
                3
            }
            fn upscale_patch(&mut self, patch: &DynamicImage) -> Result<DynamicImage> {
                let src = patch.to_rgb8();
                Ok(DynamicImage::ImageRgb8(RgbImage::from_fn(src.width() * 3, src.height() * 3, |x, y| {
                    *src.get_pixel(x / 3, y / 3)
                })))
            }
        }

        let img = gradient(25, 19);
        let cancel = CancellationToken::new();
        let tiled = upscale_tiled(&img, TilingOptions { patch_size: 8, padding: 2 }, &mut Nearest, &cancel, &mut |_| {})
            .unwrap();
        let whole = upscale_tiled(&img, TilingOptions::default(), &mut Nearest, &cancel, &mut |_| {}).unwrap();
        assert_eq!(tiled.to_rgb8(), whole.to_rgb8());
    }

    #[test]
    fn inconsistent_scale_is_an_error() {
        struct Flaky(u32);
        impl PatchEngine for Flaky {
            fn name(&self) -> &str {
                "flaky"
            }
            fn scale(&self) -> u32 {
                2
            }
            fn upscale_patch(&mut self, patch: &DynamicImage) -> Result<DynamicImage> {
                self.0 += 1;
                let s = if self.0 == 1 { 2 } else { 3 };
                let (w, h) = patch.dimensions();
                Ok(patch.resize_exact(w * s, h * s, imageops::FilterType::Nearest))
            }
        }

        let err = upscale_tiled(
            &gradient(20, 10),
            TilingOptions { patch_size: 10, padding: 0 },
            &mut Flaky(0),
            &CancellationToken::new(),
            &mut |_| {},
        )
        .unwrap_err();
        assert!(matches!(err, UpscalerError::ScaleMismatch { row: 0, col: 1, expected: 2, got: 3 }));
    }

    #[test]
    fn cancelled_before_start() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = upscale_tiled(&gradient(8, 8), TilingOptions::default(), &mut LanczosEngine::new(2), &cancel, &mut |_| {})
            .unwrap_err();
        assert!(matches!(err, UpscalerError::Cancelled));
    }

    #[test]
    fn empty_image_has_no_patches() {
        let img = DynamicImage::new_rgb8(0, 5);
        assert!(PatchGrid::new(0, 5, TilingOptions { patch_size: 0, padding: 0 }).is_empty());
        let err = upscale_tiled(&img, TilingOptions::default(), &mut LanczosEngine::new(2), &CancellationToken::new(), &mut |_| {})
            .unwrap_err();
        assert!(matches!(err, UpscalerError::EmptyImage));
    }

    #[test]
    fn keeps_alpha_when_present() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(6, 6, image::Rgba([10, 20, 30, 128])));
        let out = upscale_tiled(&img, TilingOptions { patch_size: 4, padding: 1 }, &mut LanczosEngine::new(2), &CancellationToken::new(), &mut |_| {})
            .unwrap();
        assert!(out.color().has_alpha());
        assert_eq!(out.dimensions(), (12, 12));
    }
}
