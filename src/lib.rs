//! Desktop image upscaler: load an image, tune patch size, padding and
//! spacing, upscale it patch by patch with live progress, save the result.

pub mod app;
pub mod cancel;
pub mod config;
pub mod error;
pub mod export;
pub mod job;
pub mod logging;
pub mod params;
pub mod progress;
pub mod source;
pub mod tiling;
pub mod upscaler;

pub use app::App;
pub use cancel::CancellationToken;
pub use config::AppConfig;
pub use error::{Result, UpscalerError};
pub use source::ImageSource;
pub use tiling::{upscale_tiled, PatchGrid, TilingOptions};
pub use upscaler::{LanczosEngine, ModelInfo, PatchEngine};
