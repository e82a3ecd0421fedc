use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::logging::DEFAULT_LOG_FILE;
use crate::upscaler::ModelInfo;

/// How the three parameters are edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ControlStyle {
    #[default]
    Slider,
    Numeric,
}

/// What is shown while an upscale is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ProgressStyle {
    Spinner,
    #[default]
    Labelled,
}

/// Which image the download button saves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum DownloadPolicy {
    /// Only the upscaled result.
    #[default]
    Result,
    /// The upscaled result, or the original when nothing has been upscaled yet.
    ResultOrOriginal,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "patch-upscaler", about = "Upscale images patch by patch")]
#[command(version)]
pub struct AppConfig {
    /// Parameter controls
    #[arg(long, value_enum, default_value_t = ControlStyle::Slider)]
    pub controls: ControlStyle,

    /// Busy indicator
    #[arg(long, value_enum, default_value_t = ProgressStyle::Labelled)]
    pub progress: ProgressStyle,

    /// What the download button saves
    #[arg(long, value_enum, default_value_t = DownloadPolicy::Result)]
    pub download: DownloadPolicy,

    /// Model selected at startup
    #[arg(long, default_value = "Lanczos-2x")]
    pub model: String,

    /// Where ONNX models are cached
    #[arg(long, default_value = "./models")]
    pub models_dir: PathBuf,

    /// Log file, appended to
    #[arg(long, default_value = DEFAULT_LOG_FILE)]
    pub log_file: PathBuf,

    /// Log to the console only
    #[arg(long)]
    pub no_log_file: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            controls: ControlStyle::default(),
            progress: ProgressStyle::default(),
            download: DownloadPolicy::default(),
            model: ModelInfo::builtin().name,
            models_dir: PathBuf::from("./models"),
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            no_log_file: false,
        }
    }
}

impl AppConfig {
    /// The configured model, falling back to the built-in resampler for unknown names.
    pub fn initial_model(&self) -> ModelInfo {
        ModelInfo::find(&self.model).unwrap_or_else(ModelInfo::builtin)
    }
}
