use thiserror::Error;

use crate::params::ParamKind;

#[derive(Error, Debug)]
pub enum UpscalerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image format error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Malformed data URL: {0}")]
    MalformedDataUrl(String),

    #[error("Invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("{kind} must be between {min} and {max} (got {value})")]
    ParamOutOfRange {
        kind: ParamKind,
        value: f32,
        min: f32,
        max: f32,
    },

    #[error("Not a number: {0:?}")]
    InvalidNumber(String),

    #[error("Patch {row}-{col} came back at {got}x, expected {expected}x")]
    ScaleMismatch {
        row: u32,
        col: u32,
        expected: u32,
        got: u32,
    },

    #[error("Model download failed: {0}")]
    ModelDownload(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Upscale cancelled")]
    Cancelled,

    #[error("Image has no pixels")]
    EmptyImage,
}

pub type Result<T> = std::result::Result<T, UpscalerError>;
