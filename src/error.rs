use thiserror::Error;

use crate::quantize::{MAX_COLORS, MIN_COLORS};

/// Problems with what the user handed in: the file, the color count, or an edit.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("Unsupported image format: {0} (expected PNG or JPEG)")]
    UnsupportedFormat(String),

    #[error("Unable to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("Image has no pixels")]
    EmptyImage,

    #[error("Color count {0} is outside the supported range {min}-{max}", min = MIN_COLORS, max = MAX_COLORS)]
    ColorCount(usize),

    #[error("Invalid hex color: {0:?}")]
    InvalidColor(String),

    #[error("Color {0} is not in the palette")]
    ColorNotInPalette(String),

    #[error("Cluster {index} does not exist (palette has {len} colors)")]
    UnknownCluster { index: usize, len: usize },

    #[error("No image has been uploaded")]
    NoImage,

    #[error("No image has been quantized yet")]
    NotQuantized,
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Nothing to export: no reduced image is available")]
    MissingImage,

    #[error("Unrecognized page size {0:?} (expected one of A4, A3, A2, A1, A0)")]
    UnknownPageSize(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Any error surfaced by the reducer pipeline.
#[derive(Debug, Error)]
pub enum ReduceError {
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] InputError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),
}

pub type Result<T, E = ReduceError> = std::result::Result<T, E>;
