use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while reading theme assets and configuration.
///
/// These never escape the paint and mask entrypoints; callers of those get a
/// fallback image instead.
#[derive(Debug, Error)]
pub enum ThemeError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("png decode: {0}")]
    Png(#[from] png::DecodingError),

    #[error("image decode: {0}")]
    Image(#[from] image::ImageError),

    #[error("svg parse: {0}")]
    Svg(#[from] resvg::usvg::Error),

    #[error("unsupported image format: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("invalid image size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },

    #[error("parse {}: {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

pub type Result<T> = std::result::Result<T, ThemeError>;
