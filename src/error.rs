use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A label was submitted without usable text.
    #[error("insufficient input: {0}")]
    InsufficientInput(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("raster buffer has {actual} bytes, expected {expected}")]
    RasterSize { expected: usize, actual: usize },

    #[error("text rasterization failed: {0}")]
    Rasterize(String),
}

pub type Result<T> = std::result::Result<T, Error>;
