use thiserror::Error;

#[derive(Error, Debug)]
pub enum CanvasError {
    #[error("Bitmaps differ in size: reference {reference:?}, candidate {candidate:?}")]
    DimensionMismatch {
        reference: (u32, u32),
        candidate: (u32, u32),
    },

    #[error("Expected {width}x{height} RGBA pixels, got {actual} bytes")]
    BufferLength { width: u32, height: u32, actual: usize },

    #[error("Could not decode drawing: {0}")]
    Decode(#[from] image::ImageError),
}
