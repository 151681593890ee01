//! Raster side of emblem generation: boundary masks, the hexagon mask,
//! image fitting and layer compositing.

pub mod compose;
pub mod fit;
pub mod geometry;
pub mod hexagon;
pub mod projection;

pub use compose::{compose, Composition, Layout};
pub use fit::{rect_fit, square_fit};
pub use geometry::{GeometryRasterizer, RasterSettings};
pub use hexagon::{hexagon_mask, hexagon_vertices};
pub use projection::Projection;

use thiserror::Error;

/// Errors produced while building masks and layers.
#[derive(Debug, Error)]
pub enum RasterError {
    #[error("geometry has no drawable area")]
    EmptyGeometry,

    #[error("cannot project boundary: {0}")]
    UndefinedProjection(String),

    #[error("empty canvas ({width}x{height})")]
    EmptyCanvas { width: u32, height: u32 },

    #[error("base image must be square, got {width}x{height}")]
    NonSquareBase { width: u32, height: u32 },

    #[error("mask is {mask_width}x{mask_height} but layer is {width}x{height}")]
    MaskMismatch {
        width: u32,
        height: u32,
        mask_width: u32,
        mask_height: u32,
    },
}
