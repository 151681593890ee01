use std::path::PathBuf;

use thiserror::Error;

use crate::geocode::GeocodeError;
use crate::raster::RasterError;

/// Errors raised while producing an emblem.
///
/// Everything except [`PipelineError::MissingBaseAsset`] is caught at the
/// place boundary and recorded as a failed outcome.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("base asset not found: {}", .0.display())]
    MissingBaseAsset(PathBuf),

    #[error("middle asset not found: {}", .0.display())]
    MissingMiddleAsset(PathBuf),

    #[error("no internal asset: neither {} nor {} exists", .specific.display(), .default.display())]
    MissingInternalAsset { specific: PathBuf, default: PathBuf },

    #[error("geometry lookup failed: {0}")]
    GeometryLookup(#[from] GeocodeError),

    #[error("invalid geometry: {0}")]
    Geometry(#[from] RasterError),

    #[error("cannot decode {}: {source}", .path.display())]
    ImageDecode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("cannot write {}: {source}", .path.display())]
    StorageWrite {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("worker task failed: {0}")]
    TaskFailed(String),
}

impl PipelineError {
    /// Short machine-readable name, used in reports
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::MissingBaseAsset(_) => "missing_base_asset",
            PipelineError::MissingMiddleAsset(_) => "missing_middle_asset",
            PipelineError::MissingInternalAsset { .. } => "missing_internal_asset",
            PipelineError::GeometryLookup(_) => "geometry_lookup",
            PipelineError::Geometry(_) => "geometry",
            PipelineError::ImageDecode { .. } => "image_decode",
            PipelineError::StorageWrite { .. } => "storage_write",
            PipelineError::TaskFailed(_) => "task_failed",
        }
    }

    pub(crate) fn storage(path: PathBuf, source: std::io::Error) -> Self {
        PipelineError::StorageWrite {
            path,
            source: image::ImageError::IoError(source),
        }
    }
}
