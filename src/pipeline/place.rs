//! Per-place processing: assets, geometry, rasterization, compositing, output.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::{ImageFormat, RgbaImage};
use serde::Serialize;
use tracing::{error, info};

use super::assets::{load_rgba, AssetStore, InternalAsset};
use super::PipelineError;
use crate::geocode::Geocoder;
use crate::models::{Boundary, GeometrySource, PlaceDescriptor};
use crate::raster::{compose, GeometryRasterizer, Layout};

/// Result of one place, successful or not
#[derive(Debug, Clone, Serialize)]
pub struct PlaceOutcome {
    pub display_name: String,
    #[serde(flatten)]
    pub status: OutcomeStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeStatus {
    Ok {
        output: PathBuf,
        internal_asset: InternalAsset,
        layout: Layout,
    },
    Failed {
        kind: String,
        error: String,
    },
}

impl PlaceOutcome {
    pub fn failure(display_name: impl Into<String>, err: &PipelineError) -> Self {
        Self {
            display_name: display_name.into(),
            status: OutcomeStatus::Failed {
                kind: err.kind().to_string(),
                error: err.to_string(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, OutcomeStatus::Ok { .. })
    }

    pub fn output(&self) -> Option<&Path> {
        match &self.status {
            OutcomeStatus::Ok { output, .. } => Some(output),
            OutcomeStatus::Failed { .. } => None,
        }
    }

    pub fn internal_asset(&self) -> Option<&InternalAsset> {
        match &self.status {
            OutcomeStatus::Ok { internal_asset, .. } => Some(internal_asset),
            OutcomeStatus::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.status {
            OutcomeStatus::Failed { error, .. } => Some(error),
            OutcomeStatus::Ok { .. } => None,
        }
    }
}

/// Produces one emblem per place descriptor.
pub struct PlacePipeline<G> {
    geocoder: G,
    assets: AssetStore,
    rasterizer: GeometryRasterizer,
    output_dir: PathBuf,
}

impl<G: Geocoder> PlacePipeline<G> {
    pub fn new(
        geocoder: G,
        assets: AssetStore,
        rasterizer: GeometryRasterizer,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            geocoder,
            assets,
            rasterizer,
            output_dir: output_dir.into(),
        }
    }

    pub fn geocoder(&self) -> &G {
        &self.geocoder
    }

    pub fn assets(&self) -> &AssetStore {
        &self.assets
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Process one place. Errors never escape: they become a failed outcome.
    pub async fn process(&self, place: &PlaceDescriptor, base: Arc<RgbaImage>) -> PlaceOutcome {
        let display_name = place.display_name();
        info!("--- Processing: {} ---", display_name);

        match self.try_process(place, base).await {
            Ok((output, internal_asset, layout)) => {
                info!("Saved {} to {}", display_name, output.display());
                PlaceOutcome {
                    display_name,
                    status: OutcomeStatus::Ok {
                        output,
                        internal_asset,
                        layout,
                    },
                }
            }
            Err(e) => {
                error!("Failed to process {}: {}", display_name, e);
                PlaceOutcome::failure(display_name, &e)
            }
        }
    }

    async fn try_process(
        &self,
        place: &PlaceDescriptor,
        base: Arc<RgbaImage>,
    ) -> Result<(PathBuf, InternalAsset, Layout), PipelineError> {
        let middle_path = self.assets.require_middle()?;
        let internal = self.assets.resolve_internal(&place.name)?;

        let boundary = match &place.source {
            GeometrySource::Precomputed(boundary) => boundary.clone(),
            GeometrySource::Query(query) => self.geocoder.geocode(query).await?,
        };

        let job = RenderJob {
            rasterizer: self.rasterizer,
            boundary,
            base,
            middle_path,
            internal_path: internal.path().to_path_buf(),
            output: self.output_dir.join(place.output_file_name()),
        };

        let (output, layout) = tokio::task::spawn_blocking(move || job.run())
            .await
            .map_err(|e| PipelineError::TaskFailed(e.to_string()))??;

        Ok((output, internal, layout))
    }
}

/// CPU-bound part of a place, run off the async workers
struct RenderJob {
    rasterizer: GeometryRasterizer,
    boundary: Boundary,
    base: Arc<RgbaImage>,
    middle_path: PathBuf,
    internal_path: PathBuf,
    output: PathBuf,
}

impl RenderJob {
    fn run(self) -> Result<(PathBuf, Layout), PipelineError> {
        let middle = load_rgba(&self.middle_path)?;
        let internal = load_rgba(&self.internal_path)?;
        let mask = self.rasterizer.rasterize(&self.boundary)?;

        let composition = compose(&self.base, &middle, &internal, &mask)?;
        composition
            .image
            .save_with_format(&self.output, ImageFormat::Png)
            .map_err(|source| PipelineError::StorageWrite {
                path: self.output.clone(),
                source,
            })?;

        Ok((self.output, composition.layout))
    }
}
