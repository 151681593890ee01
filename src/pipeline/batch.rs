//! Batch driver: every catalog place plus the two aggregate variants.

use std::fs;
use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use image::RgbaImage;
use indicatif::ProgressBar;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::{BatchReport, PipelineError, PlaceOutcome, PlacePipeline};
use crate::geocode::{union_all, GeocodeError, Geocoder};
use crate::models::{Boundary, Catalog, GeometrySource, PlaceDescriptor};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchOptions {
    /// Places processed concurrently
    pub jobs: usize,
    /// Build the union-of-regions variants
    pub aggregates: bool,
    /// Restrict the run to these names (empty: everything)
    #[serde(skip)]
    pub only: Vec<String>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            jobs: 1,
            aggregates: true,
            only: Vec::new(),
        }
    }
}

impl BatchOptions {
    fn wants(&self, name: &str) -> bool {
        self.only.is_empty() || self.only.iter().any(|n| n == name)
    }
}

pub struct BatchDriver<G> {
    pipeline: PlacePipeline<G>,
    catalog: Catalog,
    options: BatchOptions,
    progress: ProgressBar,
}

impl<G: Geocoder> BatchDriver<G> {
    pub fn new(pipeline: PlacePipeline<G>, catalog: Catalog, options: BatchOptions) -> Self {
        Self {
            pipeline,
            catalog,
            options,
            progress: ProgressBar::hidden(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    pub fn pipeline(&self) -> &PlacePipeline<G> {
        &self.pipeline
    }

    /// Run the whole batch.
    ///
    /// Only a missing or unusable base asset aborts the run; it is checked
    /// before any geocoding. Every other failure is recorded per place.
    pub async fn run(&self) -> Result<BatchReport, PipelineError> {
        let started_at = Utc::now();

        let output_dir = self.pipeline.output_dir();
        fs::create_dir_all(output_dir)
            .map_err(|e| PipelineError::storage(output_dir.to_path_buf(), e))?;

        let base = match self.pipeline.assets().load_base() {
            Ok(base) => Arc::new(base),
            Err(e) => {
                error!("Cannot start batch: {}", e);
                return Err(e);
            }
        };
        info!("Base image ready ({0}x{0})", base.width());

        let places: Vec<PlaceDescriptor> = self
            .catalog
            .places()
            .filter(|name| self.options.wants(name))
            .map(|name| PlaceDescriptor::from_catalog(name, &self.catalog))
            .collect();
        let aggregates = self.options.aggregates && self.options.wants(&self.catalog.aggregate.name);

        let total = places.len() + if aggregates { 2 } else { 0 };
        self.progress.set_length(total as u64);
        info!("Generating {} emblems", total);

        let mut outcomes = Vec::with_capacity(total);
        if aggregates {
            outcomes.extend(self.process_aggregates(&base).await);
        }
        outcomes.extend(self.process_places(&places, &base).await);

        self.progress.finish_and_clear();

        let report = BatchReport::new(started_at, Utc::now(), outcomes);
        info!(
            "Batch finished: {} succeeded, {} failed",
            report.succeeded, report.failed
        );
        Ok(report)
    }

    async fn process_aggregates(&self, base: &Arc<RgbaImage>) -> Vec<PlaceOutcome> {
        let aggregate = &self.catalog.aggregate;
        let descriptor = |boundary: Boundary, suffix: &str| {
            PlaceDescriptor::new(aggregate.name.as_str(), GeometrySource::Precomputed(boundary))
                .with_suffix(suffix)
        };

        info!(
            "Geocoding {} regions for {}",
            self.catalog.regions.len(),
            aggregate.name
        );

        let mut outcomes = Vec::with_capacity(2);
        match self.aggregate_boundaries().await {
            Ok((with_all, without_excluded)) => {
                for place in [
                    descriptor(with_all, &aggregate.with_suffix),
                    descriptor(without_excluded, &aggregate.without_suffix),
                ] {
                    outcomes.push(self.pipeline.process(&place, Arc::clone(base)).await);
                    self.progress.inc(1);
                }
            }
            Err(err) => {
                for suffix in [&aggregate.with_suffix, &aggregate.without_suffix] {
                    let display_name = format!("{}{}", aggregate.name, suffix);
                    error!("Failed to process {}: {}", display_name, err);
                    outcomes.push(PlaceOutcome::failure(display_name, &err));
                    self.progress.inc(1);
                }
            }
        }
        outcomes
    }

    /// Union of all regions, and of all regions but the excluded one
    async fn aggregate_boundaries(&self) -> Result<(Boundary, Boundary), PipelineError> {
        let regions = self
            .pipeline
            .geocoder()
            .geocode_all(&self.catalog.regions)
            .await?;
        let kept: Vec<bool> = self
            .catalog
            .regions
            .iter()
            .map(|name| !self.catalog.is_excluded_region(name))
            .collect();

        tokio::task::spawn_blocking(move || {
            let with_all = union_all(&regions)?;
            let without_excluded = union_all(
                regions
                    .iter()
                    .zip(&kept)
                    .filter(|(_, keep)| **keep)
                    .map(|(boundary, _)| boundary),
            )?;
            Ok::<_, GeocodeError>((with_all, without_excluded))
        })
        .await
        .map_err(|e| PipelineError::TaskFailed(e.to_string()))?
        .map_err(PipelineError::from)
    }

    async fn process_places(
        &self,
        places: &[PlaceDescriptor],
        base: &Arc<RgbaImage>,
    ) -> Vec<PlaceOutcome> {
        stream::iter(places)
            .map(|place| {
                let base = Arc::clone(base);
                async move {
                    let outcome = self.pipeline.process(place, base).await;
                    self.progress.inc(1);
                    outcome
                }
            })
            .buffered(self.options.jobs.max(1))
            .collect()
            .await
    }
}
