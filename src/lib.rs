//! Blason - hexagonal emblem generator for French administrative areas
//!
//! This library provides the geocoding, rasterization and compositing modules
//! used by the `generate` binary.

pub mod config;
pub mod geocode;
pub mod models;
pub mod pipeline;
pub mod raster;

pub use models::{Boundary, Catalog, PlaceDescriptor};
pub use pipeline::{BatchDriver, BatchReport, PlacePipeline};
