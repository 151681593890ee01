//! Emblem production: per-place pipeline and the batch driver around it.

pub mod assets;
pub mod batch;
pub mod error;
pub mod place;
pub mod report;

pub use assets::{AssetSettings, AssetStore, InternalAsset};
pub use batch::{BatchDriver, BatchOptions};
pub use error::PipelineError;
pub use place::{OutcomeStatus, PlaceOutcome, PlacePipeline};
pub use report::BatchReport;
