use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::geocode::NominatimSettings;
use crate::pipeline::{AssetSettings, BatchOptions};
use crate::raster::RasterSettings;

/// Run configuration, read from TOML. Every section is optional.
#[derive(Debug, Default, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    pub paths: PathsConfig,
    pub assets: AssetSettings,
    pub raster: RasterSettings,
    pub geocoder: NominatimSettings,
    pub batch: BatchOptions,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PathsConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Geocode response cache; no caching when unset
    pub cache_dir: Option<PathBuf>,
    /// Batch report JSON
    pub report: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("inputs"),
            output_dir: PathBuf::from("output"),
            cache_dir: None,
            report: None,
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }
}
