//! Image assets read from the input directory.

use std::path::{Path, PathBuf};

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::PipelineError;
use crate::raster::square_fit;

/// File names of the shared assets, relative to the input directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetSettings {
    pub base: String,
    pub middle: String,
    pub internal_default: String,
}

impl Default for AssetSettings {
    fn default() -> Self {
        Self {
            base: "fond_exterieur.png".to_string(),
            middle: "fond.png".to_string(),
            internal_default: "interieur.png".to_string(),
        }
    }
}

/// Which texture fills a place's silhouette
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "path", rename_all = "snake_case")]
pub enum InternalAsset {
    /// `<key>.png` made for this place
    Specific(PathBuf),
    /// Shared fallback texture
    Default(PathBuf),
}

impl InternalAsset {
    pub fn path(&self) -> &Path {
        match self {
            InternalAsset::Specific(p) | InternalAsset::Default(p) => p,
        }
    }

    pub fn is_default(&self) -> bool {
        matches!(self, InternalAsset::Default(_))
    }
}

#[derive(Debug, Clone)]
pub struct AssetStore {
    input_dir: PathBuf,
    settings: AssetSettings,
}

impl AssetStore {
    pub fn new(input_dir: impl Into<PathBuf>, settings: AssetSettings) -> Self {
        Self {
            input_dir: input_dir.into(),
            settings,
        }
    }

    pub fn base_path(&self) -> PathBuf {
        self.input_dir.join(&self.settings.base)
    }

    pub fn middle_path(&self) -> PathBuf {
        self.input_dir.join(&self.settings.middle)
    }

    pub fn default_internal_path(&self) -> PathBuf {
        self.input_dir.join(&self.settings.internal_default)
    }

    /// Asset key of a place: its name cut at the first underscore
    pub fn internal_key(name: &str) -> &str {
        name.split_once('_').map_or(name, |(key, _)| key)
    }

    /// Pick the place's own texture, or the shared default with a warning.
    pub fn resolve_internal(&self, name: &str) -> Result<InternalAsset, PipelineError> {
        let specific = self
            .input_dir
            .join(format!("{}.png", Self::internal_key(name)));
        if specific.is_file() {
            debug!("Using internal asset {}", specific.display());
            return Ok(InternalAsset::Specific(specific));
        }

        let default = self.default_internal_path();
        if default.is_file() {
            warn!(
                "No internal asset {} for {}, using {}",
                specific.display(),
                name,
                default.display()
            );
            return Ok(InternalAsset::Default(default));
        }

        Err(PipelineError::MissingInternalAsset { specific, default })
    }

    /// Load the base and crop it to a square.
    pub fn load_base(&self) -> Result<RgbaImage, PipelineError> {
        let path = self.base_path();
        if !path.is_file() {
            return Err(PipelineError::MissingBaseAsset(path));
        }
        let image = load_rgba(&path)?;
        Ok(square_fit(&image)?)
    }

    /// Path of the middle texture, checked to exist
    pub fn require_middle(&self) -> Result<PathBuf, PipelineError> {
        let path = self.middle_path();
        if !path.is_file() {
            return Err(PipelineError::MissingMiddleAsset(path));
        }
        Ok(path)
    }
}

/// Decode any supported image file as RGBA
pub fn load_rgba(path: &Path) -> Result<RgbaImage, PipelineError> {
    let image = image::open(path).map_err(|source| PipelineError::ImageDecode {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(image.to_rgba8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn write_png(dir: &Path, name: &str, width: u32, height: u32) {
        RgbaImage::from_pixel(width, height, Rgba([1, 2, 3, 255]))
            .save(dir.join(name))
            .unwrap();
    }

    #[test]
    fn test_internal_key() {
        assert_eq!(AssetStore::internal_key("Lot"), "Lot");
        assert_eq!(AssetStore::internal_key("France_avec_corse"), "France");
        assert_eq!(AssetStore::internal_key("_x"), "");
    }

    #[test]
    fn test_resolve_specific_then_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = AssetStore::new(dir.path(), AssetSettings::default());

        assert!(matches!(
            store.resolve_internal("Lot"),
            Err(PipelineError::MissingInternalAsset { .. })
        ));

        write_png(dir.path(), "interieur.png", 4, 4);
        let asset = store.resolve_internal("Lot").unwrap();
        assert!(asset.is_default());
        assert_eq!(asset.path(), dir.path().join("interieur.png"));

        write_png(dir.path(), "Lot.png", 4, 4);
        let asset = store.resolve_internal("Lot").unwrap();
        assert_eq!(asset, InternalAsset::Specific(dir.path().join("Lot.png")));
    }

    #[test]
    fn test_load_base_is_squared() {
        let dir = tempfile::tempdir().unwrap();
        let store = AssetStore::new(dir.path(), AssetSettings::default());

        assert!(matches!(
            store.load_base(),
            Err(PipelineError::MissingBaseAsset(_))
        ));

        write_png(dir.path(), "fond_exterieur.png", 120, 80);
        let base = store.load_base().unwrap();
        assert_eq!(base.dimensions(), (80, 80));
    }

    #[test]
    fn test_undecodable_asset() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("fond_exterieur.png"), b"not an image").unwrap();
        let store = AssetStore::new(dir.path(), AssetSettings::default());

        assert!(matches!(
            store.load_base(),
            Err(PipelineError::ImageDecode { .. })
        ));
    }

    #[test]
    fn test_custom_file_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = AssetStore::new(
            dir.path(),
            AssetSettings {
                middle: "hex.png".to_string(),
                ..Default::default()
            },
        );

        assert!(store.require_middle().is_err());
        write_png(dir.path(), "hex.png", 2, 2);
        assert_eq!(store.require_middle().unwrap(), dir.path().join("hex.png"));
    }
}
