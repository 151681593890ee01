//! Boundary geometry with its coordinate reference.

use geo::{BoundingRect, MultiPolygon, Polygon};

/// Coordinate reference a boundary's coordinates are expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crs {
    /// WGS84 longitude/latitude in degrees (EPSG:4326)
    Geographic,
    /// Spherical Web Mercator in metres (EPSG:3857)
    WebMercator,
    /// Any other projected reference with linear units
    Planar,
}

/// A (multi)polygon outline of an administrative area or territory.
///
/// `crs` is `None` when the source did not say what the coordinates are;
/// such a boundary cannot be reprojected and is rejected by the rasterizer.
#[derive(Debug, Clone, PartialEq)]
pub struct Boundary {
    pub geometry: MultiPolygon<f64>,
    pub crs: Option<Crs>,
}

impl Boundary {
    pub fn new(geometry: MultiPolygon<f64>, crs: Crs) -> Self {
        Self {
            geometry,
            crs: Some(crs),
        }
    }

    /// Boundary in WGS84 degrees, as returned by geocoders
    pub fn geographic(geometry: MultiPolygon<f64>) -> Self {
        Self::new(geometry, Crs::Geographic)
    }

    pub fn from_polygon(polygon: Polygon<f64>, crs: Crs) -> Self {
        Self::new(MultiPolygon::new(vec![polygon]), crs)
    }

    /// Get the bounding box of this boundary
    pub fn bbox(&self) -> Option<(f64, f64, f64, f64)> {
        self.geometry
            .bounding_rect()
            .map(|rect| (rect.min().x, rect.min().y, rect.max().x, rect.max().y))
    }

    /// Number of disjoint parts (islands, exclaves)
    pub fn part_count(&self) -> usize {
        self.geometry.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.geometry.0.is_empty()
    }
}
