//! Reprojection of geographic outlines onto a plane before rasterization.
//!
//! Plotting raw longitude/latitude squashes shapes north-south, so degree
//! coordinates are always projected first.

use std::f64::consts::PI;

use geo::{Coord, MapCoords, MultiPolygon};
use serde::{Deserialize, Serialize};

use super::RasterError;
use crate::models::{Boundary, Crs};

/// Spherical radius used by EPSG:3857
const EARTH_RADIUS: f64 = 6_378_137.0;

/// Latitude limit of the Web Mercator square
pub const MAX_MERCATOR_LAT: f64 = 85.051_128_779_806_59;

/// Planar projection applied to geographic boundaries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Projection {
    /// Spherical Web Mercator (EPSG:3857), conformal
    #[default]
    WebMercator,
    /// Spherical Lambert azimuthal equal-area, centred on the outline
    EqualArea,
}

/// Project a boundary to planar coordinates.
///
/// Planar boundaries pass through untouched.
pub fn to_planar(
    boundary: &Boundary,
    projection: Projection,
) -> Result<MultiPolygon<f64>, RasterError> {
    let crs = boundary.crs.ok_or_else(|| {
        RasterError::UndefinedProjection("boundary has no coordinate reference".to_string())
    })?;

    match crs {
        Crs::WebMercator | Crs::Planar => Ok(boundary.geometry.clone()),
        Crs::Geographic => match projection {
            Projection::WebMercator => boundary.geometry.try_map_coords(web_mercator),
            Projection::EqualArea => {
                let (min_x, min_y, max_x, max_y) =
                    boundary.bbox().ok_or(RasterError::EmptyGeometry)?;
                let lon0 = (min_x + max_x) / 2.0;
                let lat0 = (min_y + max_y) / 2.0;
                boundary
                    .geometry
                    .try_map_coords(move |c| lambert_equal_area(c, lon0, lat0))
            }
        },
    }
}

/// EPSG:4326 degrees to EPSG:3857 metres
pub fn web_mercator(c: Coord<f64>) -> Result<Coord<f64>, RasterError> {
    check_degrees(c)?;
    if c.y.abs() > MAX_MERCATOR_LAT {
        return Err(RasterError::UndefinedProjection(format!(
            "latitude {} outside Web Mercator range",
            c.y
        )));
    }

    let y = ((90.0 + c.y) * PI / 360.0).tan().ln();
    Ok(Coord {
        x: c.x.to_radians() * EARTH_RADIUS,
        y: y * EARTH_RADIUS,
    })
}

/// Spherical Lambert azimuthal equal-area around (lon0, lat0)
pub fn lambert_equal_area(
    c: Coord<f64>,
    lon0: f64,
    lat0: f64,
) -> Result<Coord<f64>, RasterError> {
    check_degrees(c)?;

    let (phi, lambda) = (c.y.to_radians(), c.x.to_radians());
    let (phi0, lambda0) = (lat0.to_radians(), lon0.to_radians());
    let dlambda = lambda - lambda0;

    let denom = 1.0 + phi0.sin() * phi.sin() + phi0.cos() * phi.cos() * dlambda.cos();
    if denom <= f64::EPSILON {
        return Err(RasterError::UndefinedProjection(format!(
            "point ({}, {}) is antipodal to the projection centre",
            c.x, c.y
        )));
    }
    let k = (2.0 / denom).sqrt();

    Ok(Coord {
        x: EARTH_RADIUS * k * phi.cos() * dlambda.sin(),
        y: EARTH_RADIUS * k * (phi0.cos() * phi.sin() - phi0.sin() * phi.cos() * dlambda.cos()),
    })
}

fn check_degrees(c: Coord<f64>) -> Result<(), RasterError> {
    if !c.x.is_finite() || !c.y.is_finite() || c.y.abs() > 90.0 || c.x.abs() > 360.0 {
        return Err(RasterError::UndefinedProjection(format!(
            "({}, {}) is not a longitude/latitude pair",
            c.x, c.y
        )));
    }
    Ok(())
}
