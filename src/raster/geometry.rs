//! Boundary rasterization into an alpha mask.

use geo::{BoundingRect, Coord, LineString, Polygon};
use image::GrayImage;
use serde::{Deserialize, Serialize};
use tiny_skia::{Color, FillRule, Paint, PathBuilder, Pixmap, Shader, Transform};
use tracing::debug;

use super::projection::{to_planar, Projection};
use super::RasterError;
use crate::models::Boundary;

/// Rasterization settings for boundary masks.
///
/// The mask's longer side is `size_inches * dpi` pixels; the other side
/// follows the outline's aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RasterSettings {
    pub size_inches: f64,
    pub dpi: u32,
    pub projection: Projection,
}

impl Default for RasterSettings {
    fn default() -> Self {
        Self {
            size_inches: 5.0,
            dpi: 300,
            projection: Projection::WebMercator,
        }
    }
}

impl RasterSettings {
    /// Length of the mask's longer side in pixels
    pub fn pixels(&self) -> u32 {
        (self.size_inches * self.dpi as f64).round().max(1.0) as u32
    }
}

/// Renders boundaries as solid silhouettes.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeometryRasterizer {
    settings: RasterSettings,
}

impl GeometryRasterizer {
    pub fn new(settings: RasterSettings) -> Self {
        Self { settings }
    }

    /// Rasterize a boundary into a mask cropped tightly to its extent.
    ///
    /// Every part of a multipolygon is drawn at its true position, so
    /// island groups keep their relative layout. Interior rings stay empty.
    pub fn rasterize(&self, boundary: &Boundary) -> Result<GrayImage, RasterError> {
        if boundary.is_empty() {
            return Err(RasterError::EmptyGeometry);
        }

        let planar = to_planar(boundary, self.settings.projection)?;
        let rect = planar.bounding_rect().ok_or(RasterError::EmptyGeometry)?;
        let (extent_w, extent_h) = (rect.width(), rect.height());
        if !(extent_w > 0.0 && extent_h > 0.0 && extent_w.is_finite() && extent_h.is_finite()) {
            return Err(RasterError::EmptyGeometry);
        }

        let scale = self.settings.pixels() as f64 / extent_w.max(extent_h);
        let width = span_px(extent_w * scale);
        let height = span_px(extent_h * scale);

        let mut pixmap =
            Pixmap::new(width, height).ok_or(RasterError::EmptyCanvas { width, height })?;

        let origin = Coord {
            x: rect.min().x,
            y: rect.max().y,
        };
        // y grows downwards on the canvas
        let to_px = |c: &Coord<f64>| {
            (
                ((c.x - origin.x) * scale) as f32,
                ((origin.y - c.y) * scale) as f32,
            )
        };

        let paint = Paint {
            shader: Shader::SolidColor(Color::BLACK),
            anti_alias: true,
            ..Default::default()
        };

        let mut drawn = 0;
        for polygon in &planar.0 {
            // One fill per part: even-odd only applies to a polygon's own holes
            if let Some(path) = polygon_path(polygon, &to_px) {
                pixmap.fill_path(&path, &paint, FillRule::EvenOdd, Transform::identity(), None);
                drawn += 1;
            }
        }

        let alpha: Vec<u8> = pixmap.pixels().iter().map(|p| p.alpha()).collect();
        let mask = GrayImage::from_raw(width, height, alpha)
            .ok_or(RasterError::EmptyCanvas { width, height })?;

        if mask.pixels().all(|p| p.0[0] == 0) {
            return Err(RasterError::EmptyGeometry);
        }

        debug!(
            "Rasterized {} of {} parts into {}x{} mask",
            drawn,
            planar.0.len(),
            width,
            height
        );

        Ok(mask)
    }
}

/// Pixel span of a scaled extent, tolerant to float noise on exact sides
fn span_px(length: f64) -> u32 {
    (length - 1e-6).ceil().max(1.0) as u32
}

fn polygon_path<F>(polygon: &Polygon<f64>, to_px: &F) -> Option<tiny_skia::Path>
where
    F: Fn(&Coord<f64>) -> (f32, f32),
{
    let mut builder = PathBuilder::new();
    push_ring(&mut builder, polygon.exterior(), to_px);
    for interior in polygon.interiors() {
        push_ring(&mut builder, interior, to_px);
    }
    builder.finish()
}

fn push_ring<F>(builder: &mut PathBuilder, ring: &LineString<f64>, to_px: &F)
where
    F: Fn(&Coord<f64>) -> (f32, f32),
{
    let mut coords = ring.coords();
    let Some(first) = coords.next() else {
        return;
    };
    let (x, y) = to_px(first);
    builder.move_to(x, y);
    for c in coords {
        let (x, y) = to_px(c);
        builder.line_to(x, y);
    }
    builder.close();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Crs;
    use geo::{polygon, MultiPolygon};

    fn rasterizer(pixels: u32) -> GeometryRasterizer {
        GeometryRasterizer::new(RasterSettings {
            size_inches: 1.0,
            dpi: pixels,
            projection: Projection::WebMercator,
        })
    }

    fn square(x0: f64, y0: f64, side: f64) -> Polygon<f64> {
        polygon![
            (x: x0, y: y0),
            (x: x0 + side, y: y0),
            (x: x0 + side, y: y0 + side),
            (x: x0, y: y0 + side),
        ]
    }

    #[test]
    fn test_default_resolution() {
        assert_eq!(RasterSettings::default().pixels(), 1500);
    }

    #[test]
    fn test_square_fills_canvas() {
        let boundary = Boundary::from_polygon(square(0.0, 0.0, 10.0), Crs::Planar);
        let mask = rasterizer(100).rasterize(&boundary).unwrap();

        assert_eq!(mask.dimensions(), (100, 100));
        assert_eq!(mask.get_pixel(50, 50).0[0], 255);
        assert_eq!(mask.get_pixel(1, 1).0[0], 255);
        assert_eq!(mask.get_pixel(98, 98).0[0], 255);
    }

    #[test]
    fn test_tight_crop_keeps_aspect() {
        let rect = polygon![(x: 100.0, y: 100.0), (x: 120.0, y: 100.0), (x: 120.0, y: 110.0), (x: 100.0, y: 110.0)];
        let boundary = Boundary::from_polygon(rect, Crs::Planar);
        let mask = rasterizer(100).rasterize(&boundary).unwrap();

        assert_eq!(mask.dimensions(), (100, 50));
    }

    #[test]
    fn test_triangle_orientation() {
        // Right angle at bottom-left in map space
        let triangle = polygon![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0), (x: 0.0, y: 10.0)];
        let boundary = Boundary::from_polygon(triangle, Crs::Planar);
        let mask = rasterizer(100).rasterize(&boundary).unwrap();

        assert_eq!(mask.get_pixel(5, 94).0[0], 255);
        assert_eq!(mask.get_pixel(94, 5).0[0], 0);
    }

    #[test]
    fn test_multipart_keeps_every_island() {
        let boundary = Boundary::new(
            MultiPolygon::new(vec![square(0.0, 0.0, 10.0), square(30.0, 0.0, 10.0)]),
            Crs::Planar,
        );
        let mask = rasterizer(100).rasterize(&boundary).unwrap();

        assert_eq!(mask.dimensions(), (100, 25));
        assert_eq!(mask.get_pixel(10, 12).0[0], 255);
        assert_eq!(mask.get_pixel(50, 12).0[0], 0);
        assert_eq!(mask.get_pixel(90, 12).0[0], 255);
    }

    #[test]
    fn test_holes_stay_empty() {
        let outer = square(0.0, 0.0, 10.0).exterior().clone();
        let hole = square(4.0, 4.0, 2.0).exterior().clone();
        let boundary = Boundary::from_polygon(Polygon::new(outer, vec![hole]), Crs::Planar);
        let mask = rasterizer(100).rasterize(&boundary).unwrap();

        assert_eq!(mask.get_pixel(50, 50).0[0], 0);
        assert_eq!(mask.get_pixel(10, 10).0[0], 255);
    }

    #[test]
    fn test_geographic_boundary_is_projected() {
        let boundary = Boundary::from_polygon(square(1.0, 45.0, 1.0), Crs::Geographic);
        let mask = rasterizer(200).rasterize(&boundary).unwrap();

        // A degree of latitude is longer than a degree of longitude at 45N
        let (w, h) = mask.dimensions();
        assert_eq!(h, 200);
        assert!(w < 160 && w > 120, "width {}", w);
    }

    #[test]
    fn test_empty_geometry_errors() {
        let boundary = Boundary::new(MultiPolygon::new(vec![]), Crs::Planar);
        assert!(matches!(
            rasterizer(100).rasterize(&boundary),
            Err(RasterError::EmptyGeometry)
        ));

        let flat = polygon![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0), (x: 5.0, y: 0.0)];
        let boundary = Boundary::from_polygon(flat, Crs::Planar);
        assert!(matches!(
            rasterizer(100).rasterize(&boundary),
            Err(RasterError::EmptyGeometry)
        ));
    }

    #[test]
    fn test_missing_reference_errors() {
        let mut boundary = Boundary::from_polygon(square(0.0, 0.0, 1.0), Crs::Geographic);
        boundary.crs = None;
        assert!(matches!(
            rasterizer(100).rasterize(&boundary),
            Err(RasterError::UndefinedProjection(_))
        ));
    }
}
