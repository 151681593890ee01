//! Analytic regular-hexagon mask.

use image::GrayImage;
use rayon::prelude::*;

use super::RasterError;

pub const HEXAGON_SIDES: usize = 6;

/// Vertices of the regular hexagon inscribed in a `width` x `height` canvas.
///
/// Circum-radius is half the shorter side, centred on the canvas. Angles are
/// `60 * i - 30` degrees in canvas coordinates, which puts a vertex at the top.
pub fn hexagon_vertices(width: u32, height: u32) -> [(f64, f64); HEXAGON_SIDES] {
    let radius = width.min(height) as f64 / 2.0;
    let (cx, cy) = (width as f64 / 2.0, height as f64 / 2.0);

    std::array::from_fn(|i| {
        let angle = (60.0 * i as f64 - 30.0).to_radians();
        (cx + radius * angle.cos(), cy + radius * angle.sin())
    })
}

/// Single-channel mask with 255 inside the hexagon and 0 elsewhere.
///
/// A pixel is inside when its centre lies in the hexagon or on its edge.
pub fn hexagon_mask(width: u32, height: u32) -> Result<GrayImage, RasterError> {
    if width == 0 || height == 0 {
        return Err(RasterError::EmptyCanvas { width, height });
    }

    let vertices = hexagon_vertices(width, height);
    let mut buf = vec![0u8; width as usize * height as usize];

    buf.par_chunks_mut(width as usize)
        .enumerate()
        .for_each(|(y, row)| {
            let py = y as f64 + 0.5;
            for (x, value) in row.iter_mut().enumerate() {
                if contains(&vertices, (x as f64 + 0.5, py)) {
                    *value = 255;
                }
            }
        });

    GrayImage::from_raw(width, height, buf).ok_or(RasterError::EmptyCanvas { width, height })
}

/// Point-in-convex-polygon: every edge sees the point on the same side
fn contains(vertices: &[(f64, f64); HEXAGON_SIDES], p: (f64, f64)) -> bool {
    const EPS: f64 = 1e-9;
    let mut positive = false;
    let mut negative = false;

    for i in 0..HEXAGON_SIDES {
        let a = vertices[i];
        let b = vertices[(i + 1) % HEXAGON_SIDES];
        let cross = (b.0 - a.0) * (p.1 - a.1) - (b.1 - a.1) * (p.0 - a.0);
        if cross > EPS {
            positive = true;
        } else if cross < -EPS {
            negative = true;
        }
        if positive && negative {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_six_vertices_on_circumcircle() {
        let vertices = hexagon_vertices(900, 900);
        assert_eq!(vertices.len(), 6);
        for (x, y) in vertices {
            let r = ((x - 450.0).powi(2) + (y - 450.0).powi(2)).sqrt();
            assert!((r - 450.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_vertex_points_up() {
        let vertices = hexagon_vertices(100, 100);
        // i = 4 -> 210 degrees, i = 5 -> 270 degrees (top in canvas coordinates)
        let (x, y) = vertices[5];
        assert!((x - 50.0).abs() < 1e-9);
        assert!(y.abs() < 1e-9);
    }

    #[test]
    fn test_center_is_covered() {
        for side in [1u32, 2, 3, 10, 99, 900, 901] {
            let mask = hexagon_mask(side, side).unwrap();
            assert_eq!(mask.get_pixel(side / 2, side / 2).0[0], 255, "side {}", side);
        }
    }

    #[test]
    fn test_corners_are_empty() {
        let mask = hexagon_mask(100, 100).unwrap();
        assert_eq!(mask.get_pixel(0, 0).0[0], 0);
        assert_eq!(mask.get_pixel(99, 0).0[0], 0);
        assert_eq!(mask.get_pixel(0, 99).0[0], 0);
        assert_eq!(mask.get_pixel(99, 99).0[0], 0);
    }

    #[test]
    fn test_area_matches_regular_hexagon() {
        let mask = hexagon_mask(200, 200).unwrap();
        let covered = mask.pixels().filter(|p| p.0[0] == 255).count() as f64;
        let expected = 3.0 * 3f64.sqrt() / 2.0 * 100.0 * 100.0;
        assert!((covered - expected).abs() / expected < 0.02, "covered {}", covered);
    }

    #[test]
    fn test_binary_values() {
        let mask = hexagon_mask(64, 64).unwrap();
        assert!(mask.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
    }

    #[test]
    fn test_wide_canvas_uses_shorter_side() {
        let mask = hexagon_mask(200, 100).unwrap();
        assert_eq!(mask.get_pixel(100, 50).0[0], 255);
        assert_eq!(mask.get_pixel(10, 50).0[0], 0);
        assert_eq!(mask.get_pixel(190, 50).0[0], 0);
    }

    #[test]
    fn test_zero_size_is_rejected() {
        assert!(hexagon_mask(0, 10).is_err());
    }
}
