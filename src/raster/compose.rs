//! Layer compositing.
//!
//! The emblem is three nested layers: the square base, a hexagon cut from the
//! middle texture, and the internal texture cut to the boundary silhouette.
//! Pastes blend every channel, alpha included, the way PIL's masked paste does.

use image::{GrayImage, RgbaImage};
use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

use super::fit::{rect_fit, resample_mask};
use super::hexagon::hexagon_mask;
use super::RasterError;

/// Hexagon side relative to the base side
const HEX_RATIO: (u32, u32) = (9, 10);
/// Silhouette box side relative to the hexagon side
const GEO_RATIO: (u32, u32) = (7, 10);

/// Sizes and offsets of one composition
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Layout {
    pub base_side: u32,
    pub hex_side: u32,
    /// Side of the box the silhouette must fit in
    pub geo_max: u32,
    /// Uniform scale applied to the boundary mask
    pub scale: f64,
    pub map_width: u32,
    pub map_height: u32,
    /// Map layer position inside the hexagon layer
    pub map_offset: (u32, u32),
    /// Hexagon layer position on the base
    pub hex_offset: (u32, u32),
}

impl Layout {
    /// Compute the layout for a square base and a boundary mask of the given size.
    ///
    /// The limiting axis of the mask lands exactly on `geo_max`; the other
    /// one is floored, so integer sizes never drift past the box.
    pub fn compute(base_side: u32, mask_width: u32, mask_height: u32) -> Result<Self, RasterError> {
        if mask_width == 0 || mask_height == 0 {
            return Err(RasterError::EmptyCanvas {
                width: mask_width,
                height: mask_height,
            });
        }

        let hex_side = base_side * HEX_RATIO.0 / HEX_RATIO.1;
        let geo_max = hex_side * GEO_RATIO.0 / GEO_RATIO.1;
        if geo_max == 0 {
            return Err(RasterError::EmptyCanvas {
                width: base_side,
                height: base_side,
            });
        }

        let scale = f64::min(
            geo_max as f64 / mask_width as f64,
            geo_max as f64 / mask_height as f64,
        );

        let (map_width, map_height) = if mask_width >= mask_height {
            (geo_max, floor_ratio(mask_height, geo_max, mask_width))
        } else {
            (floor_ratio(mask_width, geo_max, mask_height), geo_max)
        };

        Ok(Self {
            base_side,
            hex_side,
            geo_max,
            scale,
            map_width,
            map_height,
            map_offset: ((hex_side - map_width) / 2, (hex_side - map_height) / 2),
            hex_offset: ((base_side - hex_side) / 2, (base_side - hex_side) / 2),
        })
    }
}

/// `floor(value * num / den)`, at least 1
fn floor_ratio(value: u32, num: u32, den: u32) -> u32 {
    ((value as u64 * num as u64) / den as u64).max(1) as u32
}

/// Final emblem and the layout that produced it.
#[derive(Debug, Clone)]
pub struct Composition {
    pub image: RgbaImage,
    pub layout: Layout,
}

/// Build the emblem from a square base, the two textures and a boundary mask.
pub fn compose(
    base: &RgbaImage,
    middle: &RgbaImage,
    internal: &RgbaImage,
    geo_mask: &GrayImage,
) -> Result<Composition, RasterError> {
    let (width, height) = base.dimensions();
    if width != height {
        return Err(RasterError::NonSquareBase { width, height });
    }

    let layout = Layout::compute(width, geo_mask.width(), geo_mask.height())?;
    let map_layer = build_map_layer(internal, geo_mask, &layout)?;
    let hex_layer = build_hex_layer(middle, &map_layer, &layout)?;

    let mut image = base.clone();
    paste_with_own_alpha(&mut image, &hex_layer, layout.hex_offset);

    debug!(
        "Composed {}px emblem: hexagon {}px, map {}x{} (scale {:.3})",
        layout.base_side, layout.hex_side, layout.map_width, layout.map_height, layout.scale
    );

    Ok(Composition { image, layout })
}

/// Internal texture cut to the resized boundary mask
pub fn build_map_layer(
    internal: &RgbaImage,
    geo_mask: &GrayImage,
    layout: &Layout,
) -> Result<RgbaImage, RasterError> {
    let mask = resample_mask(geo_mask, layout.map_width, layout.map_height)?;
    let texture = rect_fit(internal, layout.map_width, layout.map_height)?;

    let mut layer = RgbaImage::new(layout.map_width, layout.map_height);
    paste_with_mask(&mut layer, &texture, &mask, (0, 0))?;
    Ok(layer)
}

/// Middle texture cut to the hexagon, with the map layer centred on top.
///
/// The result never has more alpha than the hexagon mask, even where the
/// map layer's resampled edges reach outside it.
pub fn build_hex_layer(
    middle: &RgbaImage,
    map_layer: &RgbaImage,
    layout: &Layout,
) -> Result<RgbaImage, RasterError> {
    let side = layout.hex_side;
    let mask = hexagon_mask(side, side)?;
    let texture = rect_fit(middle, side, side)?;

    let mut layer = RgbaImage::new(side, side);
    paste_with_mask(&mut layer, &texture, &mask, (0, 0))?;
    paste_with_own_alpha(&mut layer, map_layer, layout.map_offset);
    intersect_alpha(&mut layer, &mask)?;
    Ok(layer)
}

/// Paste `src` at `offset` through a separate mask of the same size as `src`.
pub fn paste_with_mask(
    dst: &mut RgbaImage,
    src: &RgbaImage,
    mask: &GrayImage,
    offset: (u32, u32),
) -> Result<(), RasterError> {
    if src.dimensions() != mask.dimensions() {
        return Err(RasterError::MaskMismatch {
            width: src.width(),
            height: src.height(),
            mask_width: mask.width(),
            mask_height: mask.height(),
        });
    }
    paste_by(dst, src, offset, |x, y| mask.get_pixel(x, y).0[0]);
    Ok(())
}

/// Paste `src` at `offset` using its own alpha channel as the mask
pub fn paste_with_own_alpha(dst: &mut RgbaImage, src: &RgbaImage, offset: (u32, u32)) {
    paste_by(dst, src, offset, |x, y| src.get_pixel(x, y).0[3]);
}

fn paste_by<F>(dst: &mut RgbaImage, src: &RgbaImage, offset: (u32, u32), mask_at: F)
where
    F: Fn(u32, u32) -> u8,
{
    let (ox, oy) = offset;
    let (dst_w, dst_h) = dst.dimensions();
    if ox >= dst_w || oy >= dst_h {
        return;
    }
    let w = src.width().min(dst_w - ox);
    let h = src.height().min(dst_h - oy);

    for y in 0..h {
        for x in 0..w {
            let m = mask_at(x, y);
            if m == 0 {
                continue;
            }
            let s = src.get_pixel(x, y).0;
            let d = dst.get_pixel_mut(ox + x, oy + y);
            for c in 0..4 {
                d.0[c] = blend(s[c], d.0[c], m);
            }
        }
    }
}

/// `(src * m + dst * (255 - m)) / 255`, rounded
#[inline]
fn blend(src: u8, dst: u8, m: u8) -> u8 {
    let m = m as u32;
    let t = src as u32 * m + dst as u32 * (255 - m) + 128;
    ((t + (t >> 8)) >> 8) as u8
}

/// Clamp the layer's alpha to the mask: `alpha = min(alpha, mask)`.
///
/// Applying it twice leaves the layer unchanged.
pub fn intersect_alpha(layer: &mut RgbaImage, mask: &GrayImage) -> Result<(), RasterError> {
    if layer.dimensions() != mask.dimensions() {
        return Err(RasterError::MaskMismatch {
            width: layer.width(),
            height: layer.height(),
            mask_width: mask.width(),
            mask_height: mask.height(),
        });
    }

    let raw: &mut [u8] = layer;
    raw.par_chunks_exact_mut(4)
        .zip(mask.as_raw().par_iter())
        .for_each(|(px, &m)| px[3] = px[3].min(m));
    Ok(())
}
