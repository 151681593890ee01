//! Cover-fitting of source images: centred crop to the target aspect, then
//! Lanczos resampling. Never scales the two axes differently.

use image::imageops::{self, FilterType};
use image::{GrayImage, RgbaImage};

use super::RasterError;

/// Centred crop window `(x, y, width, height)` with the aspect of `dst`.
///
/// Follows the crop rule of PIL's `ImageOps.fit`: keep the full extent of the
/// limiting axis and trim the other one symmetrically.
pub fn cover_crop(src_w: u32, src_h: u32, dst_w: u32, dst_h: u32) -> (u32, u32, u32, u32) {
    let (sw, sh, dw, dh) = (src_w as u64, src_h as u64, dst_w as u64, dst_h as u64);

    let (crop_w, crop_h) = if sw * dh == dw * sh {
        (src_w, src_h)
    } else if sw * dh > dw * sh {
        // Source is wider than the target
        let w = ((sh * dw) as f64 / dh as f64).round() as u32;
        (w.clamp(1, src_w), src_h)
    } else {
        let h = ((sw * dh) as f64 / dw as f64).round() as u32;
        (src_w, h.clamp(1, src_h))
    };

    ((src_w - crop_w) / 2, (src_h - crop_h) / 2, crop_w, crop_h)
}

/// Crop and resample to exactly `width` x `height`, alpha included.
pub fn rect_fit(image: &RgbaImage, width: u32, height: u32) -> Result<RgbaImage, RasterError> {
    if width == 0 || height == 0 {
        return Err(RasterError::EmptyCanvas { width, height });
    }
    let (src_w, src_h) = image.dimensions();
    if src_w == 0 || src_h == 0 {
        return Err(RasterError::EmptyCanvas {
            width: src_w,
            height: src_h,
        });
    }

    let (x, y, crop_w, crop_h) = cover_crop(src_w, src_h, width, height);
    let cropped = imageops::crop_imm(image, x, y, crop_w, crop_h).to_image();

    if (crop_w, crop_h) == (width, height) {
        return Ok(cropped);
    }
    Ok(imageops::resize(&cropped, width, height, FilterType::Lanczos3))
}

/// Centred square crop on the shorter side. Square input comes back unchanged.
pub fn square_fit(image: &RgbaImage) -> Result<RgbaImage, RasterError> {
    let side = image.width().min(image.height());
    rect_fit(image, side, side)
}

/// Resample a mask to a new size. Callers keep the aspect ratio themselves.
pub fn resample_mask(mask: &GrayImage, width: u32, height: u32) -> Result<GrayImage, RasterError> {
    if width == 0 || height == 0 {
        return Err(RasterError::EmptyCanvas { width, height });
    }
    if mask.dimensions() == (width, height) {
        return Ok(mask.clone());
    }
    Ok(imageops::resize(mask, width, height, FilterType::Lanczos3))
}
