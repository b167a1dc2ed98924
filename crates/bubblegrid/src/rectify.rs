//! Perspective rectification of a capture into canonical sheet space.

use image::{GrayImage, Luma};
use nalgebra::Matrix3;

use crate::homography::{homography_from_quad, project, reprojection_error, HomographyError};
use crate::layout::LayoutConfig;
use crate::marker::CornerMarkerSet;

/// Resampling options.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RectifyConfig {
    /// Gray value for canonical pixels that map outside the capture.
    pub border_value: u8,
}

impl Default for RectifyConfig {
    fn default() -> Self {
        Self { border_value: 255 }
    }
}

/// Capture resampled to the layout's canonical size.
#[derive(Debug, Clone)]
pub struct RectifiedImage {
    pub gray: GrayImage,
    /// Maps canonical sheet pixels to capture pixels.
    pub canonical_to_source: Matrix3<f64>,
}

impl RectifiedImage {
    pub fn width(&self) -> u32 {
        self.gray.width()
    }

    pub fn height(&self) -> u32 {
        self.gray.height()
    }
}

/// Sample a gray image at a sub-pixel position with bilinear interpolation.
///
/// Returns the interpolated value in `[0, 255]`, or `None` outside the image.
#[inline]
pub fn bilinear_sample(img: &GrayImage, x: f64, y: f64) -> Option<f64> {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 || !x.is_finite() || !y.is_finite() {
        return None;
    }
    let (max_x, max_y) = ((w - 1) as f64, (h - 1) as f64);
    if x < 0.0 || y < 0.0 || x > max_x || y > max_y {
        return None;
    }
    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = (x0 + 1).min(w - 1);
    let y1 = (y0 + 1).min(h - 1);
    let fx = x - x0 as f64;
    let fy = y - y0 as f64;
    let p00 = img.get_pixel(x0, y0)[0] as f64;
    let p10 = img.get_pixel(x1, y0)[0] as f64;
    let p01 = img.get_pixel(x0, y1)[0] as f64;
    let p11 = img.get_pixel(x1, y1)[0] as f64;
    Some(
        (1.0 - fx) * (1.0 - fy) * p00
            + fx * (1.0 - fy) * p10
            + (1.0 - fx) * fy * p01
            + fx * fy * p11,
    )
}

/// Warp `gray` so the marker centers land on the layout's marker targets.
pub fn rectify(
    gray: &GrayImage,
    markers: &CornerMarkerSet,
    layout: &LayoutConfig,
    config: &RectifyConfig,
) -> Result<RectifiedImage, HomographyError> {
    let targets = layout.marker_targets();
    let sources = markers.clockwise();
    let h = homography_from_quad(&targets, &sources)?;
    let max_err = targets
        .iter()
        .zip(&sources)
        .map(|(t, s)| reprojection_error(&h, t, s))
        .fold(0.0f64, f64::max);
    let out = warp_to_canonical(gray, &h, layout.width, layout.height, config.border_value);
    tracing::debug!(
        "rectified {}x{} capture to {}x{} (marker reprojection {:.2e} px)",
        gray.width(),
        gray.height(),
        layout.width,
        layout.height,
        max_err
    );
    Ok(RectifiedImage {
        gray: out,
        canonical_to_source: h,
    })
}

/// Inverse warp: every canonical pixel is sampled from its source position.
pub fn warp_to_canonical(
    gray: &GrayImage,
    canonical_to_source: &Matrix3<f64>,
    width: u32,
    height: u32,
    border_value: u8,
) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| {
        let [sx, sy] = project(canonical_to_source, x as f64, y as f64);
        let v = bilinear_sample(gray, sx, sy)
            .map_or(border_value, |v| v.round().clamp(0.0, 255.0) as u8);
        Luma([v])
    })
}
