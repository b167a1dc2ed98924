//! Capture preprocessing: contrast equalization, smoothing, adaptive binarization.
//!
//! The output mask uses 255 for ink (dark, foreground) and 0 for paper.

use image::{GrayImage, ImageBuffer, Luma};

type FloatImage = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Ink value in binary masks.
pub const INK: u8 = 255;

/// Binarization parameters.
///
/// No `Default`: which preset applies depends on the image and the capture
/// mode, see [`crate::ScanConfig::new`].
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PreprocessConfig {
    /// Apply global histogram equalization before smoothing.
    pub equalize: bool,
    /// Gaussian smoothing kernel size in pixels; `<= 1` disables smoothing.
    pub blur_kernel: u32,
    /// Neighborhood size of the adaptive threshold.
    pub block_size: u32,
    /// Constant subtracted from the local mean; larger values mark fewer pixels.
    pub offset: f32,
}

impl PreprocessConfig {
    /// Capture preset used for marker detection.
    pub fn capture() -> Self {
        Self {
            equalize: false,
            blur_kernel: 5,
            block_size: 11,
            offset: 2.0,
        }
    }

    /// Low-contrast capture preset: equalize, wider blur and block.
    pub fn capture_shadow() -> Self {
        Self {
            equalize: true,
            blur_kernel: 7,
            block_size: 21,
            offset: 2.0,
        }
    }

    /// Rectified student sheet preset used for bubble scoring.
    pub fn rectified(shadow_mode: bool) -> Self {
        if shadow_mode {
            Self {
                equalize: true,
                blur_kernel: 0,
                block_size: 15,
                offset: 2.0,
            }
        } else {
            Self {
                equalize: false,
                blur_kernel: 0,
                block_size: 11,
                offset: 2.0,
            }
        }
    }

    /// Rectified answer-key sheet preset; stricter offset rejects smudges.
    pub fn rectified_key(shadow_mode: bool) -> Self {
        Self {
            equalize: shadow_mode,
            blur_kernel: 0,
            block_size: if shadow_mode { 21 } else { 15 },
            offset: 4.0,
        }
    }
}

/// Gaussian sigma OpenCV derives for an unspecified-sigma kernel of size `k`.
pub fn sigma_for_kernel(k: u32) -> f32 {
    let k = k.max(1) as f32;
    0.3 * ((k - 1.0) * 0.5 - 1.0) + 0.8
}

/// Binarize a gray image: 255 where the pixel is darker than its
/// neighborhood by at least `offset`.
pub fn binarize(gray: &GrayImage, config: &PreprocessConfig) -> GrayImage {
    let (w, h) = gray.dimensions();
    if w == 0 || h == 0 {
        return GrayImage::new(w, h);
    }

    let equalized;
    let source = if config.equalize {
        equalized = imageproc::contrast::equalize_histogram(gray);
        &equalized
    } else {
        gray
    };

    let mut values = to_float(source);
    if config.blur_kernel > 1 {
        let sigma = sigma_for_kernel(config.blur_kernel);
        values = imageproc::filter::gaussian_blur_f32(&values, sigma);
    }

    let block = config.block_size.max(3) | 1;
    let mean = imageproc::filter::gaussian_blur_f32(&values, sigma_for_kernel(block));

    let mut out = GrayImage::new(w, h);
    for ((dst, v), m) in out
        .pixels_mut()
        .zip(values.pixels())
        .zip(mean.pixels())
    {
        if v[0] <= m[0] - config.offset {
            dst[0] = INK;
        }
    }
    out
}

/// Count ink pixels in a mask.
pub fn ink_count(mask: &GrayImage) -> usize {
    mask.as_raw().iter().filter(|&&v| v == INK).count()
}

fn to_float(img: &GrayImage) -> FloatImage {
    let (w, h) = img.dimensions();
    let data = img.as_raw().iter().map(|&v| v as f32).collect();
    FloatImage::from_raw(w, h, data).unwrap_or_else(|| FloatImage::new(w, h))
}
