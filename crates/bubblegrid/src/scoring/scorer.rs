//! Bubble fill measurement on a binary rectified sheet.

use image::GrayImage;

use crate::layout::Question;
use crate::preprocess::INK;

/// Axis-aligned sampling window in rectified pixels, already clipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Roi {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Roi {
    /// Window around a normalized bubble box, scaled by `scale`.
    ///
    /// Size is rounded, the top-left corner is clamped at 0 and the size is
    /// clipped to the image. Returns `None` when nothing of the window is
    /// left inside the image.
    pub fn around(
        center: [f64; 2],
        size: [f64; 2],
        scale: f64,
        image_size: (u32, u32),
    ) -> Option<Self> {
        let (iw, ih) = (image_size.0 as f64, image_size.1 as f64);
        let w = (size[0] * iw * scale).round();
        let h = (size[1] * ih * scale).round();
        if !(w.is_finite() && h.is_finite()) || w <= 0.0 || h <= 0.0 {
            return None;
        }
        let x = (center[0] * iw - w / 2.0).round().max(0.0);
        let y = (center[1] * ih - h / 2.0).round().max(0.0);
        let w = w.min(iw - x);
        let h = h.min(ih - y);
        if w <= 0.0 || h <= 0.0 {
            return None;
        }
        Some(Self {
            x: x as u32,
            y: y as u32,
            width: w as u32,
            height: h as u32,
        })
    }

    /// Like [`Roi::around`] but without clipping: `None` when the window
    /// overruns the right or bottom edge.
    pub fn within(
        center: [f64; 2],
        size: [f64; 2],
        scale: f64,
        image_size: (u32, u32),
    ) -> Option<Self> {
        let roi = Self::around(center, size, scale, image_size)?;
        let w = (size[0] * image_size.0 as f64 * scale).round();
        let h = (size[1] * image_size.1 as f64 * scale).round();
        (roi.width as f64 == w && roi.height as f64 == h).then_some(roi)
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Fill ratio of one choice.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BubbleScore {
    pub option: String,
    pub fill_ratio: f64,
}

/// Fraction of ink pixels inside the inner disc of `roi`.
///
/// Disc radius is `floor(mask_ratio * min(width, height))`, centered at
/// `(floor(width / 2), floor(height / 2))`, so the printed ring of the bubble
/// stays outside the measurement.
pub fn fill_ratio_circular(binary: &GrayImage, roi: &Roi, mask_ratio: f64) -> f64 {
    let r = (roi.width.min(roi.height) as f64 * mask_ratio).floor().max(0.0) as i64;
    let cx = (roi.width / 2) as i64;
    let cy = (roi.height / 2) as i64;
    let r2 = r * r;

    let mut mask = 0u64;
    let mut ink = 0u64;
    for dy in -r..=r {
        let ly = cy + dy;
        if ly < 0 || ly >= roi.height as i64 {
            continue;
        }
        for dx in -r..=r {
            let lx = cx + dx;
            if lx < 0 || lx >= roi.width as i64 || dx * dx + dy * dy > r2 {
                continue;
            }
            mask += 1;
            let px = binary.get_pixel(roi.x + lx as u32, roi.y + ly as u32)[0];
            if px == INK {
                ink += 1;
            }
        }
    }
    if mask == 0 {
        0.0
    } else {
        ink as f64 / mask as f64
    }
}

/// Fraction of ink pixels over the whole of `roi`.
pub fn fill_ratio_rect(binary: &GrayImage, roi: &Roi) -> f64 {
    let area = roi.area();
    if area == 0 {
        return 0.0;
    }
    let mut ink = 0u64;
    for y in roi.y..roi.y + roi.height {
        for x in roi.x..roi.x + roi.width {
            if binary.get_pixel(x, y)[0] == INK {
                ink += 1;
            }
        }
    }
    ink as f64 / area as f64
}

/// Circular-mask fill score of every choice of `question`, in layout order.
pub fn score_question(
    binary: &GrayImage,
    question: &Question,
    roi_scale: f64,
    mask_ratio: f64,
) -> Vec<BubbleScore> {
    let dims = binary.dimensions();
    question
        .choices
        .iter()
        .map(|c| {
            let fill_ratio = Roi::around([c.x, c.y], [c.width, c.height], roi_scale, dims)
                .map_or(0.0, |roi| fill_ratio_circular(binary, &roi, mask_ratio));
            BubbleScore {
                option: c.option.clone(),
                fill_ratio,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn ink_block(w: u32, h: u32, x0: u32, y0: u32, x1: u32, y1: u32) -> GrayImage {
        let mut img = GrayImage::new(w, h);
        for y in y0..y1 {
            for x in x0..x1 {
                img.put_pixel(x, y, Luma([INK]));
            }
        }
        img
    }

    #[test]
    fn roi_is_scaled_rounded_and_centered() {
        let roi = Roi::around([0.5, 0.5], [0.1, 0.1], 1.0, (200, 100)).expect("roi");
        assert_eq!(roi, Roi { x: 90, y: 45, width: 20, height: 10 });

        let scaled = Roi::around([0.5, 0.5], [0.1, 0.1], 1.04, (200, 100)).expect("roi");
        assert_eq!((scaled.width, scaled.height), (21, 10));
    }

    #[test]
    fn roi_is_clipped_at_image_edges() {
        let left = Roi::around([0.0, 0.5], [0.1, 0.1], 1.0, (200, 100)).expect("roi");
        assert_eq!((left.x, left.width), (0, 20));

        let right = Roi::around([1.0, 0.5], [0.1, 0.1], 1.0, (200, 100)).expect("roi");
        assert_eq!((right.x, right.width), (190, 10));
    }

    #[test]
    fn strict_roi_rejects_right_and_bottom_overrun() {
        let inside = Roi::within([0.5, 0.5], [0.1, 0.1], 1.0, (200, 100));
        assert_eq!(inside, Roi::around([0.5, 0.5], [0.1, 0.1], 1.0, (200, 100)));
        assert!(Roi::within([1.0, 0.5], [0.1, 0.1], 1.0, (200, 100)).is_none());
        assert!(Roi::within([0.5, 0.98], [0.1, 0.1], 1.0, (200, 100)).is_none());

        // The top-left corner is still clamped at 0.
        let left = Roi::within([0.0, 0.5], [0.1, 0.1], 1.0, (200, 100)).expect("roi");
        assert_eq!((left.x, left.width), (0, 20));
    }

    #[test]
    fn roi_outside_or_empty_is_none() {
        assert!(Roi::around([0.5, 0.5], [0.001, 0.1], 1.0, (200, 100)).is_none());
        assert!(Roi::around([1.2, 0.5], [0.05, 0.1], 1.0, (200, 100)).is_none());
    }

    #[test]
    fn full_ink_scores_one_and_paper_scores_zero() {
        let roi = Roi { x: 10, y: 10, width: 20, height: 20 };
        let inked = ink_block(50, 50, 0, 0, 50, 50);
        assert_eq!(fill_ratio_circular(&inked, &roi, 0.32), 1.0);
        assert_eq!(fill_ratio_rect(&inked, &roi), 1.0);

        let paper = GrayImage::new(50, 50);
        assert_eq!(fill_ratio_circular(&paper, &roi, 0.32), 0.0);
        assert_eq!(fill_ratio_rect(&paper, &roi), 0.0);
    }

    #[test]
    fn printed_ring_is_excluded_by_inner_disc() {
        // Ink only on a 3 px frame along the ROI border.
        let mut img = GrayImage::new(40, 40);
        for y in 10..30 {
            for x in 10..30 {
                let edge = x < 13 || x >= 27 || y < 13 || y >= 27;
                if edge {
                    img.put_pixel(x, y, Luma([INK]));
                }
            }
        }
        let roi = Roi { x: 10, y: 10, width: 20, height: 20 };
        assert_eq!(fill_ratio_circular(&img, &roi, 0.32), 0.0);
        assert!(fill_ratio_rect(&img, &roi) > 0.4);
    }

    #[test]
    fn half_disc_scores_about_half() {
        let img = ink_block(40, 40, 0, 0, 20, 40);
        let roi = Roi { x: 10, y: 10, width: 20, height: 20 };
        let f = fill_ratio_circular(&img, &roi, 0.32);
        assert!(f > 0.35 && f < 0.55, "fill {}", f);
    }

    #[test]
    fn question_scores_follow_choice_order() {
        let layout = crate::test_utils::grid_layout(1, 4, 0);
        let q = &layout.questions[0];
        let (w, h) = (layout.width, layout.height);
        let mut img = GrayImage::new(w, h);
        let c = &q.choices[2];
        let (cx, cy) = (c.x * w as f64, c.y * h as f64);
        for y in 0..h {
            for x in 0..w {
                if (x as f64 - cx).abs() < 8.0 && (y as f64 - cy).abs() < 8.0 {
                    img.put_pixel(x, y, Luma([INK]));
                }
            }
        }
        let scores = score_question(&img, q, 1.04, 0.32);
        let opts: Vec<_> = scores.iter().map(|s| s.option.as_str()).collect();
        assert_eq!(opts, vec!["A", "B", "C", "D"]);
        assert_eq!(scores[2].fill_ratio, 1.0);
        assert_eq!(scores[0].fill_ratio, 0.0);
    }
}
