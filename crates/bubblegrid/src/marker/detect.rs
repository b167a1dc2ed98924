//! Corner-marker localization on a binary capture mask.
//!
//! Candidates are connected ink blobs filtered by relative area, bounding-box
//! aspect and solidity. Each image quadrant contributes the candidate closest
//! to its outer image corner.

use image::GrayImage;
use imageproc::point::Point;
use imageproc::region_labelling::{connected_components, Connectivity};

use super::{Corner, CornerMarkerSet};
use crate::preprocess::INK;

/// Candidate filters for corner markers.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct MarkerDetectConfig {
    /// Minimum blob area as a fraction of image area.
    pub min_area_fraction: f64,
    /// Maximum blob area as a fraction of image area.
    pub max_area_fraction: f64,
    /// Minimum bounding-box width/height ratio.
    pub min_aspect: f64,
    /// Maximum bounding-box width/height ratio.
    pub max_aspect: f64,
    /// Blobs must exceed this area / convex-hull area ratio.
    pub min_solidity: f64,
}

impl Default for MarkerDetectConfig {
    fn default() -> Self {
        Self {
            min_area_fraction: 0.0003,
            max_area_fraction: 0.02,
            min_aspect: 0.5,
            max_aspect: 2.0,
            min_solidity: 0.6,
        }
    }
}

/// A blob that passed all marker filters.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MarkerCandidate {
    /// Bounding-box center in image pixels.
    pub center: [f64; 2],
    /// Bounding box `[x, y, width, height]`.
    pub bbox: [u32; 4],
    /// Filled area in pixels.
    pub area: f64,
    pub solidity: f64,
}

/// Marker search failure.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkersNotFound {
    /// Quadrants without any candidate.
    pub missing: Vec<Corner>,
    /// Total number of blobs that passed the filters.
    pub n_candidates: usize,
}

impl MarkersNotFound {
    pub fn reasons(&self) -> Vec<String> {
        let mut reasons: Vec<String> = self
            .missing
            .iter()
            .map(|c| format!("no marker candidate in {} quadrant", c.name()))
            .collect();
        reasons.push(format!("{} candidate blobs in total", self.n_candidates));
        reasons
    }
}

impl std::fmt::Display for MarkersNotFound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "corner markers not found: {}", self.reasons().join(", "))
    }
}

impl std::error::Error for MarkersNotFound {}

#[derive(Debug, Clone, Copy)]
struct BlobStats {
    count: u32,
    min_x: u32,
    min_y: u32,
    max_x: u32,
    max_y: u32,
}

impl BlobStats {
    fn new(x: u32, y: u32) -> Self {
        Self {
            count: 0,
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
        }
    }

    fn add(&mut self, x: u32, y: u32) {
        self.count += 1;
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }
}

/// Enumerate every blob that passes the marker filters.
pub fn find_marker_candidates(
    binary: &GrayImage,
    config: &MarkerDetectConfig,
) -> Vec<MarkerCandidate> {
    let (w, h) = binary.dimensions();
    if w == 0 || h == 0 {
        return Vec::new();
    }
    let labels = connected_components(binary, Connectivity::Eight, image::Luma([0u8]));

    let mut stats: Vec<Option<BlobStats>> = Vec::new();
    for (x, y, l) in labels.enumerate_pixels() {
        let label = l[0] as usize;
        if label == 0 || binary.get_pixel(x, y)[0] != INK {
            continue;
        }
        if stats.len() <= label {
            stats.resize(label + 1, None);
        }
        stats[label].get_or_insert_with(|| BlobStats::new(x, y)).add(x, y);
    }

    let img_area = w as f64 * h as f64;
    let min_area = img_area * config.min_area_fraction;
    let max_area = img_area * config.max_area_fraction;

    let mut out = Vec::new();
    for (label, s) in stats.iter().enumerate() {
        let Some(s) = s else { continue };
        let bbox_area = s.width() as f64 * s.height() as f64;
        // Filled area lies between the ink count and the bbox area.
        if bbox_area < min_area || s.count as f64 > max_area {
            continue;
        }
        let aspect = s.width() as f64 / s.height() as f64;
        if aspect < config.min_aspect || aspect > config.max_aspect {
            continue;
        }

        let (area, hull_area) = filled_and_hull_area(&labels, label as u32, s);
        if area < min_area || area > max_area || hull_area <= 0.0 {
            continue;
        }
        let solidity = area / hull_area;
        if solidity <= config.min_solidity {
            continue;
        }

        out.push(MarkerCandidate {
            center: [
                s.min_x as f64 + s.width() as f64 / 2.0,
                s.min_y as f64 + s.height() as f64 / 2.0,
            ],
            bbox: [s.min_x, s.min_y, s.width(), s.height()],
            area,
            solidity,
        });
    }
    out
}

/// Row-span filled area and convex-hull area of one labelled blob.
///
/// Hull vertices are the outer pixel corners of every row span, so a solid
/// axis-aligned square of side `s` has both areas equal to `s * s`.
fn filled_and_hull_area(
    labels: &image::ImageBuffer<image::Luma<u32>, Vec<u32>>,
    label: u32,
    s: &BlobStats,
) -> (f64, f64) {
    let mut area = 0.0f64;
    let mut corners: Vec<Point<i32>> = Vec::with_capacity(4 * s.height() as usize);
    for y in s.min_y..=s.max_y {
        let mut lo: Option<u32> = None;
        let mut hi = 0u32;
        for x in s.min_x..=s.max_x {
            if labels.get_pixel(x, y)[0] == label {
                lo.get_or_insert(x);
                hi = x;
            }
        }
        let Some(lo) = lo else { continue };
        area += (hi - lo + 1) as f64;
        let (x0, x1, y0, y1) = (lo as i32, hi as i32 + 1, y as i32, y as i32 + 1);
        corners.extend_from_slice(&[
            Point::new(x0, y0),
            Point::new(x0, y1),
            Point::new(x1, y0),
            Point::new(x1, y1),
        ]);
    }
    let hull = imageproc::geometry::convex_hull(corners);
    (area, polygon_area(&hull))
}

fn polygon_area(poly: &[Point<i32>]) -> f64 {
    if poly.len() < 3 {
        return 0.0;
    }
    let mut acc = 0.0f64;
    for (i, p) in poly.iter().enumerate() {
        let q = &poly[(i + 1) % poly.len()];
        acc += p.x as f64 * q.y as f64 - q.x as f64 * p.y as f64;
    }
    acc.abs() * 0.5
}

/// Pick one candidate per quadrant: the one nearest the quadrant's image corner.
pub fn select_corner_markers(
    candidates: &[MarkerCandidate],
    width: u32,
    height: u32,
) -> Result<CornerMarkerSet, MarkersNotFound> {
    let w = width as f64;
    let h = height as f64;
    let (cx, cy) = (w / 2.0, h / 2.0);

    let mut best: [Option<([f64; 2], f64)>; 4] = [None; 4];
    for c in candidates {
        let [x, y] = c.center;
        let corner = match (x < cx, y < cy) {
            (true, true) => Corner::TopLeft,
            (false, true) => Corner::TopRight,
            (true, false) => Corner::BottomLeft,
            (false, false) => Corner::BottomRight,
        };
        let [ox, oy] = corner.image_corner(w, h);
        let d = (x - ox).hypot(y - oy);
        let slot = &mut best[corner.index()];
        if slot.map_or(true, |(_, bd)| d < bd) {
            *slot = Some((c.center, d));
        }
    }

    match best {
        [Some(tl), Some(tr), Some(bl), Some(br)] => Ok(CornerMarkerSet {
            tl: tl.0,
            tr: tr.0,
            bl: bl.0,
            br: br.0,
        }),
        _ => Err(MarkersNotFound {
            missing: Corner::ALL
                .into_iter()
                .filter(|c| best[c.index()].is_none())
                .collect(),
            n_candidates: candidates.len(),
        }),
    }
}

/// Locate the four corner markers in a binary capture mask.
pub fn detect_corner_markers(
    binary: &GrayImage,
    config: &MarkerDetectConfig,
) -> Result<CornerMarkerSet, MarkersNotFound> {
    let candidates = find_marker_candidates(binary, config);
    tracing::debug!("{} marker candidates", candidates.len());
    let (w, h) = binary.dimensions();
    select_corner_markers(&candidates, w, h)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn fill_rect(img: &mut GrayImage, x: u32, y: u32, w: u32, h: u32) {
        for yy in y..y + h {
            for xx in x..x + w {
                img.put_pixel(xx, yy, Luma([INK]));
            }
        }
    }

    fn outline_rect(img: &mut GrayImage, x: u32, y: u32, w: u32, h: u32, t: u32) {
        fill_rect(img, x, y, w, t);
        fill_rect(img, x, y + h - t, w, t);
        fill_rect(img, x, y, t, h);
        fill_rect(img, x + w - t, y, t, h);
    }

    fn four_square_mask() -> GrayImage {
        let mut img = GrayImage::new(400, 300);
        fill_rect(&mut img, 10, 10, 20, 20);
        fill_rect(&mut img, 370, 10, 20, 20);
        fill_rect(&mut img, 10, 270, 20, 20);
        fill_rect(&mut img, 370, 270, 20, 20);
        img
    }

    #[test]
    fn solid_squares_are_found_in_each_corner() {
        let img = four_square_mask();
        let set = detect_corner_markers(&img, &MarkerDetectConfig::default()).expect("markers");
        assert_eq!(set.tl, [20.0, 20.0]);
        assert_eq!(set.tr, [380.0, 20.0]);
        assert_eq!(set.bl, [20.0, 280.0]);
        assert_eq!(set.br, [380.0, 280.0]);
    }

    #[test]
    fn hollow_square_keeps_full_solidity() {
        let mut img = GrayImage::new(400, 300);
        outline_rect(&mut img, 50, 50, 24, 24, 3);
        let cands = find_marker_candidates(&img, &MarkerDetectConfig::default());
        assert_eq!(cands.len(), 1);
        assert!((cands[0].area - 576.0).abs() < 1e-9);
        assert!((cands[0].solidity - 1.0).abs() < 1e-9);
    }

    #[test]
    fn speckles_and_lines_are_rejected() {
        let mut img = GrayImage::new(400, 300);
        fill_rect(&mut img, 100, 100, 2, 2);
        fill_rect(&mut img, 150, 150, 80, 6);
        let cands = find_marker_candidates(&img, &MarkerDetectConfig::default());
        assert!(cands.is_empty());
    }

    #[test]
    fn oversized_blob_is_rejected() {
        let mut img = GrayImage::new(400, 300);
        fill_rect(&mut img, 100, 100, 80, 80);
        assert!(find_marker_candidates(&img, &MarkerDetectConfig::default()).is_empty());
    }

    #[test]
    fn l_shape_fails_solidity() {
        let mut img = GrayImage::new(400, 300);
        fill_rect(&mut img, 100, 100, 30, 4);
        fill_rect(&mut img, 100, 100, 4, 30);
        assert!(find_marker_candidates(&img, &MarkerDetectConfig::default()).is_empty());
    }

    #[test]
    fn nearest_to_corner_wins_within_quadrant() {
        let mut img = four_square_mask();
        fill_rect(&mut img, 60, 60, 20, 20);
        let set = detect_corner_markers(&img, &MarkerDetectConfig::default()).expect("markers");
        assert_eq!(set.tl, [20.0, 20.0]);
    }

    #[test]
    fn missing_quadrant_is_reported() {
        let mut img = GrayImage::new(400, 300);
        fill_rect(&mut img, 10, 10, 20, 20);
        fill_rect(&mut img, 370, 10, 20, 20);
        fill_rect(&mut img, 10, 270, 20, 20);
        let err = detect_corner_markers(&img, &MarkerDetectConfig::default()).expect_err("missing");
        assert_eq!(err.missing, vec![Corner::BottomRight]);
        assert_eq!(err.n_candidates, 3);
        assert!(err.to_string().contains("bottom-right"));
    }
}
