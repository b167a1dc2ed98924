//! Student identifier decoding from the digit bubble grid.

use image::GrayImage;

use crate::layout::StudentIdGrid;

use super::scorer::{fill_ratio_rect, Roi};

/// Suspicious reason raised when any identifier column is unreadable.
pub const ID_UNREADABLE: &str = "identifier unreadable";

/// Decoded identifier, one entry per column.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DecodedId {
    /// `None` for a column whose best bubble stayed below the mark threshold.
    pub digits: Vec<Option<u8>>,
}

impl DecodedId {
    /// Column digits concatenated, `?` for unreadable columns.
    pub fn raw(&self) -> String {
        self.digits
            .iter()
            .map(|d| d.map_or('?', |d| char::from(b'0' + d)))
            .collect()
    }

    /// True when every column was read.
    pub fn is_known(&self) -> bool {
        !self.digits.is_empty() && self.digits.iter().all(Option::is_some)
    }
}

/// Pick the best digit of one column from `(digit, fill)` pairs.
///
/// Highest fill wins, the first on ties; accepted only at or above
/// `mark_threshold`.
pub fn decode_column(scores: &[(u8, f64)], mark_threshold: f64) -> Option<u8> {
    let mut best: Option<(u8, f64)> = None;
    for &(digit, fill) in scores {
        if best.map_or(true, |(_, b)| fill > b) {
            best = Some((digit, fill));
        }
    }
    best.filter(|&(_, fill)| fill >= mark_threshold)
        .map(|(digit, _)| digit)
}

/// Rectangular fill of every bubble of `column`, in layout order.
///
/// A bubble whose window overruns the right or bottom edge of the sheet is
/// left out rather than scored on a clipped window.
pub fn score_column(
    binary: &GrayImage,
    grid: &StudentIdGrid,
    column: usize,
    roi_scale: f64,
) -> Vec<(u8, f64)> {
    let dims = binary.dimensions();
    grid.column(column)
        .filter_map(|b| {
            let roi = Roi::within([b.x, b.y], [b.width, b.height], roi_scale, dims)?;
            Some((b.digit, fill_ratio_rect(binary, &roi)))
        })
        .collect()
}

/// Decode every identifier column of a binary rectified sheet.
pub fn decode_student_id(
    binary: &GrayImage,
    grid: &StudentIdGrid,
    roi_scale: f64,
    mark_threshold: f64,
) -> DecodedId {
    let digits = (0..grid.digit_count)
        .map(|col| decode_column(&score_column(binary, grid, col, roi_scale), mark_threshold))
        .collect();
    DecodedId { digits }
}
