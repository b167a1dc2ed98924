//! Corner fiducials: localization and quad plausibility checks.

mod detect;
mod geometry;

pub use detect::{
    detect_corner_markers, find_marker_candidates, select_corner_markers, MarkerCandidate,
    MarkerDetectConfig, MarkersNotFound,
};
pub use geometry::{validate_geometry, GeometryIssue, GeometryLimits, GeometryReport};

/// One of the four sheet corners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    pub const ALL: [Corner; 4] = [
        Corner::TopLeft,
        Corner::TopRight,
        Corner::BottomLeft,
        Corner::BottomRight,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Corner::TopLeft => "top-left",
            Corner::TopRight => "top-right",
            Corner::BottomLeft => "bottom-left",
            Corner::BottomRight => "bottom-right",
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Corner::TopLeft => 0,
            Corner::TopRight => 1,
            Corner::BottomLeft => 2,
            Corner::BottomRight => 3,
        }
    }

    /// Outer image corner of this quadrant for an image of size `w x h`.
    pub(crate) fn image_corner(self, w: f64, h: f64) -> [f64; 2] {
        match self {
            Corner::TopLeft => [0.0, 0.0],
            Corner::TopRight => [w, 0.0],
            Corner::BottomLeft => [0.0, h],
            Corner::BottomRight => [w, h],
        }
    }
}

/// Marker centers in source image pixels.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CornerMarkerSet {
    pub tl: [f64; 2],
    pub tr: [f64; 2],
    pub bl: [f64; 2],
    pub br: [f64; 2],
}

impl CornerMarkerSet {
    /// Centers in `tl, tr, br, bl` order, matching `LayoutConfig::marker_targets`.
    pub fn clockwise(&self) -> [[f64; 2]; 4] {
        [self.tl, self.tr, self.br, self.bl]
    }

    pub fn get(&self, corner: Corner) -> [f64; 2] {
        match corner {
            Corner::TopLeft => self.tl,
            Corner::TopRight => self.tr,
            Corner::BottomLeft => self.bl,
            Corner::BottomRight => self.br,
        }
    }
}
