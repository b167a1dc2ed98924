//! Plausibility checks on a detected marker quadrilateral.

use super::CornerMarkerSet;

/// Acceptance limits for the marker quad.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct GeometryLimits {
    /// Largest accepted relative length difference of opposite edges.
    pub max_skew: f64,
    /// Smallest accepted quad area as a fraction of image area.
    pub min_area_ratio: f64,
}

impl Default for GeometryLimits {
    fn default() -> Self {
        Self {
            max_skew: 0.15,
            min_area_ratio: 0.10,
        }
    }
}

/// Measured quad properties of an accepted marker set.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GeometryReport {
    pub top: f64,
    pub bottom: f64,
    pub left: f64,
    pub right: f64,
    /// `|top - bottom| / max(top, bottom)`.
    pub skew_horizontal: f64,
    /// `|left - right| / max(left, right)`.
    pub skew_vertical: f64,
    /// Mean width times mean height over image area.
    pub area_ratio: f64,
}

/// One failed quad check.
#[derive(Debug, Clone, PartialEq)]
pub enum GeometryIssue {
    SkewHorizontal { ratio: f64, limit: f64 },
    SkewVertical { ratio: f64, limit: f64 },
    AreaTooSmall { ratio: f64, min: f64 },
    Degenerate(String),
}

impl GeometryIssue {
    /// Stable short identifier of the failed check.
    pub fn code(&self) -> &'static str {
        match self {
            Self::SkewHorizontal { .. } => "skew-horizontal",
            Self::SkewVertical { .. } => "skew-vertical",
            Self::AreaTooSmall { .. } => "area-too-small",
            Self::Degenerate(_) => "degenerate",
        }
    }
}

impl std::fmt::Display for GeometryIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SkewHorizontal { ratio, limit } | Self::SkewVertical { ratio, limit } => {
                write!(f, "{}: {:.3} exceeds {:.3}", self.code(), ratio, limit)
            }
            Self::AreaTooSmall { ratio, min } => {
                write!(f, "{}: {:.3} below {:.3}", self.code(), ratio, min)
            }
            Self::Degenerate(msg) => write!(f, "{}: {}", self.code(), msg),
        }
    }
}

fn dist(a: [f64; 2], b: [f64; 2]) -> f64 {
    (a[0] - b[0]).hypot(a[1] - b[1])
}

fn skew(a: f64, b: f64) -> f64 {
    (a - b).abs() / a.max(b)
}

/// Check edge balance and relative size of the marker quad.
///
/// Both limits are inclusive: a skew equal to `max_skew` and an area ratio
/// equal to `min_area_ratio` pass. Every failing check is reported.
pub fn validate_geometry(
    markers: &CornerMarkerSet,
    image_size: (u32, u32),
    limits: &GeometryLimits,
) -> Result<GeometryReport, Vec<GeometryIssue>> {
    let (iw, ih) = image_size;
    if iw == 0 || ih == 0 {
        return Err(vec![GeometryIssue::Degenerate("empty image".to_string())]);
    }
    let pts = [markers.tl, markers.tr, markers.bl, markers.br];
    if pts.iter().flatten().any(|v| !v.is_finite()) {
        return Err(vec![GeometryIssue::Degenerate(
            "non-finite marker coordinates".to_string(),
        )]);
    }

    let top = dist(markers.tl, markers.tr);
    let bottom = dist(markers.bl, markers.br);
    let left = dist(markers.tl, markers.bl);
    let right = dist(markers.tr, markers.br);
    if [top, bottom, left, right].iter().any(|&e| e <= 0.0) {
        return Err(vec![GeometryIssue::Degenerate(
            "zero-length quad edge".to_string(),
        )]);
    }

    let report = GeometryReport {
        top,
        bottom,
        left,
        right,
        skew_horizontal: skew(top, bottom),
        skew_vertical: skew(left, right),
        area_ratio: ((top + bottom) * 0.5 * (left + right) * 0.5) / (iw as f64 * ih as f64),
    };

    let mut issues = Vec::new();
    if report.skew_horizontal > limits.max_skew {
        issues.push(GeometryIssue::SkewHorizontal {
            ratio: report.skew_horizontal,
            limit: limits.max_skew,
        });
    }
    if report.skew_vertical > limits.max_skew {
        issues.push(GeometryIssue::SkewVertical {
            ratio: report.skew_vertical,
            limit: limits.max_skew,
        });
    }
    if report.area_ratio < limits.min_area_ratio {
        issues.push(GeometryIssue::AreaTooSmall {
            ratio: report.area_ratio,
            min: limits.min_area_ratio,
        });
    }

    if issues.is_empty() {
        Ok(report)
    } else {
        Err(issues)
    }
}
