//! Runtime sheet layout specification.
//!
//! Layout JSON follows the `bubblegrid.layout.v1` schema produced by the sheet
//! generator. Bubble positions are normalized to the canonical sheet size so a
//! layout is independent of the resolution the sheet is rectified to.

use std::collections::HashSet;
use std::path::Path;

const LAYOUT_SCHEMA_V1: &str = "bubblegrid.layout.v1";

const DEFAULT_MARKER_OFFSET_PX: f64 = 5.0;
const DEFAULT_MARKER_SIZE_PX: f64 = 18.0;

fn default_marker_offset_px() -> f64 {
    DEFAULT_MARKER_OFFSET_PX
}

fn default_marker_size_px() -> f64 {
    DEFAULT_MARKER_SIZE_PX
}

/// One selectable choice of a question.
///
/// `x`/`y` is the bubble center and `width`/`height` its box, all as fractions
/// of the canonical sheet width/height.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Choice {
    pub option: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// A numbered question and its choice bubbles in print order.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Question {
    pub number: u32,
    pub choices: Vec<Choice>,
}

/// One bubble of the student-identifier grid.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct IdBubble {
    /// Digit value (row) this bubble encodes, 0–9.
    pub digit: u8,
    /// Identifier column, 0-based from the left.
    pub column: usize,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Student-identifier digit grid: `digit_count` columns of ten bubbles.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StudentIdGrid {
    pub digit_count: usize,
    pub bubbles: Vec<IdBubble>,
}

impl StudentIdGrid {
    /// Bubbles belonging to one identifier column.
    pub fn column(&self, column: usize) -> impl Iterator<Item = &IdBubble> + '_ {
        self.bubbles.iter().filter(move |b| b.column == column)
    }
}

/// Runtime sheet layout used by the scanner.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LayoutConfig {
    /// Canonical sheet width in pixels.
    pub width: u32,
    /// Canonical sheet height in pixels.
    pub height: u32,
    /// Distance from each sheet edge to the outer edge of a corner marker.
    #[serde(default = "default_marker_offset_px")]
    pub marker_offset_px: f64,
    /// Side length of a corner marker.
    #[serde(default = "default_marker_size_px")]
    pub marker_size_px: f64,
    pub questions: Vec<Question>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_id: Option<StudentIdGrid>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct LayoutSpecV1 {
    schema: String,
    width: u32,
    height: u32,
    #[serde(default = "default_marker_offset_px")]
    marker_offset_px: f64,
    #[serde(default = "default_marker_size_px")]
    marker_size_px: f64,
    questions: Vec<Question>,
    #[serde(default)]
    student_id: Option<StudentIdGrid>,
}

/// Reasons a layout description is rejected.
#[derive(Debug)]
pub enum LayoutError {
    Io(std::io::Error),
    Json(serde_json::Error),
    Invalid(String),
}

impl std::fmt::Display for LayoutError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "failed to read layout: {}", e),
            Self::Json(e) => write!(f, "failed to parse layout: {}", e),
            Self::Invalid(msg) => write!(f, "invalid layout: {}", msg),
        }
    }
}

impl std::error::Error for LayoutError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Json(e) => Some(e),
            Self::Invalid(_) => None,
        }
    }
}

impl From<std::io::Error> for LayoutError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for LayoutError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

impl LayoutConfig {
    /// Build and validate a layout from its parts.
    pub fn new(
        width: u32,
        height: u32,
        questions: Vec<Question>,
        student_id: Option<StudentIdGrid>,
    ) -> Result<Self, LayoutError> {
        let layout = Self {
            width,
            height,
            marker_offset_px: DEFAULT_MARKER_OFFSET_PX,
            marker_size_px: DEFAULT_MARKER_SIZE_PX,
            questions,
            student_id,
        };
        layout.validate()?;
        Ok(layout)
    }

    /// Load a layout from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self, LayoutError> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json_str(&data)
    }

    /// Parse a layout from JSON text.
    pub fn from_json_str(data: &str) -> Result<Self, LayoutError> {
        let spec: LayoutSpecV1 = serde_json::from_str(data)?;
        Self::from_layout_spec(spec)
    }

    /// Serialize to the versioned JSON schema.
    pub fn to_json_string(&self) -> Result<String, LayoutError> {
        let spec = LayoutSpecV1 {
            schema: LAYOUT_SCHEMA_V1.to_string(),
            width: self.width,
            height: self.height,
            marker_offset_px: self.marker_offset_px,
            marker_size_px: self.marker_size_px,
            questions: self.questions.clone(),
            student_id: self.student_id.clone(),
        };
        Ok(serde_json::to_string_pretty(&spec)?)
    }

    fn from_layout_spec(spec: LayoutSpecV1) -> Result<Self, LayoutError> {
        if spec.schema != LAYOUT_SCHEMA_V1 {
            return Err(LayoutError::Invalid(format!(
                "unsupported layout schema '{}' (expected '{}')",
                spec.schema, LAYOUT_SCHEMA_V1
            )));
        }

        let layout = Self {
            width: spec.width,
            height: spec.height,
            marker_offset_px: spec.marker_offset_px,
            marker_size_px: spec.marker_size_px,
            questions: spec.questions,
            student_id: spec.student_id,
        };
        layout.validate()?;
        Ok(layout)
    }

    /// Number of questions on the sheet.
    pub fn n_questions(&self) -> usize {
        self.questions.len()
    }

    /// Look up a question by its printed number.
    pub fn question(&self, number: u32) -> Option<&Question> {
        self.questions.iter().find(|q| q.number == number)
    }

    /// Number of identifier digit columns (0 when the sheet has no grid).
    pub fn id_digit_count(&self) -> usize {
        self.student_id.as_ref().map_or(0, |g| g.digit_count)
    }

    /// Canonical position of the four marker centers, in `tl, tr, br, bl` order.
    pub fn marker_targets(&self) -> [[f64; 2]; 4] {
        let c = self.marker_offset_px + self.marker_size_px / 2.0;
        let w = self.width as f64;
        let h = self.height as f64;
        [[c, c], [w - c, c], [w - c, h - c], [c, h - c]]
    }

    /// Check structural consistency. Called by every constructor.
    pub fn validate(&self) -> Result<(), LayoutError> {
        validate_layout(self).map_err(LayoutError::Invalid)
    }
}

fn validate_layout(layout: &LayoutConfig) -> Result<(), String> {
    if layout.width == 0 || layout.height == 0 {
        return Err("width and height must be >= 1".to_string());
    }

    if !layout.marker_offset_px.is_finite() || layout.marker_offset_px < 0.0 {
        return Err("marker_offset_px must be finite and >= 0".to_string());
    }

    if !layout.marker_size_px.is_finite() || layout.marker_size_px <= 0.0 {
        return Err("marker_size_px must be finite and > 0".to_string());
    }

    let inset = 2.0 * layout.marker_offset_px + layout.marker_size_px;
    if inset >= layout.width as f64 || inset >= layout.height as f64 {
        return Err("corner markers do not fit on the sheet".to_string());
    }

    if layout.questions.is_empty() {
        return Err("layout must define at least one question".to_string());
    }

    let mut numbers = HashSet::new();
    for q in &layout.questions {
        if !numbers.insert(q.number) {
            return Err(format!("duplicate question number {}", q.number));
        }
        if q.choices.is_empty() {
            return Err(format!("question {} has no choices", q.number));
        }
        let mut options = HashSet::new();
        for c in &q.choices {
            if c.option.trim().is_empty() {
                return Err(format!("question {} has an empty option label", q.number));
            }
            if !options.insert(c.option.as_str()) {
                return Err(format!(
                    "question {} repeats option '{}'",
                    q.number, c.option
                ));
            }
            check_box(c.x, c.y, c.width, c.height)
                .map_err(|e| format!("question {} option {}: {}", q.number, c.option, e))?;
        }
    }

    if let Some(grid) = &layout.student_id {
        for b in &grid.bubbles {
            if b.digit > 9 {
                return Err(format!("identifier bubble digit {} is not 0-9", b.digit));
            }
            if b.column >= grid.digit_count {
                return Err(format!(
                    "identifier bubble column {} exceeds digit_count {}",
                    b.column, grid.digit_count
                ));
            }
            check_box(b.x, b.y, b.width, b.height)
                .map_err(|e| format!("identifier column {} digit {}: {}", b.column, b.digit, e))?;
        }
    }

    Ok(())
}

fn check_box(x: f64, y: f64, width: f64, height: f64) -> Result<(), String> {
    let in_unit = |v: f64| v.is_finite() && (0.0..=1.0).contains(&v);
    if !in_unit(x) || !in_unit(y) {
        return Err("center must lie within [0, 1]".to_string());
    }
    if !in_unit(width) || !in_unit(height) || width <= 0.0 || height <= 0.0 {
        return Err("size must lie within (0, 1]".to_string());
    }
    Ok(())
}
