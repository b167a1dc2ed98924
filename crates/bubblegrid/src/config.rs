//! Tunable scan parameters.
//!
//! Every heuristic constant of the pipeline lives in one of these structs.
//! A JSON file only needs to name the fields it overrides: [`ScanConfig`]
//! fills the rest from the presets of its capture mode, and the nested
//! structs fall back to their `Default`.

use std::path::Path;

use serde::Deserialize;

use crate::marker::{GeometryLimits, MarkerDetectConfig};
use crate::preprocess::PreprocessConfig;
use crate::rectify::RectifyConfig;

/// Dominance test for a question where no choice crosses the mark threshold.
///
/// The top choice is accepted when `max > min_max_score` and either
/// `max > second * strong_ratio`, or `max > soft_floor` and
/// `max > second * soft_ratio`.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DominanceParams {
    pub min_max_score: f64,
    pub strong_ratio: f64,
    pub soft_floor: f64,
    pub soft_ratio: f64,
}

impl Default for DominanceParams {
    fn default() -> Self {
        Self {
            min_max_score: 0.05,
            strong_ratio: 1.5,
            soft_floor: 0.10,
            soft_ratio: 1.3,
        }
    }
}

/// Answer-key sheet reading controls.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct KeyScanParams {
    /// ROI scale for key bubbles; wider than the student scale.
    pub roi_scale: f64,
    /// Required ratio of best to runner-up when no choice crosses the threshold.
    pub dominance_ratio: f64,
    /// Fraction of the mark threshold the best choice must still reach.
    pub min_fraction: f64,
}

impl Default for KeyScanParams {
    fn default() -> Self {
        Self {
            roi_scale: 1.3,
            dominance_ratio: 1.5,
            min_fraction: 0.6,
        }
    }
}

/// Fill measurement and answer resolution parameters.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ScoringParameters {
    /// Minimum fill ratio for a choice to count as marked.
    pub mark_threshold: f64,
    /// Points subtracted per wrong answer.
    pub penalty: f64,
    /// Questions whose best fill is below this are blank regardless of
    /// `mark_threshold`.
    pub blank_guard: f64,
    /// Scale applied to each question bubble box before sampling.
    pub roi_scale: f64,
    /// Circular mask radius as a fraction of the smaller ROI side.
    pub mask_ratio: f64,
    /// Scale applied to identifier bubble boxes.
    pub id_roi_scale: f64,
    pub dominance: DominanceParams,
    /// A blank question with `max >= mark_threshold * ambiguous_fraction` is
    /// flagged as ambiguous.
    pub ambiguous_fraction: f64,
    pub key_scan: KeyScanParams,
}

impl Default for ScoringParameters {
    fn default() -> Self {
        Self {
            mark_threshold: 0.20,
            penalty: 0.25,
            blank_guard: 0.18,
            roi_scale: 1.04,
            mask_ratio: 0.32,
            id_roi_scale: 1.0,
            dominance: DominanceParams::default(),
            ambiguous_fraction: 0.6,
            key_scan: KeyScanParams::default(),
        }
    }
}

impl ScoringParameters {
    /// Preset for normal or low-contrast captures.
    ///
    /// Shadow captures binarize with more background noise, so the blank
    /// guard is raised and the sampling disc shrinks away from the ring.
    pub fn for_shadow_mode(shadow_mode: bool) -> Self {
        if shadow_mode {
            Self {
                blank_guard: 0.22,
                mask_ratio: 0.30,
                ..Self::default()
            }
        } else {
            Self::default()
        }
    }
}

/// Full pipeline configuration.
///
/// Deserialization reads `shadow_mode` first and overlays the remaining
/// fields, nested objects included, onto [`ScanConfig::new`] for that mode.
/// Unknown top-level fields are rejected.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "serde_json::Value")]
pub struct ScanConfig {
    /// Low-contrast capture mode. Change it with [`ScanConfig::set_shadow_mode`]
    /// so the presets follow.
    shadow_mode: bool,
    /// Binarization of the raw capture for marker detection.
    pub capture: PreprocessConfig,
    /// Binarization of a rectified student sheet.
    pub rectified: PreprocessConfig,
    /// Binarization of a rectified answer-key sheet.
    pub rectified_key: PreprocessConfig,
    pub markers: MarkerDetectConfig,
    pub geometry: GeometryLimits,
    pub rectify: RectifyConfig,
    pub scoring: ScoringParameters,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::new(false)
    }
}

impl ScanConfig {
    /// Presets for normal (`false`) or shadow (`true`) captures.
    pub fn new(shadow_mode: bool) -> Self {
        Self {
            shadow_mode,
            capture: if shadow_mode {
                PreprocessConfig::capture_shadow()
            } else {
                PreprocessConfig::capture()
            },
            rectified: PreprocessConfig::rectified(shadow_mode),
            rectified_key: PreprocessConfig::rectified_key(shadow_mode),
            markers: MarkerDetectConfig::default(),
            geometry: GeometryLimits::default(),
            rectify: RectifyConfig::default(),
            scoring: ScoringParameters::for_shadow_mode(shadow_mode),
        }
    }

    pub fn shadow() -> Self {
        Self::new(true)
    }

    pub fn shadow_mode(&self) -> bool {
        self.shadow_mode
    }

    /// Switch capture mode, replacing the mode-dependent presets: the three
    /// preprocess configs plus `scoring.blank_guard` and `scoring.mask_ratio`.
    ///
    /// Does nothing when already in the requested mode, so overrides made on
    /// top of the current presets survive.
    pub fn set_shadow_mode(&mut self, shadow_mode: bool) {
        if self.shadow_mode == shadow_mode {
            return;
        }
        let presets = Self::new(shadow_mode);
        self.shadow_mode = shadow_mode;
        self.capture = presets.capture;
        self.rectified = presets.rectified;
        self.rectified_key = presets.rectified_key;
        self.scoring.blank_guard = presets.scoring.blank_guard;
        self.scoring.mask_ratio = presets.scoring.mask_ratio;
    }

    /// Load a configuration file; absent fields take the presets of the
    /// file's `shadow_mode` (normal mode when absent).
    pub fn from_json_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Apply the user-facing scoring parameters.
    pub fn with_user_params(mut self, mark_threshold: f64, penalty: f64) -> Self {
        self.scoring.mark_threshold = mark_threshold;
        self.scoring.penalty = penalty;
        self
    }
}

// ── Deserialization ──────────────────────────────────────────────────────

/// Complete field set, deserialized after the overlay.
#[derive(serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct ScanConfigFields {
    shadow_mode: bool,
    capture: PreprocessConfig,
    rectified: PreprocessConfig,
    rectified_key: PreprocessConfig,
    markers: MarkerDetectConfig,
    geometry: GeometryLimits,
    rectify: RectifyConfig,
    scoring: ScoringParameters,
}

impl From<ScanConfigFields> for ScanConfig {
    fn from(f: ScanConfigFields) -> Self {
        Self {
            shadow_mode: f.shadow_mode,
            capture: f.capture,
            rectified: f.rectified,
            rectified_key: f.rectified_key,
            markers: f.markers,
            geometry: f.geometry,
            rectify: f.rectify,
            scoring: f.scoring,
        }
    }
}

impl TryFrom<serde_json::Value> for ScanConfig {
    type Error = serde_json::Error;

    fn try_from(overrides: serde_json::Value) -> Result<Self, Self::Error> {
        let shadow_mode = match overrides.get("shadow_mode") {
            Some(v) => bool::deserialize(v)?,
            None => false,
        };
        let mut merged = serde_json::to_value(Self::new(shadow_mode))?;
        overlay(&mut merged, overrides);
        let fields: ScanConfigFields = serde_json::from_value(merged)?;
        Ok(fields.into())
    }
}

/// Recursively replace values of `base` with those of `patch`; objects merge
/// key by key.
fn overlay(base: &mut serde_json::Value, patch: serde_json::Value) {
    use serde_json::Value;
    match (base, patch) {
        (Value::Object(base), Value::Object(patch)) => {
            for (key, value) in patch {
                match base.get_mut(&key) {
                    Some(slot) => overlay(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

/// Which terminal step a scan runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanMode {
    /// Grade a student sheet against the answer key.
    #[default]
    Student,
    /// Read the marked options of a key sheet into an answer key.
    AnswerKey,
}
