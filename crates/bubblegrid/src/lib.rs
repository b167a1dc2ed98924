//! bubblegrid: optical mark recognition for printed bubble sheets.
//!
//! A raw capture of a sheet with four black corner markers goes through:
//!
//! 1. **Preprocess** – optional histogram equalization, Gaussian blur and
//!    adaptive mean thresholding to an ink mask.
//! 2. **Markers** – connected components filtered by area, aspect ratio and
//!    solidity; the best candidate per image quadrant wins.
//! 3. **Geometry** – the marker quad is rejected when too skewed or too small.
//! 4. **Rectify** – a four-point homography resamples the capture to the
//!    layout's canonical size.
//! 5. **Scoring** – centered-disc fill ratio per bubble, mark resolution and
//!    grading against the answer key, identifier decoding.
//! 6. **Session** – graded sheets are merged into a deduplicating store and an
//!    append-only log.
//!
//! # Public API
//! - [`Scanner`] as the primary entry point
//! - [`LayoutConfig`] and [`AnswerKey`] describing the exam
//! - [`ScanConfig`] for tuning, [`ScanResult`] and [`AnswerKeyReading`] as
//!   outputs
//! - [`SessionAggregator`] and [`SessionLog`] for multi-sheet sessions

mod answer_key;
mod api;
mod config;
mod homography;
mod layout;
mod marker;
mod pipeline;
mod preprocess;
mod rectify;
mod scoring;
mod session;

#[cfg(test)]
pub(crate) mod test_utils;

pub use answer_key::{AnswerKey, KeyCoverage};
pub use api::Scanner;
pub use config::{DominanceParams, KeyScanParams, ScanConfig, ScanMode, ScoringParameters};
pub use homography::HomographyError;
pub use layout::{Choice, IdBubble, LayoutConfig, LayoutError, Question, StudentIdGrid};
pub use marker::{
    detect_corner_markers, find_marker_candidates, select_corner_markers, validate_geometry,
    Corner, CornerMarkerSet, GeometryIssue, GeometryLimits, GeometryReport, MarkerCandidate,
    MarkerDetectConfig, MarkersNotFound,
};
pub use pipeline::{is_known_id, PipelineContext, PipelineError, ScanOutcome, ScanResult};
pub use preprocess::{binarize, ink_count, PreprocessConfig, INK};
pub use rectify::{RectifiedImage, RectifyConfig};
pub use scoring::{
    decode_column, decode_student_id, fill_ratio_circular, fill_ratio_rect, grade,
    grade_questions, read_answer_key, read_key_choice, resolve_marks, round2, score_column,
    score_question, AnswerKeyReading, BubbleScore, DecodedId, GradedSheet, MarkState,
    QuestionReading, QuestionStatus, Resolution, Roi, Tally, ID_UNREADABLE,
};
pub use session::{
    format_log_line, MergeOutcome, SessionAggregator, SessionEntry, SessionLog, SessionStats,
    SuspiciousPolicy,
};
