use crate::marker::CornerMarkerSet;
use crate::scoring::{AnswerKeyReading, QuestionReading};

/// Graded result of one student sheet.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ScanResult {
    pub correct_count: usize,
    pub wrong_count: usize,
    pub blank_count: usize,
    /// Questions with several marks, also included in correct or wrong.
    pub multi_count: usize,
    /// `correct - wrong * penalty`, two decimals.
    pub net_score: f64,
    /// One reading per layout question, in layout order.
    pub readings: Vec<QuestionReading>,
    /// Decoded identifier with `?` for unreadable columns; `None` when the
    /// layout has no identifier grid.
    pub student_id: Option<String>,
    pub suspicious: bool,
    pub suspicious_reasons: Vec<String>,
    /// Marker centers in capture pixels.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub markers: Option<CornerMarkerSet>,
}

impl ScanResult {
    /// Number of graded questions.
    pub fn question_count(&self) -> usize {
        self.correct_count + self.wrong_count + self.blank_count
    }

    /// Identifier usable for deduplication: non-empty and all digits.
    pub fn known_student_id(&self) -> Option<&str> {
        self.student_id
            .as_deref()
            .filter(|id| is_known_id(id))
    }
}

/// A fully decoded identifier: non-empty and made only of ASCII digits.
pub fn is_known_id(id: &str) -> bool {
    !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit())
}

/// Terminal output of a scan, selected by [`crate::ScanMode`].
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ScanOutcome {
    Student(ScanResult),
    AnswerKey(AnswerKeyReading),
}
