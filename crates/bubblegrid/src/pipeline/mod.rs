//! Single-sheet scan pipeline.
//!
//! Stage order is fixed: capture binarization → corner markers → quad
//! validation → rectification → terminal step. The terminal step is chosen by
//! [`ScanMode`](crate::ScanMode): grading a student sheet or reading an answer
//! key. Every intermediate buffer is local to one call.

mod error;
mod result;
mod run;

pub use error::PipelineError;
pub use result::{is_known_id, ScanOutcome, ScanResult};
pub use run::{locate_and_rectify, run, scan, scan_answer_key};

use crate::answer_key::AnswerKey;
use crate::config::ScanConfig;
use crate::layout::LayoutConfig;

/// Everything a scan reads besides the image.
#[derive(Debug, Clone)]
pub struct PipelineContext {
    pub layout: LayoutConfig,
    pub answer_key: AnswerKey,
    pub params: ScanConfig,
}

impl PipelineContext {
    pub fn new(layout: LayoutConfig, answer_key: AnswerKey, params: ScanConfig) -> Self {
        Self {
            layout,
            answer_key,
            params,
        }
    }
}
