//! High-level scanning API.
//!
//! [`Scanner`] is the primary entry point. It owns a sheet layout, the answer
//! key and the scan configuration, and runs the pipeline on raw captures.

use image::GrayImage;
use std::path::Path;

use crate::answer_key::AnswerKey;
use crate::config::{ScanConfig, ScanMode};
use crate::layout::LayoutConfig;
use crate::pipeline::{self, PipelineContext, PipelineError, ScanOutcome, ScanResult};
use crate::scoring::AnswerKeyReading;

/// Primary scanning interface.
///
/// Create once per exam, scan many sheets.
///
/// # Examples
///
/// ```no_run
/// use bubblegrid::{AnswerKey, Scanner};
/// use std::path::Path;
///
/// let key = AnswerKey::from_json_file(Path::new("key.json")).unwrap();
/// let scanner = Scanner::from_layout_json_file(Path::new("layout.json"))
///     .unwrap()
///     .with_answer_key(key);
/// let image = image::open("sheet.jpg").unwrap().to_luma8();
/// match scanner.scan(&image) {
///     Ok(result) => println!("net {:.2}", result.net_score),
///     Err(e) => eprintln!("{}", e),
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Scanner {
    ctx: PipelineContext,
}

impl Scanner {
    /// Create a scanner with an empty answer key and default configuration.
    pub fn new(layout: LayoutConfig) -> Self {
        Self::with_config(layout, ScanConfig::default())
    }

    /// Create with full config control.
    pub fn with_config(layout: LayoutConfig, config: ScanConfig) -> Self {
        Self {
            ctx: PipelineContext::new(layout, AnswerKey::new(), config),
        }
    }

    /// Load layout JSON and create a scanner in one step.
    pub fn from_layout_json_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self::new(LayoutConfig::from_json_file(path)?))
    }

    pub fn with_answer_key(mut self, key: AnswerKey) -> Self {
        self.ctx.answer_key = key;
        self
    }

    pub fn context(&self) -> &PipelineContext {
        &self.ctx
    }

    pub fn layout(&self) -> &LayoutConfig {
        &self.ctx.layout
    }

    pub fn answer_key(&self) -> &AnswerKey {
        &self.ctx.answer_key
    }

    pub fn set_answer_key(&mut self, key: AnswerKey) {
        self.ctx.answer_key = key;
    }

    /// Access the current configuration.
    pub fn config(&self) -> &ScanConfig {
        &self.ctx.params
    }

    /// Mutable access to configuration for post-construction tuning.
    pub fn config_mut(&mut self) -> &mut ScanConfig {
        &mut self.ctx.params
    }

    /// Grade a student sheet against the current answer key.
    pub fn scan(&self, image: &GrayImage) -> Result<ScanResult, PipelineError> {
        pipeline::scan(image, &self.ctx)
    }

    /// Read the answers marked on a key sheet.
    pub fn read_answer_key(&self, image: &GrayImage) -> Result<AnswerKeyReading, PipelineError> {
        pipeline::scan_answer_key(image, &self.ctx)
    }

    /// Run with an explicit terminal step.
    pub fn run(&self, image: &GrayImage, mode: ScanMode) -> Result<ScanOutcome, PipelineError> {
        pipeline::run(image, &self.ctx, mode)
    }

    /// Read a key sheet and use the result as the answer key.
    ///
    /// The current key is kept when the sheet cannot be read.
    pub fn load_answer_key_from_sheet(
        &mut self,
        image: &GrayImage,
    ) -> Result<AnswerKeyReading, PipelineError> {
        let reading = self.read_answer_key(image)?;
        self.ctx.answer_key = reading.key.clone();
        Ok(reading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{grid_layout, render_capture, CaptureTransform};

    #[test]
    fn key_sheet_then_student_sheet() {
        let layout = grid_layout(3, 4, 0);
        let mut scanner = Scanner::new(layout.clone());
        assert!(scanner.answer_key().is_empty());

        let key_marks = [(1, "B"), (2, "C"), (3, "A")];
        let key_img = render_capture(&layout, &key_marks, None, CaptureTransform::default());
        let reading = scanner
            .load_answer_key_from_sheet(&key_img)
            .expect("key sheet");
        assert_eq!(reading.key.len(), 3);
        assert_eq!(scanner.answer_key().get(2), Some("C"));

        let student = render_capture(
            &layout,
            &[(1, "B"), (2, "D"), (3, "A")],
            None,
            CaptureTransform::default(),
        );
        let result = scanner.scan(&student).expect("student sheet");
        assert_eq!(result.correct_count, 2);
        assert_eq!(result.wrong_count, 1);
        assert_eq!(result.student_id, None);
        assert!(!result.suspicious);
    }

    #[test]
    fn failed_key_read_keeps_current_key() {
        let layout = grid_layout(2, 4, 0);
        let key: AnswerKey = [(1, "A".to_string()), (2, "B".to_string())]
            .into_iter()
            .collect();
        let mut scanner = Scanner::new(layout.clone()).with_answer_key(key.clone());
        let blank = render_capture(&layout, &[], None, CaptureTransform::default());
        assert!(scanner.load_answer_key_from_sheet(&blank).is_err());
        assert_eq!(scanner.answer_key(), &key);
    }

    #[test]
    fn config_mut_updates_scoring() {
        let mut scanner = Scanner::new(grid_layout(1, 2, 0));
        scanner.config_mut().scoring.penalty = 0.5;
        assert_eq!(scanner.config().scoring.penalty, 0.5);
    }
}
