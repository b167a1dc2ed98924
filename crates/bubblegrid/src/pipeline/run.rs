//! Scan orchestrator: preprocess → markers → geometry → rectify → terminal step.

use image::GrayImage;

use super::{PipelineContext, PipelineError, ScanOutcome, ScanResult};
use crate::config::ScanMode;
use crate::marker::{detect_corner_markers, validate_geometry, CornerMarkerSet};
use crate::preprocess::binarize;
use crate::rectify::{rectify, RectifiedImage};
use crate::scoring::{
    decode_student_id, grade_questions, read_answer_key, score_question, AnswerKeyReading,
    BubbleScore, ID_UNREADABLE,
};

// ---------------------------------------------------------------------------
// Shared front half
// ---------------------------------------------------------------------------

/// Locate the sheet in a raw capture and resample it to canonical size.
pub fn locate_and_rectify(
    image: &GrayImage,
    ctx: &PipelineContext,
) -> Result<(CornerMarkerSet, RectifiedImage), PipelineError> {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return Err(PipelineError::EmptyImage);
    }
    let params = &ctx.params;

    let markers = {
        let binary = binarize(image, &params.capture);
        detect_corner_markers(&binary, &params.markers).map_err(|e| {
            tracing::info!("{}", e);
            PipelineError::GeometryNotFound {
                reasons: e.reasons(),
            }
        })?
    };

    let report = validate_geometry(&markers, (w, h), &params.geometry).map_err(|issues| {
        let reasons: Vec<String> = issues.iter().map(ToString::to_string).collect();
        tracing::warn!("marker quad rejected: {}", reasons.join("; "));
        PipelineError::GeometryRejected { reasons }
    })?;
    tracing::debug!(
        "marker quad: skew {:.3}/{:.3}, area ratio {:.3}",
        report.skew_horizontal,
        report.skew_vertical,
        report.area_ratio
    );

    let rectified = rectify(image, &markers, &ctx.layout, &params.rectify).map_err(|e| {
        tracing::warn!("rectification failed: {}", e);
        PipelineError::GeometryRejected {
            reasons: vec![e.to_string()],
        }
    })?;
    Ok((markers, rectified))
}

// ---------------------------------------------------------------------------
// Terminal steps
// ---------------------------------------------------------------------------

fn grade_sheet(
    rectified: &RectifiedImage,
    markers: CornerMarkerSet,
    ctx: &PipelineContext,
) -> ScanResult {
    let params = &ctx.params;
    let scoring = &params.scoring;
    let binary = binarize(&rectified.gray, &params.rectified);

    let per_question: Vec<(u32, Vec<BubbleScore>)> = ctx
        .layout
        .questions
        .iter()
        .map(|q| {
            (
                q.number,
                score_question(&binary, q, scoring.roi_scale, scoring.mask_ratio),
            )
        })
        .collect();
    let sheet = grade_questions(
        per_question.iter().map(|(n, s)| (*n, s.as_slice())),
        &ctx.answer_key,
        scoring,
    );

    let mut reasons = sheet.reasons;
    let student_id = ctx
        .layout
        .student_id
        .as_ref()
        .filter(|grid| grid.digit_count > 0)
        .map(|grid| {
            let id =
                decode_student_id(&binary, grid, scoring.id_roi_scale, scoring.mark_threshold);
            if !id.is_known() {
                reasons.push(ID_UNREADABLE.to_string());
            }
            id.raw()
        });

    let tally = sheet.tally;
    ScanResult {
        correct_count: tally.correct,
        wrong_count: tally.wrong,
        blank_count: tally.blank,
        multi_count: tally.multi,
        net_score: tally.net(scoring.penalty),
        readings: sheet.readings,
        student_id,
        suspicious: !reasons.is_empty(),
        suspicious_reasons: reasons,
        markers: Some(markers),
    }
}

fn read_key_sheet(
    rectified: &RectifiedImage,
    ctx: &PipelineContext,
) -> Result<AnswerKeyReading, PipelineError> {
    let binary = binarize(&rectified.gray, &ctx.params.rectified_key);
    let reading = read_answer_key(&binary, &ctx.layout, &ctx.params.scoring);
    if reading.key.is_empty() {
        return Err(PipelineError::AnswerKeyUnreadable {
            questions: ctx.layout.n_questions(),
        });
    }
    Ok(reading)
}

// ---------------------------------------------------------------------------
// Public entry points
// ---------------------------------------------------------------------------

/// Run one scan with the terminal step selected by `mode`.
pub fn run(
    image: &GrayImage,
    ctx: &PipelineContext,
    mode: ScanMode,
) -> Result<ScanOutcome, PipelineError> {
    let (markers, rectified) = locate_and_rectify(image, ctx)?;
    match mode {
        ScanMode::Student => {
            let result = grade_sheet(&rectified, markers, ctx);
            tracing::info!(
                "graded sheet: correct={} wrong={} blank={} multi={} net={:.2} suspicious={}",
                result.correct_count,
                result.wrong_count,
                result.blank_count,
                result.multi_count,
                result.net_score,
                result.suspicious
            );
            Ok(ScanOutcome::Student(result))
        }
        ScanMode::AnswerKey => {
            let reading = read_key_sheet(&rectified, ctx)?;
            tracing::info!(
                "answer key read: {} answered, {} unread",
                reading.key.len(),
                reading.unread.len()
            );
            Ok(ScanOutcome::AnswerKey(reading))
        }
    }
}

/// Grade a student sheet.
pub fn scan(image: &GrayImage, ctx: &PipelineContext) -> Result<ScanResult, PipelineError> {
    let (markers, rectified) = locate_and_rectify(image, ctx)?;
    Ok(grade_sheet(&rectified, markers, ctx))
}

/// Read an answer key from a marked key sheet.
pub fn scan_answer_key(
    image: &GrayImage,
    ctx: &PipelineContext,
) -> Result<AnswerKeyReading, PipelineError> {
    let (_, rectified) = locate_and_rectify(image, ctx)?;
    read_key_sheet(&rectified, ctx)
}
