//! Per-question answer resolution and grading.

use crate::answer_key::AnswerKey;
use crate::config::ScoringParameters;

use super::BubbleScore;

/// Resolver verdict for one question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkState {
    Blank,
    Single,
    Multi,
    /// Scored as blank, but a mark-like fill was seen.
    Ambiguous,
}

/// Grading outcome for one question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionStatus {
    Correct,
    Wrong,
    Blank,
    Ambiguous,
}

/// Resolved marks of one question before grading.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub state: MarkState,
    /// Counted option for `Single` and `Multi`.
    pub chosen: Option<String>,
    pub max_score: f64,
    /// Suspicious reason raised by this question, if any.
    pub reason: Option<String>,
}

impl Resolution {
    /// Label shown per question: `-` when nothing is counted, the option for
    /// a single mark, the option with a `*` suffix for a multi mark.
    pub fn marked_label(&self) -> String {
        match (&self.state, &self.chosen) {
            (MarkState::Single, Some(opt)) => opt.clone(),
            (MarkState::Multi, Some(opt)) => format!("{}*", opt),
            _ => "-".to_string(),
        }
    }
}

/// Graded reading of one question.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct QuestionReading {
    pub question_number: u32,
    pub marked_label: String,
    pub status: QuestionStatus,
    pub state: MarkState,
    pub max_score: f64,
}

/// Per-sheet counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Tally {
    pub correct: usize,
    pub wrong: usize,
    pub blank: usize,
    /// Questions with several marks; each is also counted as correct or wrong.
    pub multi: usize,
}

impl Tally {
    /// `correct - wrong * penalty`, rounded to two decimals.
    pub fn net(&self, penalty: f64) -> f64 {
        round2(self.correct as f64 - self.wrong as f64 * penalty)
    }

    pub fn answered(&self) -> usize {
        self.correct + self.wrong + self.blank
    }
}

/// Round half away from zero to two decimals.
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Index of the highest score; the first one wins ties.
pub(crate) fn argmax(scores: &[BubbleScore]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, s) in scores.iter().enumerate() {
        if best.map_or(true, |b| s.fill_ratio > scores[b].fill_ratio) {
            best = Some(i);
        }
    }
    best
}

/// Highest score among all choices except `skip`, or 0 with a single choice.
pub(crate) fn runner_up(scores: &[BubbleScore], skip: usize) -> f64 {
    scores
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != skip)
        .map(|(_, s)| s.fill_ratio)
        .fold(0.0, f64::max)
}

/// Turn the fill scores of one question into a mark state.
pub fn resolve_marks(
    question_number: u32,
    scores: &[BubbleScore],
    params: &ScoringParameters,
) -> Resolution {
    let Some(best) = argmax(scores) else {
        return Resolution {
            state: MarkState::Blank,
            chosen: None,
            max_score: 0.0,
            reason: None,
        };
    };
    let max_score = scores[best].fill_ratio;
    let blank = |reason: Option<String>| Resolution {
        state: if reason.is_some() {
            MarkState::Ambiguous
        } else {
            MarkState::Blank
        },
        chosen: None,
        max_score,
        reason,
    };

    if max_score < params.blank_guard {
        return blank(None);
    }

    let filled: Vec<usize> = (0..scores.len())
        .filter(|&i| scores[i].fill_ratio >= params.mark_threshold)
        .collect();

    match filled.len() {
        0 => {
            let d = &params.dominance;
            if max_score > d.min_max_score {
                let second = runner_up(scores, best);
                let dominant = max_score > second * d.strong_ratio
                    || (max_score > d.soft_floor && max_score > second * d.soft_ratio);
                if dominant {
                    return Resolution {
                        state: MarkState::Single,
                        chosen: Some(scores[best].option.clone()),
                        max_score,
                        reason: None,
                    };
                }
            }
            if max_score >= params.mark_threshold * params.ambiguous_fraction {
                blank(Some(format!(
                    "ambiguous mark on question {} (score={:.2})",
                    question_number, max_score
                )))
            } else {
                blank(None)
            }
        }
        1 => Resolution {
            state: MarkState::Single,
            chosen: Some(scores[filled[0]].option.clone()),
            max_score,
            reason: None,
        },
        _ => Resolution {
            // `best` is the first maximal score, which is always filled here.
            state: MarkState::Multi,
            chosen: Some(scores[best].option.clone()),
            max_score,
            reason: Some(format!("multiple marks on question {}", question_number)),
        },
    }
}

/// Compare a resolution against the key.
///
/// A counted mark on a question without a key entry is wrong.
pub fn grade(resolution: &Resolution, key_option: Option<&str>) -> QuestionStatus {
    match (&resolution.chosen, resolution.state) {
        (Some(opt), MarkState::Single | MarkState::Multi) => {
            if key_option == Some(opt.as_str()) {
                QuestionStatus::Correct
            } else {
                QuestionStatus::Wrong
            }
        }
        (_, MarkState::Ambiguous) => QuestionStatus::Ambiguous,
        _ => QuestionStatus::Blank,
    }
}

/// Graded readings and counters of a whole sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct GradedSheet {
    pub readings: Vec<QuestionReading>,
    pub tally: Tally,
    pub reasons: Vec<String>,
}

/// Resolve and grade every question, given `(question_number, scores)` pairs
/// in layout order.
pub fn grade_questions<'a, I>(
    questions: I,
    key: &AnswerKey,
    params: &ScoringParameters,
) -> GradedSheet
where
    I: IntoIterator<Item = (u32, &'a [BubbleScore])>,
{
    let mut tally = Tally::default();
    let mut readings = Vec::new();
    let mut reasons = Vec::new();

    for (number, scores) in questions {
        let resolution = resolve_marks(number, scores, params);
        let status = grade(&resolution, key.get(number));
        match status {
            QuestionStatus::Correct => tally.correct += 1,
            QuestionStatus::Wrong => tally.wrong += 1,
            QuestionStatus::Blank | QuestionStatus::Ambiguous => tally.blank += 1,
        }
        if resolution.state == MarkState::Multi {
            tally.multi += 1;
        }
        readings.push(QuestionReading {
            question_number: number,
            marked_label: resolution.marked_label(),
            status,
            state: resolution.state,
            max_score: resolution.max_score,
        });
        if let Some(reason) = resolution.reason {
            reasons.push(reason);
        }
    }

    GradedSheet {
        readings,
        tally,
        reasons,
    }
}
