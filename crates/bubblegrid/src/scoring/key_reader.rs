//! Reading an answer key from a marked key sheet.

use image::GrayImage;

use crate::answer_key::AnswerKey;
use crate::config::ScoringParameters;
use crate::layout::LayoutConfig;

use super::resolver::{argmax, runner_up};
use super::{score_question, BubbleScore};

/// Key read from a sheet plus the questions that could not be read.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AnswerKeyReading {
    pub key: AnswerKey,
    /// Question numbers left out of `key`, in layout order.
    pub unread: Vec<u32>,
}

/// Decide the keyed option of one question, if it is unambiguous.
///
/// Exactly one choice at or above the mark threshold is taken as is. With
/// none above it, the best choice is taken when it reaches
/// `mark_threshold * min_fraction` and beats the runner-up by
/// `dominance_ratio`. Anything else leaves the question unread.
///
/// The runner-up is the best score at any index other than the winner's, so
/// two equal light marks leave the question unread.
pub fn read_key_choice(scores: &[BubbleScore], params: &ScoringParameters) -> Option<String> {
    let ks = &params.key_scan;
    let filled: Vec<&BubbleScore> = scores
        .iter()
        .filter(|s| s.fill_ratio >= params.mark_threshold)
        .collect();
    match filled.as_slice() {
        [one] => Some(one.option.clone()),
        [] => {
            let best = argmax(scores)?;
            let top = scores[best].fill_ratio;
            let second = runner_up(scores, best);
            (top >= params.mark_threshold * ks.min_fraction && top > second * ks.dominance_ratio)
                .then(|| scores[best].option.clone())
        }
        _ => None,
    }
}

/// Score a binary key sheet and collect the readable answers.
pub fn read_answer_key(
    binary: &GrayImage,
    layout: &LayoutConfig,
    params: &ScoringParameters,
) -> AnswerKeyReading {
    let mut key = AnswerKey::new();
    let mut unread = Vec::new();
    for q in &layout.questions {
        let scores = score_question(binary, q, params.key_scan.roi_scale, params.mask_ratio);
        match read_key_choice(&scores, params) {
            Some(opt) => {
                key.insert(q.number, opt);
            }
            None => unread.push(q.number),
        }
    }
    tracing::debug!(
        "answer key read: {}/{} questions",
        key.len(),
        layout.n_questions()
    );
    AnswerKeyReading { key, unread }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::scores;

    #[test]
    fn exactly_one_filled_choice_is_read() {
        let p = ScoringParameters::default();
        let s = scores(&[("A", 0.1), ("B", 0.6), ("C", 0.0)]);
        assert_eq!(read_key_choice(&s, &p).as_deref(), Some("B"));
    }

    #[test]
    fn two_filled_choices_are_unread() {
        let p = ScoringParameters::default();
        let s = scores(&[("A", 0.5), ("B", 0.6)]);
        assert_eq!(read_key_choice(&s, &p), None);
    }

    #[test]
    fn light_but_dominant_mark_is_read() {
        let p = ScoringParameters::default();
        // 0.15 >= 0.2 * 0.6 and 0.15 > 0.09 * 1.5
        let s = scores(&[("A", 0.09), ("B", 0.15), ("C", 0.02)]);
        assert_eq!(read_key_choice(&s, &p).as_deref(), Some("B"));

        let weak = scores(&[("A", 0.11), ("B", 0.15)]);
        assert_eq!(read_key_choice(&weak, &p), None);

        let faint = scores(&[("A", 0.0), ("B", 0.11)]);
        assert_eq!(read_key_choice(&faint, &p), None);
    }

    #[test]
    fn tied_light_marks_are_unread() {
        let p = ScoringParameters::default();
        let s = scores(&[("A", 0.15), ("B", 0.15)]);
        assert_eq!(read_key_choice(&s, &p), None);

        let with_third = scores(&[("A", 0.15), ("B", 0.02), ("C", 0.15)]);
        assert_eq!(read_key_choice(&with_third, &p), None);
    }
}
