//! Answer keys: question number to correct option.

use std::collections::BTreeMap;
use std::path::Path;

use rand::Rng;

use crate::layout::LayoutConfig;

/// Mapping from question number to the correct option label.
///
/// Backed by an ordered map so serialized keys and iteration follow question
/// order.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct AnswerKey {
    answers: BTreeMap<u32, String>,
}

/// How much of a layout an answer key covers.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct KeyCoverage {
    /// Questions of the layout that have a key entry.
    pub answered: usize,
    /// Questions on the layout.
    pub total: usize,
    /// Question numbers without a key entry, ascending.
    pub missing: Vec<u32>,
}

impl KeyCoverage {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

impl AnswerKey {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a key from a JSON object such as `{"1": "A", "2": "C"}`.
    pub fn from_json_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Draw one option per question uniformly from that question's choices.
    pub fn random<R: Rng + ?Sized>(layout: &LayoutConfig, rng: &mut R) -> Self {
        let answers = layout
            .questions
            .iter()
            .filter(|q| !q.choices.is_empty())
            .map(|q| {
                let pick = rng.gen_range(0..q.choices.len());
                (q.number, q.choices[pick].option.clone())
            })
            .collect();
        Self { answers }
    }

    /// Set the correct option for a question, returning the previous one.
    pub fn insert(&mut self, question: u32, option: impl Into<String>) -> Option<String> {
        self.answers.insert(question, option.into())
    }

    pub fn remove(&mut self, question: u32) -> Option<String> {
        self.answers.remove(&question)
    }

    pub fn get(&self, question: u32) -> Option<&str> {
        self.answers.get(&question).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    pub fn clear(&mut self) {
        self.answers.clear();
    }

    /// Iterate `(question, option)` pairs in question order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> + '_ {
        self.answers.iter().map(|(q, o)| (*q, o.as_str()))
    }

    /// Report which layout questions have a key entry.
    pub fn coverage(&self, layout: &LayoutConfig) -> KeyCoverage {
        let mut missing: Vec<u32> = layout
            .questions
            .iter()
            .map(|q| q.number)
            .filter(|n| !self.answers.contains_key(n))
            .collect();
        missing.sort_unstable();
        let total = layout.n_questions();
        KeyCoverage {
            answered: total - missing.len(),
            total,
            missing,
        }
    }
}

impl FromIterator<(u32, String)> for AnswerKey {
    fn from_iter<I: IntoIterator<Item = (u32, String)>>(iter: I) -> Self {
        Self {
            answers: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::grid_layout;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn random_key_uses_valid_options_for_every_question() {
        let layout = grid_layout(12, 5, 0);
        let mut rng = StdRng::seed_from_u64(7);
        let key = AnswerKey::random(&layout, &mut rng);
        assert_eq!(key.len(), 12);
        for q in &layout.questions {
            let opt = key.get(q.number).expect("every question keyed");
            assert!(q.choices.iter().any(|c| c.option == opt));
        }
        assert!(key.coverage(&layout).is_complete());
    }

    #[test]
    fn random_key_is_reproducible_for_a_seed() {
        let layout = grid_layout(20, 4, 0);
        let a = AnswerKey::random(&layout, &mut StdRng::seed_from_u64(3));
        let b = AnswerKey::random(&layout, &mut StdRng::seed_from_u64(3));
        assert_eq!(a, b);
    }

    #[test]
    fn coverage_lists_missing_questions() {
        let layout = grid_layout(4, 4, 0);
        let mut key = AnswerKey::new();
        key.insert(1, "A");
        key.insert(3, "C");
        key.insert(99, "B");
        let cov = key.coverage(&layout);
        assert_eq!(cov.total, 4);
        assert_eq!(cov.answered, 2);
        assert_eq!(cov.missing, vec![2, 4]);
        assert!(!cov.is_complete());
    }

    #[test]
    fn json_uses_question_numbers_as_keys() {
        let key: AnswerKey = [(2, "B".to_string()), (1, "A".to_string())]
            .into_iter()
            .collect();
        let json = serde_json::to_string(&key).expect("serialize");
        assert_eq!(json, r#"{"1":"A","2":"B"}"#);
        let back: AnswerKey = serde_json::from_str(&json).expect("parse");
        assert_eq!(back.get(2), Some("B"));
    }
}
