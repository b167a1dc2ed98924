use crate::pipeline::{is_known_id, ScanResult};
use crate::scoring::QuestionReading;

/// What to do with results flagged as suspicious.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuspiciousPolicy {
    /// Store them like any other result.
    #[default]
    Record,
    /// Leave the session untouched.
    Discard,
}

/// One stored result.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SessionEntry {
    /// 1-based position in the session.
    pub id: usize,
    /// Fully decoded identifier, `None` when unknown.
    pub student_id: Option<String>,
    pub correct_count: usize,
    pub wrong_count: usize,
    pub blank_count: usize,
    pub multi_count: usize,
    pub net_score: f64,
    pub readings: Vec<QuestionReading>,
    pub suspicious: bool,
    pub suspicious_reasons: Vec<String>,
}

impl SessionEntry {
    /// Copy the session-relevant parts of a scan result.
    ///
    /// `id` is a placeholder until the entry is merged.
    pub fn from_result(result: &ScanResult) -> Self {
        Self {
            id: 0,
            student_id: result.known_student_id().map(str::to_owned),
            correct_count: result.correct_count,
            wrong_count: result.wrong_count,
            blank_count: result.blank_count,
            multi_count: result.multi_count,
            net_score: result.net_score,
            readings: result.readings.clone(),
            suspicious: result.suspicious,
            suspicious_reasons: result.suspicious_reasons.clone(),
        }
    }
}

/// Effect of a single [`SessionAggregator::merge`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MergeOutcome {
    Appended { id: usize },
    Replaced { id: usize },
    Discarded,
}

/// Summary over the current entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SessionStats {
    pub entries: usize,
    pub suspicious: usize,
    /// Entries stored without a known identifier.
    pub unknown_ids: usize,
    /// `None` for an empty session.
    pub mean_net: Option<f64>,
    pub best_net: Option<f64>,
    pub worst_net: Option<f64>,
}

/// Ordered, deduplicating store of graded sheets.
///
/// Merging takes `&mut self`; share across threads behind a lock.
#[derive(Debug, Clone, Default)]
pub struct SessionAggregator {
    entries: Vec<SessionEntry>,
    policy: SuspiciousPolicy,
}

impl SessionAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: SuspiciousPolicy) -> Self {
        Self {
            entries: Vec::new(),
            policy,
        }
    }

    pub fn policy(&self) -> SuspiciousPolicy {
        self.policy
    }

    /// Add a result to the session.
    ///
    /// A known identifier that is already stored replaces that entry in
    /// place; anything else is appended. Ids are renumbered `1..=N` after
    /// each merge.
    pub fn merge(&mut self, result: &ScanResult) -> MergeOutcome {
        if result.suspicious && self.policy == SuspiciousPolicy::Discard {
            tracing::debug!("suspicious result discarded from session");
            return MergeOutcome::Discarded;
        }

        let entry = SessionEntry::from_result(result);
        let existing = entry.student_id.as_deref().and_then(|sid| {
            self.entries
                .iter()
                .position(|e| e.student_id.as_deref() == Some(sid))
        });

        let (idx, replaced) = match existing {
            Some(idx) => {
                self.entries[idx] = entry;
                (idx, true)
            }
            None => {
                self.entries.push(entry);
                (self.entries.len() - 1, false)
            }
        };
        self.renumber();

        let id = idx + 1;
        if replaced {
            tracing::info!("session entry #{} replaced", id);
            MergeOutcome::Replaced { id }
        } else {
            tracing::info!("session entry #{} appended", id);
            MergeOutcome::Appended { id }
        }
    }

    fn renumber(&mut self) {
        for (i, e) in self.entries.iter_mut().enumerate() {
            e.id = i + 1;
        }
    }

    pub fn entries(&self) -> &[SessionEntry] {
        &self.entries
    }

    /// Owned copy of the entries.
    pub fn snapshot(&self) -> Vec<SessionEntry> {
        self.entries.clone()
    }

    /// Entry with the given known identifier.
    pub fn find(&self, student_id: &str) -> Option<&SessionEntry> {
        if !is_known_id(student_id) {
            return None;
        }
        self.entries
            .iter()
            .find(|e| e.student_id.as_deref() == Some(student_id))
    }

    pub fn stats(&self) -> SessionStats {
        let n = self.entries.len();
        let nets = self.entries.iter().map(|e| e.net_score);
        let (best, worst) = nets.clone().fold((None, None), |(b, w), v| {
            (
                Some(b.map_or(v, |b: f64| b.max(v))),
                Some(w.map_or(v, |w: f64| w.min(v))),
            )
        });
        SessionStats {
            entries: n,
            suspicious: self.entries.iter().filter(|e| e.suspicious).count(),
            unknown_ids: self.entries.iter().filter(|e| e.student_id.is_none()).count(),
            mean_net: (n > 0).then(|| nets.sum::<f64>() / n as f64),
            best_net: best,
            worst_net: worst,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
