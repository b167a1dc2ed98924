/// Hard failures of a single scan. No partial result is produced.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// The input image has zero width or height.
    EmptyImage,
    /// At least one corner marker could not be located.
    GeometryNotFound { reasons: Vec<String> },
    /// The markers were found but the quad is implausible or degenerate.
    GeometryRejected { reasons: Vec<String> },
    /// An answer-key sheet yielded no readable question.
    AnswerKeyUnreadable { questions: usize },
}

impl PipelineError {
    /// Human-readable reason list.
    pub fn reasons(&self) -> Vec<String> {
        match self {
            Self::EmptyImage => vec!["empty image".to_string()],
            Self::GeometryNotFound { reasons } | Self::GeometryRejected { reasons } => {
                reasons.clone()
            }
            Self::AnswerKeyUnreadable { questions } => {
                vec![format!("none of {} questions could be read", questions)]
            }
        }
    }
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyImage => write!(f, "empty image"),
            Self::GeometryNotFound { reasons } => {
                write!(f, "sheet not found: {}", reasons.join("; "))
            }
            Self::GeometryRejected { reasons } => {
                write!(f, "sheet geometry rejected: {}", reasons.join("; "))
            }
            Self::AnswerKeyUnreadable { questions } => write!(
                f,
                "answer key unreadable: none of {} questions could be read",
                questions
            ),
        }
    }
}

impl std::error::Error for PipelineError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_lists_every_reason() {
        let err = PipelineError::GeometryRejected {
            reasons: vec!["skew-horizontal: 0.300 exceeds 0.150".into(), "area-too-small".into()],
        };
        let msg = err.to_string();
        assert!(msg.starts_with("sheet geometry rejected"));
        assert!(msg.contains("skew-horizontal"));
        assert!(msg.contains("area-too-small"));
        assert_eq!(err.reasons().len(), 2);
    }
}
