//! Session store for graded sheets and its plain-text log.
//!
//! A session collects one [`SessionEntry`] per student. Rescanning a sheet
//! whose identifier is already present replaces the earlier entry instead of
//! adding a duplicate; sheets with an unreadable identifier are always
//! appended.

mod aggregator;
mod log;

pub use aggregator::{
    MergeOutcome, SessionAggregator, SessionEntry, SessionStats, SuspiciousPolicy,
};
pub use log::{format_log_line, SessionLog};
