use chrono::NaiveDateTime;
use std::collections::BTreeSet;

use crate::archive::AgeWindow;

/// Size and staleness thresholds a thread must meet, inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Criteria {
    pub min_msg_count: usize,
    pub max_msg_count: usize,
    pub min_age_days: i64,
    pub max_age_days: i64,
}

impl Criteria {
    pub fn window(&self) -> AgeWindow {
        AgeWindow {
            min_days: self.min_age_days,
            max_days: self.max_age_days,
        }
    }

    pub fn accepts_size(&self, count: usize) -> bool {
        (self.min_msg_count..=self.max_msg_count).contains(&count)
    }

    pub fn accepts_age(&self, age_days: i64) -> bool {
        (self.min_age_days..=self.max_age_days).contains(&age_days)
    }
}

/// A candidate thread, built once per filtering pass
#[derive(Debug, Clone)]
pub struct ThreadRecord {
    /// First reference shared by every message of the thread
    pub thread_id: String,
    /// Message id of the earliest message
    pub root_id: String,
    pub subject: String,
    pub message_count: usize,
    /// Unique sender addresses
    pub participants: BTreeSet<String>,
    pub last_activity: NaiveDateTime,
    pub age_days: i64,
    /// Blob of the earliest message
    pub blob: String,
}

impl ThreadRecord {
    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    /// Blob prefix used in file names and as a fallback label
    pub fn short_blob(&self) -> &str {
        short_id(&self.blob)
    }
}

/// First 8 characters of an identifier
pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(8) {
        Some((i, _)) => &id[..i],
        None => id,
    }
}

/// Why groups were discarded during a filtering pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexReport {
    pub threads_seen: usize,
    pub dropped_size: usize,
    pub dropped_age: usize,
    pub dropped_undated: usize,
}
