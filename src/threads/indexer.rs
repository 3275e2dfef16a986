use chrono::NaiveDateTime;
use std::collections::{BTreeSet, HashMap};

use super::types::{Criteria, IndexReport, ThreadRecord};
use crate::archive::MessageRecord;

const SECONDS_PER_DAY: i64 = 86_400;

/// Group messages into threads and keep those matching `criteria`.
///
/// Messages are grouped by their first reference (or their own id when they
/// have none). A group is dropped when its size or age falls outside the
/// criteria, or when none of its messages carries a usable date. Undated
/// messages still count toward the size. Threads come back in first-seen
/// order; use [`sort_by_age`] for display order.
pub fn build_threads(
    messages: Vec<MessageRecord>,
    criteria: &Criteria,
    now: NaiveDateTime,
) -> (Vec<ThreadRecord>, IndexReport) {
    // 1. Group by thread key, remembering first-seen order
    let mut key_to_idx: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(String, Vec<MessageRecord>)> = Vec::new();
    for msg in messages {
        let Some(key) = msg.thread_key().map(str::to_string) else {
            continue;
        };
        match key_to_idx.get(&key) {
            Some(&idx) => groups[idx].1.push(msg),
            None => {
                key_to_idx.insert(key.clone(), groups.len());
                groups.push((key, vec![msg]));
            }
        }
    }

    let mut report = IndexReport {
        threads_seen: groups.len(),
        ..IndexReport::default()
    };
    let mut threads = Vec::new();

    for (thread_id, mut msgs) in groups {
        // 2. Size
        let message_count = msgs.len();
        if !criteria.accepts_size(message_count) {
            report.dropped_size += 1;
            continue;
        }

        // 3. Last activity
        let Some(last_activity) = msgs.iter().filter_map(|m| m.date).max() else {
            report.dropped_undated += 1;
            continue;
        };

        // 4. Age in whole days, rounded down
        let age_days = (now - last_activity)
            .num_seconds()
            .div_euclid(SECONDS_PER_DAY);
        if !criteria.accepts_age(age_days) {
            report.dropped_age += 1;
            continue;
        }

        // 5. Participants by address only
        let participants: BTreeSet<String> = msgs
            .iter()
            .flat_map(|m| m.senders.iter())
            .filter_map(|s| s.addr.clone())
            .filter(|a| !a.is_empty())
            .collect();

        // 6. Earliest dated message describes the thread; undated sort last
        msgs.sort_by_key(|m| (m.date.is_none(), m.date));
        let first = msgs.swap_remove(0);
        let root_id = first
            .message_id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| thread_id.clone());

        threads.push(ThreadRecord {
            thread_id,
            root_id,
            subject: first
                .subject
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| "(No Subject)".to_string()),
            message_count,
            participants,
            last_activity,
            age_days,
            blob: first.blob,
        });
    }

    tracing::info!(
        "Filtered out: {} by size, {} by date, {} undated ({} of {} threads kept)",
        report.dropped_size,
        report.dropped_age,
        report.dropped_undated,
        threads.len(),
        report.threads_seen
    );

    (threads, report)
}

/// Display order: youngest threads first, ties keep their order
pub fn sort_by_age(threads: &mut [ThreadRecord]) {
    threads.sort_by_key(|t| t.age_days);
}
