//! Print how the configured filter treats the current search window.

use anyhow::{Context, Result};
use chrono::Local;

use threadpick::archive::{Archive, Lei};
use threadpick::config::Config;
use threadpick::threads::{build_threads, Criteria};

fn main() -> Result<()> {
    threadpick::logging::init()?;
    let config = Config::load();
    let criteria = config.criteria();
    let now = Local::now().naive_local();

    let lei = Lei::connect(&config.archive)?;
    let messages = lei
        .query(criteria.window())
        .context("Failed to query the archive")?;
    println!(
        "Messages between {} and {} days old: {}",
        criteria.min_age_days,
        criteria.max_age_days,
        messages.len()
    );

    // Every thread with a dated message, whatever its size
    let everything = Criteria {
        min_msg_count: 1,
        max_msg_count: usize::MAX,
        ..criteria
    };
    let (all, report) = build_threads(messages.clone(), &everything, now);
    println!("Threads: {} ({} undated)", report.threads_seen, report.dropped_undated);

    let buckets: [(&str, usize, usize); 5] = [
        ("1 message", 1, 1),
        ("2-4 messages", 2, 4),
        ("5-10 messages", 5, 10),
        ("11-40 messages", 11, 40),
        ("41+ messages", 41, usize::MAX),
    ];
    println!("\nThread size distribution:");
    for (label, lo, hi) in buckets {
        let count = all
            .iter()
            .filter(|t| (lo..=hi).contains(&t.message_count))
            .count();
        println!("  {:<15} {}", label, count);
    }

    let mut largest: Vec<_> = all.iter().collect();
    largest.sort_by(|a, b| b.message_count.cmp(&a.message_count));
    println!("\nTop 20 largest threads:");
    for (i, t) in largest.iter().take(20).enumerate() {
        let subject: String = t.subject.chars().take(50).collect();
        println!(
            "  {:2}. {:4} msgs {:3} ppl {:3}d - {}",
            i + 1,
            t.message_count,
            t.participant_count(),
            t.age_days,
            subject
        );
    }

    let (kept, report) = build_threads(messages, &criteria, now);
    println!(
        "\nFilter {}-{} messages, {}-{} days: {} kept, {} too small or large, {} too young or old",
        criteria.min_msg_count,
        criteria.max_msg_count,
        criteria.min_age_days,
        criteria.max_age_days,
        kept.len(),
        report.dropped_size,
        report.dropped_age
    );

    Ok(())
}
