use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;

use crate::archive::Archive;
use crate::resume::{IndexEntry, ResumeStore};
use crate::threads::{short_id, ThreadRecord};

const MAX_FILENAME_STEM: usize = 50;

/// Filesystem-safe stem built from a subject line.
///
/// Drops everything but word characters, whitespace and hyphens, turns runs
/// of whitespace and hyphens into a single hyphen and trims hyphens from
/// both ends.
pub fn sanitize_filename(name: &str) -> String {
    let kept: String = name
        .chars()
        .filter(|&c| c.is_alphanumeric() || c == '_' || c == '-' || c.is_whitespace())
        .collect();

    let mut collapsed = String::with_capacity(kept.len());
    let mut in_run = false;
    for c in kept.chars() {
        if c == '-' || c.is_whitespace() {
            if !in_run {
                collapsed.push('-');
            }
            in_run = true;
        } else {
            collapsed.push(c);
            in_run = false;
        }
    }

    collapsed
        .trim_matches('-')
        .chars()
        .take(MAX_FILENAME_STEM)
        .collect()
}

#[derive(Debug, Default)]
pub struct ProcessReport {
    pub exported: Vec<String>,
    pub failed: Vec<String>,
    /// Entries newly added to the edition's index
    pub recorded: usize,
    pub output_dir: PathBuf,
}

/// Exports the chosen threads and records them in the edition's index
pub struct ThreadProcessor<'a> {
    archive: &'a dyn Archive,
    store: &'a ResumeStore,
    edition: i64,
}

impl<'a> ThreadProcessor<'a> {
    pub fn new(archive: &'a dyn Archive, store: &'a ResumeStore, edition: i64) -> Self {
        Self {
            archive,
            store,
            edition,
        }
    }

    /// Export `selected` root ids in order. A failed export is logged and
    /// skipped; only successful ones reach the index.
    pub fn process(
        &self,
        threads: &[ThreadRecord],
        selected: &[String],
        today: NaiveDate,
    ) -> Result<ProcessReport> {
        let dir = self
            .store
            .ensure_dir(self.edition)
            .with_context(|| format!("Failed to create threads directory for edition {}", self.edition))?;
        let by_root: HashMap<&str, &ThreadRecord> =
            threads.iter().map(|t| (t.root_id.as_str(), t)).collect();

        let mut report = ProcessReport {
            output_dir: dir.clone(),
            ..ProcessReport::default()
        };
        let mut entries = Vec::new();

        for root_id in selected {
            let thread = by_root.get(root_id.as_str()).copied();
            let subject = thread.map_or("unknown", |t| t.subject.as_str());
            let locator = thread.map_or_else(|| short_id(root_id), |t| t.short_blob());
            let filename = format!("{}_{}.txt", sanitize_filename(subject), locator);

            tracing::info!("Fetching thread {}: {}", root_id, subject);
            match self.archive.export_thread(root_id, &dir.join(&filename)) {
                Ok(()) => {
                    report.exported.push(root_id.clone());
                    if let Some(t) = thread {
                        entries.push(IndexEntry {
                            subject: t.subject.clone(),
                            filename,
                            root_id: root_id.clone(),
                        });
                    }
                }
                Err(e) => {
                    tracing::error!("Failed to fetch thread {}: {}", root_id, e);
                    report.failed.push(root_id.clone());
                }
            }
        }

        if !entries.is_empty() {
            let index = self.store.load(self.edition);
            match self.store.merge_and_save(&index, &entries, today) {
                Ok(n) => report.recorded = n,
                Err(e) => tracing::error!("Thread index not updated: {}", e),
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::thread;
    use crate::archive::FakeArchive;
    use std::collections::HashSet;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(
            sanitize_filename("[PATCH v2 3/7] refs: add --exclude option"),
            "PATCH-v2-37-refs-add-exclude-option"
        );
        assert_eq!(sanitize_filename("  -- hello   world --  "), "hello-world");
        assert_eq!(sanitize_filename("Re: ÆØÅ_test"), "Re-ÆØÅ_test");
        assert_eq!(sanitize_filename("!!!"), "");
        assert_eq!(sanitize_filename(&"x".repeat(80)).len(), 50);
    }

    #[test]
    fn test_exports_in_order_and_records_index() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResumeStore::new(dir.path(), "Git Rev News");
        let archive = FakeArchive::default();
        let threads = vec![
            thread("r0", "[PATCH] refs: fix locking", 21),
            thread("r1", "Git 2.52 release notes", 25),
        ];

        let processor = ThreadProcessor::new(&archive, &store, 140);
        let selected = vec!["r1".to_string(), "r0".to_string()];
        let report = processor.process(&threads, &selected, today()).unwrap();

        assert_eq!(report.exported, selected);
        assert!(report.failed.is_empty());
        assert_eq!(report.recorded, 2);

        let exports = archive.exports.borrow();
        let ids: Vec<&str> = exports.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["r1", "r0"]);
        assert_eq!(
            exports[0].1,
            dir.path()
                .join("threads_140")
                .join("Git-252-release-notes_r1012345.txt")
        );
        assert!(exports[0].1.exists());

        let index = store.load(140);
        let roots: Vec<&str> = index.entries.iter().map(|e| e.root_id.as_str()).collect();
        assert_eq!(roots, vec!["r1", "r0"]);
        assert_eq!(index.entries[1].filename, "PATCH-refs-fix-locking_r0012345.txt");
    }

    #[test]
    fn test_failure_is_skipped_and_not_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResumeStore::new(dir.path(), "Git Rev News");
        let archive = FakeArchive {
            failing: HashSet::from(["r0".to_string()]),
            ..FakeArchive::default()
        };
        let threads = vec![thread("r0", "first", 21), thread("r1", "second", 22)];

        let processor = ThreadProcessor::new(&archive, &store, 140);
        let selected = vec!["r0".to_string(), "r1".to_string()];
        let report = processor.process(&threads, &selected, today()).unwrap();

        assert_eq!(report.failed, vec!["r0".to_string()]);
        assert_eq!(report.exported, vec!["r1".to_string()]);
        assert_eq!(report.recorded, 1);
        assert_eq!(archive.exports.borrow().len(), 2);

        let index = store.load(140);
        assert!(!index.done_ids.contains("r0"));
        assert!(index.done_ids.contains("r1"));
    }

    #[test]
    fn test_unknown_id_is_exported_but_not_indexed() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResumeStore::new(dir.path(), "Git Rev News");
        let archive = FakeArchive::default();

        let processor = ThreadProcessor::new(&archive, &store, 140);
        let selected = vec!["abcdef0123456789@example.com".to_string()];
        let report = processor.process(&[], &selected, today()).unwrap();

        assert_eq!(report.exported, selected);
        assert_eq!(report.recorded, 0);
        assert_eq!(
            archive.exports.borrow()[0].1.file_name().unwrap(),
            "unknown_abcdef01.txt"
        );
        assert!(!store.index_path(140).exists());
    }

    #[test]
    fn test_reexport_does_not_duplicate_entries() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResumeStore::new(dir.path(), "Git Rev News");
        let archive = FakeArchive::default();
        let threads = vec![thread("r0", "first", 21), thread("r1", "second", 22)];
        let processor = ThreadProcessor::new(&archive, &store, 140);

        processor
            .process(&threads, &["r0".to_string()], today())
            .unwrap();
        let report = processor
            .process(&threads, &["r0".to_string(), "r1".to_string()], today())
            .unwrap();

        assert_eq!(report.exported.len(), 2);
        assert_eq!(report.recorded, 1);
        assert_eq!(store.load(140).entries.len(), 2);
    }

    #[test]
    fn test_corrupt_index_is_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResumeStore::new(dir.path(), "Git Rev News");
        let path = store.index_path(140);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "not front matter").unwrap();

        let archive = FakeArchive::default();
        let processor = ThreadProcessor::new(&archive, &store, 140);
        let threads = vec![thread("r0", "first", 21)];
        let report = processor
            .process(&threads, &["r0".to_string()], today())
            .unwrap();
        assert_eq!(report.exported, vec!["r0".to_string()]);
        assert_eq!(report.recorded, 0);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "not front matter");
    }
}
