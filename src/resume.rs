use std::collections::HashSet;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use chrono::NaiveDate;

pub const INDEX_FILENAME: &str = "index.md";

const DATE_FORMAT: &str = "%Y-%m-%d";
const SECTION_HEADING: &str = "## Selected Threads";
const HEADING_SUFFIX: &str = " - Raw Materials";

#[derive(Debug, thiserror::Error)]
pub enum ResumeError {
    #[error("refusing to rewrite {0}: front matter cannot be parsed")]
    Corrupt(PathBuf),
    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexStatus {
    Missing,
    Loaded,
    Corrupt,
}

/// One exported thread as listed in the index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub subject: String,
    pub filename: String,
    pub root_id: String,
}

/// What has already been exported for an edition
#[derive(Debug, Clone)]
pub struct ResumeIndex {
    pub edition: i64,
    pub created: Option<NaiveDate>,
    pub done_ids: HashSet<String>,
    pub entries: Vec<IndexEntry>,
    pub status: IndexStatus,
}

impl ResumeIndex {
    pub fn empty(edition: i64, status: IndexStatus) -> Self {
        Self {
            edition,
            created: None,
            done_ids: HashSet::new(),
            entries: Vec::new(),
            status,
        }
    }
}

/// Per-edition `threads_<n>/index.md` documents below a base directory
pub struct ResumeStore {
    base_dir: PathBuf,
    title: String,
}

impl ResumeStore {
    pub fn new(base_dir: impl Into<PathBuf>, title: impl Into<String>) -> Self {
        Self {
            base_dir: base_dir.into(),
            title: title.into(),
        }
    }

    pub fn threads_dir(&self, edition: i64) -> PathBuf {
        self.base_dir.join(format!("threads_{}", edition))
    }

    /// Create the edition's directory if needed
    pub fn ensure_dir(&self, edition: i64) -> io::Result<PathBuf> {
        let dir = self.threads_dir(edition);
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    pub fn index_path(&self, edition: i64) -> PathBuf {
        self.threads_dir(edition).join(INDEX_FILENAME)
    }

    /// Load the edition's index. A missing document is an empty history; an
    /// unreadable one is treated the same way but flagged as corrupt.
    pub fn load(&self, edition: i64) -> ResumeIndex {
        let path = self.index_path(edition);
        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return ResumeIndex::empty(edition, IndexStatus::Missing);
            }
            Err(e) => {
                tracing::warn!("Cannot read {}: {}", path.display(), e);
                return ResumeIndex::empty(edition, IndexStatus::Corrupt);
            }
        };

        let Some(doc) = Document::parse(&content) else {
            tracing::warn!(
                "Ignoring {}: front matter cannot be parsed",
                path.display()
            );
            return ResumeIndex::empty(edition, IndexStatus::Corrupt);
        };

        if doc.edition != edition {
            tracing::warn!(
                "{} claims edition {}, expected {}",
                path.display(),
                doc.edition,
                edition
            );
        }

        ResumeIndex {
            edition,
            created: doc.created,
            done_ids: doc.done_ids,
            entries: doc.entries,
            status: IndexStatus::Loaded,
        }
    }

    /// Append entries for threads not yet recorded and rewrite the index.
    ///
    /// The document is re-read before writing so edits made since `index`
    /// was loaded survive, and so repeated calls never duplicate entries.
    /// Returns the number of entries appended.
    pub fn merge_and_save(
        &self,
        index: &ResumeIndex,
        exported: &[IndexEntry],
        today: NaiveDate,
    ) -> Result<usize, ResumeError> {
        let path = self.index_path(index.edition);
        let existing = match fs::read_to_string(&path) {
            Ok(c) => Some(c),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };

        let doc = match &existing {
            Some(content) => {
                Some(Document::parse(content).ok_or_else(|| ResumeError::Corrupt(path.clone()))?)
            }
            None => None,
        };

        let mut done: HashSet<String> = index.done_ids.clone();
        if let Some(doc) = &doc {
            done.extend(doc.done_ids.iter().cloned());
        }
        let new_entries: Vec<&IndexEntry> = exported
            .iter()
            .filter(|e| done.insert(e.root_id.clone()))
            .collect();
        if new_entries.is_empty() {
            return Ok(0);
        }

        let created = doc
            .as_ref()
            .and_then(|d| d.created)
            .or(index.created)
            .unwrap_or(today);
        let body = doc.as_ref().map(|d| d.body.as_str()).unwrap_or("");

        let mut sections = vec![if body.is_empty() {
            SECTION_HEADING.to_string()
        } else {
            body.to_string()
        }];
        sections.extend(new_entries.iter().map(|e| format_entry(e)));

        let extra_front: String = doc
            .as_ref()
            .map(|d| d.extra_front.iter().map(|line| format!("{}\n", line)).collect())
            .unwrap_or_default();

        let content = format!(
            "---\nedition: {}\ncreated: {}\n{}---\n\n# {} Edition {}{}\n\n{}\n",
            index.edition,
            created.format(DATE_FORMAT),
            extra_front,
            self.title,
            index.edition,
            HEADING_SUFFIX,
            sections.join("\n\n")
        );

        let dir = self.ensure_dir(index.edition)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.persist(&path).map_err(|e| e.error)?;

        tracing::info!(
            "Recorded {} thread(s) in {}",
            new_entries.len(),
            path.display()
        );
        Ok(new_entries.len())
    }
}

fn format_entry(entry: &IndexEntry) -> String {
    format!(
        "- **{}**\n  - File: {}\n  - Message-ID: {}\n  - Notes:",
        entry.subject,
        code_span(&entry.filename),
        code_span(&entry.root_id)
    )
}

/// Inline code; values holding a backtick get a double fence
fn code_span(value: &str) -> String {
    if value.contains('`') {
        format!("`` {} ``", value)
    } else {
        format!("`{}`", value)
    }
}

/// A parsed index document
struct Document {
    edition: i64,
    created: Option<NaiveDate>,
    /// Front matter lines other than `edition` and `created`, verbatim
    extra_front: Vec<String>,
    /// Everything after the front matter and title, without surrounding
    /// blank lines
    body: String,
    done_ids: HashSet<String>,
    entries: Vec<IndexEntry>,
}

impl Document {
    fn parse(content: &str) -> Option<Self> {
        let content = content.replace("\r\n", "\n");
        let rest = content.strip_prefix("---\n")?;
        let (front, after) = match rest.strip_prefix("---") {
            Some(after) => ("", after),
            None => {
                let end = rest.find("\n---")?;
                (&rest[..end], &rest[end + 4..])
            }
        };

        let mut edition = None;
        let mut created = None;
        let mut extra_front = Vec::new();
        for line in front.lines() {
            match line.split_once(':').map(|(key, value)| (key.trim(), value)) {
                Some(("edition", value)) => edition = Some(value.trim().parse::<i64>().ok()?),
                Some(("created", value)) => {
                    created = NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).ok()
                }
                _ if line.trim().is_empty() => {}
                _ => extra_front.push(line.to_string()),
            }
        }

        let lines: Vec<&str> = after
            .lines()
            .filter(|line| !(line.starts_with("# ") && line.trim_end().ends_with(HEADING_SUFFIX)))
            .collect();
        let start = lines
            .iter()
            .position(|l| !l.trim().is_empty())
            .unwrap_or(lines.len());
        let end = lines
            .iter()
            .rposition(|l| !l.trim().is_empty())
            .map_or(start, |i| i + 1);
        let body = lines[start..end].join("\n");
        let (done_ids, entries) = parse_entries(&body);

        Some(Self {
            edition: edition?,
            created,
            extra_front,
            body,
            done_ids,
            entries,
        })
    }
}

/// Collect recorded message ids and the entries they belong to.
///
/// Any indented `- Message-ID:` bullet marks its id as done, even when the
/// surrounding entry was edited beyond recognition.
fn parse_entries(body: &str) -> (HashSet<String>, Vec<IndexEntry>) {
    let mut done = HashSet::new();
    let mut entries = Vec::new();
    let mut current: Option<IndexEntry> = None;

    for line in body.lines() {
        if let Some(subject) = line
            .trim_end()
            .strip_prefix("- **")
            .and_then(|s| s.strip_suffix("**"))
        {
            current = Some(IndexEntry {
                subject: subject.to_string(),
                filename: String::new(),
                root_id: String::new(),
            });
            continue;
        }

        if !line.starts_with([' ', '\t']) {
            continue;
        }
        let Some(field) = line.trim_start().strip_prefix('-').map(str::trim_start) else {
            continue;
        };

        if let Some(value) = field.strip_prefix("File:") {
            if let (Some(entry), Some(name)) = (current.as_mut(), backticked(value)) {
                entry.filename = name.to_string();
            }
        } else if let Some(value) = field.strip_prefix("Message-ID:") {
            if let Some(id) = backticked(value) {
                done.insert(id.to_string());
                if let Some(mut entry) = current.take() {
                    entry.root_id = id.to_string();
                    entries.push(entry);
                }
            }
        }
    }

    (done, entries)
}

/// Content of the code span on a line, from the first to the last backtick.
/// A double fence drops the padding spaces inside it.
fn backticked(s: &str) -> Option<&str> {
    let start = s.find('`')?;
    let end = s.rfind('`')?;
    if end == start {
        return None;
    }
    let span = &s[start..=end];
    let mut fence = span.chars().take_while(|&c| c == '`').count().min(2);
    if span.len() < 2 * fence {
        fence = 1;
    }
    let inner = &span[fence..span.len() - fence];
    let inner = if fence > 1 { inner.trim_matches(' ') } else { inner };
    Some(inner).filter(|id| !id.is_empty())
}
