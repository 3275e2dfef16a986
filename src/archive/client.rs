use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::time::{Duration, Instant};

use chrono::NaiveDateTime;

use super::render::{body_lines, parse_mbox, render_thread};
use super::types::{AgeWindow, MessageRecord, parse_query_output};
use super::{Archive, ArchiveError};
use crate::config::ArchiveConfig;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Archive backed by `lei` and a local public-inbox mirror
pub struct Lei {
    lei: String,
    git: String,
    repo: Option<PathBuf>,
    preview_timeout: Duration,
}

impl Lei {
    pub fn new(config: &ArchiveConfig, repo: Option<PathBuf>) -> Self {
        Self {
            lei: config.lei.clone(),
            git: config.git.clone(),
            repo,
            preview_timeout: Duration::from_secs(config.preview_timeout_secs),
        }
    }

    /// Connect using the configured repository, or the first local external
    /// registered with lei. Fails when lei itself cannot be run.
    pub fn connect(config: &ArchiveConfig) -> Result<Self, ArchiveError> {
        let mut lei = Self::new(config, None);
        let discovered = match lei.local_external() {
            Ok(path) => path,
            Err(e @ ArchiveError::ToolMissing(_)) => return Err(e),
            Err(e) => {
                tracing::warn!("Could not list lei externals: {}", e);
                None
            }
        };
        lei.repo = config.repo_path().or(discovered);
        Ok(lei)
    }

    pub fn repo(&self) -> Option<&Path> {
        self.repo.as_deref()
    }

    /// First local directory listed by `lei ls-external`
    fn local_external(&self) -> Result<Option<PathBuf>, ArchiveError> {
        let output = run(Command::new(&self.lei).arg("ls-external"), &self.lei)?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout
            .lines()
            .map(str::trim)
            .filter(|line| line.starts_with('/'))
            .filter_map(|line| line.split_whitespace().next())
            .map(PathBuf::from)
            .find(|path| path.is_dir()))
    }

    /// Date of the most recently received message in the mirror
    pub fn latest_message_date(&self) -> Result<Option<NaiveDateTime>, ArchiveError> {
        let repo = self.repo.as_ref().ok_or(ArchiveError::NoRepo)?;
        let mut cmd = Command::new(&self.lei);
        cmd.args(["q", "--only"])
            .arg(repo)
            .args(["-n", "1", "-s", "received", "dt:1.month.ago..", "-f", "json"]);
        let output = run(&mut cmd, &self.lei)?;

        Ok(parse_query_output(&output.stdout)
            .into_iter()
            .next()
            .and_then(|m| m.date))
    }

    /// Directory to run git in: `all.git` for v2 inboxes
    fn git_dir(&self) -> Option<PathBuf> {
        let repo = self.repo.as_ref()?;
        let all = repo.join("all.git");
        if all.is_dir() {
            Some(all)
        } else if repo.is_dir() {
            Some(repo.clone())
        } else {
            None
        }
    }
}

impl Archive for Lei {
    fn query(&self, window: AgeWindow) -> Result<Vec<MessageRecord>, ArchiveError> {
        let date_query = format!("d:{}.days.ago..{}.days.ago", window.max_days, window.min_days);
        let mut cmd = Command::new(&self.lei);
        cmd.args(["q", "-t", "-f", "json", &date_query]);
        tracing::debug!("Running {} q -t -f json {}", self.lei, date_query);

        let output = run(&mut cmd, &self.lei)?;
        Ok(parse_query_output(&output.stdout))
    }

    fn fetch_body(&self, blob: &str) -> Result<Vec<String>, ArchiveError> {
        let mut cmd = Command::new(&self.git);
        cmd.args(["show", blob]);
        if let Some(dir) = self.git_dir() {
            cmd.current_dir(dir);
        }

        let raw = run_with_timeout(&mut cmd, &self.git, self.preview_timeout)?;
        Ok(body_lines(&raw))
    }

    fn export_thread(&self, message_id: &str, destination: &Path) -> Result<(), ArchiveError> {
        let mbox = tempfile::NamedTempFile::new()?;
        let raw_id = message_id.trim().trim_start_matches("m:").trim_matches(['<', '>', ' ']);

        let mut cmd = Command::new(&self.lei);
        cmd.args(["q", "-t", "-o"])
            .arg(format!("mboxrd:{}", mbox.path().display()));
        if let Some(repo) = &self.repo {
            cmd.arg("--only").arg(repo);
        }
        cmd.arg(format!("m:\"<{}>\"", raw_id));
        run(&mut cmd, &self.lei)?;

        let messages = parse_mbox(BufReader::new(mbox.reopen()?));
        std::fs::write(destination, render_thread(&messages, raw_id))?;
        tracing::info!(
            "Wrote {} messages to {}",
            messages.len(),
            destination.display()
        );
        Ok(())
    }
}

/// Run a command to completion, mapping spawn and exit failures.
fn run(cmd: &mut Command, name: &str) -> Result<Output, ArchiveError> {
    let output = cmd.output().map_err(|e| spawn_error(e, name))?;
    if !output.status.success() {
        return Err(ArchiveError::Command {
            command: name.to_string(),
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(output)
}

/// Run a command, killing it once `timeout` elapses.
///
/// Stdout goes to a temporary file so a chatty child can never block on a
/// full pipe while we poll.
fn run_with_timeout(
    cmd: &mut Command,
    name: &str,
    timeout: Duration,
) -> Result<Vec<u8>, ArchiveError> {
    let mut out = tempfile::tempfile()?;
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(out.try_clone()?)
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| spawn_error(e, name))?;

    let started = Instant::now();
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if started.elapsed() >= timeout {
            let _ = child.kill();
            let _ = child.wait();
            return Err(ArchiveError::Timeout(name.to_string()));
        }
        std::thread::sleep(POLL_INTERVAL);
    };

    if !status.success() {
        return Err(ArchiveError::Command {
            command: name.to_string(),
            code: status.code(),
            stderr: String::new(),
        });
    }

    let mut raw = Vec::new();
    out.seek(SeekFrom::Start(0))?;
    out.read_to_end(&mut raw)?;
    Ok(raw)
}

fn spawn_error(e: std::io::Error, name: &str) -> ArchiveError {
    if e.kind() == std::io::ErrorKind::NotFound {
        ArchiveError::ToolMissing(name.to_string())
    } else {
        ArchiveError::Io(e)
    }
}

/// True when the newest archived message is at most `max_days` old
pub fn is_fresh(latest: Option<NaiveDateTime>, now: NaiveDateTime, max_days: i64) -> bool {
    latest.is_some_and(|dt| (now - dt).num_days() <= max_days)
}
