mod client;
#[cfg(test)]
mod fake;
mod render;
mod types;

use std::path::Path;

pub use client::*;
#[cfg(test)]
pub(crate) use fake::FakeArchive;
pub use render::*;
pub use types::*;

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("'{0}' command not found in PATH")]
    ToolMissing(String),
    #[error("{command} failed (exit code {code:?}): {stderr}")]
    Command {
        command: String,
        code: Option<i32>,
        stderr: String,
    },
    #[error("{0} timed out")]
    Timeout(String),
    #[error("no local archive repository configured")]
    NoRepo,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Operations the thread picker needs from the mail archive.
pub trait Archive {
    /// All messages dated inside the window, with their threads.
    fn query(&self, window: AgeWindow) -> Result<Vec<MessageRecord>, ArchiveError>;

    /// Body lines of one message, headers stripped.
    fn fetch_body(&self, blob: &str) -> Result<Vec<String>, ArchiveError>;

    /// Write the whole thread containing `message_id` to `destination` as text.
    fn export_thread(&self, message_id: &str, destination: &Path) -> Result<(), ArchiveError>;
}
