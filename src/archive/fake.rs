use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use super::{AgeWindow, Archive, ArchiveError, MessageRecord};

/// In-memory archive that records calls. Ids in `failing` fail to export;
/// blobs missing from `bodies` time out.
#[derive(Default)]
pub(crate) struct FakeArchive {
    pub failing: HashSet<String>,
    pub bodies: HashMap<String, Vec<String>>,
    pub exports: RefCell<Vec<(String, PathBuf)>>,
    pub body_requests: RefCell<Vec<String>>,
}

impl Archive for FakeArchive {
    fn query(&self, _window: AgeWindow) -> Result<Vec<MessageRecord>, ArchiveError> {
        Ok(Vec::new())
    }

    fn fetch_body(&self, blob: &str) -> Result<Vec<String>, ArchiveError> {
        self.body_requests.borrow_mut().push(blob.to_string());
        self.bodies
            .get(blob)
            .cloned()
            .ok_or_else(|| ArchiveError::Timeout("git".to_string()))
    }

    fn export_thread(&self, message_id: &str, destination: &Path) -> Result<(), ArchiveError> {
        self.exports
            .borrow_mut()
            .push((message_id.to_string(), destination.to_path_buf()));
        if self.failing.contains(message_id) {
            return Err(ArchiveError::Command {
                command: "lei".to_string(),
                code: Some(1),
                stderr: "no such message".to_string(),
            });
        }
        std::fs::write(destination, format!("thread {}", message_id))?;
        Ok(())
    }
}
