use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::collections::{HashMap, HashSet};

use crate::archive::Archive;
use crate::threads::ThreadRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Browsing,
    Searching,
    HelpOverlay,
    /// Quit: the selection is final
    Done,
    /// Ctrl+C: leave without exporting anything
    Aborted,
}

/// Terminal-independent key press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Up,
    Down,
    Enter,
    Esc,
    Backspace,
    Char(char),
    TogglePreview,
    Interrupt,
}

impl Key {
    pub fn from_event(event: &KeyEvent) -> Option<Self> {
        if event.kind != KeyEventKind::Press {
            return None;
        }
        let ctrl = event.modifiers.contains(KeyModifiers::CONTROL);
        match event.code {
            KeyCode::Char('p') if ctrl => Some(Key::TogglePreview),
            KeyCode::Char('c') if ctrl => Some(Key::Interrupt),
            KeyCode::Char(_) if ctrl => None,
            KeyCode::Char(c) => Some(Key::Char(c)),
            KeyCode::Up => Some(Key::Up),
            KeyCode::Down => Some(Key::Down),
            KeyCode::Enter => Some(Key::Enter),
            KeyCode::Esc => Some(Key::Esc),
            KeyCode::Backspace => Some(Key::Backspace),
            _ => None,
        }
    }
}

/// Selector state: cursor, viewport, selection, search and preview cache
pub struct App {
    pub threads: Vec<ThreadRecord>,
    pub selected: Vec<bool>,
    pub cursor: usize,
    pub offset: usize,
    pub viewport_rows: usize,
    pub mode: Mode,
    prior_mode: Mode,
    pub search_term: String,
    pub matches: Vec<usize>,
    pub current_match: Option<usize>,
    pub show_preview: bool,
    pub done_ids: HashSet<String>,
    pub edition: Option<i64>,
    // Bodies by blob, kept for the whole session
    preview_cache: HashMap<String, Vec<String>>,
}

impl App {
    pub fn new(threads: Vec<ThreadRecord>, done_ids: HashSet<String>, edition: Option<i64>) -> Self {
        Self {
            selected: vec![false; threads.len()],
            threads,
            cursor: 0,
            offset: 0,
            viewport_rows: 1,
            mode: Mode::Browsing,
            prior_mode: Mode::Browsing,
            search_term: String::new(),
            matches: Vec::new(),
            current_match: None,
            show_preview: true,
            done_ids,
            edition,
            preview_cache: HashMap::new(),
        }
    }

    pub fn with_preview(mut self, show: bool) -> Self {
        self.show_preview = show;
        self
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.mode, Mode::Done | Mode::Aborted)
    }

    /// Apply one key press
    pub fn update(&mut self, key: Key) {
        if key == Key::Interrupt {
            self.mode = Mode::Aborted;
            return;
        }
        match self.mode {
            Mode::Browsing => self.handle_browsing(key),
            Mode::Searching => self.handle_searching(key),
            Mode::HelpOverlay => self.mode = self.prior_mode,
            Mode::Done | Mode::Aborted => {}
        }
        self.scroll_into_view();
    }

    fn handle_browsing(&mut self, key: Key) {
        match key {
            Key::Up | Key::Char('k') => self.previous(),
            Key::Down | Key::Char('j') => self.next(),
            Key::Char(' ') => self.toggle_current(),
            Key::Char('a') => self.toggle_all(),
            Key::Char('/') => self.start_search(),
            Key::Char('?') => {
                self.prior_mode = self.mode;
                self.mode = Mode::HelpOverlay;
            }
            Key::Char('n') => self.next_match(),
            Key::Char('p') => self.previous_match(),
            Key::Char('q') | Key::Char('Q') => self.mode = Mode::Done,
            Key::TogglePreview => self.show_preview = !self.show_preview,
            _ => {}
        }
    }

    fn handle_searching(&mut self, key: Key) {
        match key {
            Key::Enter => {
                self.mode = Mode::Browsing;
                if let Some(idx) = self.current_match_index() {
                    self.cursor = idx;
                }
            }
            Key::Esc => self.cancel_search(),
            Key::Backspace => {
                self.search_term.pop();
                self.apply_search();
            }
            Key::Down => self.next_match(),
            Key::Up => self.previous_match(),
            Key::TogglePreview => self.show_preview = !self.show_preview,
            Key::Char(c) if !c.is_control() => {
                self.search_term.push(c);
                self.apply_search();
            }
            _ => {}
        }
    }

    pub fn next(&mut self) {
        if !self.threads.is_empty() {
            self.cursor = (self.cursor + 1).min(self.threads.len() - 1);
        }
    }

    pub fn previous(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    /// Number of list rows on screen; keeps the cursor visible
    pub fn set_viewport(&mut self, rows: usize) {
        self.viewport_rows = rows.max(1);
        self.scroll_into_view();
    }

    fn scroll_into_view(&mut self) {
        if self.cursor < self.offset {
            self.offset = self.cursor;
        } else if self.cursor >= self.offset + self.viewport_rows {
            self.offset = self.cursor + 1 - self.viewport_rows;
        }
    }

    pub fn toggle_current(&mut self) {
        if let Some(bit) = self.selected.get_mut(self.cursor) {
            *bit = !*bit;
        }
    }

    /// Select everything, or clear everything when all are already selected
    pub fn toggle_all(&mut self) {
        let all_selected = self.selected.iter().all(|&s| s);
        self.selected.fill(!all_selected);
    }

    pub fn start_search(&mut self) {
        self.mode = Mode::Searching;
        self.search_term.clear();
        self.matches.clear();
        self.current_match = None;
    }

    pub fn cancel_search(&mut self) {
        self.mode = Mode::Browsing;
        self.search_term.clear();
        self.matches.clear();
        self.current_match = None;
    }

    fn apply_search(&mut self) {
        self.matches = self.find_matches(&self.search_term);
        self.current_match = if self.matches.is_empty() { None } else { Some(0) };
    }

    /// Indices of threads whose subject contains `term`, ignoring case
    pub fn find_matches(&self, term: &str) -> Vec<usize> {
        if term.is_empty() {
            return Vec::new();
        }
        let term = term.to_lowercase();
        self.threads
            .iter()
            .enumerate()
            .filter(|(_, t)| t.subject.to_lowercase().contains(&term))
            .map(|(i, _)| i)
            .collect()
    }

    fn current_match_index(&self) -> Option<usize> {
        self.current_match.and_then(|m| self.matches.get(m).copied())
    }

    pub fn next_match(&mut self) {
        if self.matches.is_empty() {
            return;
        }
        let next = self.current_match.map_or(0, |m| (m + 1) % self.matches.len());
        self.current_match = Some(next);
        self.cursor = self.matches[next];
    }

    pub fn previous_match(&mut self) {
        if self.matches.is_empty() {
            return;
        }
        let len = self.matches.len();
        let prev = self.current_match.map_or(len - 1, |m| (m + len - 1) % len);
        self.current_match = Some(prev);
        self.cursor = self.matches[prev];
    }

    pub fn current_thread(&self) -> Option<&ThreadRecord> {
        self.threads.get(self.cursor)
    }

    pub fn is_done(&self, thread: &ThreadRecord) -> bool {
        self.done_ids.contains(&thread.root_id)
    }

    pub fn selected_count(&self) -> usize {
        self.selected.iter().filter(|&&s| s).count()
    }

    /// Root ids of the selected threads, in list order
    pub fn selected_ids(&self) -> Vec<String> {
        self.threads
            .iter()
            .zip(&self.selected)
            .filter(|&(_, &sel)| sel)
            .map(|(t, _)| t.root_id.clone())
            .collect()
    }

    /// Fetch the current thread's body unless it is already cached
    pub fn load_preview_if_needed(&mut self, loader: impl FnOnce(&str) -> Vec<String>) {
        let Some(blob) = self.current_thread().map(|t| t.blob.clone()) else {
            return;
        };
        if blob.is_empty() || self.preview_cache.contains_key(&blob) {
            return;
        }
        let lines = loader(&blob);
        self.preview_cache.insert(blob, lines);
    }

    pub fn preview_lines(&self) -> &[String] {
        self.current_thread()
            .and_then(|t| self.preview_cache.get(&t.blob))
            .map(|lines| lines.as_slice())
            .unwrap_or(&[])
    }
}

/// Body lines for the preview pane, at most `max_lines`. A failed or
/// timed-out fetch shows as an empty preview.
pub fn fetch_preview(archive: &dyn Archive, blob: &str, max_lines: usize) -> Vec<String> {
    match archive.fetch_body(blob) {
        Ok(mut lines) => {
            lines.truncate(max_lines);
            lines
        }
        Err(e) => {
            tracing::debug!("Preview for {} unavailable: {}", blob, e);
            Vec::new()
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::archive::FakeArchive;
    use chrono::NaiveDate;
    use std::collections::BTreeSet;

    pub(crate) fn thread(root: &str, subject: &str, age_days: i64) -> ThreadRecord {
        ThreadRecord {
            thread_id: root.to_string(),
            root_id: root.to_string(),
            subject: subject.to_string(),
            message_count: 7,
            participants: BTreeSet::from(["a@example.com".to_string(), "b@example.com".to_string()]),
            last_activity: NaiveDate::from_ymd_opt(2026, 9, 1)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap(),
            age_days,
            blob: format!("{}0123456789", root),
        }
    }

    pub(crate) fn sample_app() -> App {
        let threads = vec![
            thread("r0", "[PATCH] refs: fix reftable locking", 21),
            thread("r1", "Git 2.52 release notes", 25),
            thread("r2", "[RFC] Rust in Git", 30),
            thread("r3", "[PATCH v2] refs: reftable compaction", 33),
            thread("r4", "What's cooking in git.git", 40),
            thread("r5", "[PATCH] docs: rust coding guidelines", 52),
        ];
        App::new(threads, HashSet::from(["r1".to_string()]), Some(140))
    }

    fn press(app: &mut App, keys: &[Key]) {
        for &key in keys {
            app.update(key);
        }
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            app.update(Key::Char(c));
        }
    }

    #[test]
    fn test_cursor_is_clamped() {
        let mut app = sample_app();
        press(&mut app, &[Key::Up, Key::Char('k')]);
        assert_eq!(app.cursor, 0);
        for _ in 0..10 {
            app.update(Key::Down);
        }
        assert_eq!(app.cursor, 5);
        app.update(Key::Char('k'));
        assert_eq!(app.cursor, 4);
    }

    #[test]
    fn test_viewport_follows_cursor() {
        let mut app = sample_app();
        app.set_viewport(3);
        press(&mut app, &[Key::Down, Key::Down]);
        assert_eq!((app.cursor, app.offset), (2, 0));
        app.update(Key::Down);
        assert_eq!((app.cursor, app.offset), (3, 1));
        press(&mut app, &[Key::Down, Key::Down]);
        assert_eq!((app.cursor, app.offset), (5, 3));
        press(&mut app, &[Key::Up, Key::Up]);
        assert_eq!((app.cursor, app.offset), (3, 3));
        app.update(Key::Up);
        assert_eq!((app.cursor, app.offset), (2, 2));

        // Shrinking the terminal keeps the cursor on screen
        app.cursor = 5;
        app.set_viewport(2);
        assert_eq!(app.offset, 4);
    }

    #[test]
    fn test_toggle_order_does_not_matter() {
        let mut first = sample_app();
        first.cursor = 0;
        first.update(Key::Char(' '));
        first.cursor = 2;
        first.update(Key::Char(' '));
        first.cursor = 0;
        first.update(Key::Char(' '));

        let mut second = sample_app();
        second.cursor = 2;
        second.update(Key::Char(' '));
        second.cursor = 0;
        second.update(Key::Char(' '));
        second.update(Key::Char(' '));

        assert_eq!(first.selected, second.selected);
        assert_eq!(first.selected_ids(), vec!["r2".to_string()]);
    }

    #[test]
    fn test_select_all_toggles() {
        let mut app = sample_app();
        app.update(Key::Char(' '));
        app.update(Key::Char('a'));
        assert!(app.selected.iter().all(|&s| s));
        app.update(Key::Char('a'));
        assert_eq!(app.selected_count(), 0);
    }

    #[test]
    fn test_quit_returns_ids_in_list_order() {
        let mut app = sample_app();
        press(&mut app, &[Key::Down, Key::Down, Key::Down]);
        app.update(Key::Char(' '));
        press(&mut app, &[Key::Up, Key::Up]);
        // r1 was exported before; selecting it again is allowed
        assert!(app.is_done(&app.threads[1]));
        app.update(Key::Char(' '));
        app.update(Key::Char('q'));

        assert_eq!(app.mode, Mode::Done);
        assert!(app.is_finished());
        assert_eq!(app.selected_ids(), vec!["r1".to_string(), "r3".to_string()]);

        // Done is terminal
        app.update(Key::Char(' '));
        assert_eq!(app.selected_count(), 2);
    }

    #[test]
    fn test_search_matches_and_wraparound() {
        let mut app = sample_app();
        app.update(Key::Char('/'));
        assert_eq!(app.mode, Mode::Searching);
        type_text(&mut app, "REFS");
        assert_eq!(app.matches, vec![0, 3]);
        assert_eq!(app.current_match, Some(0));

        // Typing 'q' or 'n' while searching extends the term
        type_text(&mut app, "n");
        assert!(app.matches.is_empty());
        assert_eq!(app.current_match, None);
        app.update(Key::Backspace);
        assert_eq!(app.matches, vec![0, 3]);

        app.update(Key::Enter);
        assert_eq!(app.mode, Mode::Browsing);
        assert_eq!(app.cursor, 0);

        let k = app.matches.len();
        for _ in 0..k {
            app.update(Key::Char('n'));
        }
        assert_eq!(app.current_match, Some(0));
        assert_eq!(app.cursor, 0);

        app.update(Key::Char('p'));
        assert_eq!(app.current_match, Some(1));
        assert_eq!(app.cursor, 3);
    }

    #[test]
    fn test_search_navigation_stays_in_search_mode() {
        let mut app = sample_app();
        app.update(Key::Char('/'));
        type_text(&mut app, "rust");
        assert_eq!(app.matches, vec![2, 5]);
        app.update(Key::Down);
        assert_eq!(app.mode, Mode::Searching);
        assert_eq!(app.cursor, 5);
        app.update(Key::Down);
        assert_eq!(app.cursor, 2);
        app.update(Key::Up);
        assert_eq!(app.cursor, 5);
    }

    #[test]
    fn test_search_leaves_selection_alone() {
        let mut app = sample_app();
        app.update(Key::Char(' '));
        app.update(Key::Char('/'));
        type_text(&mut app, "cooking");
        app.update(Key::Enter);
        assert_eq!(app.cursor, 4);
        assert_eq!(app.selected_ids(), vec!["r0".to_string()]);
    }

    #[test]
    fn test_escape_cancels_search() {
        let mut app = sample_app();
        app.update(Key::Down);
        app.update(Key::Char('/'));
        type_text(&mut app, "rust");
        app.update(Key::Esc);
        assert_eq!(app.mode, Mode::Browsing);
        assert!(app.search_term.is_empty());
        assert!(app.matches.is_empty());
        assert_eq!(app.current_match, None);
        assert_eq!(app.cursor, 1);

        // Without matches, n/p do nothing
        app.update(Key::Char('n'));
        assert_eq!(app.cursor, 1);
    }

    #[test]
    fn test_new_search_clears_previous_one() {
        let mut app = sample_app();
        app.update(Key::Char('/'));
        type_text(&mut app, "refs");
        app.update(Key::Enter);
        app.update(Key::Char('/'));
        assert!(app.search_term.is_empty());
        assert!(app.matches.is_empty());
        app.update(Key::Enter);
        assert_eq!(app.cursor, 0);
    }

    #[test]
    fn test_help_overlay_has_no_side_effects() {
        let mut app = sample_app();
        app.update(Key::Char('?'));
        assert_eq!(app.mode, Mode::HelpOverlay);
        app.update(Key::Char(' '));
        assert_eq!(app.mode, Mode::Browsing);
        assert_eq!(app.selected_count(), 0);

        app.update(Key::Char('?'));
        app.update(Key::Char('q'));
        assert_eq!(app.mode, Mode::Browsing);

        app.update(Key::Char('?'));
        app.update(Key::TogglePreview);
        assert!(app.show_preview);
    }

    #[test]
    fn test_toggle_preview_in_both_modes() {
        let mut app = sample_app();
        app.update(Key::TogglePreview);
        assert!(!app.show_preview);
        app.update(Key::Char('/'));
        app.update(Key::TogglePreview);
        assert!(app.show_preview);
        assert!(app.search_term.is_empty());
    }

    #[test]
    fn test_interrupt_aborts() {
        let mut app = sample_app();
        app.update(Key::Char(' '));
        app.update(Key::Char('/'));
        app.update(Key::Interrupt);
        assert_eq!(app.mode, Mode::Aborted);
        assert!(app.is_finished());
    }

    #[test]
    fn test_preview_is_fetched_once_per_blob() {
        let mut app = sample_app();
        let mut calls = 0;
        for _ in 0..3 {
            app.load_preview_if_needed(|blob| {
                calls += 1;
                vec![format!("body of {}", blob)]
            });
        }
        assert_eq!(calls, 1);
        assert_eq!(app.preview_lines(), ["body of r00123456789".to_string()]);

        app.update(Key::Down);
        assert!(app.preview_lines().is_empty());
    }

    #[test]
    fn test_fetch_preview_truncates_and_swallows_errors() {
        let archive = FakeArchive {
            bodies: HashMap::from([(
                "r00123456789".to_string(),
                (1..=5).map(|n| format!("line {}", n)).collect(),
            )]),
            ..FakeArchive::default()
        };

        let mut app = sample_app();
        app.load_preview_if_needed(|blob| fetch_preview(&archive, blob, 3));
        assert_eq!(app.preview_lines(), ["line 1", "line 2", "line 3"]);

        // r1 has no body: the fetch fails once and stays empty
        app.update(Key::Down);
        for _ in 0..2 {
            app.load_preview_if_needed(|blob| fetch_preview(&archive, blob, 3));
        }
        assert!(app.preview_lines().is_empty());
        assert_eq!(
            *archive.body_requests.borrow(),
            vec!["r00123456789".to_string(), "r10123456789".to_string()]
        );
    }

    #[test]
    fn test_empty_thread_list() {
        let mut app = App::new(Vec::new(), HashSet::new(), None);
        press(&mut app, &[Key::Down, Key::Up, Key::Char(' '), Key::Char('a')]);
        assert_eq!(app.cursor, 0);
        assert!(app.current_thread().is_none());
        app.update(Key::Char('q'));
        assert!(app.selected_ids().is_empty());
    }

    #[test]
    fn test_key_from_event() {
        let ctrl_p = KeyEvent::new(KeyCode::Char('p'), KeyModifiers::CONTROL);
        assert_eq!(Key::from_event(&ctrl_p), Some(Key::TogglePreview));
        let p = KeyEvent::new(KeyCode::Char('p'), KeyModifiers::NONE);
        assert_eq!(Key::from_event(&p), Some(Key::Char('p')));
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(Key::from_event(&ctrl_c), Some(Key::Interrupt));
        let f1 = KeyEvent::new(KeyCode::F(1), KeyModifiers::NONE);
        assert_eq!(Key::from_event(&f1), None);
    }
}
