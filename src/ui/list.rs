use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::Line,
    widgets::{List, ListItem},
    Frame,
};

use super::pane::Pane;
use super::preview::sanitize_line;
use crate::app::App;
use crate::config::ThemeConfig;
use crate::threads::ThreadRecord;

/// Marker, age, message and participant columns before the subject
const PREFIX_WIDTH: usize = 19;

pub fn render_list(f: &mut Frame, area: Rect, app: &App, theme: &ThemeConfig) {
    // Area minus borders
    let avail_width = area.width.saturating_sub(2) as usize;
    let subject_width = avail_width.saturating_sub(PREFIX_WIDTH);

    let header = format!(
        "{:3} {:>4} {:>4} {:>3}  {}",
        "", "Age", "Msgs", "Ppl", "Subject"
    );
    let mut items = vec![ListItem::new(Line::raw(header)).style(
        Style::default()
            .fg(theme.fg_muted())
            .add_modifier(Modifier::BOLD),
    )];

    let end = (app.offset + app.viewport_rows).min(app.threads.len());
    for idx in app.offset..end {
        let thread = &app.threads[idx];
        let selected = app.selected[idx];
        let line = format!(
            "{}{}",
            row_prefix(thread, marker(selected, app.is_done(thread))),
            truncate(&sanitize_line(&thread.subject), subject_width)
        );

        let mut style = Style::default().fg(theme.fg());
        if selected {
            style = style.fg(theme.success());
        } else if app.is_done(thread) {
            style = style.fg(theme.done());
        } else if app.matches.contains(&idx) {
            style = style.fg(theme.secondary());
        }
        if idx == app.cursor {
            style = style.bg(theme.selected_bg()).add_modifier(Modifier::BOLD);
        }
        items.push(ListItem::new(Line::raw(line)).style(style));
    }

    let title = format!("Threads ({})", app.threads.len());
    let list = List::new(items).block(Pane::new(&title, true, theme).block());
    f.render_widget(list, area);
}

/// `[X]` selected, `[D]` exported in an earlier session, `[ ]` otherwise
pub fn marker(selected: bool, done: bool) -> &'static str {
    if selected {
        "[X]"
    } else if done {
        "[D]"
    } else {
        "[ ]"
    }
}

fn row_prefix(thread: &ThreadRecord, marker: &str) -> String {
    format!(
        "{} {:>4} {:>4} {:>3}  ",
        marker,
        format!("{}d", thread.age_days),
        thread.message_count,
        thread.participant_count()
    )
}

pub fn truncate(s: &str, max: usize) -> String {
    if max < 4 {
        return s.chars().take(max).collect();
    }
    let char_count = s.chars().count();
    if char_count <= max {
        format!("{:width$}", s, width = max)
    } else {
        let truncated: String = s.chars().take(max - 3).collect();
        format!("{}...", truncated)
    }
}
