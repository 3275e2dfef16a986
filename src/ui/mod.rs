mod help;
mod list;
mod pane;
mod preview;

pub use help::*;
pub use list::*;
pub use pane::*;
pub use preview::*;

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::app::{App, Mode};
use crate::config::{LayoutConfig, ThemeConfig};

/// Title bar, status bar, list borders and the column header
const CHROME_ROWS: u16 = 5;

/// Columns left for the preview when the list has to shrink
const PREVIEW_RESERVE: u16 = 35;
const MIN_LIST_WIDTH: u16 = 50;

/// Thread rows visible in a terminal `height` rows tall
pub fn list_rows(height: u16) -> usize {
    height.saturating_sub(CHROME_ROWS).max(1) as usize
}

pub fn preview_visible(app: &App, width: u16, layout: &LayoutConfig) -> bool {
    app.show_preview && width >= layout.preview_min_width
}

/// Width of the list pane when the preview sits next to it
pub fn list_width(width: u16, layout: &LayoutConfig) -> u16 {
    layout
        .list_width
        .min(width.saturating_sub(PREVIEW_RESERVE).max(MIN_LIST_WIDTH))
        .min(width)
}

pub fn render(f: &mut Frame, app: &App, layout: &LayoutConfig, theme: &ThemeConfig) {
    let area = f.area();
    let [title_area, body, status_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_title(f, title_area, app, theme);

    if preview_visible(app, area.width, layout) {
        let [list_area, preview_area] = Layout::horizontal([
            Constraint::Length(list_width(area.width, layout)),
            Constraint::Min(0),
        ])
        .areas(body);
        render_list(f, list_area, app, theme);
        render_preview(f, preview_area, app, theme);
    } else {
        render_list(f, body, app, theme);
    }

    render_status(f, status_area, app, theme);

    if app.mode == Mode::HelpOverlay {
        render_help_overlay(f, area, theme);
    }
}

fn render_title(f: &mut Frame, area: Rect, app: &App, theme: &ThemeConfig) {
    let edition = app
        .edition
        .map(|n| format!("Edition {} | ", n))
        .unwrap_or_default();
    let text = match app.mode {
        Mode::Searching => format!(
            "{}Search: {} (Enter: done, Esc: cancel, Up/Down: next/prev, Ctrl+P: preview)",
            edition, app.search_term
        ),
        _ => format!(
            "{}Select threads (? help, / search, Ctrl+P preview, Space toggle, q done)",
            edition
        ),
    };

    let title = Paragraph::new(Line::from(Span::styled(
        text,
        Style::default()
            .fg(theme.primary())
            .add_modifier(Modifier::BOLD),
    )))
    .style(Style::default().bg(theme.bg_panel()));
    f.render_widget(title, area);
}
