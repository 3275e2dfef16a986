use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Clear, Paragraph},
    Frame,
};

use super::pane::Modal;
use crate::app::{App, Mode};
use crate::config::ThemeConfig;

pub fn render_status(f: &mut Frame, area: Rect, app: &App, theme: &ThemeConfig) {
    let key_style = Style::default().fg(theme.primary());
    let text_style = Style::default().fg(theme.fg_muted());
    let search_style = Style::default().fg(theme.fg());

    let mut spans = match app.mode {
        Mode::Searching => vec![
            Span::styled("/", key_style),
            Span::raw(" "),
            Span::styled(app.search_term.as_str(), search_style),
            Span::styled("_", key_style),
            Span::styled("  ", text_style),
            Span::styled("Enter", key_style),
            Span::styled(" done  ", text_style),
            Span::styled("Esc", key_style),
            Span::styled(" cancel  ", text_style),
            Span::styled("Up/Down", key_style),
            Span::styled(" matches", text_style),
        ],
        _ => vec![
            Span::styled("j/k", key_style),
            Span::styled(" move  ", text_style),
            Span::styled("Space", key_style),
            Span::styled(" toggle  ", text_style),
            Span::styled("a", key_style),
            Span::styled(" all  ", text_style),
            Span::styled("/", key_style),
            Span::styled(" search  ", text_style),
            Span::styled("n/p", key_style),
            Span::styled(" match  ", text_style),
            Span::styled("?", key_style),
            Span::styled(" help  ", text_style),
            Span::styled("q", key_style),
            Span::styled(" done", text_style),
        ],
    };

    let separator = Style::default().fg(theme.border());
    if let Some(current) = app.current_match {
        spans.push(Span::styled("  │  ", separator));
        spans.push(Span::styled(
            format!("Match: {}/{}", current + 1, app.matches.len()),
            Style::default().fg(theme.secondary()),
        ));
    }
    spans.push(Span::styled("  │  ", separator));
    spans.push(Span::styled(
        format!("Selected: {}/{}", app.selected_count(), app.threads.len()),
        Style::default().fg(theme.success()),
    ));

    let paragraph =
        Paragraph::new(Line::from(spans)).style(Style::default().bg(theme.bg_panel()));
    f.render_widget(paragraph, area);
}

const HELP_SECTIONS: &[(&str, &[(&str, &str)])] = &[
    (
        "Navigation",
        &[("k / Up", "move up"), ("j / Down", "move down")],
    ),
    (
        "Markers",
        &[
            ("[X]", "selected for export"),
            ("[D]", "exported earlier this edition"),
            ("[ ]", "not selected"),
        ],
    ),
    (
        "Selection",
        &[("Space", "toggle thread"), ("a", "select all / clear all")],
    ),
    (
        "Search",
        &[
            ("/", "start search"),
            ("n / p", "next / previous match"),
            ("Up / Down", "step matches while typing"),
            ("Enter", "finish search"),
            ("Esc", "cancel search"),
        ],
    ),
    (
        "Other",
        &[
            ("Ctrl+P", "toggle preview"),
            ("?", "this help"),
            ("q / Q", "finish and export"),
        ],
    ),
];

pub fn render_help_overlay(f: &mut Frame, area: Rect, theme: &ThemeConfig) {
    let heading = Style::default()
        .fg(theme.secondary())
        .add_modifier(Modifier::BOLD);
    let key_style = Style::default().fg(theme.primary());
    let text_style = Style::default().fg(theme.fg());

    let mut lines = Vec::new();
    for (title, keys) in HELP_SECTIONS {
        lines.push(Line::styled(*title, heading));
        for (key, action) in *keys {
            lines.push(Line::from(vec![
                Span::styled(format!("  {:<12}", key), key_style),
                Span::styled(*action, text_style),
            ]));
        }
        lines.push(Line::raw(""));
    }
    lines.push(Line::styled(
        "Press any key to close",
        Style::default().fg(theme.fg_muted()),
    ));

    let modal = Modal::new(" Help ", theme);
    let rect = modal.centered_rect(50, lines.len() as u16 + 2, area);
    f.render_widget(Clear, rect);
    f.render_widget(Paragraph::new(lines).block(modal.block()), rect);
}
