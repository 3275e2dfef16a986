use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use super::pane::Pane;
use crate::app::App;
use crate::config::ThemeConfig;

/// Replace characters the terminal cannot show. Tabs become a single space.
pub fn sanitize_line(line: &str) -> String {
    line.chars()
        .map(|c| match c {
            '\t' => ' ',
            c if c.is_control() => '?',
            c => c,
        })
        .collect()
}

pub fn render_preview(f: &mut Frame, area: Rect, app: &App, theme: &ThemeConfig) {
    let block = Pane::new("Preview", false, theme).block();
    let Some(thread) = app.current_thread() else {
        f.render_widget(block, area);
        return;
    };

    let key_style = Style::default()
        .fg(theme.primary())
        .add_modifier(Modifier::BOLD);
    let field = |name: &'static str, value: String| {
        Line::from(vec![
            Span::styled(name, key_style),
            Span::styled(value, Style::default().fg(theme.fg())),
        ])
    };

    let mut lines = vec![
        field("Subject: ", sanitize_line(&thread.subject)),
        field("Messages: ", thread.message_count.to_string()),
        field("Participants: ", thread.participant_count().to_string()),
        field(
            "Last activity: ",
            thread.last_activity.format("%Y-%m-%d %H:%M").to_string(),
        ),
        field("Thread ID: ", thread.root_id.clone()),
        Line::raw(""),
    ];

    // Body is cut to what fits below the header
    let room = (area.height.saturating_sub(2) as usize).saturating_sub(lines.len());
    let body_style = Style::default().fg(theme.fg_muted());
    lines.extend(
        app.preview_lines()
            .iter()
            .take(room)
            .map(|l| Line::styled(sanitize_line(l), body_style)),
    );

    f.render_widget(Paragraph::new(lines).block(block), area);
}
