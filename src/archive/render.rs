use std::io::BufRead;

use mail_parser::MessageParser;
use mail_parser::mailbox::mbox::MessageIterator;

/// A message of an exported thread, reduced to what the text dump shows
#[derive(Debug, Clone, Default)]
pub struct ThreadMessage {
    pub id: String,
    pub subject: String,
    pub from: String,
    pub date: String,
    pub body: Vec<String>,
    pub is_reply: bool,
}

const RULE_WIDTH: usize = 80;

/// Parse an mboxrd stream into thread messages, dropping sender-less entries.
pub fn parse_mbox(reader: impl BufRead) -> Vec<ThreadMessage> {
    MessageIterator::new(reader)
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| parse_message(entry.contents()))
        .filter(|m| !m.from.is_empty())
        .collect()
}

fn parse_message(raw: &[u8]) -> Option<ThreadMessage> {
    let message = MessageParser::default().parse(raw)?;

    let from = message
        .from()
        .and_then(|a| a.first())
        .map(|addr| match (addr.name(), addr.address()) {
            (Some(name), Some(address)) => format!("{} <{}>", name, address),
            (None, Some(address)) => address.to_string(),
            (Some(name), None) => name.to_string(),
            (None, None) => String::new(),
        })
        .unwrap_or_default();
    let subject = message.subject().unwrap_or("").trim().to_string();
    let is_reply =
        subject.to_lowercase().starts_with("re:") || !message.in_reply_to().is_empty();

    Some(ThreadMessage {
        id: message.message_id().unwrap_or("").to_string(),
        date: message.date().map(|d| d.to_rfc822()).unwrap_or_default(),
        body: message
            .body_text(0)
            .map(|b| b.lines().map(str::to_string).collect())
            .unwrap_or_default(),
        subject,
        from,
        is_reply,
    })
}

/// Body lines of a single raw message.
///
/// Falls back to splitting at the first blank line that is not followed by
/// a folded header continuation when the message cannot be parsed.
pub fn body_lines(raw: &[u8]) -> Vec<String> {
    if let Some(body) = MessageParser::default()
        .parse(raw)
        .and_then(|m| m.body_text(0).map(|b| b.into_owned()))
    {
        return body.lines().map(str::to_string).collect();
    }

    let text = String::from_utf8_lossy(raw);
    let lines: Vec<&str> = text.lines().collect();
    let body_start = lines
        .iter()
        .enumerate()
        .position(|(i, line)| {
            line.is_empty()
                && lines
                    .get(i + 1)
                    .is_none_or(|next| !next.starts_with([' ', '\t']))
        })
        .map(|i| i + 1)
        .unwrap_or(lines.len());

    lines[body_start..].iter().map(|l| l.to_string()).collect()
}

/// Render a thread as an indented plain-text transcript.
pub fn render_thread(messages: &[ThreadMessage], source: &str) -> String {
    let mut out = vec![
        format!("Git Mailing List Archive - Converted from {}", source),
        format!("Extracted {} messages", messages.len()),
        "=".repeat(RULE_WIDTH),
        String::new(),
    ];

    let mut in_group = false;
    for message in messages {
        let level = if in_group && message.is_reply { 1 } else { 0 };
        in_group = true;
        out.push(format_message(message, level));
    }

    out.join("\n")
}

fn format_message(message: &ThreadMessage, level: usize) -> String {
    let indent = "  ".repeat(level);
    let mut out = Vec::new();

    if level == 0 {
        out.push("=".repeat(RULE_WIDTH));
    } else {
        out.push(format!("{}---", indent));
    }

    for (label, value) in [
        ("Subject", &message.subject),
        ("From", &message.from),
        ("Date", &message.date),
        ("Message-ID", &message.id),
    ] {
        if !value.is_empty() {
            out.push(format!("{}{}: {}", indent, label, value));
        }
    }
    out.push(String::new());

    let body = message.body.join("\n");
    let body = body.trim();
    if !body.is_empty() {
        out.extend(body.lines().map(|l| format!("{}{}", indent, l)));
    }
    out.push(String::new());

    out.join("\n")
}
