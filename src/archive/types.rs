use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    pub name: Option<String>,
    pub addr: Option<String>,
}

/// One message as returned by a bulk archive query
#[derive(Debug, Clone)]
pub struct MessageRecord {
    pub message_id: Option<String>,
    /// Threading ancestry, root first
    pub references: Vec<String>,
    pub date: Option<NaiveDateTime>,
    pub subject: Option<String>,
    pub senders: Vec<Address>,
    /// Git blob id of the raw message
    pub blob: String,
}

/// Inclusive age window, in days before now
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgeWindow {
    pub min_days: i64,
    pub max_days: i64,
}

/// `lei q -f json` output object. Every field is optional in practice, and
/// a field of the wrong type is treated as absent rather than failing the
/// whole record.
#[derive(Debug, Deserialize)]
struct RawMessage {
    #[serde(default, deserialize_with = "lenient_string")]
    m: Option<String>,
    #[serde(default, deserialize_with = "lenient_strings")]
    refs: Vec<String>,
    #[serde(default)]
    dt: Option<Value>,
    #[serde(default, deserialize_with = "lenient_string")]
    s: Option<String>,
    #[serde(default, deserialize_with = "lenient_senders")]
    f: Vec<Address>,
    #[serde(default, deserialize_with = "lenient_string")]
    blob: Option<String>,
}

fn string_value(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        _ => None,
    }
}

fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(string_value(Value::deserialize(d)?))
}

/// String elements of an array; anything else is dropped
fn lenient_strings<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Array(items) => items.into_iter().filter_map(string_value).collect(),
        _ => Vec::new(),
    })
}

/// `[[name, address], ...]` pairs; elements that are not arrays are dropped
fn lenient_senders<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Address>, D::Error> {
    let Value::Array(items) = Value::deserialize(d)? else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter_map(|item| match item {
            Value::Array(pair) => {
                let mut fields = pair.into_iter().map(string_value);
                let name = fields.next().flatten();
                let addr = fields.next().flatten();
                Some(Address { name, addr })
            }
            _ => None,
        })
        .collect())
}

impl MessageRecord {
    /// Thread grouping key: first reference, else the message's own id
    pub fn thread_key(&self) -> Option<&str> {
        self.references
            .first()
            .map(|s| s.as_str())
            .or(self.message_id.as_deref())
            .filter(|s| !s.is_empty())
    }

    fn from_raw(raw: RawMessage) -> Self {
        let date = match raw.dt {
            Some(Value::String(s)) => parse_date(&s),
            Some(Value::Array(items)) => items.first().and_then(|v| v.as_str()).and_then(parse_date),
            _ => None,
        };

        Self {
            message_id: raw.m,
            references: raw.refs,
            date,
            subject: raw.s,
            senders: raw.f,
            blob: raw.blob.unwrap_or_default(),
        }
    }
}

/// Parse the JSON array printed by `lei q -f json`.
///
/// Elements that are not message objects (lei terminates its array with
/// `null`) are skipped. Output that is not a JSON array at all yields no
/// records.
pub fn parse_query_output(output: &[u8]) -> Vec<MessageRecord> {
    if output.iter().all(|b| b.is_ascii_whitespace()) {
        return Vec::new();
    }

    let values: Vec<Value> = match serde_json::from_slice(output) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!("Malformed query output: {}", e);
            return Vec::new();
        }
    };

    values
        .into_iter()
        .filter(|v| v.is_object())
        .filter_map(|v| match serde_json::from_value::<RawMessage>(v) {
            Ok(raw) => Some(MessageRecord::from_raw(raw)),
            Err(e) => {
                tracing::debug!("Skipping malformed record: {}", e);
                None
            }
        })
        .collect()
}

/// Parse a lei `dt` value such as "2026-09-01T12:30:00Z".
/// Only the first 19 characters are significant.
pub fn parse_date(s: &str) -> Option<NaiveDateTime> {
    let head: String = s.chars().take(19).collect();
    NaiveDateTime::parse_from_str(&head.replacen('T', " ", 1), "%Y-%m-%d %H:%M:%S").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date() {
        let dt = parse_date("2026-09-01T12:30:00Z").unwrap();
        assert_eq!(dt.to_string(), "2026-09-01 12:30:00");
        assert!(parse_date("2026-09-01 12:30:00+02:00").is_some());
        assert!(parse_date("yesterday").is_none());
        assert!(parse_date("").is_none());
    }

    #[test]
    fn test_parse_query_output_tolerates_junk() {
        let json = br#"[
            {"m": "a@x", "refs": [], "dt": "2026-09-01T12:30:00Z", "s": "hello",
             "f": [["Alice", "alice@x"]], "blob": "0123456789abcdef"},
            {"m": "b@x", "refs": ["a@x"], "dt": ["2026-09-02T08:00:00Z"], "f": [[null, "bob@x"]]},
            {"m": "c@x", "f": [["Carol"]]},
            null
        ]"#;

        let records = parse_query_output(json);
        assert_eq!(records.len(), 3);

        assert_eq!(records[0].thread_key(), Some("a@x"));
        assert_eq!(records[0].subject.as_deref(), Some("hello"));
        assert_eq!(records[0].senders[0].addr.as_deref(), Some("alice@x"));

        assert_eq!(records[1].thread_key(), Some("a@x"));
        assert!(records[1].date.is_some());
        assert_eq!(records[1].senders[0].name, None);
        assert_eq!(records[1].blob, "");

        assert!(records[2].date.is_none());
        assert_eq!(records[2].senders[0].name.as_deref(), Some("Carol"));
        assert_eq!(records[2].senders[0].addr, None);
    }

    #[test]
    fn test_mistyped_fields_keep_the_record() {
        let json = br#"[
            {"m": "a@x", "s": 42, "dt": "2026-09-01T12:30:00Z", "blob": 7},
            {"m": "b@x", "refs": ["a@x", null, 3], "f": [["Bob", "bob@x"], "junk", null]},
            {"m": ["c@x"], "refs": "a@x", "f": {"name": "Carol"}, "dt": 12}
        ]"#;

        let records = parse_query_output(json);
        assert_eq!(records.len(), 3);

        assert_eq!(records[0].subject, None);
        assert_eq!(records[0].blob, "");
        assert!(records[0].date.is_some());

        assert_eq!(records[1].references, vec!["a@x".to_string()]);
        assert_eq!(records[1].senders.len(), 1);
        assert_eq!(records[1].senders[0].addr.as_deref(), Some("bob@x"));

        assert_eq!(records[2].message_id, None);
        assert!(records[2].references.is_empty());
        assert!(records[2].senders.is_empty());
        assert!(records[2].date.is_none());
        assert_eq!(records[2].thread_key(), None);
    }

    #[test]
    fn test_parse_query_output_empty_or_malformed() {
        assert!(parse_query_output(b"").is_empty());
        assert!(parse_query_output(b"  \n").is_empty());
        assert!(parse_query_output(b"not json").is_empty());
        assert!(parse_query_output(b"{\"m\": \"a\"}").is_empty());
    }
}
