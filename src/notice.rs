//! Purpose: Define a stable, structured schema for non-fatal stderr notices.
//! Exports: `Notice`, `notice_json`, `now_rfc3339`.
//! Role: Lets the host report composer activity without touching stdout.
//! Invariants: Notices are non-fatal and never alter stdout payloads.
//! Invariants: JSON schema is stable once published; fields are additive-only.
use serde_json::{Map, Value, json};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: String,
    pub time: String,
    pub channel: String,
    pub message: String,
    pub details: Map<String, Value>,
}

impl Notice {
    pub fn now(kind: &str, channel: &str, message: impl Into<String>) -> Self {
        Self {
            kind: kind.to_string(),
            time: now_rfc3339().unwrap_or_default(),
            channel: channel.to_string(),
            message: message.into(),
            details: Map::new(),
        }
    }

    pub fn with_detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }
}

pub fn now_rfc3339() -> Option<String> {
    OffsetDateTime::now_utc().format(&Rfc3339).ok()
}

pub fn notice_json(notice: &Notice) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(notice.kind));
    inner.insert("time".to_string(), json!(notice.time));
    inner.insert("channel".to_string(), json!(notice.channel));
    inner.insert("message".to_string(), json!(notice.message));
    inner.insert("details".to_string(), Value::Object(notice.details.clone()));

    let mut outer = Map::new();
    outer.insert("notice".to_string(), Value::Object(inner));
    Value::Object(outer)
}

#[cfg(test)]
mod tests {
    use super::{Notice, notice_json};
    use serde_json::{Map, Value};

    #[test]
    fn notice_json_has_required_fields() {
        let mut details = Map::new();
        details.insert("recipient".to_string(), Value::from("+15551234567"));

        let notice = Notice {
            kind: "presented".to_string(),
            time: "2026-02-01T00:00:00Z".to_string(),
            channel: "com.sendit/messages".to_string(),
            message: "composer presented".to_string(),
            details,
        };

        let value = notice_json(&notice);
        let obj = value
            .get("notice")
            .and_then(|v| v.as_object())
            .expect("notice object");

        assert_eq!(obj.get("kind").and_then(|v| v.as_str()), Some("presented"));
        assert_eq!(
            obj.get("time").and_then(|v| v.as_str()),
            Some("2026-02-01T00:00:00Z")
        );
        assert_eq!(
            obj.get("channel").and_then(|v| v.as_str()),
            Some("com.sendit/messages")
        );
        assert_eq!(
            obj.get("message").and_then(|v| v.as_str()),
            Some("composer presented")
        );
        assert_eq!(
            obj["details"]["recipient"].as_str(),
            Some("+15551234567")
        );
    }

    #[test]
    fn now_stamps_an_rfc3339_time() {
        let notice = Notice::now("discarded", "c", "late event").with_detail("outcome", "sent");
        assert!(notice.time.ends_with('Z'));
        assert!(time::OffsetDateTime::parse(
            &notice.time,
            &time::format_description::well_known::Rfc3339
        )
        .is_ok());
        assert_eq!(notice.details["outcome"], Value::from("sent"));
    }
}
