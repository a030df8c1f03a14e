use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::common::{ChatMessage, NewMessage};

/// A Firestore document as returned by the REST API.
#[derive(Debug, Deserialize)]
pub struct Document {
    /// Full resource name; the last segment is the document id.
    pub name: String,
    #[serde(default)]
    pub fields: HashMap<String, Value>,
}

/// One element of a `runQuery` response stream.
#[derive(Debug, Deserialize)]
pub struct QueryResult {
    pub document: Option<Document>,
}

pub fn string_value(value: &str) -> Value {
    json!({ "stringValue": value })
}

/// Field map written on append. `createdAt` is filled by a server transform.
pub fn message_fields(record: &NewMessage) -> Value {
    json!({
        "text": string_value(&record.text),
        "uid": string_value(&record.uid),
        "photoURL": string_value(&record.photo_url),
    })
}

fn read_string(fields: &HashMap<String, Value>, key: &str) -> Option<String> {
    fields
        .get(key)?
        .get("stringValue")?
        .as_str()
        .map(str::to_string)
}

fn read_timestamp(fields: &HashMap<String, Value>, key: &str) -> Option<DateTime<Utc>> {
    let raw = fields.get(key)?.get("timestampValue")?.as_str()?;
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|timestamp| timestamp.with_timezone(&Utc))
}

impl Document {
    pub fn id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }

    /// Missing string fields read as empty; a missing or null `createdAt`
    /// reads as a pending write.
    pub fn into_message(self) -> ChatMessage {
        ChatMessage {
            id: self.id().to_string(),
            text: read_string(&self.fields, "text").unwrap_or_default(),
            created_at: read_timestamp(&self.fields, "createdAt"),
            uid: read_string(&self.fields, "uid").unwrap_or_default(),
            photo_url: read_string(&self.fields, "photoURL").unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_a_message_document() {
        let results: Vec<QueryResult> = serde_json::from_str(
            r#"[
                {
                    "document": {
                        "name": "projects/p/databases/(default)/documents/messages/abc123",
                        "fields": {
                            "text": { "stringValue": "hello" },
                            "createdAt": { "timestampValue": "2024-03-01T10:00:00.123456Z" },
                            "uid": { "stringValue": "u1" },
                            "photoURL": { "stringValue": "https://example.com/u1.png" }
                        },
                        "createTime": "2024-03-01T10:00:00.123456Z",
                        "updateTime": "2024-03-01T10:00:00.123456Z"
                    },
                    "readTime": "2024-03-01T10:00:01Z"
                },
                { "readTime": "2024-03-01T10:00:01Z" }
            ]"#,
        )
        .unwrap();

        let messages: Vec<ChatMessage> = results
            .into_iter()
            .filter_map(|result| result.document)
            .map(Document::into_message)
            .collect();

        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id, "abc123");
        assert_eq!(messages[0].text, "hello");
        assert_eq!(messages[0].uid, "u1");
        assert!(messages[0].created_at.is_some());
    }

    #[test]
    fn null_timestamp_is_pending() {
        let document: Document = serde_json::from_str(
            r#"{ "name": "x/messages/p1", "fields": { "createdAt": { "nullValue": null } } }"#,
        )
        .unwrap();
        let message = document.into_message();
        assert_eq!(message.created_at, None);
        assert_eq!(message.text, "");
    }
}
