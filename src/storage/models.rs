use chrono::{DateTime, TimeZone, Utc};

use crate::common::{ChatMessage, UserIdentity};

/// Row of the `messages` table.
#[derive(Debug, Clone)]
pub struct StoredMessage {
    pub seq: i64,
    pub id: String,
    pub text: String,
    /// Server timestamp in UTC milliseconds.
    pub created_at: i64,
    pub uid: String,
    pub photo_url: String,
}

impl StoredMessage {
    pub fn into_chat_message(self) -> ChatMessage {
        ChatMessage {
            id: self.id,
            text: self.text,
            created_at: millis_to_datetime(self.created_at),
            uid: self.uid,
            photo_url: self.photo_url,
        }
    }
}

/// The single local profile row.
#[derive(Debug, Clone)]
pub struct LocalProfile {
    pub uid: String,
    pub display_name: Option<String>,
    pub photo_url: String,
    pub created_at: i64,
    pub signed_in: bool,
}

impl LocalProfile {
    pub fn identity(&self) -> UserIdentity {
        UserIdentity {
            uid: self.uid.clone(),
            display_name: self.display_name.clone(),
            photo_url: self.photo_url.clone(),
        }
    }
}

pub fn millis_to_datetime(millis: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis).single()
}
