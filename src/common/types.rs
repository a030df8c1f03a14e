use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Name of the shared room's collection in the message store.
pub const MESSAGES_COLLECTION: &str = "messages";

/// A chat message as delivered by the message store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub text: String,
    /// Assigned by the store's clock; `None` while the write is still pending.
    pub created_at: Option<DateTime<Utc>>,
    pub uid: String,
    pub photo_url: String,
}

/// Record handed to the store on append. The store stamps `createdAt` itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub text: String,
    pub uid: String,
    pub photo_url: String,
}

/// The signed-in user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub uid: String,
    pub display_name: Option<String>,
    pub photo_url: String,
}

impl UserIdentity {
    /// Name shown in the chat header.
    pub fn label(&self) -> &str {
        match self.display_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.uid,
        }
    }
}

impl NewMessage {
    pub fn authored_by(text: impl Into<String>, author: &UserIdentity) -> Self {
        Self {
            text: text.into(),
            uid: author.uid.clone(),
            photo_url: author.photo_url.clone(),
        }
    }
}
