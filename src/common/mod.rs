pub mod commands;
pub mod events;
pub mod types;

pub use commands::RoomCommand;
pub use events::RoomEvent;
pub use types::{ChatMessage, MESSAGES_COLLECTION, NewMessage, UserIdentity};
