use crate::room::Screen;

/// Events sent from the room client up to the UI.
#[derive(Debug, Clone)]
pub enum RoomEvent {
    /// The room state or the feed window changed.
    Render(Screen),
    /// A new snapshot arrived; the message list should show its last entry.
    ScrollToLatest,
    SignInFailed(String),
    /// The store acknowledged an append.
    MessageSent { id: String },
    /// The append was rejected; `text` is what the user typed.
    SendFailed { text: String, reason: String },
}
