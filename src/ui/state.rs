use crate::common::RoomEvent;
use crate::room::Screen;

/// UI-local mirror of the room plus composer state.
pub struct AppState {
    pub screen: Screen,
    pub input_text: String,
    /// An append is in flight; the composer keeps its text until it resolves.
    pub sending: bool,
    pub signing_in: bool,
    pub last_error: Option<String>,
    /// Text of the append in flight, cleared from the composer only if the
    /// user has not edited it since.
    in_flight: Option<String>,
    scroll_to_latest: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            screen: Screen::SignIn,
            input_text: String::new(),
            sending: false,
            signing_in: false,
            last_error: None,
            in_flight: None,
            scroll_to_latest: false,
        }
    }

    pub fn apply(&mut self, event: RoomEvent) {
        match event {
            RoomEvent::Render(screen) => {
                if self.signing_in && matches!(screen, Screen::Chat { .. }) {
                    self.last_error = None;
                }
                if matches!(screen, Screen::SignIn) {
                    self.sending = false;
                    self.in_flight = None;
                }
                self.signing_in = false;
                self.screen = screen;
            }
            RoomEvent::ScrollToLatest => self.scroll_to_latest = true,
            RoomEvent::SignInFailed(reason) => {
                self.signing_in = false;
                self.last_error = Some(reason);
            }
            RoomEvent::MessageSent { .. } => {
                self.sending = false;
                if self.in_flight.take().as_ref() == Some(&self.input_text) {
                    self.input_text.clear();
                }
                self.last_error = None;
            }
            RoomEvent::SendFailed { text, reason } => {
                self.sending = false;
                self.in_flight = None;
                if self.input_text.is_empty() {
                    self.input_text = text;
                }
                self.last_error = Some(reason);
            }
        }
    }

    /// Marks an append as in flight and returns the text to send. Blank input
    /// and double submits are ignored.
    pub fn begin_send(&mut self) -> Option<String> {
        if self.sending || self.input_text.trim().is_empty() {
            return None;
        }
        self.sending = true;
        self.in_flight = Some(self.input_text.clone());
        Some(self.input_text.clone())
    }

    /// The command never reached the room client.
    pub fn abort_send(&mut self, reason: impl Into<String>) {
        self.sending = false;
        self.in_flight = None;
        self.last_error = Some(reason.into());
    }

    pub fn take_scroll(&mut self) -> bool {
        std::mem::take(&mut self.scroll_to_latest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::UserIdentity;

    fn chat_screen() -> Screen {
        Screen::Chat {
            user: UserIdentity {
                uid: "u1".to_string(),
                display_name: None,
                photo_url: String::new(),
            },
            messages: Vec::new(),
        }
    }

    #[test]
    fn text_is_cleared_only_after_acknowledgement() {
        let mut state = AppState::new();
        state.input_text = "hello".to_string();

        assert_eq!(state.begin_send().as_deref(), Some("hello"));
        assert_eq!(state.begin_send(), None);
        assert_eq!(state.input_text, "hello");

        state.apply(RoomEvent::MessageSent { id: "m1".to_string() });
        assert!(state.input_text.is_empty());
        assert!(!state.sending);
    }

    #[test]
    fn text_typed_during_an_append_survives_the_acknowledgement() {
        let mut state = AppState::new();
        state.input_text = "first".to_string();
        state.begin_send();

        state.input_text = "second thought".to_string();
        state.apply(RoomEvent::MessageSent { id: "m1".to_string() });

        assert_eq!(state.input_text, "second thought");
        assert!(!state.sending);
        assert_eq!(state.begin_send().as_deref(), Some("second thought"));
    }

    #[test]
    fn failed_send_keeps_the_typed_text() {
        let mut state = AppState::new();
        state.input_text = "keep me".to_string();
        state.begin_send();

        state.apply(RoomEvent::SendFailed {
            text: "keep me".to_string(),
            reason: "offline".to_string(),
        });

        assert_eq!(state.input_text, "keep me");
        assert_eq!(state.last_error.as_deref(), Some("offline"));
        assert!(!state.sending);
    }

    #[test]
    fn blank_input_is_not_sent() {
        let mut state = AppState::new();
        state.input_text = "   ".to_string();
        assert_eq!(state.begin_send(), None);
    }

    #[test]
    fn scroll_request_is_consumed_once() {
        let mut state = AppState::new();
        state.apply(RoomEvent::Render(chat_screen()));
        state.apply(RoomEvent::ScrollToLatest);

        assert!(state.take_scroll());
        assert!(!state.take_scroll());
    }

    #[test]
    fn sign_in_failure_clears_the_pending_flag() {
        let mut state = AppState::new();
        state.signing_in = true;
        state.apply(RoomEvent::SignInFailed("cancelled".to_string()));

        assert!(!state.signing_in);
        assert_eq!(state.screen, Screen::SignIn);
        assert_eq!(state.last_error.as_deref(), Some("cancelled"));
    }
}
