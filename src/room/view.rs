use futures::StreamExt;

use crate::common::{ChatMessage, UserIdentity};
use crate::error::{ChatError, Result};

use super::feed::{FeedSubscription, MessageFeed};
use super::session::SessionState;
use super::window::FeedWindow;
use super::wrap::{DEFAULT_LINE_WIDTH, wrap};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomState {
    Unauthenticated,
    Authenticated,
}

/// Which side of the conversation a message is drawn on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageSide {
    Sent,
    Received,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub id: String,
    pub side: MessageSide,
    pub photo_url: String,
    pub lines: Vec<String>,
}

/// What the room shows right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    SignIn,
    Chat {
        user: UserIdentity,
        messages: Vec<RenderedMessage>,
    },
}

/// The room's state machine: sign-in prompt while signed out, live message
/// list and composer while signed in.
pub struct RoomView {
    session: SessionState,
    feed: MessageFeed,
    subscription: Option<FeedSubscription>,
    window: FeedWindow,
    scroll_pending: bool,
}

impl RoomView {
    /// Starts in the state the session is in right now.
    pub fn mount(session: SessionState, feed: MessageFeed) -> Self {
        let mut view = Self {
            session,
            feed,
            subscription: None,
            window: FeedWindow::empty(),
            scroll_pending: false,
        };
        view.reconcile();
        view
    }

    pub fn state(&self) -> RoomState {
        if self.session.is_signed_in() {
            RoomState::Authenticated
        } else {
            RoomState::Unauthenticated
        }
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut SessionState {
        &mut self.session
    }

    pub fn window(&self) -> &FeedWindow {
        &self.window
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription
            .as_ref()
            .is_some_and(FeedSubscription::is_open)
    }

    pub fn subscription_mut(&mut self) -> Option<&mut FeedSubscription> {
        self.subscription.as_mut()
    }

    pub async fn sign_in(&mut self) -> Result<()> {
        self.session.sign_in().await?;
        self.reconcile();
        Ok(())
    }

    pub async fn sign_out(&mut self) -> Result<()> {
        self.session.sign_out().await?;
        self.reconcile();
        Ok(())
    }

    /// Re-reads the provider session and applies any transition. Returns
    /// whether the session changed.
    pub fn sync_session(&mut self) -> bool {
        let changed = self.session.refresh();
        if changed {
            self.reconcile();
        }
        changed
    }

    /// Opens the feed on entering Authenticated, closes it on leaving. Every
    /// new subscription starts from an empty window.
    fn reconcile(&mut self) {
        if !self.session.is_signed_in() {
            if let Some(mut subscription) = self.subscription.take() {
                subscription.close();
            }
            self.reset_window();
            return;
        }

        if self.subscription.is_none() {
            self.reset_window();
            match self.feed.subscribe() {
                Ok(subscription) => self.subscription = Some(subscription),
                Err(err) => log::warn!("{err}; the room will stay empty"),
            }
        }
    }

    fn reset_window(&mut self) {
        self.window = FeedWindow::empty();
        self.scroll_pending = false;
    }

    /// Waits for the next feed snapshot and applies it. Never resolves while
    /// no subscription is open. Returns `false` when the store ended the
    /// live query; the room then stays as it is until the next sign-in.
    pub async fn next_update(&mut self) -> bool {
        let Some(subscription) = self.subscription.as_mut() else {
            return std::future::pending().await;
        };

        match subscription.next().await {
            Some(window) => {
                self.window = window;
                self.scroll_pending = true;
                true
            }
            None => {
                log::warn!("Live feed dropped; no further updates until the next sign-in");
                self.subscription = None;
                false
            }
        }
    }

    /// Applies snapshots that already arrived, without waiting.
    pub fn poll_updates(&mut self) -> bool {
        let Some(subscription) = self.subscription.as_mut() else {
            return false;
        };
        match subscription.drain_ready() {
            Some(window) => {
                self.window = window;
                self.scroll_pending = true;
                true
            }
            None => false,
        }
    }

    pub fn request_scroll(&mut self) {
        self.scroll_pending = true;
    }

    /// Consumes the pending scroll-to-latest request.
    pub fn take_scroll_request(&mut self) -> bool {
        std::mem::take(&mut self.scroll_pending)
    }

    /// The feed handle and author an append needs, detached from the view so
    /// the write can run on its own task.
    pub fn prepare_append(&self) -> Result<(MessageFeed, UserIdentity)> {
        let author = self.session.identity().cloned().ok_or(ChatError::NotSignedIn)?;
        Ok((self.feed.clone(), author))
    }

    pub async fn append(&self, text: &str) -> Result<String> {
        let (feed, author) = self.prepare_append()?;
        feed.append(text, &author).await
    }

    pub fn render(&self) -> Screen {
        let Some(user) = self.session.identity() else {
            return Screen::SignIn;
        };

        let messages = self
            .window
            .messages()
            .iter()
            .map(|message| self.render_message(message, user))
            .collect();

        Screen::Chat {
            user: user.clone(),
            messages,
        }
    }

    fn render_message(&self, message: &ChatMessage, user: &UserIdentity) -> RenderedMessage {
        let side = if message.uid == user.uid {
            MessageSide::Sent
        } else {
            MessageSide::Received
        };

        RenderedMessage {
            id: message.id.clone(),
            side,
            photo_url: message.photo_url.clone(),
            lines: wrap(&message.text, DEFAULT_LINE_WIDTH),
        }
    }

    /// Closes any open subscription.
    pub fn unmount(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.close();
        }
    }
}
