use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc::error::TryRecvError;

use crate::common::{ChatMessage, NewMessage, UserIdentity};
use crate::error::{ChatError, Result};
use crate::network::{LiveResults, MessageStore};

use super::listeners::{ListenerId, Listeners};
use super::window::{FEED_LIMIT, FeedWindow};

/// Reads and writes the shared room through the message store.
#[derive(Clone)]
pub struct MessageFeed {
    store: Arc<dyn MessageStore>,
    limit: usize,
}

impl MessageFeed {
    pub fn new(store: Arc<dyn MessageStore>) -> Self {
        Self::with_limit(store, FEED_LIMIT)
    }

    pub fn with_limit(store: Arc<dyn MessageStore>, limit: usize) -> Self {
        Self { store, limit }
    }

    /// Opens a live view of the latest messages.
    pub fn subscribe(&self) -> Result<FeedSubscription> {
        let results = self.store.watch_latest(self.limit).map_err(|err| match err {
            ChatError::Subscription(reason) => ChatError::Subscription(reason),
            other => ChatError::Subscription(other.to_string()),
        })?;
        log::debug!("Opened live feed of the latest {} messages", self.limit);
        Ok(FeedSubscription::new(results, self.limit))
    }

    /// Submits `text` as `author` and waits for the store's acknowledgement.
    /// The message shows up through the subscription, not here.
    pub async fn append(&self, text: &str, author: &UserIdentity) -> Result<String> {
        let record = NewMessage::authored_by(text, author);
        match self.store.add(record).await {
            Ok(id) => {
                log::info!("Message {id} acknowledged");
                Ok(id)
            }
            Err(err) => {
                log::warn!("Append rejected: {err}");
                Err(match err {
                    ChatError::Write(reason) => ChatError::Write(reason),
                    other => ChatError::Write(other.to_string()),
                })
            }
        }
    }
}

/// Cancellable stream of [`FeedWindow`] snapshots, one per store change.
///
/// Not restartable: once closed or dropped, subscribe again for a new one.
pub struct FeedSubscription {
    results: Option<LiveResults>,
    limit: usize,
    window: FeedWindow,
    listeners: Listeners<FeedWindow>,
}

impl FeedSubscription {
    fn new(results: LiveResults, limit: usize) -> Self {
        Self {
            results: Some(results),
            limit,
            window: FeedWindow::empty(),
            listeners: Listeners::new(),
        }
    }

    /// Last delivered window.
    pub fn window(&self) -> &FeedWindow {
        &self.window
    }

    pub fn is_open(&self) -> bool {
        self.results.is_some()
    }

    pub fn on_snapshot(&mut self, callback: impl FnMut(&FeedWindow) + Send + 'static) -> ListenerId {
        self.listeners.subscribe(callback)
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.unsubscribe(id)
    }

    /// Stops delivery and releases the live query. Calling it again is a no-op.
    pub fn close(&mut self) {
        if let Some(mut results) = self.results.take() {
            results.close();
            log::debug!("Closed live feed");
        }
    }

    /// Applies every snapshot already queued without waiting and returns the
    /// newest window, if any arrived.
    pub fn drain_ready(&mut self) -> Option<FeedWindow> {
        let mut newest = None;
        while let Some(results) = self.results.as_mut() {
            match results.try_recv() {
                Ok(snapshot) => newest = Some(self.accept(snapshot)),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.results = None;
                    log::warn!("Live feed ended by the store");
                }
            }
        }
        newest
    }

    fn accept(&mut self, snapshot: Vec<ChatMessage>) -> FeedWindow {
        self.window = FeedWindow::from_snapshot(snapshot, self.limit);
        self.listeners.notify(&self.window);
        self.window.clone()
    }
}

impl Stream for FeedSubscription {
    type Item = FeedWindow;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<FeedWindow>> {
        let this = self.get_mut();
        let Some(results) = this.results.as_mut() else {
            return Poll::Ready(None);
        };

        match results.poll_recv(cx) {
            Poll::Ready(Some(snapshot)) => Poll::Ready(Some(this.accept(snapshot))),
            Poll::Ready(None) => {
                this.results = None;
                log::warn!("Live feed ended by the store");
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for FeedSubscription {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::sync::Mutex;

    use crate::storage::SqliteMessageStore;

    fn author() -> UserIdentity {
        UserIdentity {
            uid: "u1".to_string(),
            display_name: Some("ana".to_string()),
            photo_url: "https://example.com/ana.png".to_string(),
        }
    }

    fn feed() -> MessageFeed {
        MessageFeed::new(Arc::new(SqliteMessageStore::in_memory().unwrap()))
    }

    #[tokio::test]
    async fn empty_room_yields_an_empty_window() {
        let mut subscription = feed().subscribe().unwrap();
        let window = subscription.next().await.unwrap();
        assert!(window.is_empty());
    }

    #[tokio::test]
    async fn sender_sees_own_message_after_acknowledgement() {
        let feed = feed();
        let mut subscription = feed.subscribe().unwrap();
        subscription.next().await.unwrap();

        let id = feed.append("hello room", &author()).await.unwrap();
        let window = subscription.next().await.unwrap();

        assert_eq!(window.len(), 1);
        let message = window.latest().unwrap();
        assert_eq!(message.id, id);
        assert_eq!(message.text, "hello room");
        assert_eq!(message.uid, "u1");
        assert_eq!(message.photo_url, "https://example.com/ana.png");
    }

    #[tokio::test]
    async fn window_slides_once_full() {
        let feed = feed();
        let mut subscription = feed.subscribe().unwrap();
        let mut window = subscription.next().await.unwrap();

        for i in 0..FEED_LIMIT + 3 {
            let prior = window.len();
            feed.append(&format!("m{i}"), &author()).await.unwrap();
            window = subscription.next().await.unwrap();

            assert_eq!(window.len(), (prior + 1).min(FEED_LIMIT));
            assert_eq!(window.latest().unwrap().text, format!("m{i}"));
        }

        assert_eq!(window.messages()[0].text, "m3");
    }

    #[tokio::test]
    async fn close_stops_delivery_and_is_idempotent() {
        let feed = feed();
        let mut subscription = feed.subscribe().unwrap();
        subscription.next().await.unwrap();

        let fired = Arc::new(Mutex::new(0));
        let counter = fired.clone();
        subscription.on_snapshot(move |_| *counter.lock().unwrap() += 1);

        subscription.close();
        subscription.close();
        feed.append("after close", &author()).await.unwrap();

        assert!(subscription.next().await.is_none());
        assert!(subscription.drain_ready().is_none());
        assert_eq!(*fired.lock().unwrap(), 0);
        assert!(!subscription.is_open());
    }

    #[tokio::test]
    async fn listeners_see_each_snapshot() {
        let feed = feed();
        let mut subscription = feed.subscribe().unwrap();

        let sizes = Arc::new(Mutex::new(Vec::new()));
        let sink = sizes.clone();
        subscription.on_snapshot(move |window| sink.lock().unwrap().push(window.len()));

        subscription.next().await.unwrap();
        feed.append("one", &author()).await.unwrap();
        subscription.next().await.unwrap();

        assert_eq!(*sizes.lock().unwrap(), vec![0, 1]);
    }
}
