use crate::common::ChatMessage;

/// Number of most recent messages a client keeps on screen.
pub const FEED_LIMIT: usize = 25;

/// The bounded, ordered set of the latest acknowledged messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedWindow {
    messages: Vec<ChatMessage>,
}

impl FeedWindow {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a window from one store result set.
    ///
    /// Pending writes (no server timestamp yet) are left out. The sort is
    /// stable, so messages sharing a timestamp keep the order the store
    /// delivered them in.
    pub fn from_snapshot(results: Vec<ChatMessage>, limit: usize) -> Self {
        let mut messages: Vec<ChatMessage> = results
            .into_iter()
            .filter(|message| message.created_at.is_some())
            .collect();
        messages.sort_by_key(|message| message.created_at);

        if messages.len() > limit {
            messages.drain(..messages.len() - limit);
        }

        Self { messages }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn latest(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn message(id: &str, millis: Option<i64>) -> ChatMessage {
        ChatMessage {
            id: id.to_string(),
            text: format!("text {id}"),
            created_at: millis.map(|ms| Utc.timestamp_millis_opt(ms).unwrap()),
            uid: "u1".to_string(),
            photo_url: String::new(),
        }
    }

    fn ids(window: &FeedWindow) -> Vec<&str> {
        window.messages().iter().map(|m| m.id.as_str()).collect()
    }

    #[test]
    fn orders_by_created_at_ascending() {
        let window = FeedWindow::from_snapshot(
            vec![message("c", Some(30)), message("a", Some(10)), message("b", Some(20))],
            FEED_LIMIT,
        );
        assert_eq!(ids(&window), vec!["a", "b", "c"]);
    }

    #[test]
    fn keeps_store_order_for_equal_timestamps() {
        let window = FeedWindow::from_snapshot(
            vec![message("y", Some(10)), message("x", Some(10)), message("z", Some(5))],
            FEED_LIMIT,
        );
        assert_eq!(ids(&window), vec!["z", "y", "x"]);
    }

    #[test]
    fn keeps_only_the_most_recent_entries() {
        let results = (0..30).map(|i| message(&i.to_string(), Some(i))).collect();
        let window = FeedWindow::from_snapshot(results, FEED_LIMIT);

        assert_eq!(window.len(), FEED_LIMIT);
        assert_eq!(window.messages()[0].id, "5");
        assert_eq!(window.latest().map(|m| m.id.as_str()), Some("29"));
    }

    #[test]
    fn skips_pending_writes() {
        let window =
            FeedWindow::from_snapshot(vec![message("a", Some(1)), message("p", None)], FEED_LIMIT);
        assert_eq!(ids(&window), vec!["a"]);
    }
}
