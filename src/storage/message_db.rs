use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::params;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

use crate::common::{ChatMessage, NewMessage};
use crate::config::DEFAULT_POLL_INTERVAL_MS;
use crate::error::Result;
use crate::network::{LiveResults, MessageStore};

use super::database::{self, Database, SharedDatabase};
use super::models::StoredMessage;

/// SQLite-backed message store for running without a hosted platform.
///
/// The store plays the server's role: it assigns ids and non-decreasing
/// timestamps, and wakes every live query after each write. Live queries
/// also re-read on a timer to pick up writes from other processes sharing
/// the file.
pub struct SqliteMessageStore {
    db: SharedDatabase,
    revision: watch::Sender<u64>,
    poll_interval: Duration,
}

impl SqliteMessageStore {
    pub fn new(db: SharedDatabase, poll_interval: Duration) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            db,
            revision,
            poll_interval,
        }
    }

    pub fn in_memory() -> Result<Self> {
        Ok(Self::new(
            Database::in_memory()?.into_shared(),
            Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        ))
    }

    fn insert(&self, record: &NewMessage) -> Result<String> {
        let id = Uuid::new_v4().simple().to_string();

        {
            let db = database::lock(&self.db);
            let conn = db.connection();
            let last: i64 = conn.query_row(
                "SELECT COALESCE(MAX(created_at), 0) FROM messages",
                [],
                |row| row.get(0),
            )?;
            let created_at = Utc::now().timestamp_millis().max(last);

            conn.execute(
                "INSERT INTO messages (id, text, created_at, uid, photo_url)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id, record.text, created_at, record.uid, record.photo_url],
            )?;
        }

        self.revision.send_modify(|revision| *revision += 1);
        Ok(id)
    }
}

/// Latest `limit` messages, oldest first.
fn query_latest(db: &SharedDatabase, limit: usize) -> Result<Vec<ChatMessage>> {
    let db = database::lock(db);
    let mut stmt = db.connection().prepare(
        "SELECT seq, id, text, created_at, uid, photo_url
         FROM messages
         ORDER BY created_at DESC, seq DESC
         LIMIT ?1",
    )?;

    let mut rows = stmt
        .query_map(params![limit as i64], |row| {
            Ok(StoredMessage {
                seq: row.get(0)?,
                id: row.get(1)?,
                text: row.get(2)?,
                created_at: row.get(3)?,
                uid: row.get(4)?,
                photo_url: row.get(5)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    rows.reverse();
    Ok(rows
        .into_iter()
        .map(StoredMessage::into_chat_message)
        .collect())
}

#[async_trait]
impl MessageStore for SqliteMessageStore {
    fn watch_latest(&self, limit: usize) -> Result<LiveResults> {
        // Subscribe before the first read so a write in between is not missed.
        let mut revision = self.revision.subscribe();
        let first = query_latest(&self.db, limit)?;

        let (tx, rx) = mpsc::channel(16);
        let db = self.db.clone();
        let poll_interval = self.poll_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.reset();

            let mut last = first.clone();
            if tx.send(first).await.is_ok() {
                loop {
                    tokio::select! {
                        _ = tx.closed() => break,
                        changed = revision.changed() => {
                            if changed.is_err() {
                                break;
                            }
                        }
                        _ = ticker.tick() => {}
                    }

                    let results = match query_latest(&db, limit) {
                        Ok(results) => results,
                        Err(err) => {
                            log::warn!("Live query over messages dropped: {err}");
                            break;
                        }
                    };
                    if results == last {
                        continue;
                    }
                    last = results.clone();
                    if tx.send(results).await.is_err() {
                        break;
                    }
                }
            }
            log::debug!("Live query over messages released");
        });

        Ok(rx)
    }

    async fn add(&self, record: NewMessage) -> Result<String> {
        let id = self.insert(&record)?;
        log::debug!("Stored message {id} from {}", record.uid);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(text: &str) -> NewMessage {
        NewMessage {
            text: text.to_string(),
            uid: "u1".to_string(),
            photo_url: "https://example.com/u1.png".to_string(),
        }
    }

    #[tokio::test]
    async fn first_result_set_is_current_contents() {
        let store = SqliteMessageStore::in_memory().unwrap();
        store.add(record("hello")).await.unwrap();

        let mut live = store.watch_latest(25).unwrap();
        let first = live.recv().await.unwrap();

        assert_eq!(first.len(), 1);
        assert_eq!(first[0].text, "hello");
        assert!(first[0].created_at.is_some());
    }

    #[tokio::test]
    async fn writes_wake_live_queries() {
        let store = SqliteMessageStore::in_memory().unwrap();
        let mut live = store.watch_latest(25).unwrap();
        assert!(live.recv().await.unwrap().is_empty());

        let id = store.add(record("one")).await.unwrap();
        let next = live.recv().await.unwrap();

        assert_eq!(next.len(), 1);
        assert_eq!(next[0].id, id);
    }

    #[tokio::test]
    async fn returns_latest_entries_oldest_first() {
        let store = SqliteMessageStore::in_memory().unwrap();
        for i in 0..5 {
            store.add(record(&format!("m{i}"))).await.unwrap();
        }

        let mut live = store.watch_latest(3).unwrap();
        let texts: Vec<String> = live
            .recv()
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.text)
            .collect();

        assert_eq!(texts, vec!["m2", "m3", "m4"]);
    }

    #[tokio::test]
    async fn timestamps_never_decrease() {
        let store = SqliteMessageStore::in_memory().unwrap();
        for i in 0..10 {
            store.add(record(&i.to_string())).await.unwrap();
        }

        let mut live = store.watch_latest(25).unwrap();
        let results = live.recv().await.unwrap();
        assert!(
            results
                .windows(2)
                .all(|pair| pair[0].created_at <= pair[1].created_at)
        );
    }

    #[tokio::test]
    async fn live_queries_see_writes_from_another_connection() {
        let path = std::env::temp_dir().join(format!("room-{}.db", Uuid::new_v4().simple()));
        let open = || {
            SqliteMessageStore::new(
                Database::new(&path).unwrap().into_shared(),
                Duration::from_millis(50),
            )
        };
        let tail = open();
        let sender = open();

        let mut live = tail.watch_latest(25).unwrap();
        assert!(live.recv().await.unwrap().is_empty());

        let id = sender.add(record("from elsewhere")).await.unwrap();
        let next = tokio::time::timeout(Duration::from_secs(3), live.recv())
            .await
            .expect("other connection's write never showed up")
            .unwrap();
        assert_eq!(next[0].id, id);

        drop(live);
        drop((tail, sender));
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn unchanged_polls_emit_nothing() {
        let store = SqliteMessageStore::new(
            Database::in_memory().unwrap().into_shared(),
            Duration::from_millis(20),
        );
        let mut live = store.watch_latest(25).unwrap();
        live.recv().await.unwrap();

        let quiet = tokio::time::timeout(Duration::from_millis(150), live.recv()).await;
        assert!(quiet.is_err());
    }
}
