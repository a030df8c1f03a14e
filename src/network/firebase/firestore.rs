use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

use crate::common::{ChatMessage, MESSAGES_COLLECTION, NewMessage};
use crate::config::FirebaseConfig;
use crate::error::{ChatError, Result};
use crate::network::{LiveResults, MessageStore};

use super::values::{QueryResult, message_fields};
use super::{FirebaseAuth, api_error};

const FIRESTORE_URL: &str = "https://firestore.googleapis.com/v1";

/// Everything a polling task needs to re-run the room query.
#[derive(Clone)]
struct LatestQuery {
    http: reqwest::Client,
    url: String,
    api_key: String,
    limit: usize,
}

impl LatestQuery {
    /// Newest first on the wire so `limit` keeps the latest entries, then
    /// reversed to oldest first.
    async fn run(&self, id_token: Option<&str>) -> Result<Vec<ChatMessage>> {
        let body = json!({
            "structuredQuery": {
                "from": [{ "collectionId": MESSAGES_COLLECTION }],
                "orderBy": [{
                    "field": { "fieldPath": "createdAt" },
                    "direction": "DESCENDING"
                }],
                "limit": self.limit
            }
        });

        let mut request = self
            .http
            .post(&self.url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body);
        if let Some(token) = id_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(ChatError::Subscription(api_error(response).await));
        }

        let results: Vec<QueryResult> = response.json().await?;
        let mut messages: Vec<ChatMessage> = results
            .into_iter()
            .filter_map(|result| result.document)
            .map(|document| document.into_message())
            .collect();
        messages.reverse();
        Ok(messages)
    }
}

/// Firestore `messages` collection over the REST API.
///
/// REST has no push channel, so live queries poll `runQuery` and only emit
/// when the result set differs from the previous one.
pub struct FirestoreStore {
    http: reqwest::Client,
    api_key: String,
    project_id: String,
    auth: Arc<FirebaseAuth>,
    poll_interval: Duration,
}

impl FirestoreStore {
    pub fn new(
        http: reqwest::Client,
        config: &FirebaseConfig,
        auth: Arc<FirebaseAuth>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            http,
            api_key: config.api_key.clone(),
            project_id: config.project_id.clone(),
            auth,
            poll_interval,
        }
    }

    fn database_name(&self) -> String {
        format!("projects/{}/databases/(default)", self.project_id)
    }

    fn documents_url(&self, method: &str) -> String {
        format!("{FIRESTORE_URL}/{}/documents:{method}", self.database_name())
    }
}

#[async_trait]
impl MessageStore for FirestoreStore {
    fn watch_latest(&self, limit: usize) -> Result<LiveResults> {
        let query = LatestQuery {
            http: self.http.clone(),
            url: self.documents_url("runQuery"),
            api_key: self.api_key.clone(),
            limit,
        };
        let auth = self.auth.clone();
        let poll_interval = self.poll_interval;

        let (tx, rx) = mpsc::channel(4);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut last: Option<Vec<ChatMessage>> = None;
            loop {
                tokio::select! {
                    _ = tx.closed() => break,
                    _ = ticker.tick() => {}
                }

                let token = match auth.id_token().await {
                    Ok(token) => Some(token),
                    Err(ChatError::NotSignedIn) => None,
                    Err(err) => {
                        log::warn!("Live query over messages dropped: {err}");
                        break;
                    }
                };

                match query.run(token.as_deref()).await {
                    Ok(results) => {
                        if last.as_ref() == Some(&results) {
                            continue;
                        }
                        last = Some(results.clone());
                        if tx.send(results).await.is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        log::warn!("Live query over messages dropped: {err}");
                        break;
                    }
                }
            }
            log::debug!("Firestore live query released");
        });

        Ok(rx)
    }

    async fn add(&self, record: NewMessage) -> Result<String> {
        let token = self.auth.id_token().await?;
        let id = Uuid::new_v4().simple().to_string();
        let name = format!(
            "{}/documents/{MESSAGES_COLLECTION}/{id}",
            self.database_name()
        );

        let body = json!({
            "writes": [{
                "update": { "name": name, "fields": message_fields(&record) },
                "updateTransforms": [{
                    "fieldPath": "createdAt",
                    "setToServerValue": "REQUEST_TIME"
                }],
                "currentDocument": { "exists": false }
            }]
        });

        let response = self
            .http
            .post(self.documents_url("commit"))
            .query(&[("key", self.api_key.as_str())])
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ChatError::Write(api_error(response).await));
        }

        log::debug!("Firestore acknowledged message {id}");
        Ok(id)
    }
}
