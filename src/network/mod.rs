//! Narrow interface to the external platform: identity provider and message
//! store, plus the context object that owns them for the lifetime of the app.

pub mod firebase;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::common::{ChatMessage, NewMessage, UserIdentity};
use crate::config::{AppConfig, Backend};
use crate::error::Result;
use crate::storage::{self, Database, LocalIdentityProvider, SharedDatabase, SqliteMessageStore};

/// Live result set of a store query. Each item is the full current result,
/// oldest first. Dropping or closing the receiver releases the query.
pub type LiveResults = mpsc::Receiver<Vec<ChatMessage>>;

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Runs the provider's sign-in flow.
    async fn sign_in_interactive(&self) -> Result<UserIdentity>;

    async fn sign_out(&self) -> Result<()>;

    /// Cached session, read without any I/O.
    fn current_identity(&self) -> Option<UserIdentity>;
}

#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Opens a live query over the latest `limit` messages ordered by
    /// creation time. The first item is the result set at open time; a new
    /// item follows every change. The channel closing means the query
    /// dropped.
    fn watch_latest(&self, limit: usize) -> Result<LiveResults>;

    /// Appends a record stamped with the store's own clock and returns its id
    /// once the store acknowledges the write.
    async fn add(&self, record: NewMessage) -> Result<String>;
}

/// Platform clients, constructed once at startup and passed to the room.
#[derive(Clone)]
pub struct PlatformContext {
    name: &'static str,
    identity: Arc<dyn IdentityProvider>,
    store: Arc<dyn MessageStore>,
}

impl PlatformContext {
    pub fn new(
        name: &'static str,
        identity: Arc<dyn IdentityProvider>,
        store: Arc<dyn MessageStore>,
    ) -> Self {
        Self {
            name,
            identity,
            store,
        }
    }

    /// Builds the platform selected by `config`.
    pub fn connect(config: &AppConfig) -> Result<Self> {
        match config.backend() {
            Backend::Firebase(firebase) => {
                let http = reqwest::Client::builder()
                    .user_agent(concat!("rust_room_chat/", env!("CARGO_PKG_VERSION")))
                    .build()?;
                let auth = Arc::new(firebase::FirebaseAuth::new(
                    http.clone(),
                    firebase,
                    config.display_name.clone(),
                    config.default_photo_url.clone(),
                ));
                let store =
                    firebase::FirestoreStore::new(http, firebase, auth.clone(), config.poll_interval());
                log::info!("Connected to Firebase project {}", firebase.project_id);
                Ok(Self::new("firebase", auth, Arc::new(store)))
            }
            Backend::Local { database_path } => {
                storage::ensure_parent_dir(database_path)?;
                let db = Database::new(database_path)?.into_shared();
                log::info!("Using local room database {database_path}");
                Self::local(db, config)
            }
        }
    }

    /// SQLite platform over an already opened database.
    pub fn local(db: SharedDatabase, config: &AppConfig) -> Result<Self> {
        let identity = LocalIdentityProvider::new(
            db.clone(),
            config.display_name.clone(),
            config.default_photo_url.clone(),
        )?;
        let store = SqliteMessageStore::new(db, config.poll_interval());
        Ok(Self::new("local", Arc::new(identity), Arc::new(store)))
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn identity(&self) -> Arc<dyn IdentityProvider> {
        self.identity.clone()
    }

    pub fn store(&self) -> Arc<dyn MessageStore> {
        self.store.clone()
    }

    /// Releases the platform clients. Live queries still open end once their
    /// receivers are dropped.
    pub fn shutdown(self) {
        log::info!("Shutting down {} platform", self.name);
    }
}
