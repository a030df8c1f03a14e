use thiserror::Error;

/// Errors raised at the boundary with the identity provider and message store.
///
/// None of these are fatal: every caller logs or reports them and keeps the
/// UI interactive.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Interactive sign-in was rejected, cancelled or errored.
    #[error("sign-in failed: {0}")]
    Auth(String),

    /// The live query could not be opened or dropped.
    #[error("subscription failed: {0}")]
    Subscription(String),

    /// The store rejected an append.
    #[error("message was not sent: {0}")]
    Write(String),

    #[error("no user is signed in")]
    NotSignedIn,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Storage(#[from] rusqlite::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ChatError>;
