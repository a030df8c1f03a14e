pub mod database;
pub mod message_db;
pub mod models;
pub mod profile_db;

pub use database::{Database, SharedDatabase};
pub use message_db::SqliteMessageStore;
pub use profile_db::LocalIdentityProvider;

use std::fs;
use std::path::Path;

/// Ensure the directory holding `path` exists
pub fn ensure_parent_dir(path: &str) -> std::io::Result<()> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
