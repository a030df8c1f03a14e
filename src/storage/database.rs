use rusqlite::{Connection, Result as SqlResult};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Connection shared by the local message store and identity provider.
pub type SharedDatabase = Arc<Mutex<Database>>;

/// Base database connection wrapper
pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn new<P: AsRef<Path>>(path: P) -> SqlResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    pub fn in_memory() -> SqlResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    pub fn into_shared(self) -> SharedDatabase {
        Arc::new(Mutex::new(self))
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn init_schema(&self) -> SqlResult<()> {
        // `seq` keeps insertion order for messages stamped with the same millisecond.
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS messages (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                text TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                uid TEXT NOT NULL,
                photo_url TEXT NOT NULL
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_messages_created_at ON messages(created_at, seq)",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS profile (
                slot INTEGER PRIMARY KEY CHECK (slot = 1),
                uid TEXT NOT NULL,
                display_name TEXT,
                photo_url TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                signed_in INTEGER NOT NULL DEFAULT 0
            )",
            [],
        )?;

        Ok(())
    }
}

/// Locks the shared connection, recovering it if a previous holder panicked.
pub fn lock(db: &SharedDatabase) -> MutexGuard<'_, Database> {
    db.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
