use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{OptionalExtension, params};
use uuid::Uuid;

use crate::common::UserIdentity;
use crate::error::Result;
use crate::network::IdentityProvider;

use super::database::{self, SharedDatabase};
use super::models::LocalProfile;

/// Identity provider for the local platform.
///
/// Signing in creates (once) and reuses a single profile stored next to the
/// messages, so the same uid owns the same messages across runs. The
/// signed-in flag is persisted the way a hosted provider caches sessions.
pub struct LocalIdentityProvider {
    db: SharedDatabase,
    display_name: Option<String>,
    default_photo_url: String,
    session: RwLock<Option<UserIdentity>>,
}

impl LocalIdentityProvider {
    pub fn new(
        db: SharedDatabase,
        display_name: Option<String>,
        default_photo_url: impl Into<String>,
    ) -> Result<Self> {
        let session = load_profile(&db)?
            .filter(|profile| profile.signed_in)
            .map(|profile| profile.identity());

        if let Some(identity) = &session {
            log::info!("Restored local session for {}", identity.label());
        }

        Ok(Self {
            db,
            display_name,
            default_photo_url: default_photo_url.into(),
            session: RwLock::new(session),
        })
    }

    fn set_session(&self, identity: Option<UserIdentity>) {
        let mut session = self
            .session
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *session = identity;
    }

    fn sign_in_profile(&self) -> Result<LocalProfile> {
        let db = database::lock(&self.db);
        let conn = db.connection();

        let existing = conn
            .query_row(
                "SELECT uid, display_name, photo_url, created_at, signed_in FROM profile WHERE slot = 1",
                [],
                read_profile,
            )
            .optional()?;

        let profile = match existing {
            Some(mut profile) => {
                if self.display_name.is_some() {
                    profile.display_name = self.display_name.clone();
                }
                profile.signed_in = true;
                conn.execute(
                    "UPDATE profile SET display_name = ?1, signed_in = 1 WHERE slot = 1",
                    params![profile.display_name],
                )?;
                profile
            }
            None => {
                let profile = LocalProfile {
                    uid: Uuid::new_v4().simple().to_string(),
                    display_name: self.display_name.clone(),
                    photo_url: self.default_photo_url.clone(),
                    created_at: Utc::now().timestamp(),
                    signed_in: true,
                };
                conn.execute(
                    "INSERT INTO profile (slot, uid, display_name, photo_url, created_at, signed_in)
                     VALUES (1, ?1, ?2, ?3, ?4, 1)",
                    params![
                        profile.uid,
                        profile.display_name,
                        profile.photo_url,
                        profile.created_at
                    ],
                )?;
                log::info!("Created local profile {}", profile.uid);
                profile
            }
        };

        Ok(profile)
    }
}

fn read_profile(row: &rusqlite::Row<'_>) -> rusqlite::Result<LocalProfile> {
    Ok(LocalProfile {
        uid: row.get(0)?,
        display_name: row.get(1)?,
        photo_url: row.get(2)?,
        created_at: row.get(3)?,
        signed_in: row.get::<_, i64>(4)? != 0,
    })
}

fn load_profile(db: &SharedDatabase) -> Result<Option<LocalProfile>> {
    let db = database::lock(db);
    let profile = db
        .connection()
        .query_row(
            "SELECT uid, display_name, photo_url, created_at, signed_in FROM profile WHERE slot = 1",
            [],
            read_profile,
        )
        .optional()?;
    Ok(profile)
}

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    async fn sign_in_interactive(&self) -> Result<UserIdentity> {
        let identity = self.sign_in_profile()?.identity();
        self.set_session(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_out(&self) -> Result<()> {
        {
            let db = database::lock(&self.db);
            db.connection()
                .execute("UPDATE profile SET signed_in = 0 WHERE slot = 1", [])?;
        }
        self.set_session(None);
        Ok(())
    }

    fn current_identity(&self) -> Option<UserIdentity> {
        self.session
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;

    fn provider(db: &SharedDatabase, name: Option<&str>) -> LocalIdentityProvider {
        LocalIdentityProvider::new(db.clone(), name.map(str::to_string), "https://example.com/me.png")
            .unwrap()
    }

    #[tokio::test]
    async fn sign_in_reuses_the_stored_profile() {
        let db = Database::in_memory().unwrap().into_shared();
        let auth = provider(&db, Some("ana"));
        assert!(auth.current_identity().is_none());

        let first = auth.sign_in_interactive().await.unwrap();
        assert_eq!(first.label(), "ana");
        assert_eq!(first.photo_url, "https://example.com/me.png");

        auth.sign_out().await.unwrap();
        assert!(auth.current_identity().is_none());

        let second = auth.sign_in_interactive().await.unwrap();
        assert_eq!(first.uid, second.uid);
    }

    #[tokio::test]
    async fn session_survives_a_restart() {
        let db = Database::in_memory().unwrap().into_shared();
        let identity = provider(&db, None).sign_in_interactive().await.unwrap();

        let restarted = provider(&db, None);
        assert_eq!(restarted.current_identity(), Some(identity));
    }
}
