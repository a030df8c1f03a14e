use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::json;

use crate::common::UserIdentity;
use crate::config::FirebaseConfig;
use crate::error::{ChatError, Result};
use crate::network::IdentityProvider;

use super::api_error;

const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com/v1";
const SECURE_TOKEN_URL: &str = "https://securetoken.googleapis.com/v1/token";

/// Refresh id tokens this long before they expire.
const REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone)]
struct AuthSession {
    identity: UserIdentity,
    id_token: String,
    refresh_token: String,
    expires_at: DateTime<Utc>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignUpResponse {
    id_token: String,
    refresh_token: String,
    expires_in: String,
    local_id: String,
}

#[derive(Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    expires_in: String,
}

/// Firebase Authentication over its REST API, using anonymous accounts.
pub struct FirebaseAuth {
    http: reqwest::Client,
    api_key: String,
    display_name: Option<String>,
    default_photo_url: String,
    session: RwLock<Option<AuthSession>>,
}

impl FirebaseAuth {
    pub fn new(
        http: reqwest::Client,
        config: &FirebaseConfig,
        display_name: Option<String>,
        default_photo_url: String,
    ) -> Self {
        Self {
            http,
            api_key: config.api_key.clone(),
            display_name,
            default_photo_url,
            session: RwLock::new(None),
        }
    }

    fn session(&self) -> Option<AuthSession> {
        self.session
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn set_session(&self, next: Option<AuthSession>) {
        *self
            .session
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = next;
    }

    /// Bearer token for Firestore calls, refreshed when close to expiry.
    pub async fn id_token(&self) -> Result<String> {
        let session = self.session().ok_or(ChatError::NotSignedIn)?;
        if session.expires_at - Utc::now() > Duration::seconds(REFRESH_MARGIN_SECS) {
            return Ok(session.id_token);
        }

        log::debug!("Refreshing id token for {}", session.identity.uid);
        let response = self
            .http
            .post(format!("{SECURE_TOKEN_URL}?key={}", self.api_key))
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", session.refresh_token.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let reason = api_error(response).await;
            // The refresh token is dead; the session with it.
            self.set_session(None);
            return Err(ChatError::Auth(format!("token refresh rejected: {reason}")));
        }

        let refreshed: RefreshResponse = response.json().await?;
        let next = AuthSession {
            identity: session.identity,
            id_token: refreshed.id_token.clone(),
            refresh_token: refreshed.refresh_token,
            expires_at: expiry_from(&refreshed.expires_in),
        };
        self.set_session(Some(next));
        Ok(refreshed.id_token)
    }
}

/// `expiresIn` arrives as a decimal string of seconds.
fn expiry_from(expires_in: &str) -> DateTime<Utc> {
    let seconds = expires_in.trim().parse::<i64>().unwrap_or(3600);
    Utc::now() + Duration::seconds(seconds)
}

#[async_trait]
impl IdentityProvider for FirebaseAuth {
    async fn sign_in_interactive(&self) -> Result<UserIdentity> {
        let response = self
            .http
            .post(format!(
                "{IDENTITY_TOOLKIT_URL}/accounts:signUp?key={}",
                self.api_key
            ))
            .json(&json!({ "returnSecureToken": true }))
            .send()
            .await
            .map_err(|err| ChatError::Auth(err.to_string()))?;

        if !response.status().is_success() {
            return Err(ChatError::Auth(api_error(response).await));
        }

        let body: SignUpResponse = response
            .json()
            .await
            .map_err(|err| ChatError::Auth(err.to_string()))?;

        let identity = UserIdentity {
            uid: body.local_id,
            display_name: self.display_name.clone(),
            photo_url: self.default_photo_url.clone(),
        };
        log::info!("Signed in to Firebase as {}", identity.uid);

        self.set_session(Some(AuthSession {
            identity: identity.clone(),
            id_token: body.id_token,
            refresh_token: body.refresh_token,
            expires_at: expiry_from(&body.expires_in),
        }));
        Ok(identity)
    }

    async fn sign_out(&self) -> Result<()> {
        self.set_session(None);
        Ok(())
    }

    fn current_identity(&self) -> Option<UserIdentity> {
        self.session().map(|session| session.identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sign_up_payload() {
        let body: SignUpResponse = serde_json::from_str(
            r#"{
                "kind": "identitytoolkit#SignupNewUserResponse",
                "idToken": "tok",
                "refreshToken": "ref",
                "expiresIn": "3600",
                "localId": "uid-1"
            }"#,
        )
        .unwrap();
        assert_eq!(body.local_id, "uid-1");
        assert_eq!(body.expires_in, "3600");
    }

    #[test]
    fn malformed_expiry_defaults_to_an_hour() {
        let expiry = expiry_from("soon");
        let remaining = expiry - Utc::now();
        assert!(remaining > Duration::minutes(59));
    }

    #[tokio::test]
    async fn token_requires_a_session() {
        let auth = FirebaseAuth::new(
            reqwest::Client::new(),
            &FirebaseConfig::default(),
            None,
            String::new(),
        );
        assert!(auth.current_identity().is_none());
        assert!(matches!(auth.id_token().await, Err(ChatError::NotSignedIn)));
    }
}
