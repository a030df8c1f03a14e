use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_PATH: &str = "config/room_chat.json";
pub const DEFAULT_DATABASE_PATH: &str = "data/room_chat.db";
pub const DEFAULT_PHOTO_URL: &str = "https://www.gravatar.com/avatar/?d=mp";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1500;

/// Web app settings of the hosted platform, as issued by the Firebase console.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FirebaseConfig {
    pub api_key: String,
    pub auth_domain: String,
    pub project_id: String,
    pub storage_bucket: String,
    pub messaging_sender_id: String,
    pub app_id: String,
    pub measurement_id: String,
}

impl FirebaseConfig {
    /// Auth and Firestore calls need only the API key and project id.
    pub fn is_usable(&self) -> bool {
        !self.api_key.trim().is_empty() && !self.project_id.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub firebase: FirebaseConfig,
    #[serde(default = "default_database_path")]
    pub database_path: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default = "default_photo_url")]
    pub default_photo_url: String,
    /// How often the hosted live query re-reads the room.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

/// Which platform the client talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend<'a> {
    Firebase(&'a FirebaseConfig),
    Local { database_path: &'a str },
}

fn default_database_path() -> String {
    DEFAULT_DATABASE_PATH.to_string()
}

fn default_photo_url() -> String {
    DEFAULT_PHOTO_URL.to_string()
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            firebase: FirebaseConfig::default(),
            database_path: default_database_path(),
            display_name: None,
            default_photo_url: default_photo_url(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl AppConfig {
    pub fn backend(&self) -> Backend<'_> {
        if self.firebase.is_usable() {
            Backend::Firebase(&self.firebase)
        } else {
            Backend::Local {
                database_path: &self.database_path,
            }
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(100))
    }

    /// Overlays process environment (including a loaded `.env`) on top of the file.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let firebase = &mut self.firebase;
        let fields: [(&str, &mut String); 7] = [
            ("FIREBASE_API_KEY", &mut firebase.api_key),
            ("FIREBASE_AUTH_DOMAIN", &mut firebase.auth_domain),
            ("FIREBASE_PROJECT_ID", &mut firebase.project_id),
            ("FIREBASE_STORAGE_BUCKET", &mut firebase.storage_bucket),
            ("FIREBASE_MESSAGING_SENDER_ID", &mut firebase.messaging_sender_id),
            ("FIREBASE_APP_ID", &mut firebase.app_id),
            ("FIREBASE_MEASUREMENT_ID", &mut firebase.measurement_id),
        ];
        for (key, field) in fields {
            if let Some(value) = lookup(key) {
                *field = value;
            }
        }

        if let Some(name) = lookup("ROOM_CHAT_DISPLAY_NAME") {
            self.display_name = Some(name);
        }
        if let Some(path) = lookup("ROOM_CHAT_DATABASE") {
            self.database_path = path;
        }
    }
}

pub fn load_config(path: &str) -> AppConfig {
    let path = Path::new(path);
    match fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str::<AppConfig>(&content) {
            Ok(config) => config,
            Err(err) => {
                log::warn!("Failed to parse config file {}: {err}", path.display());
                AppConfig::default()
            }
        },
        Err(err) => {
            log::info!(
                "Config file {} not found ({err}); using defaults",
                path.display()
            );
            AppConfig::default()
        }
    }
}

pub fn save_config(path: &str, config: &AppConfig) -> std::io::Result<()> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(config)?;
    fs::write(path, json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn missing_file_falls_back_to_local_backend() {
        let config = load_config("does/not/exist.json");
        assert_eq!(config, AppConfig::default());
        assert_eq!(
            config.backend(),
            Backend::Local {
                database_path: DEFAULT_DATABASE_PATH
            }
        );
    }

    #[test]
    fn partial_json_uses_field_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{ "firebase": { "apiKey": "k", "projectId": "p" } }"#)
                .unwrap();

        assert_eq!(config.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);
        assert_eq!(config.default_photo_url, DEFAULT_PHOTO_URL);
        assert!(matches!(config.backend(), Backend::Firebase(fb) if fb.project_id == "p"));
    }

    #[test]
    fn environment_overrides_file_values() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("FIREBASE_API_KEY", "env-key"),
            ("FIREBASE_PROJECT_ID", "env-project"),
            ("ROOM_CHAT_DISPLAY_NAME", "bo"),
        ]);
        let mut config = AppConfig::default();
        config.apply_overrides(|key| env.get(key).map(|value| value.to_string()));

        assert_eq!(config.firebase.api_key, "env-key");
        assert_eq!(config.firebase.project_id, "env-project");
        assert_eq!(config.display_name.as_deref(), Some("bo"));
        assert_eq!(config.database_path, DEFAULT_DATABASE_PATH);
    }

    #[test]
    fn blank_credentials_are_not_usable() {
        let firebase = FirebaseConfig {
            api_key: "  ".to_string(),
            project_id: "p".to_string(),
            ..FirebaseConfig::default()
        };
        assert!(!firebase.is_usable());
    }
}
