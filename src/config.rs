// Client configuration. The API key and endpoint are handed to the client
// at construction time; nothing here is process-global.
//
// Lookup order for the key: explicit value, `BACKGROUND_ERASE_API_KEY`,
// then the settings file in the user's home directory.

use crate::error::{Result, UploadError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_ENDPOINT: &str = "https://api.backgrounderase.net/v2";
pub const API_KEY_ENV: &str = "BACKGROUND_ERASE_API_KEY";
pub const ENDPOINT_ENV: &str = "BACKGROUND_ERASE_ENDPOINT";
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(20);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

const SETTINGS_FILE_NAME: &str = ".bgerase.json";

/// Everything the upload client needs to talk to the API.
#[derive(Clone)]
pub struct ClientConfig {
    pub api_key: String,
    pub endpoint: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

// The key must never end up in logs.
impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .field("connect_timeout", &self.connect_timeout)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl ClientConfig {
    /// Config for `api_key` against the public endpoint with default timeouts.
    pub fn new(api_key: impl Into<String>) -> Self {
        ClientConfig {
            api_key: api_key.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Resolve key and endpoint from an explicit value, the environment and
    /// the settings file, in that order.
    ///
    /// The settings file is only read when the flag and the environment leave
    /// something unset. If a key was supplied, an unreadable file is ignored.
    pub fn resolve(api_key: Option<String>, endpoint: Option<String>) -> Result<Self> {
        Self::resolve_with(
            api_key,
            endpoint,
            std::env::var(API_KEY_ENV).ok(),
            std::env::var(ENDPOINT_ENV).ok(),
            Settings::load_default,
        )
    }

    fn resolve_with(
        api_key: Option<String>,
        endpoint: Option<String>,
        env_key: Option<String>,
        env_endpoint: Option<String>,
        load_settings: impl FnOnce() -> Result<Settings>,
    ) -> Result<Self> {
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        let api_key = non_empty(api_key).or_else(|| non_empty(env_key));
        let endpoint = non_empty(endpoint).or_else(|| non_empty(env_endpoint));

        let settings = if api_key.is_some() && endpoint.is_some() {
            Settings::default()
        } else {
            match load_settings() {
                Ok(settings) => settings,
                Err(e) if api_key.is_some() => {
                    warn!("ignoring settings file: {}", e);
                    Settings::default()
                }
                Err(e) => return Err(e),
            }
        };

        let api_key = api_key
            .or_else(|| non_empty(settings.api_key))
            .ok_or(UploadError::MissingApiKey)?;
        let endpoint = endpoint
            .or_else(|| non_empty(settings.endpoint))
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

        Ok(ClientConfig::new(api_key.trim()).with_endpoint(endpoint))
    }
}

/// Persisted user settings, stored as JSON in the home directory.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

impl Settings {
    /// `~/.bgerase.json`, or `./.bgerase.json` when there is no home directory.
    pub fn default_path() -> PathBuf {
        let dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        dir.join(SETTINGS_FILE_NAME)
    }

    pub fn load_default() -> Result<Self> {
        Self::load(&Self::default_path())
    }

    /// A missing file yields empty settings.
    pub fn load(path: &Path) -> Result<Self> {
        let data = match std::fs::read_to_string(path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Settings::default()),
            Err(e) => return Err(UploadError::io(path, e)),
        };
        serde_json::from_str(&data).map_err(|e| {
            UploadError::config(format!("invalid settings file {}: {}", path.display(), e))
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| UploadError::config(format!("cannot serialize settings: {}", e)))?;
        std::fs::write(path, json).map_err(|e| UploadError::io(path, e))?;
        tracing::debug!(path = %path.display(), "saved settings");
        Ok(())
    }
}
