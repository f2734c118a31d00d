//! Configuration types mapping to the TOML schema.
//!
//! Top-level config:
//! ```toml
//! [session]                # identity endpoint and timing
//! [store]                  # shared session store location
//! [client]                 # HTTP identity client settings
//! [language]               # labels for the login/logout controls
//! ```

use std::path::PathBuf;
use std::time::Duration;

use hearth_session::{
    DEFAULT_FRESH_INTENT_MARKER, DEFAULT_LOCK_BACKOFF, DEFAULT_LOCK_STALE_AFTER, DEFAULT_TIMEOUT,
    Language, SessionConfig,
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ConfigError, Result};

/// Default identity request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// All sections are optional so that partial configs (e.g., project-local
/// overrides) can be loaded and merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HearthConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionSection>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub store: Option<StoreSection>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub client: Option<ClientSection>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<LanguageSection>,
}

impl HearthConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge another config on top of this one (other takes priority).
    pub fn merge(&mut self, other: HearthConfig) {
        if other.session.is_some() {
            self.session = other.session;
        }

        if other.store.is_some() {
            self.store = other.store;
        }

        if other.client.is_some() {
            self.client = other.client;
        }

        if other.language.is_some() {
            self.language = other.language;
        }
    }

    /// Build the session configuration these sections describe.
    ///
    /// A missing `session.url` is left unset; the session builder reports it.
    pub fn session_config(&self) -> Result<SessionConfig> {
        let section = self.session.clone().unwrap_or_default();
        let language = self.language.clone().unwrap_or_default();

        let mut config = SessionConfig::new()
            .with_timeout(positive_millis("session.timeout_ms", section.timeout_ms)?)
            .with_lock_backoff(positive_millis("session.lock_backoff_ms", section.lock_backoff_ms)?)
            .with_lock_stale_after(positive_millis("session.lock_stale_ms", section.lock_stale_ms)?)
            .with_fresh_intent_marker(section.fresh_intent_marker)
            .with_language(language.into());

        if let Some(url) = &section.url {
            let endpoint =
                Url::parse(url).map_err(|e| ConfigError::invalid("session.url", e.to_string()))?;
            config = config.with_endpoint(endpoint);
        }

        Ok(config)
    }

    /// Identity request timeout.
    pub fn request_timeout(&self) -> Duration {
        let secs = self
            .client
            .as_ref()
            .map_or(DEFAULT_REQUEST_TIMEOUT_SECS, |c| c.request_timeout_secs);
        Duration::from_secs(secs)
    }
}

fn positive_millis(field: &str, millis: u64) -> Result<Duration> {
    if millis == 0 {
        return Err(ConfigError::invalid(field, "must be greater than zero"));
    }
    Ok(Duration::from_millis(millis))
}

// ─────────────────────────────────────────────────────────────────────────────
// Sections
// ─────────────────────────────────────────────────────────────────────────────

/// Session section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    /// Identity server endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// How long a cached session is trusted.
    pub timeout_ms: u64,
    /// Retry delay while another context revalidates.
    pub lock_backoff_ms: u64,
    /// Age after which a held lock is reclaimed.
    pub lock_stale_ms: u64,
    /// Location suffix marking a fresh sign-in.
    pub fresh_intent_marker: String,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            url: None,
            timeout_ms: DEFAULT_TIMEOUT.as_millis() as u64,
            lock_backoff_ms: DEFAULT_LOCK_BACKOFF.as_millis() as u64,
            lock_stale_ms: DEFAULT_LOCK_STALE_AFTER.as_millis() as u64,
            fresh_intent_marker: DEFAULT_FRESH_INTENT_MARKER.to_string(),
        }
    }
}

/// Store section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    /// Path of the shared store file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// HTTP identity client section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSection {
    pub request_timeout_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl Default for ClientSection {
    fn default() -> Self {
        Self {
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            user_agent: None,
        }
    }
}

/// Labels for the login/logout controls.
///
/// `logout_msg` may use `${username}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguageSection {
    pub login: String,
    pub logout: String,
    pub logout_msg_noname: String,
    pub logout_msg: String,
}

impl Default for LanguageSection {
    fn default() -> Self {
        Language::default().into()
    }
}

impl From<Language> for LanguageSection {
    fn from(language: Language) -> Self {
        Self {
            login: language.login,
            logout: language.logout,
            logout_msg_noname: language.logout_msg_noname,
            logout_msg: language.logout_msg,
        }
    }
}

impl From<LanguageSection> for Language {
    fn from(section: LanguageSection) -> Self {
        Self {
            login: section.login,
            logout: section.logout,
            logout_msg_noname: section.logout_msg_noname,
            logout_msg: section.logout_msg,
        }
    }
}
