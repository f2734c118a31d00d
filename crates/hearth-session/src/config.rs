//! Configuration for a session.

use std::time::Duration;

use url::Url;

use crate::error::{Error, Result};
use crate::notify::SessionSnapshot;
use crate::template;

/// Default session timeout: a cached session is trusted for three minutes.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(180_000);

/// Default delay before re-checking a lock held by another context.
pub const DEFAULT_LOCK_BACKOFF: Duration = Duration::from_millis(100);

/// Default age after which a held lock is considered abandoned.
pub const DEFAULT_LOCK_STALE_AFTER: Duration = Duration::from_secs(30);

/// Default suffix of the current location that marks a just-created session.
pub const DEFAULT_FRESH_INTENT_MARKER: &str = "#auth";

/// User-facing labels for the login/logout controls.
///
/// `logout_msg` may contain a `${username}` placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Language {
    pub login: String,
    pub logout: String,
    pub logout_msg_noname: String,
    pub logout_msg: String,
}

impl Default for Language {
    fn default() -> Self {
        Self {
            login: "Sign in".to_string(),
            logout: "Log out".to_string(),
            logout_msg_noname: "Log out".to_string(),
            logout_msg: "Logged in as ${username}. Click here to log out.".to_string(),
        }
    }
}

impl Language {
    /// Label of the sign-in control.
    pub fn login_label(&self) -> &str {
        &self.login
    }

    /// Label of the logout control for the given identity.
    pub fn logout_label(&self, username: Option<&str>) -> String {
        match username {
            Some(name) => template::render(&self.logout_msg, &[("username", name)]),
            None => self.logout_msg_noname.clone(),
        }
    }

    /// Label shown for the session as it currently stands.
    pub fn status_label(&self, snapshot: &SessionSnapshot) -> String {
        self.logout_label(snapshot.username.as_deref())
    }
}

/// Configuration for a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Identity server endpoint. Required.
    pub endpoint: Option<Url>,

    /// How long an established record is trusted before revalidation.
    pub timeout: Duration,

    /// Retry delay while another context holds the revalidation lock.
    pub lock_backoff: Duration,

    /// Age after which a held lock is reclaimed.
    pub lock_stale_after: Duration,

    /// Location suffix marking a session that was just created server-side.
    pub fresh_intent_marker: String,

    /// Labels for the presentation adapter.
    pub language: Language,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout: DEFAULT_TIMEOUT,
            lock_backoff: DEFAULT_LOCK_BACKOFF,
            lock_stale_after: DEFAULT_LOCK_STALE_AFTER,
            fresh_intent_marker: DEFAULT_FRESH_INTENT_MARKER.to_string(),
            language: Language::default(),
        }
    }
}

impl SessionConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the identity server endpoint.
    pub fn with_endpoint(mut self, endpoint: Url) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    /// Parse and set the identity server endpoint.
    pub fn with_endpoint_str(mut self, endpoint: &str) -> Result<Self> {
        let url = Url::parse(endpoint)
            .map_err(|e| Error::Config(format!("url '{}' is invalid: {}", endpoint, e)))?;
        self.endpoint = Some(url);
        Ok(self)
    }

    /// Set the session timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the lock retry delay.
    pub fn with_lock_backoff(mut self, backoff: Duration) -> Self {
        self.lock_backoff = backoff;
        self
    }

    /// Set the age after which a held lock is reclaimed.
    pub fn with_lock_stale_after(mut self, stale_after: Duration) -> Self {
        self.lock_stale_after = stale_after;
        self
    }

    /// Set the fresh-intent location marker.
    pub fn with_fresh_intent_marker(mut self, marker: impl Into<String>) -> Self {
        self.fresh_intent_marker = marker.into();
        self
    }

    /// Set the presentation labels.
    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    /// Session timeout in milliseconds, as compared against store timestamps.
    pub fn timeout_millis(&self) -> i64 {
        duration_millis(self.timeout)
    }

    /// Whether `location` carries the fresh-intent marker.
    pub fn is_fresh_intent(&self, location: &str) -> bool {
        !self.fresh_intent_marker.is_empty() && location.ends_with(&self.fresh_intent_marker)
    }

    pub(crate) fn validate(&self) -> Result<Url> {
        let endpoint = self
            .endpoint
            .clone()
            .ok_or_else(|| Error::Config("url is undefined".to_string()))?;
        if self.timeout.is_zero() {
            return Err(Error::Config("timeout must be greater than zero".to_string()));
        }
        if self.lock_backoff.is_zero() {
            return Err(Error::Config(
                "lock backoff must be greater than zero".to_string(),
            ));
        }
        Ok(endpoint)
    }
}

/// Convert a duration to whole milliseconds, saturating at `i64::MAX`.
pub(crate) fn duration_millis(d: Duration) -> i64 {
    i64::try_from(d.as_millis()).unwrap_or(i64::MAX)
}
