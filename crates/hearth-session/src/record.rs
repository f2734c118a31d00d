//! Store key contract and the cached session record.
//!
//! The record lives under a fixed set of keys so that any context sharing
//! the store reads the same fact. Reads fall back to typed defaults, and a
//! value of the wrong type reads as the default.

use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::store::{SharedStore, StoreValue};

/// Store keys owned by the session.
pub mod keys {
    pub const TIMESTAMP: &str = "session-timestamp";
    pub const USERNAME: &str = "session-username";
    pub const ESTABLISHED: &str = "session-established";
    pub const LOCKED: &str = "session-locked";
    pub const LOCKED_AT: &str = "session-locked-at";
    pub const SIGNIN_LOCATION: &str = "session-signin-location";
    pub const SIGNIN_TIMESTAMP: &str = "session-signin-timestamp";

    /// Every key, in display order.
    pub const ALL: [&str; 7] = [
        TIMESTAMP,
        USERNAME,
        ESTABLISHED,
        LOCKED,
        LOCKED_AT,
        SIGNIN_LOCATION,
        SIGNIN_TIMESTAMP,
    ];
}

/// The cached session fact, as read from the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionRecord {
    /// The record reflects a completed identity check.
    pub established: bool,

    /// A revalidation round trip is in flight in some context.
    pub locked: bool,

    /// When the lock was taken (epoch millis).
    pub locked_at: Option<i64>,

    /// When the record was last established (epoch millis).
    pub timestamp: i64,

    /// Confirmed identity; `None` with `established` means "checked, unauthenticated".
    pub username: Option<String>,

    /// Location saved when the user initiated sign-in.
    pub signin_location: Option<String>,

    /// Record timestamp at the moment sign-in was initiated.
    pub signin_timestamp: Option<i64>,
}

/// Typed access to the session keys of a store.
#[derive(Debug, Clone)]
pub struct RecordStore {
    store: SharedStore,
}

impl RecordStore {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    fn bool_or(&self, key: &str, default: bool) -> Result<bool> {
        Ok(match self.store.get(key)? {
            None => default,
            Some(value) => value.as_bool().unwrap_or_else(|| {
                debug!(key, ?value, "Ignoring non-boolean store value");
                default
            }),
        })
    }

    fn int(&self, key: &str) -> Result<Option<i64>> {
        Ok(match self.store.get(key)? {
            None => None,
            Some(value) => {
                let parsed = value.as_i64();
                if parsed.is_none() {
                    debug!(key, ?value, "Ignoring non-integer store value");
                }
                parsed
            }
        })
    }

    fn text(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .store
            .get(key)?
            .and_then(|value| value.as_str().map(str::to_string)))
    }

    pub fn established(&self) -> Result<bool> {
        self.bool_or(keys::ESTABLISHED, false)
    }

    pub fn locked(&self) -> Result<bool> {
        self.bool_or(keys::LOCKED, false)
    }

    pub fn locked_at(&self) -> Result<Option<i64>> {
        self.int(keys::LOCKED_AT)
    }

    pub fn timestamp(&self) -> Result<i64> {
        Ok(self.int(keys::TIMESTAMP)?.unwrap_or(0))
    }

    pub fn username(&self) -> Result<Option<String>> {
        self.text(keys::USERNAME)
    }

    pub fn signin_location(&self) -> Result<Option<String>> {
        self.text(keys::SIGNIN_LOCATION)
    }

    pub fn signin_timestamp(&self) -> Result<Option<i64>> {
        self.int(keys::SIGNIN_TIMESTAMP)
    }

    /// Read the whole record.
    pub fn load(&self) -> Result<SessionRecord> {
        Ok(SessionRecord {
            established: self.established()?,
            locked: self.locked()?,
            locked_at: self.locked_at()?,
            timestamp: self.timestamp()?,
            username: self.username()?,
            signin_location: self.signin_location()?,
            signin_timestamp: self.signin_timestamp()?,
        })
    }

    /// Forget the cached fact so the next read revalidates.
    ///
    /// The username key is removed rather than blanked. Sign-in intent keys
    /// are kept; their age is judged against the timeout when read.
    pub fn flush(&self) -> Result<()> {
        debug!("Flushing session data in store");
        self.store.set(keys::TIMESTAMP, StoreValue::Int(0))?;
        self.store.set(keys::LOCKED, StoreValue::Bool(false))?;
        self.store.delete(keys::LOCKED_AT)?;
        self.store.set(keys::ESTABLISHED, StoreValue::Bool(false))?;
        self.store.delete(keys::USERNAME)
    }

    /// Mark a revalidation round trip as in flight.
    pub fn acquire_lock(&self, now: i64) -> Result<()> {
        self.store.set(keys::LOCKED, StoreValue::Bool(true))?;
        self.store.set(keys::LOCKED_AT, StoreValue::Int(now))
    }

    /// Date a lock that was taken without a timestamp.
    pub fn stamp_lock(&self, now: i64) -> Result<()> {
        self.store.set(keys::LOCKED_AT, StoreValue::Int(now))
    }

    /// Record the outcome of a completed identity check and release the lock.
    ///
    /// An absent identity leaves no username key behind.
    pub fn establish(&self, now: i64, username: Option<&str>) -> Result<()> {
        self.store.set(keys::TIMESTAMP, StoreValue::Int(now))?;
        match username {
            Some(name) => self.store.set(keys::USERNAME, name.into())?,
            None => self.store.delete(keys::USERNAME)?,
        }
        self.store.set(keys::ESTABLISHED, StoreValue::Bool(true))?;
        self.store.set(keys::LOCKED, StoreValue::Bool(false))?;
        self.store.delete(keys::LOCKED_AT)
    }

    /// Save where the user was when sign-in started.
    pub fn record_signin_intent(&self, location: &str, timestamp: i64) -> Result<()> {
        self.store.set(keys::SIGNIN_LOCATION, location.into())?;
        self.store.set(keys::SIGNIN_TIMESTAMP, StoreValue::Int(timestamp))
    }
}
