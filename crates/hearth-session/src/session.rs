//! The session state machine.
//!
//! A [`Session`] owns the interpretation of the stored record. Each call to
//! [`Session::evaluate`] runs one cycle: derive the state, trust the cache
//! or revalidate against the identity server, publish the outcome, and
//! report when the next cycle is due. Scheduling that next cycle is the
//! job of [`SessionHandle`](crate::SessionHandle).

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::{Language, SessionConfig};
use crate::error::{Error, Result};
use crate::expiry::{self, SharedClock, SystemClock};
use crate::identity::{Identity, IdentityAction, SharedIdentityClient};
use crate::lock::{LockPolicy, LockStatus};
use crate::notify::{
    self, Established, EstablishedFrom, FixedLocation, NoopObserver, SessionSnapshot,
    SharedNavigator, SharedObserver,
};
use crate::record::{RecordStore, SessionRecord};
use crate::state::SessionState;
use crate::store::SharedStore;

/// Result of one evaluation cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cycle {
    pub outcome: Outcome,

    /// Delay until the next evaluation should run.
    pub next: Duration,
}

impl Cycle {
    /// The establishment event, if the cycle reached one.
    pub fn established(&self) -> Option<&Established> {
        match &self.outcome {
            Outcome::Established(event) => Some(event),
            Outcome::LockBusy { .. } => None,
        }
    }
}

/// How an evaluation cycle ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The session is established; observers were notified.
    Established(Established),

    /// Another context holds the revalidation lock; retry after backoff.
    LockBusy { since: Option<i64> },
}

/// Client-held authentication session backed by a shared store.
pub struct Session {
    config: SessionConfig,
    endpoint: Url,
    records: RecordStore,
    identity: SharedIdentityClient,
    navigator: SharedNavigator,
    observer: SharedObserver,
    clock: SharedClock,
    lock: LockPolicy,
    snapshot: watch::Sender<SessionSnapshot>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("endpoint", &self.endpoint.as_str())
            .field("timeout", &self.config.timeout)
            .field("snapshot", &*self.snapshot.borrow())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Create a new session builder.
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    /// Get the session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Get the identity server endpoint.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Get the presentation labels.
    pub fn language(&self) -> &Language {
        &self.config.language
    }

    /// Current in-memory view of the session.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn username(&self) -> Option<String> {
        self.snapshot.borrow().username.clone()
    }

    pub fn timestamp(&self) -> i64 {
        self.snapshot.borrow().timestamp
    }

    /// Watch the in-memory view; updated on every establishment.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.subscribe()
    }

    /// Read the stored record without changing anything.
    pub fn record(&self) -> Result<SessionRecord> {
        self.records.load()
    }

    /// Run one evaluation cycle.
    pub async fn evaluate(&self) -> Result<Cycle> {
        let location = self.navigator.current_location();
        let fresh_intent = self.config.is_fresh_intent(&location);
        let now = self.clock.now_millis();
        let record = self.records.load()?;
        if !fresh_intent {
            debug!("Session is not new");
        }

        let state = SessionState::classify(&record, now, self.config.timeout_millis(), fresh_intent);
        match state {
            SessionState::FreshIntent => info!(location = %location, "New session detected"),
            SessionState::Unestablished => {
                debug!("Session data is not available, requery from server is required")
            }
            SessionState::Expired => info!(
                username = ?record.username,
                age_ms = expiry::age(now, record.timestamp),
                "Session expired"
            ),
            SessionState::Valid => {
                debug!(username = ?record.username, "Loading session from store")
            }
        }

        if state.needs_flush() {
            self.flush()?;
        }
        if state.needs_revalidation() {
            return self.load_from_server(fresh_intent).await;
        }

        let snapshot = SessionSnapshot {
            timestamp: record.timestamp,
            username: record.username,
        };
        let event = self.publish(snapshot, EstablishedFrom::Cache, false)?;
        Ok(Cycle {
            outcome: Outcome::Established(event),
            next: self.config.timeout,
        })
    }

    /// Flush the stored record, then evaluate. Forces a server round trip.
    pub async fn reevaluate(&self) -> Result<Cycle> {
        self.flush()?;
        self.evaluate().await
    }

    /// Forget the cached fact. Sign-in intent is kept.
    pub fn flush(&self) -> Result<()> {
        self.records.flush()
    }

    /// Save the current location so a fresh sign-in can return to it.
    ///
    /// Navigating to the identity provider is left to the caller.
    pub fn initiate_sign_in(&self) -> Result<()> {
        let location = self.navigator.current_location();
        let timestamp = self.timestamp();
        debug!(location = %location, timestamp, "Recording sign-in intent");
        self.records.record_signin_intent(&location, timestamp)
    }

    /// End the server-side session, then re-evaluate.
    ///
    /// A failed logout leaves the session untouched and returns `Ok(None)`.
    pub async fn logout(&self) -> Result<Option<Cycle>> {
        match self
            .identity
            .identify(&self.endpoint, IdentityAction::Logout)
            .await
        {
            Ok(_) => {
                info!("Logged out");
                self.reevaluate().await.map(Some)
            }
            Err(e) => {
                warn!(error = %e, "Logout request failed, session left unchanged");
                Ok(None)
            }
        }
    }

    async fn load_from_server(&self, fresh_intent: bool) -> Result<Cycle> {
        let now = self.clock.now_millis();
        let record = self.records.load()?;

        let status = self.lock.inspect(&record, now);
        if !status.may_proceed() {
            let since = record.locked_at;
            if since.is_none() {
                self.records.stamp_lock(now)?;
            }
            debug!("Server access is locked, session is being loaded in another context");
            return Ok(Cycle {
                outcome: Outcome::LockBusy { since },
                next: self.lock.backoff,
            });
        }
        if let LockStatus::Stale { since } = status {
            warn!(
                age_ms = expiry::age(now, since),
                "Reclaiming stale revalidation lock"
            );
        }

        self.records.acquire_lock(now)?;
        debug!(endpoint = %self.endpoint, "Loading session from server");

        let identity = match self
            .identity
            .identify(&self.endpoint, IdentityAction::Ident)
            .await
        {
            Ok(identity) => {
                debug!("Session data was successfully received from server");
                identity
            }
            Err(e) => {
                debug!(error = %e, "Session was not loaded from server");
                Identity::anonymous()
            }
        };

        let completed = self.clock.now_millis().max(now);
        self.records.establish(completed, identity.username.as_deref())?;

        let snapshot = SessionSnapshot {
            timestamp: completed,
            username: identity.username,
        };
        let event = self.publish(snapshot, EstablishedFrom::Server, fresh_intent)?;
        Ok(Cycle {
            outcome: Outcome::Established(event),
            next: self.config.timeout,
        })
    }

    fn publish(
        &self,
        snapshot: SessionSnapshot,
        source: EstablishedFrom,
        fresh_intent: bool,
    ) -> Result<Established> {
        let resume_to = if fresh_intent && snapshot.is_authenticated() {
            notify::resume_target(
                fresh_intent,
                &snapshot,
                self.records.signin_location()?.as_deref(),
                self.records.signin_timestamp()?,
                self.clock.now_millis(),
                self.config.timeout_millis(),
            )
        } else {
            None
        };

        match &snapshot.username {
            Some(username) => info!(username = %username, ?source, "Authenticated"),
            None => info!(?source, "Unauthenticated context"),
        }

        self.snapshot.send_replace(snapshot.clone());
        let event = Established {
            snapshot,
            source,
            resume_to,
        };
        self.observer.on_established(&event);

        if let Some(target) = &event.resume_to {
            info!(location = %target, "Resuming navigation saved at sign-in");
            self.navigator.navigate(target);
        }

        Ok(event)
    }
}

/// Builder for creating a [`Session`].
///
/// Endpoint, store and identity client are required.
#[derive(Default)]
pub struct SessionBuilder {
    config: SessionConfig,
    store: Option<SharedStore>,
    identity: Option<SharedIdentityClient>,
    navigator: Option<SharedNavigator>,
    observer: Option<SharedObserver>,
    clock: Option<SharedClock>,
}

impl SessionBuilder {
    /// Create a new builder with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the identity server endpoint.
    pub fn endpoint(mut self, endpoint: Url) -> Self {
        self.config.endpoint = Some(endpoint);
        self
    }

    /// Set the session timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the shared persistent store.
    pub fn store(mut self, store: SharedStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the identity client.
    pub fn identity(mut self, identity: SharedIdentityClient) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Set the navigator. Defaults to an empty fixed location.
    pub fn navigator(mut self, navigator: SharedNavigator) -> Self {
        self.navigator = Some(navigator);
        self
    }

    /// Set the establishment observer. Defaults to a no-op.
    pub fn observer(mut self, observer: SharedObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Set the clock. Defaults to the system clock.
    pub fn clock(mut self, clock: SharedClock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Build the session.
    ///
    /// Fails with [`Error::Config`] when a required part is missing; the
    /// in-memory view starts from whatever the store already holds.
    pub fn build(self) -> Result<Session> {
        let endpoint = self.config.validate()?;
        let store = self
            .store
            .ok_or_else(|| Error::Config("store is undefined".to_string()))?;
        let identity = self
            .identity
            .ok_or_else(|| Error::Config("identity client is undefined".to_string()))?;

        let records = RecordStore::new(store);
        let snapshot = SessionSnapshot {
            timestamp: records.timestamp()?,
            username: records.username()?,
        };
        let (snapshot, _) = watch::channel(snapshot);

        let lock = LockPolicy::new(self.config.lock_backoff, self.config.lock_stale_after);

        Ok(Session {
            config: self.config,
            endpoint,
            records,
            identity,
            navigator: self
                .navigator
                .unwrap_or_else(|| Arc::new(FixedLocation::default())),
            observer: self.observer.unwrap_or_else(|| Arc::new(NoopObserver)),
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            lock,
            snapshot,
        })
    }
}
