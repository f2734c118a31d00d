//! Test doubles for the session's collaborators.
//!
//! These stand in for the identity server and the presentation layer so
//! that sessions can be exercised against a [`MemoryStore`](crate::MemoryStore)
//! without a network or a UI.

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tokio::sync::{Notify, Semaphore};
use url::Url;

use crate::error::{Error, Result};
use crate::identity::{Identity, IdentityAction, IdentityClient};
use crate::notify::{Established, Navigator, SessionObserver};

/// A scripted identity server answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    User(String),
    Anonymous,
    Fail(String),
}

impl Reply {
    pub fn user(username: impl Into<String>) -> Self {
        Reply::User(username.into())
    }

    fn into_result(self) -> Result<Identity> {
        match self {
            Reply::User(name) => Ok(Identity::user(name)),
            Reply::Anonymous => Ok(Identity::anonymous()),
            Reply::Fail(message) => Err(Error::Transport(message)),
        }
    }
}

/// Identity client that answers from a queue, then from a default reply.
///
/// A gated client holds every round trip until [`release`](Self::release)
/// hands out permits, which keeps a revalidation in flight on demand.
#[derive(Debug)]
pub struct ScriptedIdentity {
    queue: Mutex<VecDeque<Reply>>,
    fallback: Reply,
    calls: Mutex<Vec<IdentityAction>>,
    called: Notify,
    gate: Option<Semaphore>,
}

impl Default for ScriptedIdentity {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedIdentity {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            fallback: Reply::Anonymous,
            calls: Mutex::new(Vec::new()),
            called: Notify::new(),
            gate: None,
        }
    }

    /// Reply used once the queue is empty.
    pub fn with_default(mut self, reply: Reply) -> Self {
        self.fallback = reply;
        self
    }

    /// Hold every round trip until released.
    pub fn gated(mut self) -> Self {
        self.gate = Some(Semaphore::new(0));
        self
    }

    /// Queue a reply for the next call.
    pub fn push(&self, reply: Reply) {
        self.queue.lock().push_back(reply);
    }

    /// Let `n` held round trips complete.
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    /// Every action received, in order.
    pub fn calls(&self) -> Vec<IdentityAction> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Number of calls with the given action.
    pub fn count(&self, action: IdentityAction) -> usize {
        self.calls.lock().iter().filter(|a| **a == action).count()
    }

    /// Wait until at least `n` calls have started.
    pub async fn wait_for_calls(&self, n: usize) {
        loop {
            let notified = self.called.notified();
            if self.call_count() >= n {
                return;
            }
            notified.await;
        }
    }
}

#[async_trait]
impl IdentityClient for ScriptedIdentity {
    async fn identify(&self, _endpoint: &Url, action: IdentityAction) -> Result<Identity> {
        self.calls.lock().push(action);
        self.called.notify_waiters();

        if let Some(gate) = &self.gate {
            let permit = gate.acquire().await.map_err(|_| Error::Closed)?;
            permit.forget();
        }

        let reply = self
            .queue
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        reply.into_result()
    }
}

/// Navigator that records navigation instructions instead of following them.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    location: RwLock<String>,
    navigations: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: RwLock::new(location.into()),
            navigations: Mutex::new(Vec::new()),
        }
    }

    pub fn set_location(&self, location: impl Into<String>) {
        *self.location.write() = location.into();
    }

    /// Every navigation instruction received, in order.
    pub fn navigations(&self) -> Vec<String> {
        self.navigations.lock().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn current_location(&self) -> String {
        self.location.read().clone()
    }

    fn navigate(&self, location: &str) {
        self.navigations.lock().push(location.to_string());
    }
}

/// Observer that keeps every establishment event.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<Established>>,
    notified: Notify,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Established> {
        self.events.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.events.lock().len()
    }

    pub fn last(&self) -> Option<Established> {
        self.events.lock().last().cloned()
    }

    /// Wait until at least `n` events have been observed.
    pub async fn wait_for(&self, n: usize) {
        loop {
            let notified = self.notified.notified();
            if self.count() >= n {
                return;
            }
            notified.await;
        }
    }
}

impl SessionObserver for RecordingObserver {
    fn on_established(&self, event: &Established) {
        self.events.lock().push(event.clone());
        self.notified.notify_waiters();
    }
}
