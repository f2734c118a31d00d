//! Background driver that keeps a session evaluated.
//!
//! The driver runs one evaluation cycle, then waits for whichever comes
//! first: the delay the cycle asked for, a command from the presentation
//! side, or cancellation. Cancelling mid round trip abandons the request
//! and leaves the store lock as it is; other contexts reclaim it once it
//! goes stale.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::notify::SessionSnapshot;
use crate::session::{Cycle, Session};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Evaluate,
    Reevaluate,
    Logout,
}

/// Owned, cancellable handle to a running session.
///
/// Dropping the handle cancels the driver; [`shutdown`](Self::shutdown)
/// also waits for it to stop.
#[derive(Debug)]
pub struct SessionHandle {
    session: Arc<Session>,
    commands: mpsc::UnboundedSender<Step>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl SessionHandle {
    /// Start driving `session` on the current tokio runtime.
    pub fn spawn(session: Session) -> Self {
        Self::spawn_shared(Arc::new(session))
    }

    /// Start driving a session that is shared with other owners.
    pub fn spawn_shared(session: Arc<Session>) -> Self {
        let (commands, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(drive(Arc::clone(&session), rx, cancel.clone()));

        Self {
            session,
            commands,
            cancel,
            task: Some(task),
        }
    }

    /// The driven session.
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.session.snapshot()
    }

    pub fn username(&self) -> Option<String> {
        self.session.username()
    }

    pub fn timestamp(&self) -> i64 {
        self.session.timestamp()
    }

    /// Watch the in-memory view of the session.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.session.subscribe()
    }

    /// Flush and evaluate now instead of waiting for the schedule.
    pub fn reevaluate(&self) -> Result<()> {
        self.send(Step::Reevaluate)
    }

    /// Log out remotely; re-evaluates on success.
    pub fn logout(&self) -> Result<()> {
        self.send(Step::Logout)
    }

    /// Record the sign-in intent for the current location.
    pub fn initiate_sign_in(&self) -> Result<()> {
        self.session.initiate_sign_in()
    }

    /// Cancel the driver and wait for it to stop.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            warn!(error = %e, "Session driver ended abnormally");
        }
    }

    fn send(&self, step: Step) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(Error::Closed);
        }
        self.commands.send(step).map_err(|_| Error::Closed)
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run_step(session: &Session, step: Step) -> Result<Option<Cycle>> {
    match step {
        Step::Evaluate => session.evaluate().await.map(Some),
        Step::Reevaluate => session.reevaluate().await.map(Some),
        Step::Logout => session.logout().await,
    }
}

async fn drive(
    session: Arc<Session>,
    mut commands: mpsc::UnboundedReceiver<Step>,
    cancel: CancellationToken,
) {
    let mut step = Step::Evaluate;
    let mut deadline = Instant::now();

    loop {
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            result = run_step(&session, step) => result,
        };

        match result {
            Ok(Some(cycle)) => deadline = Instant::now() + cycle.next,
            // Failed logout: keep the current schedule.
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, "Session evaluation failed, retrying");
                deadline = Instant::now() + session.config().lock_backoff;
            }
        }

        step = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            command = commands.recv() => match command {
                Some(step) => step,
                None => break,
            },
            _ = sleep_until(deadline) => Step::Evaluate,
        };
    }

    debug!("Session driver stopped");
}
