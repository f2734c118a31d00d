//! Client-held authentication session shared through a persistent store.
//!
//! The identity server is the source of truth; this crate caches its answer
//! in a store that several independent contexts share, so that they agree on
//! the login state without each asking the server. It provides:
//! - A fixed store key contract with typed defaults
//! - A state machine that trusts a recent answer and revalidates a stale one
//! - A store-level lock so one context revalidates while the others wait,
//!   with reclaim of locks left behind by a vanished context
//! - Establishment notifications, including the return to the location a
//!   sign-in started from
//! - A cancellable background driver
//!
//! # Example
//!
//! ```rust,ignore
//! use hearth_session::{MemoryStore, Session, SessionHandle};
//!
//! let session = Session::builder()
//!     .endpoint(url)
//!     .store(Arc::new(MemoryStore::new()))
//!     .identity(Arc::new(client))
//!     .build()?;
//!
//! let handle = SessionHandle::spawn(session);
//! // ...
//! handle.shutdown().await;
//! ```

mod config;
mod error;
pub mod expiry;
mod handle;
mod identity;
mod lock;
mod notify;
pub mod record;
mod session;
mod state;
mod store;
pub mod template;
pub mod testing;

pub use config::{
    DEFAULT_FRESH_INTENT_MARKER, DEFAULT_LOCK_BACKOFF, DEFAULT_LOCK_STALE_AFTER, DEFAULT_TIMEOUT,
    Language, SessionConfig,
};
pub use error::{Error, Result};
pub use expiry::{Clock, ManualClock, SharedClock, SystemClock};
pub use handle::SessionHandle;
pub use identity::{Identity, IdentityAction, IdentityClient, SharedIdentityClient};
pub use lock::{LockPolicy, LockStatus};
pub use notify::{
    Established, EstablishedFrom, FixedLocation, Navigator, NoopObserver, SessionObserver,
    SessionSnapshot, SharedNavigator, SharedObserver, resume_target,
};
pub use record::{RecordStore, SessionRecord};
pub use session::{Cycle, Outcome, Session, SessionBuilder};
pub use state::SessionState;
pub use store::{FileStore, MemoryStore, STORE_FILE, SessionStore, SharedStore, StoreValue};
