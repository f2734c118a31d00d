//! HTTP identity client for hearth sessions.
//!
//! Implements [`hearth_session::IdentityClient`] over plain HTTP: one `GET`
//! per round trip with an `action` query parameter (`ident` or `logout`),
//! answered with a JSON body whose `username` names the current identity.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use hearth_client::HttpIdentityClient;
//! use hearth_session::{MemoryStore, Session};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpIdentityClient::builder().build()?;
//! let session = Session::builder()
//!     .endpoint("https://id.example.org/session".parse()?)
//!     .store(Arc::new(MemoryStore::new()))
//!     .identity(Arc::new(client))
//!     .build()?;
//! # Ok(())
//! # }
//! ```

mod client;
mod error;

pub use client::{ClientBuilder, HttpIdentityClient};
pub use error::{Error, Result};
