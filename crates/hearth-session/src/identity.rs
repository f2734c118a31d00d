//! Remote identity client contract.

use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use crate::error::Result;

/// Action discriminator sent to the identity server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityAction {
    /// Ask who the current identity is.
    Ident,
    /// End the server-side session.
    Logout,
}

impl IdentityAction {
    /// Wire name of the action.
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentityAction::Ident => "ident",
            IdentityAction::Logout => "logout",
        }
    }
}

impl std::fmt::Display for IdentityAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Answer of a completed round trip.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    /// `None` means the server confirmed there is no identity.
    pub username: Option<String>,
}

impl Identity {
    pub fn user(username: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
        }
    }

    pub fn anonymous() -> Self {
        Self { username: None }
    }
}

/// One round trip to the identity server per call.
///
/// Implementations make a single attempt; retrying is the session's job.
/// A transport failure is reported as `Err(Error::Transport)`.
#[async_trait]
pub trait IdentityClient: Send + Sync + std::fmt::Debug {
    async fn identify(&self, endpoint: &Url, action: IdentityAction) -> Result<Identity>;
}

/// Shared identity client handle.
pub type SharedIdentityClient = Arc<dyn IdentityClient>;
