//! CLI command handlers.

pub mod inspect;
pub mod login;
pub mod logout;
pub mod output;
pub mod refresh;
pub mod status;
pub mod watch;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use hearth_client::HttpIdentityClient;
use hearth_config::HearthConfig;
use hearth_session::{
    FileStore, FixedLocation, STORE_FILE, Session, SessionConfig, SharedObserver, SharedStore,
};

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Merged file configuration.
    pub config: HearthConfig,
    /// Identity endpoint from the command line.
    pub server_url: Option<String>,
    /// Store file from the command line.
    pub store_path: Option<PathBuf>,
    /// Current location of this context.
    pub location: String,
    /// Session timeout from the command line.
    pub timeout_ms: Option<u64>,
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
}

impl Context {
    /// File configuration with command-line overrides applied.
    pub fn session_config(&self) -> Result<SessionConfig> {
        let mut config = self.config.session_config()?;
        if let Some(url) = &self.server_url {
            config = config.with_endpoint_str(url)?;
        }
        if let Some(ms) = self.timeout_ms {
            config = config.with_timeout(Duration::from_millis(ms));
        }
        Ok(config)
    }

    /// Location of the shared store file.
    ///
    /// Command line, then `[store] path`, then the platform data directory.
    pub fn store_path(&self) -> PathBuf {
        self.store_path
            .clone()
            .or_else(|| self.config.store.as_ref().and_then(|s| s.path.clone()))
            .or_else(|| hearth_config::default_data_dir().map(|d| d.join(STORE_FILE)))
            .unwrap_or_else(|| PathBuf::from(STORE_FILE))
    }

    pub fn store(&self) -> SharedStore {
        Arc::new(FileStore::with_path(self.store_path()))
    }

    pub fn identity_client(&self) -> Result<HttpIdentityClient> {
        let mut builder = HttpIdentityClient::builder().timeout(self.config.request_timeout());
        if let Some(agent) = self.config.client.as_ref().and_then(|c| c.user_agent.clone()) {
            builder = builder.user_agent(agent);
        }
        Ok(builder.build()?)
    }

    /// Build the session this invocation drives.
    pub fn session(&self, observer: SharedObserver) -> Result<Session> {
        let session = Session::builder()
            .config(self.session_config()?)
            .store(self.store())
            .identity(Arc::new(self.identity_client()?))
            .navigator(Arc::new(FixedLocation::new(self.location.clone())))
            .observer(observer)
            .build()?;
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> Context {
        Context {
            config: HearthConfig::new(),
            server_url: None,
            store_path: None,
            location: String::new(),
            timeout_ms: None,
            json_output: false,
            verbose: false,
        }
    }

    #[test]
    fn test_command_line_overrides_file() {
        let mut ctx = context();
        ctx.config = HearthConfig::from_toml(
            r#"
[session]
url = "https://file.example.org/"
timeout_ms = 1000
"#,
        )
        .unwrap();
        ctx.server_url = Some("https://cli.example.org/".to_string());
        ctx.timeout_ms = Some(2000);

        let config = ctx.session_config().unwrap();
        assert_eq!(
            config.endpoint.unwrap().as_str(),
            "https://cli.example.org/"
        );
        assert_eq!(config.timeout, Duration::from_millis(2000));
    }

    #[test]
    fn test_store_path_precedence() {
        let mut ctx = context();
        ctx.config = HearthConfig::from_toml("[store]\npath = \"/srv/store.json\"").unwrap();
        assert_eq!(ctx.store_path(), PathBuf::from("/srv/store.json"));

        ctx.store_path = Some(PathBuf::from("/tmp/cli.json"));
        assert_eq!(ctx.store_path(), PathBuf::from("/tmp/cli.json"));
    }

    #[test]
    fn test_session_requires_endpoint() {
        let err = context()
            .session(Arc::new(hearth_session::NoopObserver))
            .unwrap_err();
        assert!(err.to_string().contains("Wrong session config"));
    }
}
