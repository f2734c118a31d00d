//! Configuration files for hearth sessions.
//!
//! Provides TOML-based configuration with:
//! - `[session]`, `[store]`, `[client]` and `[language]` sections
//! - Config file layering (user config + project-local overrides)
//! - Conversion into a [`hearth_session::SessionConfig`]

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    CONFIG_DIR_ENV, ConfigLayer, ConfigSource, LoadedConfig, default_data_dir, load_config,
    load_config_file, load_config_with_options, remember_endpoint, save_config, user_config_dir,
    user_config_path,
};
pub use error::{ConfigError, Result};
pub use types::*;
