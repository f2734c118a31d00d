//! Locating, layering and persisting config files.
//!
//! Two files are consulted, lowest precedence first: the per-user
//! `config.toml` in the hearth config directory, then `hearth.toml` in the
//! project directory. Command-line flags sit above both and are applied by
//! the binary.

use std::fmt;
use std::path::{Path, PathBuf};

use url::Url;

use crate::{ConfigError, HearthConfig, Result, SessionSection};

const PROJECT_CONFIG_FILE: &str = "hearth.toml";
const USER_CONFIG_FILE: &str = "config.toml";
const APP_NAME: &str = "hearth";

/// Overrides the per-user config directory when set and non-empty.
pub const CONFIG_DIR_ENV: &str = "HEARTH_CONFIG_DIR";

/// Which file a layer came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLayer {
    User,
    Project,
}

impl fmt::Display for ConfigLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigLayer::User => f.write_str("user"),
            ConfigLayer::Project => f.write_str("project"),
        }
    }
}

/// One file that discovery looked at.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    pub layer: ConfigLayer,
    pub path: PathBuf,
    /// The file existed and parsed.
    pub loaded: bool,
}

/// The merged configuration plus an account of how it was built.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: HearthConfig,
    /// Every file consulted, lowest precedence first.
    pub sources: Vec<ConfigSource>,
    /// Files that existed but could not be used.
    pub warnings: Vec<String>,
}

impl LoadedConfig {
    pub fn loaded_from(&self) -> Vec<&Path> {
        self.sources
            .iter()
            .filter_map(|source| source.loaded.then_some(source.path.as_path()))
            .collect()
    }
}

/// Discover and merge config using the current directory and the default
/// per-user directory.
pub fn load_config(project_dir: Option<&Path>) -> Result<LoadedConfig> {
    load_config_with_options(project_dir, None)
}

/// Discover and merge config.
///
/// `config_dir` replaces the per-user directory, ignoring `HEARTH_CONFIG_DIR`.
/// A file that exists but fails to parse is skipped with a warning.
pub fn load_config_with_options(
    project_dir: Option<&Path>,
    config_dir: Option<&Path>,
) -> Result<LoadedConfig> {
    let user = match config_dir {
        Some(dir) => Some(dir.join(USER_CONFIG_FILE)),
        None => user_config_path(),
    };
    let project = project_dir.unwrap_or(Path::new(".")).join(PROJECT_CONFIG_FILE);

    let layers = user
        .map(|path| (ConfigLayer::User, path))
        .into_iter()
        .chain([(ConfigLayer::Project, project)]);

    let mut loaded = LoadedConfig {
        config: HearthConfig::new(),
        sources: Vec::new(),
        warnings: Vec::new(),
    };
    for (layer, path) in layers {
        let ok = path.is_file()
            && match load_config_file(&path) {
                Ok(file) => {
                    loaded.config.merge(file);
                    true
                }
                Err(e) => {
                    loaded
                        .warnings
                        .push(format!("Failed to load {} config {}: {}", layer, path.display(), e));
                    false
                }
            };
        loaded.sources.push(ConfigSource {
            layer,
            path,
            loaded: ok,
        });
    }

    Ok(loaded)
}

/// Read and parse one config file.
pub fn load_config_file(path: &Path) -> Result<HearthConfig> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.display().to_string(),
        source,
    })?;
    HearthConfig::from_toml(&contents)
}

/// Write `config` to `path`, creating missing parent directories.
pub fn save_config(config: &HearthConfig, path: &Path) -> Result<()> {
    let write_err = |path: &Path, source| ConfigError::WriteFile {
        path: path.display().to_string(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| write_err(parent, e))?;
    }
    std::fs::write(path, config.to_toml()?).map_err(|e| write_err(path, e))
}

/// Persist `endpoint` as `[session] url` in the config file at `path`.
///
/// Everything else already in the file is preserved.
pub fn remember_endpoint(path: &Path, endpoint: &str) -> Result<HearthConfig> {
    Url::parse(endpoint).map_err(|e| ConfigError::invalid("session.url", e.to_string()))?;

    let mut config = if path.is_file() {
        load_config_file(path)?
    } else {
        HearthConfig::new()
    };
    config
        .session
        .get_or_insert_with(SessionSection::default)
        .url = Some(endpoint.to_string());

    save_config(&config, path)?;
    Ok(config)
}

/// The per-user config file.
pub fn user_config_path() -> Option<PathBuf> {
    Some(user_config_dir()?.join(USER_CONFIG_FILE))
}

/// The per-user config directory: `HEARTH_CONFIG_DIR`, else the platform
/// config directory.
pub fn user_config_dir() -> Option<PathBuf> {
    match std::env::var_os(CONFIG_DIR_ENV) {
        Some(dir) if !dir.is_empty() => Some(PathBuf::from(dir)),
        _ => dirs::config_dir().map(|d| d.join(APP_NAME)),
    }
}

/// Default directory holding the shared session store.
pub fn default_data_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join(APP_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_reads_session_url() {
        let dir = TempDir::new().unwrap();
        let path = write(
            dir.path(),
            "config.toml",
            "[session]\nurl = \"https://id.example.org/session\"\n",
        );

        let config = load_config_file(&path).unwrap();
        assert_eq!(
            config.session.unwrap().url.as_deref(),
            Some("https://id.example.org/session")
        );
    }

    #[test]
    fn test_missing_and_broken_files_are_errors() {
        let err = load_config_file(Path::new("/nonexistent/config.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));

        let dir = TempDir::new().unwrap();
        let path = write(dir.path(), "config.toml", "this is not valid toml {{{{");
        assert!(matches!(load_config_file(&path).unwrap_err(), ConfigError::Parse(_)));
    }

    #[test]
    fn test_nothing_to_discover() {
        let project = TempDir::new().unwrap();
        let user = TempDir::new().unwrap();

        let loaded = load_config_with_options(Some(project.path()), Some(user.path())).unwrap();
        assert_eq!(loaded.config, HearthConfig::new());
        assert!(loaded.loaded_from().is_empty());
        let layers: Vec<_> = loaded.sources.iter().map(|s| s.layer).collect();
        assert_eq!(layers, vec![ConfigLayer::User, ConfigLayer::Project]);
    }

    #[test]
    fn test_project_file_wins_per_section() {
        let user = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        write(
            user.path(),
            "config.toml",
            r#"
[session]
url = "https://user.example.org/"

[store]
path = "/var/lib/hearth/store.json"
"#,
        );
        write(
            project.path(),
            "hearth.toml",
            r#"
[session]
url = "https://project.example.org/"
timeout_ms = 5000
"#,
        );

        let loaded = load_config_with_options(Some(project.path()), Some(user.path())).unwrap();
        let session = loaded.config.session.as_ref().unwrap();
        assert_eq!(session.url.as_deref(), Some("https://project.example.org/"));
        assert_eq!(session.timeout_ms, 5000);
        assert_eq!(
            loaded.config.store.as_ref().unwrap().path,
            Some(PathBuf::from("/var/lib/hearth/store.json"))
        );
        assert_eq!(loaded.loaded_from().len(), 2);
    }

    #[test]
    fn test_broken_project_file_is_a_warning() {
        let project = TempDir::new().unwrap();
        let user = TempDir::new().unwrap();
        write(project.path(), "hearth.toml", "not valid toml {{{{");

        let loaded = load_config_with_options(Some(project.path()), Some(user.path())).unwrap();
        assert_eq!(loaded.warnings.len(), 1);
        assert!(loaded.warnings[0].starts_with("Failed to load project config"));
        assert!(loaded.loaded_from().is_empty());
    }

    #[test]
    fn test_remember_endpoint_keeps_other_settings() {
        let dir = TempDir::new().unwrap();
        let path = write(
            dir.path(),
            "config.toml",
            "[session]\nurl = \"https://old.example.org/\"\nlock_stale_ms = 10000\n\n[store]\npath = \"/srv/store.json\"\n",
        );

        remember_endpoint(&path, "https://new.example.org/session").unwrap();

        let config = load_config_file(&path).unwrap();
        let session = config.session.as_ref().unwrap();
        assert_eq!(session.url.as_deref(), Some("https://new.example.org/session"));
        assert_eq!(session.lock_stale_ms, 10000);
        assert_eq!(
            config.store.unwrap().path,
            Some(PathBuf::from("/srv/store.json"))
        );
    }

    #[test]
    fn test_remember_endpoint_creates_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let saved = remember_endpoint(&path, "https://id.example.org/").unwrap();
        assert_eq!(load_config_file(&path).unwrap(), saved);

        let err = remember_endpoint(&path, "not a url").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }
}
