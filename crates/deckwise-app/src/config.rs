// Configuration loading and parsing (deckwise.toml, credentials.toml).

use deckwise_core::{RarityFilter, SortKey};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub remote: RemoteConfig,
    pub view: ViewConfig,
    pub chat: ChatConfig,
    pub preload_catalog: bool,
    pub credentials: CredentialsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl RemoteConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Initial filter/sort selection, parsed from the `[view]` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewConfig {
    pub rarity: RarityFilter,
    pub sort: SortKey,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    pub thinking_placeholder: String,
}

// ---------------------------------------------------------------------------
// deckwise.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire deckwise.toml file.
#[derive(Debug, Clone, Deserialize)]
struct ConfigFile {
    remote: RemoteConfig,
    view: ViewSection,
    chat: ChatConfig,
    startup: StartupSection,
}

#[derive(Debug, Clone, Deserialize)]
struct ViewSection {
    default_rarity: String,
    default_sort: String,
}

#[derive(Debug, Clone, Deserialize)]
struct StartupSection {
    #[serde(default)]
    preload_catalog: bool,
}

// ---------------------------------------------------------------------------
// credentials.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CredentialsConfig {
    pub api_token: Option<String>,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/deckwise.toml` and
/// (optionally) `config/credentials.toml`, relative to `base_dir`.
///
/// Does not write defaults; `load_config()` does.
pub(crate) fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    // --- deckwise.toml (required) ---
    let main_path = config_dir.join("deckwise.toml");
    let main_text = read_file(&main_path)?;
    let file: ConfigFile = toml::from_str(&main_text).map_err(|e| ConfigError::ParseError {
        path: main_path.clone(),
        source: e,
    })?;

    let view = ViewConfig {
        rarity: RarityFilter::parse(&file.view.default_rarity).ok_or_else(|| {
            ConfigError::ValidationError {
                field: "view.default_rarity".into(),
                message: format!(
                    "expected \"all\" or a rarity name, got \"{}\"",
                    file.view.default_rarity
                ),
            }
        })?,
        sort: SortKey::parse(&file.view.default_sort).ok_or_else(|| {
            ConfigError::ValidationError {
                field: "view.default_sort".into(),
                message: format!(
                    "expected one of level_desc, level_asc, cost_asc, cost_desc, got \"{}\"",
                    file.view.default_sort
                ),
            }
        })?,
    };

    // --- credentials.toml (optional) ---
    let credentials_path = config_dir.join("credentials.toml");
    let credentials = if credentials_path.exists() {
        let cred_text = read_file(&credentials_path)?;
        toml::from_str(&cred_text).map_err(|e| ConfigError::ParseError {
            path: credentials_path.clone(),
            source: e,
        })?
    } else {
        CredentialsConfig::default()
    };

    let config = Config {
        remote: file.remote,
        view,
        chat: file.chat,
        preload_catalog: file.startup.preload_catalog,
        credentials,
    };

    validate(&config)?;

    Ok(config)
}

/// Files written into `config/` on first run, compiled in from `defaults/`
/// so the binary works from any directory.
const DEFAULT_FILES: &[(&str, &str)] = &[
    ("deckwise.toml", include_str!("../defaults/deckwise.toml")),
    (
        "credentials.toml.example",
        include_str!("../defaults/credentials.toml.example"),
    ),
];

/// Write any missing default file into `base_dir/config/`. Existing files are
/// left alone. Returns the paths written.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let config_dir = base_dir.join("config");
    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("cannot create {}: {e}", config_dir.display()),
    })?;

    let mut written = Vec::new();
    for (name, contents) in DEFAULT_FILES {
        let target = config_dir.join(name);
        if write_if_absent(&target, contents)? {
            written.push(target);
        }
    }
    Ok(written)
}

/// `Ok(false)` when `path` already exists.
fn write_if_absent(path: &Path, contents: &str) -> Result<bool, ConfigError> {
    use std::io::Write;

    let file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path);
    let mut file = match file {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => {
            return Err(ConfigError::DefaultsCopyError {
                message: format!("cannot create {}: {e}", path.display()),
            });
        }
    };
    file.write_all(contents.as_bytes())
        .map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("cannot write {}: {e}", path.display()),
        })?;
    Ok(true)
}

/// Directory holding `config/`: the working directory when it already has
/// one, otherwise the per-user config directory (e.g. `~/.config/deckwise`).
pub fn resolve_base_dir() -> Result<PathBuf, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    let user_dir = directories::ProjectDirs::from("", "", "deckwise")
        .map(|dirs| dirs.config_dir().to_path_buf());
    Ok(choose_base_dir(cwd, user_dir))
}

fn choose_base_dir(cwd: PathBuf, user_dir: Option<PathBuf>) -> PathBuf {
    if cwd.join("config").is_dir() {
        return cwd;
    }
    user_dir.unwrap_or(cwd)
}

/// Resolve the base directory, write missing defaults, and load.
pub fn load_config() -> Result<Config, ConfigError> {
    let base = resolve_base_dir()?;
    ensure_config_files(&base)?;
    load_config_from(&base)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    let url = config.remote.base_url.trim();
    if url.is_empty() {
        return Err(ConfigError::ValidationError {
            field: "remote.base_url".into(),
            message: "must not be empty".into(),
        });
    }
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ConfigError::ValidationError {
            field: "remote.base_url".into(),
            message: format!("must start with http:// or https://, got \"{url}\""),
        });
    }

    if config.remote.timeout_secs == 0 {
        return Err(ConfigError::ValidationError {
            field: "remote.timeout_secs".into(),
            message: "must be greater than 0".into(),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
