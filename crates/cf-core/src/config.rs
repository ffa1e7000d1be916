//! Session and target configuration.
//!
//! The client persists its session in `$CF_HOME/.cf/config.json` (falling back
//! to `$HOME/.cf/config.json`). A [`Config`] is loaded once per invocation and
//! handed to commands by reference; nothing here is global state.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use crate::error::ConfigError;
use crate::models::{OrganizationFields, SpaceFields};

/// Environment variable that relocates the `.cf` directory.
pub const ENV_CF_HOME: &str = "CF_HOME";
/// Environment variable that overrides `logging.level`.
pub const ENV_CF_LOG: &str = "CF_LOG";

const CONFIG_DIR: &str = ".cf";
const CONFIG_FILE: &str = "config.json";

// ---------------------------------------------------------------------------
// Root config
// ---------------------------------------------------------------------------

/// Session/target state consumed by commands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub api_endpoint: String,
    pub api_version: String,
    pub uaa_endpoint: String,
    pub access_token: String,
    pub organization_fields: OrganizationFields,
    pub space_fields: SpaceFields,
    pub logging: LoggingConfig,
}

/// Logging configuration. `level` is an `EnvFilter` directive string, so
/// `debug` and `cf_cli=debug,reqwest=warn` are both accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".into(),
        }
    }
}

impl LoggingConfig {
    /// Default level with the `CF_LOG` override applied. Needs no saved
    /// session, so the binary can install logging before reading config.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut logging = Self::default();
        logging.apply_override(lookup(ENV_CF_LOG));
        logging
    }

    fn apply_override(&mut self, value: Option<String>) {
        if let Some(level) = value {
            // Targets are case sensitive; only surrounding whitespace goes.
            let level = level.trim();
            if !level.is_empty() {
                self.level = level.to_string();
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        EnvFilter::try_new(&self.level)
            .map(|_| ())
            .map_err(|err| {
                ConfigError::Invalid(format!(
                    "logging.level {:?} is not a valid filter: {err}",
                    self.level
                ))
            })
    }
}

/// On-disk layout of `config.json`. Unknown keys are ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct ConfigFile {
    target: String,
    api_version: String,
    uaa_endpoint: String,
    access_token: String,
    organization_fields: OrganizationFields,
    space_fields: SpaceFields,
}

impl Config {
    /// Load the saved session from the default location, then apply
    /// environment overrides. A missing file yields the default (logged out)
    /// config.
    pub fn load() -> Result<Self, ConfigError> {
        let path = default_config_path(std::env::var_os(ENV_CF_HOME).map(PathBuf::from), home_dir());
        let mut cfg = if path.is_file() {
            Self::load_from_path(&path)?
        } else {
            tracing::debug!(path = %path.display(), "no saved config, starting logged out");
            Self::default()
        };
        cfg.apply_env_overrides_with(|key| std::env::var(key).ok());
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse a `config.json` file.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|err| ConfigError::Read {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        Self::from_json(&raw).map_err(|message| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        })
    }

    fn from_json(raw: &str) -> Result<Self, String> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        let file: ConfigFile = serde_json::from_str(raw).map_err(|err| err.to_string())?;
        Ok(Self {
            api_endpoint: file.target,
            api_version: file.api_version,
            uaa_endpoint: file.uaa_endpoint,
            access_token: file.access_token,
            organization_fields: file.organization_fields,
            space_fields: file.space_fields,
            logging: LoggingConfig::default(),
        })
    }

    /// Apply overrides from a variable lookup (normally the process env).
    pub fn apply_env_overrides_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        self.logging.apply_override(lookup(ENV_CF_LOG));
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.logging.validate()?;
        if !self.api_endpoint.is_empty()
            && !self.api_endpoint.starts_with("http://")
            && !self.api_endpoint.starts_with("https://")
        {
            return Err(ConfigError::Invalid(format!(
                "api endpoint {:?} must be an http(s) URL",
                self.api_endpoint
            )));
        }
        Ok(())
    }

    pub fn is_logged_in(&self) -> bool {
        !self.access_token.trim().is_empty()
    }

    pub fn has_organization(&self) -> bool {
        !self.organization_fields.is_empty()
    }

    pub fn has_space(&self) -> bool {
        !self.space_fields.is_empty()
    }

    pub fn set_api_version(&mut self, version: &str) {
        self.api_version = version.to_string();
    }

    pub fn set_organization_fields(&mut self, fields: OrganizationFields) {
        self.organization_fields = fields;
    }

    pub fn set_space_fields(&mut self, fields: SpaceFields) {
        self.space_fields = fields;
    }
}

/// Resolve the config file path from an optional `CF_HOME` and the home dir.
pub fn default_config_path(cf_home: Option<PathBuf>, home: PathBuf) -> PathBuf {
    let base = match cf_home {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => home,
    };
    base.join(CONFIG_DIR).join(CONFIG_FILE)
}

/// Get the user's home directory, falling back to `/` on failure.
fn home_dir() -> PathBuf {
    #[allow(deprecated)]
    std::env::home_dir().unwrap_or_else(|| PathBuf::from("/"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
