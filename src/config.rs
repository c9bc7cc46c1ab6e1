// src/config.rs

use serde::{Deserialize, Serialize};
use std::{
    fmt, fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

use crate::process::{overview_table_specs, TableSpec};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot parse config: {0}")]
    Parse(String),
    #[error("missing {0}: pass it explicitly or set the `{1}` environment variable")]
    MissingCredential(&'static str, &'static str),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub output: OutputConfig,
    /// Overrides the built-in overview tables when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tables: Option<Vec<TableSpec>>,
}

impl Config {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }

    pub fn table_specs(&self) -> Vec<TableSpec> {
        self.tables.clone().unwrap_or_else(overview_table_specs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiConfig {
    #[serde(default = "ApiConfig::default_base_url")]
    pub base_url: String,
    #[serde(default = "ApiConfig::default_auth_path")]
    pub auth_path: String,
    /// Value of the `Peloton-Platform` header.
    #[serde(default = "ApiConfig::default_platform")]
    pub platform: String,
    #[serde(default = "ApiConfig::default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ApiConfig {
    fn default_base_url() -> String {
        String::from("https://api.onepeloton.com")
    }

    fn default_auth_path() -> String {
        String::from("/auth/login")
    }

    fn default_platform() -> String {
        String::from("web")
    }

    fn default_timeout_secs() -> u64 {
        30
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: Self::default_base_url(),
            auth_path: Self::default_auth_path(),
            platform: Self::default_platform(),
            timeout_secs: Self::default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(default = "OutputConfig::default_dir")]
    pub dir: PathBuf,
    #[serde(default = "OutputConfig::default_parquet")]
    pub parquet: bool,
}

impl OutputConfig {
    fn default_dir() -> PathBuf {
        PathBuf::from("overview")
    }

    fn default_parquet() -> bool {
        true
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: Self::default_dir(),
            parquet: Self::default_parquet(),
        }
    }
}

/// Login details. Always passed in explicitly; [`Credentials::resolve`] is
/// the one place a caller-supplied lookup (normally the environment) is
/// consulted.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub const USERNAME_VAR: &'static str = "peloton_user_name";
    pub const PASSWORD_VAR: &'static str = "peloton_password";

    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Explicit values win; otherwise ask `lookup` for the conventional
    /// variable names. Blank values count as missing.
    pub fn resolve<F>(
        username: Option<String>,
        password: Option<String>,
        lookup: F,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let pick = |explicit: Option<String>, var: &str| {
            explicit
                .or_else(|| lookup(var))
                .filter(|v| !v.trim().is_empty())
        };
        let username = pick(username, Self::USERNAME_VAR)
            .ok_or(ConfigError::MissingCredential("username", Self::USERNAME_VAR))?;
        let password = pick(password, Self::PASSWORD_VAR)
            .ok_or(ConfigError::MissingCredential("password", Self::PASSWORD_VAR))?;
        Ok(Self { username, password })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
