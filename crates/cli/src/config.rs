//! `solo.toml` loading and validation.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use solo_core::{Caller, CapabilityCode, GrantTable, SectionConfig};

/// Default HTTP port when neither the config file nor `SOLO_PORT` sets one.
pub(crate) const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, thiserror::Error)]
pub(crate) enum ConfigError {
    #[error("error reading config '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("error parsing config '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ServerConfig {
    #[serde(default = "default_bind")]
    pub(crate) bind: String,
    #[serde(default = "default_port")]
    pub(crate) port: u16,
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: DEFAULT_PORT,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct StorageConfig {
    /// JSON state file. In-memory storage when absent.
    #[serde(default)]
    pub(crate) path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct CallerConfig {
    pub(crate) id: String,
    /// API token presented as `Bearer` or `X-API-Key`.
    #[serde(default)]
    pub(crate) token: Option<String>,
    #[serde(default)]
    pub(crate) grants: Vec<CapabilityCode>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct SoloConfig {
    #[serde(default)]
    pub(crate) server: ServerConfig,
    #[serde(default)]
    pub(crate) storage: StorageConfig,
    #[serde(default, rename = "section")]
    pub(crate) sections: Vec<SectionConfig>,
    #[serde(default, rename = "caller")]
    pub(crate) callers: Vec<CallerConfig>,
}

impl SoloConfig {
    /// Read, parse, apply environment overrides and validate.
    pub(crate) fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::parse(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub(crate) fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// `SOLO_PORT` and `SOLO_STORAGE_PATH` override the file.
    pub(crate) fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("SOLO_PORT").filter(|v| !v.is_empty()) {
            self.server.port = port
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("SOLO_PORT '{port}' is not a port")))?;
        }
        if let Some(path) = lookup("SOLO_STORAGE_PATH").filter(|v| !v.is_empty()) {
            self.storage.path = Some(PathBuf::from(path));
        }
        Ok(())
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        let mut names = BTreeSet::new();
        let mut record_types = BTreeSet::new();
        let mut known_codes: BTreeSet<&str> = [
            CapabilityCode::EDIT,
            CapabilityCode::PUBLISH,
            CapabilityCode::UNPUBLISH,
        ]
        .into_iter()
        .collect();

        for section in &self.sections {
            if section.name.is_empty() || section.record_type.is_empty() {
                return Err(ConfigError::Invalid(
                    "sections need a name and a record_type".to_string(),
                ));
            }
            if !names.insert(section.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate section '{}'",
                    section.name
                )));
            }
            if !record_types.insert(section.record_type.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "record type '{}' is managed by more than one section",
                    section.record_type
                )));
            }
            known_codes.insert(section.access_code.as_str());
            for code in section.required_codes.iter().flatten() {
                known_codes.insert(code.as_str());
            }
        }

        let mut ids = BTreeSet::new();
        let mut tokens = BTreeSet::new();
        for caller in &self.callers {
            if !ids.insert(caller.id.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate caller '{}'",
                    caller.id
                )));
            }
            if let Some(token) = &caller.token {
                if token.is_empty() || !tokens.insert(token.as_str()) {
                    return Err(ConfigError::Invalid(format!(
                        "caller '{}' needs a unique, non-empty token",
                        caller.id
                    )));
                }
            }
            if let Some(unknown) = caller
                .grants
                .iter()
                .find(|g| !known_codes.contains(g.as_str()))
            {
                return Err(ConfigError::Invalid(format!(
                    "caller '{}' is granted unknown code '{}'",
                    caller.id, unknown
                )));
            }
        }
        Ok(())
    }

    pub(crate) fn grant_table(&self) -> GrantTable {
        let mut table = GrantTable::new();
        for caller in &self.callers {
            table.grant(caller.id.clone(), caller.grants.iter().cloned());
        }
        table
    }

    pub(crate) fn section(&self, name: &str) -> Option<&SectionConfig> {
        self.sections.iter().find(|s| s.name == name)
    }

    /// Token → caller pairs for authentication.
    pub(crate) fn tokens(&self) -> Vec<(String, Caller)> {
        self.callers
            .iter()
            .filter_map(|c| c.token.clone().map(|t| (t, Caller::new(c.id.clone()))))
            .collect()
    }
}
