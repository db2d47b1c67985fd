//! Widget configuration with layered resolution.
//!
//! Resolution order (highest priority first):
//! 1. Environment variables (`LEAFCHECK_*`)
//! 2. TOML file (`$LEAFCHECK_CONFIG`, else `leafcheck.toml` if present)
//! 3. Compiled defaults

use std::path::Path;

use serde::Deserialize;

use crate::errors::ConfigError;

pub const CONFIG_PATH_ENV: &str = "LEAFCHECK_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "leafcheck.toml";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// How a label is obtained for an uploaded image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Pick a random label locally; no backend needed.
    Simulated,
    /// POST the image to an inference endpoint. The endpoint may be empty,
    /// in which case every prediction fails with a configuration error.
    Remote { endpoint: String },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WidgetConfig {
    pub use_mock: bool,
    pub backend_url: String,
    pub bind: String,
    /// Ceiling on the bytes read from a single uploaded file.
    pub max_upload_bytes: usize,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            use_mock: true,
            backend_url: String::new(),
            bind: "127.0.0.1:8080".to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl WidgetConfig {
    /// Load from file and process environment.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            Err(_) => Self::default(),
        };

        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| ConfigError::ParseError {
            path: "<string>".to_string(),
            message: e.to_string(),
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Apply `LEAFCHECK_*` overrides. `lookup` abstracts the environment so
    /// tests don't have to mutate process state.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("LEAFCHECK_USE_MOCK") {
            self.use_mock = parse_bool(&raw).ok_or_else(|| ConfigError::InvalidValue {
                field: "LEAFCHECK_USE_MOCK".to_string(),
                message: format!("expected a boolean, got {raw:?}"),
            })?;
        }
        if let Some(url) = lookup("LEAFCHECK_BACKEND_URL") {
            self.backend_url = url;
        }
        if let Some(bind) = lookup("LEAFCHECK_BIND") {
            self.bind = bind;
        }
        if let Some(raw) = lookup("LEAFCHECK_MAX_UPLOAD_BYTES") {
            self.max_upload_bytes =
                raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                    field: "LEAFCHECK_MAX_UPLOAD_BYTES".to_string(),
                    message: format!("expected a byte count, got {raw:?}"),
                })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bind.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "bind".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        if self.max_upload_bytes == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_upload_bytes".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        Ok(())
    }

    pub fn mode(&self) -> Mode {
        if self.use_mock {
            Mode::Simulated
        } else {
            Mode::Remote {
                endpoint: self.backend_url.trim().to_string(),
            }
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
