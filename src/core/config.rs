//! FM-006: Runtime configuration (`forma.yaml`).
//!
//! ```yaml
//! feature: orders
//! spec: orders.xml          # relative to this file
//! mock_bundle: mocks.yaml   # optional; selects the mock gateway
//! strict: false
//! log_level: warn
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default config file name looked up by the CLI.
pub const CONFIG_FILE: &str = "forma.yaml";

const LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Feature identity the context is bound to
    pub feature: String,

    #[serde(default = "default_spec")]
    pub spec: PathBuf,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mock_bundle: Option<PathBuf>,

    #[serde(default)]
    pub strict: bool,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Directory relative paths are resolved against
    #[serde(skip)]
    pub base_dir: PathBuf,
}

fn default_spec() -> PathBuf {
    PathBuf::from("feature.xml")
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl RuntimeConfig {
    pub fn new(feature: impl Into<String>) -> Self {
        Self {
            feature: feature.into(),
            spec: default_spec(),
            mock_bundle: None,
            strict: false,
            log_level: default_log_level(),
            base_dir: PathBuf::new(),
        }
    }

    /// Read and validate a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        let mut config = Self::from_yaml_str(&content)?;
        config.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Ok(config)
    }

    pub fn from_yaml_str(source: &str) -> Result<Self> {
        let config: Self = serde_yaml_ng::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.feature.trim().is_empty() {
            return Err(Error::Config("feature must not be empty".into()));
        }
        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            return Err(Error::Config(format!(
                "unknown log_level '{}' (expected one of: {})",
                self.log_level,
                LOG_LEVELS.join(", ")
            )));
        }
        Ok(())
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    pub fn spec_path(&self) -> PathBuf {
        self.resolve(&self.spec)
    }

    pub fn mock_bundle_path(&self) -> Option<PathBuf> {
        self.mock_bundle.as_deref().map(|p| self.resolve(p))
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }
}
