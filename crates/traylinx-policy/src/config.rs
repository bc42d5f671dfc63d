//! Construction-time configuration for [`PolicyEngine`](crate::PolicyEngine).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::docker::ResourceLimits;
use crate::error::ConfigError;
use crate::shell::PatternRule;

/// Options recognized by [`PolicyEngine::new`](crate::PolicyEngine::new).
///
/// Every field is optional in a config file.
///
/// ```toml
/// allowed_paths = ["/data/shared"]
/// trusted_registries = ["ghcr.io/acme/"]
///
/// [[custom_deny_patterns]]
/// pattern = 'git\s+push\s+--force'
/// reason = "Force push"
///
/// [resource_limits]
/// memory = "4g"
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Deny rules appended after the built-in list
    pub custom_deny_patterns: Vec<PatternRule>,
    /// Roots permitted in addition to the workdir
    pub allowed_paths: Vec<PathBuf>,
    /// Trusted registry prefixes; empty means the built-in list
    pub trusted_registries: Vec<String>,
    /// Container resource limits; absent means the defaults
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_limits: Option<ResourceLimits>,
}

impl PolicyConfig {
    /// Load a config file: TOML for `.toml`, JSON otherwise.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
        let config = if is_toml {
            Self::from_toml_str(&content)?
        } else {
            Self::from_json_str(&content)?
        };

        tracing::debug!(
            path = %path.display(),
            custom_deny_patterns = config.custom_deny_patterns.len(),
            allowed_paths = config.allowed_paths.len(),
            "loaded policy config"
        );
        Ok(config)
    }

    /// Parse a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Parse a JSON document.
    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Check that every custom deny pattern compiles.
    ///
    /// The engine accepts invalid patterns and treats them as always
    /// matching; this lets callers reject such configs up front instead.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for rule in &self.custom_deny_patterns {
            rule.compile().map_err(|e| ConfigError::InvalidPattern {
                pattern: rule.pattern.clone(),
                message: e.to_string(),
            })?;
        }
        Ok(())
    }
}
