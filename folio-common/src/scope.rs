//! Publisher → imprint → tranche configuration scopes
//!
//! Each scope contributes a [`ConfigLayer`]. Resolution is a per-key shallow
//! override: for every key in `settings`, `field_overrides` and `field_limits`
//! the most specific scope that defines the key wins. Maps are never merged
//! recursively; values are opaque strings.
//!
//! The result is an immutable [`ResolvedConfig`] handed to the compilation
//! engine by value, so concurrent batches with different scopes cannot
//! interfere with one another.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// One scope's configuration contribution
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigLayer {
    /// Scope name (publisher, imprint or tranche name)
    #[serde(default)]
    pub name: Option<String>,

    /// Free-form settings consumed by strategies (e.g. `lsi_account`, `file_naming_pattern`)
    #[serde(default)]
    pub settings: BTreeMap<String, String>,

    /// Target field header → constant value
    #[serde(default)]
    pub field_overrides: BTreeMap<String, String>,

    /// Text context → maximum character count
    #[serde(default)]
    pub field_limits: BTreeMap<String, usize>,
}

impl ConfigLayer {
    fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.settings.is_empty()
            && self.field_overrides.is_empty()
            && self.field_limits.is_empty()
    }
}

/// The three configuration scopes, broadest first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScopedConfig {
    #[serde(default)]
    pub publisher: ConfigLayer,
    #[serde(default)]
    pub imprint: ConfigLayer,
    #[serde(default)]
    pub tranche: ConfigLayer,
}

/// Names of the scopes a resolved config was built from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeIdentity {
    pub publisher: Option<String>,
    pub imprint: Option<String>,
    pub tranche: Option<String>,
}

/// Merged, read-only configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolvedConfig {
    pub scope: ScopeIdentity,
    pub settings: BTreeMap<String, String>,
    pub field_overrides: BTreeMap<String, String>,
    pub field_limits: BTreeMap<String, usize>,
}

impl ScopedConfig {
    /// Parse a scope file with `[publisher]`, `[imprint]`, `[tranche]` tables
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load a scope file from disk
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Cannot read scope file {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Resolve the three layers into one config (most specific scope wins per key)
    pub fn resolve(&self) -> ResolvedConfig {
        let mut resolved = ResolvedConfig {
            scope: ScopeIdentity {
                publisher: self.publisher.name.clone(),
                imprint: self.imprint.name.clone(),
                tranche: self.tranche.name.clone(),
            },
            ..Default::default()
        };

        for layer in [&self.publisher, &self.imprint, &self.tranche] {
            if layer.is_empty() {
                continue;
            }
            for (key, value) in &layer.settings {
                resolved.settings.insert(key.clone(), value.clone());
            }
            for (key, value) in &layer.field_overrides {
                resolved.field_overrides.insert(key.clone(), value.clone());
            }
            for (key, value) in &layer.field_limits {
                resolved.field_limits.insert(key.clone(), *value);
            }
        }

        tracing::debug!(
            publisher = ?resolved.scope.publisher,
            imprint = ?resolved.scope.imprint,
            tranche = ?resolved.scope.tranche,
            settings = resolved.settings.len(),
            overrides = resolved.field_overrides.len(),
            "Resolved scoped configuration"
        );

        resolved
    }
}

impl ResolvedConfig {
    /// Setting value, if present and non-blank
    pub fn setting(&self, key: &str) -> Option<&str> {
        self.settings
            .get(key)
            .map(|s| s.as_str())
            .filter(|s| !s.trim().is_empty())
    }

    /// Setting value or the given default
    pub fn setting_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.setting(key).unwrap_or(default)
    }

    /// Setting parsed as an unsigned integer
    pub fn setting_usize(&self, key: &str) -> Option<usize> {
        self.setting(key).and_then(|s| s.trim().parse().ok())
    }

    /// Character limit configured for a text context
    pub fn field_limit(&self, context: &str) -> Option<usize> {
        self.field_limits.get(context).copied()
    }
}
