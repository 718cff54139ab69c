use crate::overrides::{OverrideRule, RuleScope};
use deskx_misc::debug_on;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};
use thiserror::Error;

const WILDCARD: &str = "*";

#[derive(
    Debug,
    Copy,
    Clone,
    Default,
    PartialEq,
    Eq,
    AsRefStr,
    Display,
    EnumIter,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ScopeMatchMode {
    /// Only rules naming the caller apply.
    Exact,
    /// Rules naming the caller first, then wildcard rules.
    #[default]
    ExactThenWildcard,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub scope_match_mode: ScopeMatchMode,
    /// Propagate derivation failures instead of falling back to the default.
    pub fail_closed_on_derivation_error: bool,
}

impl EngineConfig {
    /// Apply `debug.deskx.*` switches. No-op in release builds.
    pub fn with_debug_props(mut self) -> Self {
        if debug_on!("fail_closed") {
            debug!("debug.deskx.fail_closed is on");
            self.fail_closed_on_derivation_error = true;
        }

        if debug_on!("exact_scope") {
            debug!("debug.deskx.exact_scope is on");
            self.scope_match_mode = ScopeMatchMode::Exact;
        }

        self
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read `{}`", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Parse(#[from] toml::de::Error),
    #[error("override #{index} for `{capability}` mixes `*` with named callers")]
    MixedWildcard { index: usize, capability: String },
    #[error("override #{index} for `{capability}` has an empty scope")]
    EmptyScope { index: usize, capability: String },
    #[error("override #{index} for `{capability}` has an empty caller name")]
    EmptyCaller { index: usize, capability: String },
    #[error("override #{index} has an empty capability name")]
    EmptyCapability { index: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
struct RuleEntry {
    capability: String,
    value: bool,
    #[serde(default)]
    scope: Option<Vec<String>>,
}

/// A TOML rule file:
///
/// ```toml
/// [engine]
/// scope_match_mode = "exact"
///
/// [[override]]
/// capability = "FeatureFlagsImpl.enableDesktopWindowingMode"
/// value = true
/// scope = ["com.android.systemui"]
/// ```
///
/// A missing scope, or `["*"]`, makes the rule global. An empty list is
/// rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleFile {
    #[serde(default)]
    pub engine: Option<EngineConfig>,
    #[serde(default, rename = "override")]
    overrides: Vec<RuleEntry>,
}

impl RuleFile {
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;

        let file = Self::parse(&content)?;
        info!(
            "loaded {} override entries from {}",
            file.overrides.len(),
            path.display()
        );

        Ok(file)
    }

    pub fn rules(&self) -> Result<Vec<OverrideRule>, ConfigError> {
        self.overrides
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                if entry.capability.is_empty() {
                    return Err(ConfigError::EmptyCapability { index });
                }

                let scope = Self::scope(index, entry)?;
                Ok(OverrideRule::new(&entry.capability, entry.value, scope))
            })
            .collect()
    }

    fn scope(index: usize, entry: &RuleEntry) -> Result<RuleScope, ConfigError> {
        let Some(callers) = &entry.scope else {
            return Ok(RuleScope::Global);
        };

        if callers.is_empty() {
            return Err(ConfigError::EmptyScope {
                index,
                capability: entry.capability.clone(),
            });
        }

        if callers.iter().any(|caller| caller == WILDCARD) {
            if callers.len() > 1 {
                return Err(ConfigError::MixedWildcard {
                    index,
                    capability: entry.capability.clone(),
                });
            }
            return Ok(RuleScope::Global);
        }

        if callers.iter().any(|caller| caller.is_empty()) {
            return Err(ConfigError::EmptyCaller {
                index,
                capability: entry.capability.clone(),
            });
        }

        Ok(RuleScope::callers(callers.iter().cloned()))
    }
}
