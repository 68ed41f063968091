//! Configuration management for graft
//!
//! Settings live in TOML. Lookup order: an explicit path, `./graft.toml`, then
//! `<config dir>/graft/config.toml`.

use crate::util::write_atomic;
use anyhow::{bail, Context};
use graft_engine::{ApplyOptions, FuzzyAmbiguity, PolicyKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const LOCAL_CONFIG_FILE: &str = "graft.toml";
pub const DEFAULT_MAX_ERROR_CHARS: usize = 10_000;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub parse: ParseConfig,
    pub apply: ApplyConfig,
    pub selection: SelectionConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseConfig {
    /// Prefix stripped from model paths; defaults to the project directory name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplyConfig {
    pub fuzzy_ambiguity: FuzzyAmbiguity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    pub policy: PolicyKind,
    /// Compile errors longer than this are truncated.
    pub max_error_chars: usize,
    /// Per-target policy overrides, keyed by target language.
    pub targets: BTreeMap<String, PolicyKind>,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            policy: PolicyKind::default(),
            max_error_chars: DEFAULT_MAX_ERROR_CHARS,
            targets: BTreeMap::new(),
        }
    }
}

impl Config {
    fn sanitize(&mut self) {
        if let Some(name) = self.parse.display_name.take() {
            let name = name.trim().trim_end_matches('/').to_string();
            if !name.is_empty() {
                self.parse.display_name = Some(name);
            }
        }
        if self.selection.max_error_chars == 0 {
            self.selection.max_error_chars = DEFAULT_MAX_ERROR_CHARS;
        }
        self.selection.targets = std::mem::take(&mut self.selection.targets)
            .into_iter()
            .map(|(target, policy)| (target.trim().to_ascii_lowercase(), policy))
            .collect();
    }

    /// Get the user config file path
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("graft").join("config.toml"))
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let mut config: Config = toml::from_str(content)?;
        config.sanitize();
        Ok(config)
    }

    /// Load an explicitly requested config file. Any failure is an error.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("Invalid config {}", path.display()))
    }

    /// Load config using the standard lookup order.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }
        let mut candidates = vec![PathBuf::from(LOCAL_CONFIG_FILE)];
        candidates.extend(Self::user_config_path());
        Ok(Self::load_first(&candidates))
    }

    /// Load the first readable file among `candidates`, or return default. A file that
    /// fails to parse is moved aside and defaults are used.
    pub fn load_first(candidates: &[PathBuf]) -> Self {
        for path in candidates {
            let Ok(content) = fs::read_to_string(path) else {
                continue;
            };
            match Self::from_toml(&content) {
                Ok(config) => {
                    debug!(path = %path.display(), "loaded config");
                    return config;
                }
                Err(err) => {
                    let backup = preserve_corrupt_config(path, &content);
                    warn!(
                        path = %path.display(),
                        backup = %backup.display(),
                        error = %err,
                        "config file was corrupted, a backup was saved and defaults were loaded"
                    );
                    return Self::default();
                }
            }
        }
        Self::default()
    }

    /// Save config to `path`
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let mut sanitized = self.clone();
        sanitized.sanitize();
        let content = toml::to_string_pretty(&sanitized).context("Failed to serialize config")?;
        write_atomic(path, &content)
    }

    pub fn apply_options(&self) -> ApplyOptions {
        ApplyOptions {
            fuzzy_ambiguity: self.apply.fuzzy_ambiguity,
        }
    }

    /// Policy for a selection run. Without a target the configured default is used;
    /// with one, configured overrides win over the built-in mapping.
    pub fn policy_for(&self, target: Option<&str>) -> anyhow::Result<PolicyKind> {
        let Some(target) = target else {
            return Ok(self.selection.policy);
        };
        let key = target.trim().to_ascii_lowercase();
        if let Some(policy) = self.selection.targets.get(&key) {
            return Ok(*policy);
        }
        match PolicyKind::for_target(&key) {
            Some(policy) => Ok(policy),
            None => bail!("Unsupported target language '{}'", target),
        }
    }
}

fn preserve_corrupt_config(path: &Path, content: &str) -> PathBuf {
    let corrupt_path = path.with_extension("toml.corrupt");
    if fs::rename(path, &corrupt_path).is_err() {
        let _ = fs::write(&corrupt_path, content);
    }
    corrupt_path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.selection.max_error_chars, DEFAULT_MAX_ERROR_CHARS);
        assert_eq!(config.selection.policy, PolicyKind::FewestFailures);
        assert_eq!(config.apply.fuzzy_ambiguity, FuzzyAmbiguity::First);
    }

    #[test]
    fn test_config_partial_sections_use_defaults() {
        let config = Config::from_toml("[apply]\nfuzzy_ambiguity = \"reject\"\n").unwrap();
        assert_eq!(config.apply.fuzzy_ambiguity, FuzzyAmbiguity::Reject);
        assert_eq!(config.selection, SelectionConfig::default());
    }

    #[test]
    fn test_config_sanitizes_values() {
        let config = Config::from_toml(
            "[parse]\ndisplay_name = \"  \"\n[selection]\nmax_error_chars = 0\n[selection.targets]\n\" Java21 \" = \"test-suite\"\n",
        )
        .unwrap();
        assert_eq!(config.parse.display_name, None);
        assert_eq!(config.selection.max_error_chars, DEFAULT_MAX_ERROR_CHARS);
        assert_eq!(config.policy_for(Some("JAVA21")).unwrap(), PolicyKind::TestSuite);
    }

    #[test]
    fn test_policy_for_target() {
        let config = Config::default();
        assert_eq!(config.policy_for(None).unwrap(), PolicyKind::FewestFailures);
        assert_eq!(config.policy_for(Some("java17")).unwrap(), PolicyKind::MostChanges);
        assert!(config.policy_for(Some("fortran")).is_err());
    }

    #[test]
    fn test_config_round_trip() {
        let mut config = Config::default();
        config.parse.display_name = Some("Hashids.net".to_string());
        config.selection.policy = PolicyKind::MostChanges;
        let encoded = toml::to_string(&config).unwrap();
        assert_eq!(Config::from_toml(&encoded).unwrap(), config);
    }

    #[test]
    fn test_unknown_policy_is_rejected() {
        assert!(Config::from_toml("[selection]\npolicy = \"largest\"\n").is_err());
    }
}
