//! Layered configuration loading: defaults → file → environment overlay,
//! validated once at load time and then handed out as immutable clones.

use std::path::Path;

use tokio::fs;
use tracing::{info, warn};

use crate::config::ConsensusNetConfig;
use crate::validation::{ConfigError, ConfigResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStrategy {
    Override,
    Merge,
    Replace,
}

#[derive(Debug, Clone, Copy)]
pub enum ConfigSource {
    File,
    Environment,
    Default,
}

pub struct ConfigLoadResult {
    pub config: ConsensusNetConfig,
    pub sources_applied: Vec<ConfigSource>,
    pub warnings: Vec<String>,
}

#[derive(Default)]
pub struct ConfigLoaderBuilder {
    path: Option<String>,
    env_prefix: String,
    merge_strategy: MergeStrategy,
}

impl Default for MergeStrategy {
    fn default() -> Self {
        MergeStrategy::Override
    }
}

impl ConfigLoaderBuilder {
    pub fn new() -> Self {
        Self {
            path: None,
            env_prefix: "CONSENSUSNET_".to_string(),
            merge_strategy: MergeStrategy::Override,
        }
    }

    pub fn with_file(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    pub fn build(self) -> ConfigLoader {
        ConfigLoader {
            path: self.path,
            env_prefix: self.env_prefix,
            merge_strategy: self.merge_strategy,
        }
    }
}

/// Loads `ConsensusNetConfig` by layering a file overlay and an environment
/// overlay on top of `ConsensusNetConfig::default()`, then validates the
/// result. Each subcomponent receives a clone of the validated value rather
/// than a shared mutable global (SPEC_FULL §11).
pub struct ConfigLoader {
    path: Option<String>,
    env_prefix: String,
    merge_strategy: MergeStrategy,
}

impl ConfigLoader {
    pub fn builder() -> ConfigLoaderBuilder {
        ConfigLoaderBuilder::new()
    }

    pub async fn load(&self) -> ConfigResult<ConfigLoadResult> {
        let mut sources_applied = vec![ConfigSource::Default];
        let mut warnings = Vec::new();

        let mut value = serde_json::to_value(ConsensusNetConfig::default())
            .map_err(|e| ConfigError::Parse(e.to_string()))?;

        if let Some(path) = &self.path {
            match self.load_file_overlay(path).await {
                Ok(Some(file_value)) => {
                    merge(&mut value, file_value, self.merge_strategy);
                    sources_applied.push(ConfigSource::File);
                }
                Ok(None) => {
                    warnings.push(format!("configuration file not found: {path}, using defaults"));
                }
                Err(e) => return Err(e),
            }
        }

        if let Some(env_value) = self.load_env_overlay() {
            merge(&mut value, env_value, self.merge_strategy);
            sources_applied.push(ConfigSource::Environment);
        }

        let config: ConsensusNetConfig =
            serde_json::from_value(value).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;

        info!(sources = sources_applied.len(), "configuration loaded and validated");

        Ok(ConfigLoadResult {
            config,
            sources_applied,
            warnings,
        })
    }

    async fn load_file_overlay(&self, path: &str) -> ConfigResult<Option<serde_json::Value>> {
        let file_path = Path::new(path);
        if !file_path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(file_path)
            .await
            .map_err(|e| ConfigError::Parse(e.to_string()))?;
        let value: serde_json::Value =
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        Ok(Some(value))
    }

    /// Recognizes `CONSENSUSNET_<SECTION>__<FIELD>` style overrides, e.g.
    /// `CONSENSUSNET_CONSENSUS__THRESHOLD=0.8`.
    fn load_env_overlay(&self) -> Option<serde_json::Value> {
        let mut overlay = serde_json::Map::new();
        let mut applied = 0;

        for (key, raw_value) in std::env::vars() {
            let Some(rest) = key.strip_prefix(&self.env_prefix) else {
                continue;
            };
            let Some((section, field)) = rest.split_once("__") else {
                warn!(key, "ignoring malformed environment override, expected SECTION__FIELD");
                continue;
            };
            let section = section.to_lowercase();
            let field = field.to_lowercase();
            let parsed: serde_json::Value = serde_json::from_str(&raw_value)
                .unwrap_or(serde_json::Value::String(raw_value));

            let entry = overlay
                .entry(section)
                .or_insert_with(|| serde_json::Value::Object(serde_json::Map::new()));
            if let serde_json::Value::Object(map) = entry {
                map.insert(field, parsed);
                applied += 1;
            }
        }

        if applied == 0 {
            None
        } else {
            Some(serde_json::Value::Object(overlay))
        }
    }
}

fn merge(base: &mut serde_json::Value, overlay: serde_json::Value, strategy: MergeStrategy) {
    match strategy {
        MergeStrategy::Replace => *base = overlay,
        MergeStrategy::Override | MergeStrategy::Merge => merge_recursive(base, overlay),
    }
}

fn merge_recursive(base: &mut serde_json::Value, overlay: serde_json::Value) {
    match (base, overlay) {
        (serde_json::Value::Object(base_map), serde_json::Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                merge_recursive(base_map.entry(key).or_insert(serde_json::Value::Null), value);
            }
        }
        (base_slot, overlay_value) => *base_slot = overlay_value,
    }
}
