//! Engine configuration.
//!
//! `EngineConfig::default()` reproduces the stock behaviour: five-minute
//! leases, a 100-entry history window, the default strategy table and
//! "no conflict" for snapshots without timestamps. Every knob can be
//! overridden from the environment with `AREABOOK_*` variables.

use std::collections::HashMap;
use std::env;
use std::time::Duration;

use thiserror::Error;

use crate::detector::MissingTimestampPolicy;
use crate::merge::StrategyTable;
use crate::models::{EntityType, ResolutionStrategy};
use crate::util::normalize_text_option;

const DEFAULT_LOCK_TTL_SECS: u64 = 300;
/// One week
const MAX_LOCK_TTL_SECS: u64 = 7 * 24 * 60 * 60;
const DEFAULT_HISTORY_LIMIT: usize = 100;
const MAX_HISTORY_LIMIT: usize = 10_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Tunables shared by the lock manager, detector, merge engine and history log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub strategies: StrategyTable,
    pub lock_ttl: Duration,
    pub history_limit: usize,
    pub missing_timestamp: MissingTimestampPolicy,
    /// Allow the remote-wins fallback for types without a dedicated merger
    pub fallback_merge: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            strategies: StrategyTable::default(),
            lock_ttl: Duration::from_secs(DEFAULT_LOCK_TTL_SECS),
            history_limit: DEFAULT_HISTORY_LIMIT,
            missing_timestamp: MissingTimestampPolicy::Ignore,
            fallback_merge: true,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(value) = optional_trimmed(&lookup, "AREABOOK_LOCK_TTL_SECS") {
            let secs = value.parse::<u64>().map_err(|_| {
                ConfigError::Invalid(format!(
                    "AREABOOK_LOCK_TTL_SECS must be an integer in [1, {MAX_LOCK_TTL_SECS}]"
                ))
            })?;
            if secs == 0 || secs > MAX_LOCK_TTL_SECS {
                return Err(ConfigError::Invalid(format!(
                    "AREABOOK_LOCK_TTL_SECS must be in [1, {MAX_LOCK_TTL_SECS}]"
                )));
            }
            config.lock_ttl = Duration::from_secs(secs);
        }

        if let Some(value) = optional_trimmed(&lookup, "AREABOOK_HISTORY_LIMIT") {
            let limit = value.parse::<usize>().map_err(|_| {
                ConfigError::Invalid(format!(
                    "AREABOOK_HISTORY_LIMIT must be an integer in [1, {MAX_HISTORY_LIMIT}]"
                ))
            })?;
            if limit == 0 || limit > MAX_HISTORY_LIMIT {
                return Err(ConfigError::Invalid(format!(
                    "AREABOOK_HISTORY_LIMIT must be in [1, {MAX_HISTORY_LIMIT}]"
                )));
            }
            config.history_limit = limit;
        }

        if let Some(value) = optional_trimmed(&lookup, "AREABOOK_MISSING_TIMESTAMP") {
            config.missing_timestamp = match value.to_ascii_lowercase().as_str() {
                "ignore" => MissingTimestampPolicy::Ignore,
                "escalate" => MissingTimestampPolicy::Escalate,
                _ => {
                    return Err(ConfigError::Invalid(
                        "AREABOOK_MISSING_TIMESTAMP must be `ignore` or `escalate`".to_string(),
                    ))
                }
            };
        }

        if let Some(value) = optional_trimmed(&lookup, "AREABOOK_FALLBACK_MERGE") {
            config.fallback_merge = parse_bool(&value).ok_or_else(|| {
                ConfigError::Invalid("AREABOOK_FALLBACK_MERGE must be true or false".to_string())
            })?;
        }

        for entity_type in EntityType::ALL {
            let name = format!(
                "AREABOOK_STRATEGY_{}",
                entity_type.as_str().to_ascii_uppercase()
            );
            if let Some(value) = optional_trimmed(&lookup, &name) {
                let strategy = value.parse::<ResolutionStrategy>().map_err(|_| {
                    ConfigError::Invalid(format!(
                        "{name} must be one of keep-local, keep-remote, merge, manual"
                    ))
                })?;
                config.strategies.set(entity_type, strategy);
            }
        }

        Ok(config)
    }
}

fn optional_trimmed(lookup: impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    normalize_text_option(lookup(name))
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
