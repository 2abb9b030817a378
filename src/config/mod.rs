//! Configuration module for Rustedge.
//!
//! Settings come from an optional TOML file, then environment variables on
//! top of it, organized by concern: walk-forward evaluation and live signal
//! routing.

mod regime_config;
mod walk_forward_config;

pub use regime_config::RegimeEnvConfig;
pub use walk_forward_config::WalkForwardEnvConfig;

use crate::application::signals::signal_router::SignalRouterSettings;
use crate::domain::optimization::settings::WalkForwardSettings;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;

/// Parses `key` through `lookup`, falling back to `default` when unset.
pub(crate) fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{}", e))
            .with_context(|| format!("Failed to parse {}", key)),
        None => Ok(default),
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub walk_forward: WalkForwardSettings,
    pub signals: SignalRouterSettings,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(Self::default(), |key| env::var(key).ok())
    }

    /// Reads a TOML file, then applies any environment overrides.
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let base: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {:?}", path))?;
        Self::from_lookup(base, |key| env::var(key).ok())
    }

    pub fn from_lookup<F>(base: Config, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let walk_forward = WalkForwardEnvConfig::overlay(base.walk_forward, &lookup)?.settings;
        let signals = RegimeEnvConfig::overlay(base.signals, &lookup)?.settings;

        walk_forward
            .validate()
            .context("Invalid walk-forward configuration")?;
        if !(0.0..=1.0).contains(&signals.base_threshold) {
            anyhow::bail!(
                "Invalid BASE_THRESHOLD: {}. Must be within [0, 1]",
                signals.base_threshold
            );
        }

        Ok(Self {
            walk_forward,
            signals,
        })
    }
}
