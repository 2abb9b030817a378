//! Signal routing configuration parsing from environment variables.

use super::parse_or;
use crate::application::signals::signal_router::SignalRouterSettings;
use anyhow::Result;

/// Regime detection and adaptive threshold environment configuration
#[derive(Debug, Clone)]
pub struct RegimeEnvConfig {
    pub settings: SignalRouterSettings,
}

impl RegimeEnvConfig {
    pub fn overlay<F>(base: SignalRouterSettings, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            settings: SignalRouterSettings {
                regime_lookback: parse_or(&lookup, "REGIME_LOOKBACK", base.regime_lookback)?,
                volatility_lookback: parse_or(
                    &lookup,
                    "REGIME_VOLATILITY_LOOKBACK",
                    base.volatility_lookback,
                )?,
                base_threshold: parse_or(&lookup, "BASE_THRESHOLD", base.base_threshold)?,
            },
        })
    }
}
