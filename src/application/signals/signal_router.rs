use crate::application::ml::model_registry::ModelRegistry;
use crate::domain::market::market_regime::{MarketRegime, MarketRegimeDetector, MarketRegimeType};
use crate::domain::market::price_series::Candle;
use crate::domain::optimization::adaptive_threshold::{
    AdaptiveThresholdRouter, DEFAULT_BASE_THRESHOLD,
};
use crate::domain::performance::stats::Stats;
use crate::domain::ports::FeatureProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Probability reported when no model output is available.
const NEUTRAL_PROBABILITY: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Signal {
    Buy,
    Sell,
    Hold,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Buy => write!(f, "BUY"),
            Signal::Sell => write!(f, "SELL"),
            Signal::Hold => write!(f, "HOLD"),
        }
    }
}

/// `BUY` above the threshold, `SELL` below its mirror `1 - threshold`,
/// `HOLD` in between. Returns the signal with its confidence.
pub fn decide(probability: f64, threshold: f64) -> (Signal, f64) {
    if probability > threshold {
        (Signal::Buy, probability)
    } else if probability < 1.0 - threshold {
        (Signal::Sell, 1.0 - probability)
    } else {
        (Signal::Hold, NEUTRAL_PROBABILITY)
    }
}

/// Live decision payload for one pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeDecision {
    pub pair: String,
    pub regime: MarketRegimeType,
    pub regime_strength: f64,
    pub volatility: f64,
    pub adaptive_threshold: f64,
    pub probability: f64,
    pub confidence: f64,
    pub signal: Signal,
    /// Why the router fell back to `HOLD` without consulting a model
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalRouterSettings {
    pub regime_lookback: usize,
    pub volatility_lookback: usize,
    pub base_threshold: f64,
}

impl Default for SignalRouterSettings {
    fn default() -> Self {
        Self {
            regime_lookback: 50,
            volatility_lookback: 20,
            base_threshold: DEFAULT_BASE_THRESHOLD,
        }
    }
}

/// Turns a trailing bar buffer and a registered model into a trade decision.
///
/// The router holds no mutable state; concurrent calls need no locking.
pub struct SignalRouter {
    registry: Arc<ModelRegistry>,
    feature_provider: Arc<dyn FeatureProvider>,
    detector: MarketRegimeDetector,
    settings: SignalRouterSettings,
}

impl SignalRouter {
    pub fn new(
        registry: Arc<ModelRegistry>,
        feature_provider: Arc<dyn FeatureProvider>,
        settings: SignalRouterSettings,
    ) -> Self {
        Self {
            registry,
            feature_provider,
            detector: MarketRegimeDetector::new(settings.regime_lookback),
            settings,
        }
    }

    /// Never fails: missing models, short history and model errors all
    /// produce a `HOLD` with the cause in `reason`.
    pub fn route(&self, pair: &str, bars: &[Candle]) -> RegimeDecision {
        let closes: Vec<f64> = bars.iter().map(Candle::close_f64).collect();
        let regime = self.detector.detect(&closes);
        let volatility = Stats::realized_volatility(&closes, self.settings.volatility_lookback);
        let threshold = AdaptiveThresholdRouter::threshold(
            regime.regime_type,
            self.settings.base_threshold,
            volatility,
        );

        let hold = |reason: String| {
            debug!("{}: HOLD ({})", pair, reason);
            self.decision(pair, regime, volatility, threshold, NEUTRAL_PROBABILITY, Some(reason))
        };

        let Some(model) = self.registry.get(pair) else {
            return hold(format!("no model registered for {}", pair));
        };

        let features = match self.feature_provider.compute(bars) {
            Ok(matrix) => matrix.rows.into_iter().last(),
            Err(e) => {
                warn!("{}: feature computation failed: {}", pair, e);
                return hold(format!("feature computation failed: {}", e));
            }
        };
        let Some(latest) = features else {
            return hold("no price history".to_string());
        };

        match model.predict_proba(&[latest]) {
            Ok(probabilities) => match probabilities.first() {
                Some(&p) => self.decision(pair, regime, volatility, threshold, p.clamp(0.0, 1.0), None),
                None => hold("model returned no prediction".to_string()),
            },
            Err(e) => {
                warn!("{}: prediction failed: {}", pair, e);
                hold(format!("prediction failed: {}", e))
            }
        }
    }

    fn decision(
        &self,
        pair: &str,
        regime: MarketRegime,
        volatility: f64,
        threshold: f64,
        probability: f64,
        reason: Option<String>,
    ) -> RegimeDecision {
        let (signal, confidence) = match reason {
            Some(_) => (Signal::Hold, NEUTRAL_PROBABILITY),
            None => decide(probability, threshold),
        };
        RegimeDecision {
            pair: pair.to_uppercase(),
            regime: regime.regime_type,
            regime_strength: regime.strength,
            volatility,
            adaptive_threshold: threshold,
            probability,
            confidence,
            signal,
            reason,
        }
    }
}
