use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use rustedge::application::ml::feature_provider::BasicFeatureProvider;
use rustedge::application::ml::model_registry::{ModelRegistry, save_model};
use rustedge::application::ml::smartcore_trainer::RandomForestTrainer;
use rustedge::application::signals::signal_router::{Signal, SignalRouter, SignalRouterSettings};
use rustedge::domain::errors::EvaluationError;
use rustedge::domain::market::market_regime::MarketRegimeType;
use rustedge::domain::market::price_series::Candle;
use rustedge::domain::ml::dataset::Dataset;
use rustedge::domain::ml::labels::{LabelGenerator, TailLabelPolicy};
use rustedge::domain::ports::{FeatureProvider, ModelTrainer, ProbabilityModel};
use std::sync::Arc;

fn candles(closes: &[f64]) -> Vec<Candle> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            let close = Decimal::from_f64(c).unwrap().round_dp(6);
            Candle {
                symbol: "ETHUSDT".to_string(),
                open: close,
                high: close,
                low: close,
                close,
                volume: Decimal::from(50 + (i % 5) as i64),
                timestamp: i as i64 * 60_000,
            }
        })
        .collect()
}

struct Constant(f64);

impl ProbabilityModel for Constant {
    fn predict_proba(&self, features: &[Vec<f64>]) -> Result<Vec<f64>, EvaluationError> {
        Ok(vec![self.0; features.len()])
    }
}

fn router_with(pair: &str, probability: f64) -> SignalRouter {
    let registry = ModelRegistry::builder()
        .register(pair, Arc::new(Constant(probability)))
        .build();
    SignalRouter::new(
        Arc::new(registry),
        Arc::new(BasicFeatureProvider::default()),
        SignalRouterSettings::default(),
    )
}

#[test]
fn test_downtrend_raises_threshold_and_holds() {
    // Steady 1% decline per bar
    let closes: Vec<f64> = (0..80).map(|i| 200.0 * 0.99f64.powi(i)).collect();
    let decision = router_with("ETHUSDT", 0.64).route("ETHUSDT", &candles(&closes));

    assert_eq!(decision.regime, MarketRegimeType::TrendingDown);
    // 0.65 base for a downtrend plus a small volatility premium
    assert!(decision.adaptive_threshold >= 0.65 && decision.adaptive_threshold < 0.66);
    assert_eq!(decision.signal, Signal::Hold);
    assert!(decision.reason.is_none());
    assert_eq!(decision.probability, 0.64);
}

#[test]
fn test_ranging_market_buys_above_base() {
    let closes: Vec<f64> = (0..80)
        .map(|i| 100.0 + if i % 2 == 0 { 0.5 } else { -0.5 })
        .collect();
    let decision = router_with("ETHUSDT", 0.7).route("ethusdt", &candles(&closes));

    assert_eq!(decision.regime, MarketRegimeType::Ranging);
    assert_eq!(decision.signal, Signal::Buy);
    assert_eq!(decision.confidence, 0.7);
}

#[test]
fn test_trained_model_round_trip_routes_a_decision() {
    let closes: Vec<f64> = (0..300)
        .map(|i| 100.0 + (i as f64 * 0.2).sin() * 3.0 + i as f64 * 0.01)
        .collect();
    let bars = candles(&closes);

    let provider = BasicFeatureProvider::default();
    let labels = LabelGenerator::new(5, 0.003, TailLabelPolicy::Exclude)
        .unwrap()
        .generate(&closes);
    let dataset = Dataset::from_complete_rows(provider.compute(&bars).unwrap(), &labels).unwrap();
    assert_eq!(dataset.len(), 295);

    let trainer = RandomForestTrainer;
    let model = trainer
        .train(&dataset, &trainer.default_hyperparameters())
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    save_model(dir.path(), "ethusdt", &model).unwrap();
    let registry = ModelRegistry::builder().load_dir(dir.path()).unwrap().build();

    let router = SignalRouter::new(
        Arc::new(registry),
        Arc::new(provider),
        SignalRouterSettings::default(),
    );
    let decision = router.route("ETHUSDT", &bars);

    assert!(decision.reason.is_none());
    assert!((0.0..=1.0).contains(&decision.probability));
    assert!((0.50..=0.75).contains(&decision.adaptive_threshold));
    match decision.signal {
        Signal::Buy => assert!(decision.probability > decision.adaptive_threshold),
        Signal::Sell => assert!(decision.probability < 1.0 - decision.adaptive_threshold),
        Signal::Hold => assert_eq!(decision.confidence, 0.5),
    }
}
