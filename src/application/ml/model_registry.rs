use crate::application::ml::smartcore_trainer::SmartcoreModel;
use crate::domain::ports::ProbabilityModel;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Read-only map from trading pair to fitted model.
///
/// Populated once through [`ModelRegistryBuilder`] at startup and shared by
/// reference afterwards; there is no way to mutate it after `build()`.
#[derive(Clone, Default)]
pub struct ModelRegistry {
    models: HashMap<String, Arc<dyn ProbabilityModel>>,
}

impl ModelRegistry {
    pub fn builder() -> ModelRegistryBuilder {
        ModelRegistryBuilder::default()
    }

    pub fn get(&self, pair: &str) -> Option<Arc<dyn ProbabilityModel>> {
        self.models.get(&pair.to_uppercase()).cloned()
    }

    pub fn pairs(&self) -> Vec<String> {
        let mut pairs: Vec<String> = self.models.keys().cloned().collect();
        pairs.sort();
        pairs
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

/// Writes a fitted model as `<dir>/<PAIR>.json`, the layout
/// [`ModelRegistryBuilder::load_dir`] reads back.
pub fn save_model(dir: &Path, pair: &str, model: &SmartcoreModel) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create model directory {:?}", dir))?;
    let path = dir.join(format!("{}.json", pair.to_uppercase()));
    let mut file = File::create(&path).with_context(|| format!("Failed to create {:?}", path))?;
    serde_json::to_writer(&mut file, model).context("Failed to serialize model")?;
    info!("Saved model for {} to {:?}", pair.to_uppercase(), path);
    Ok(path)
}

#[derive(Default)]
pub struct ModelRegistryBuilder {
    models: HashMap<String, Arc<dyn ProbabilityModel>>,
}

impl ModelRegistryBuilder {
    pub fn register(mut self, pair: &str, model: Arc<dyn ProbabilityModel>) -> Self {
        self.models.insert(pair.to_uppercase(), model);
        self
    }

    /// Loads every `<PAIR>.json` smartcore model in `dir`. Files that fail to
    /// deserialize are logged and skipped.
    pub fn load_dir(mut self, dir: &Path) -> Result<Self> {
        let entries = std::fs::read_dir(dir)
            .with_context(|| format!("Failed to read model directory {:?}", dir))?;

        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(pair) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            let file = File::open(&path).with_context(|| format!("Failed to open {:?}", path))?;
            match serde_json::from_reader::<_, SmartcoreModel>(BufReader::new(file)) {
                Ok(model) => {
                    info!("Loaded model for {} from {:?}", pair, path);
                    self.models.insert(pair.to_uppercase(), Arc::new(model));
                }
                Err(e) => warn!("Failed to deserialize model {:?}: {}", path, e),
            }
        }
        Ok(self)
    }

    pub fn build(self) -> ModelRegistry {
        ModelRegistry {
            models: self.models,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::EvaluationError;

    struct Fixed(f64);

    impl ProbabilityModel for Fixed {
        fn predict_proba(&self, features: &[Vec<f64>]) -> Result<Vec<f64>, EvaluationError> {
            Ok(vec![self.0; features.len()])
        }
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let registry = ModelRegistry::builder()
            .register("btcusdt", Arc::new(Fixed(0.7)))
            .register("ETHUSDT", Arc::new(Fixed(0.3)))
            .build();

        assert_eq!(registry.len(), 2);
        assert!(registry.get("BTCUSDT").is_some());
        assert_eq!(registry.pairs(), vec!["BTCUSDT", "ETHUSDT"]);

        let model = registry.get("ethusdt").unwrap();
        assert_eq!(model.predict_proba(&[vec![]]).unwrap(), vec![0.3]);
        assert!(registry.get("SOLUSDT").is_none());
    }

    #[test]
    fn test_load_dir_skips_unreadable_models() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("BTCUSDT.json"), "not a model").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let registry = ModelRegistry::builder().load_dir(dir.path()).unwrap().build();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_saved_model_round_trips_through_load_dir() {
        use crate::application::ml::smartcore_trainer::RandomForestTrainer;
        use crate::domain::ml::dataset::Dataset;
        use crate::domain::ports::Hyperparameters;

        let features: Vec<Vec<f64>> = (0..40).map(|i| vec![(i % 2) as f64]).collect();
        let labels = (0..40).map(|i| (i % 2) as u8).collect();
        let data = Dataset::new(features, labels).unwrap();
        let params = Hyperparameters::from([("n_trees".to_string(), 5.0)]);
        let model = RandomForestTrainer.train(&data, &params).unwrap();

        let dir = tempfile::tempdir().unwrap();
        save_model(dir.path(), "solusdt", &model).unwrap();

        let registry = ModelRegistry::builder().load_dir(dir.path()).unwrap().build();
        assert_eq!(registry.pairs(), vec!["SOLUSDT"]);
        let loaded = registry.get("SOLUSDT").unwrap();
        assert_eq!(
            loaded.predict_proba(&[vec![1.0]]).unwrap(),
            model.predict_proba(&[vec![1.0]]).unwrap()
        );
    }

    #[test]
    fn test_load_dir_missing_directory_fails() {
        let result = ModelRegistry::builder().load_dir(Path::new("/definitely/not/here"));
        assert!(result.is_err());
    }
}
