//! The set of models loaded at startup.
//!
//! The registry is built once before the listener is bound and is read-only
//! afterwards; handlers share it behind an `Arc`.
use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::ServerConfig;
use crate::error::PredictError;
use crate::models::factory::load_named_model;
use crate::models::Predictor;

/// Public description of a loaded model, as listed by `GET /models`.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ModelInfo {
    pub name: String,
    pub kind: String,
    pub n_features: usize,
}

#[derive(Default)]
pub struct ModelRegistry {
    models: BTreeMap<String, Arc<dyn Predictor>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every configured model. Any failure aborts the whole load, so a
    /// server never starts with only some of its models.
    pub fn load(config: &ServerConfig) -> Result<Self> {
        config.validate()?;

        let mut registry = ModelRegistry::new();
        for entry in &config.models {
            let model = load_named_model(entry)?;
            log::info!(
                "[PredictServer::Registry] Loaded model '{}' ({}, {} features) from {}",
                entry.name,
                model.kind(),
                model.n_features(),
                entry.path
            );
            registry.insert(&entry.name, Arc::from(model));
        }
        Ok(registry)
    }

    /// Register `model` under `name`, replacing any previous model of that name.
    pub fn insert(&mut self, name: &str, model: Arc<dyn Predictor>) {
        if self.models.insert(name.to_string(), model).is_some() {
            log::warn!("[PredictServer::Registry] Replaced model '{}'", name);
        }
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn Predictor>, PredictError> {
        self.models
            .get(name)
            .cloned()
            .ok_or_else(|| PredictError::UnknownModel(name.to_string()))
    }

    /// Model names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.models.keys().map(String::as_str).collect()
    }

    pub fn describe(&self) -> Vec<ModelInfo> {
        self.models
            .iter()
            .map(|(name, model)| ModelInfo {
                name: name.clone(),
                kind: model.kind().to_string(),
                n_features: model.n_features(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
