use anyhow::{Context, Result};

use crate::config::{ModelEntry, ModelFormat};
use crate::models::gbdt::GbdtModel;
use crate::models::linear::LinearModel;
use crate::models::predictor::Predictor;

/// Load the artifact described by `entry` into a boxed predictor.
pub fn load_model(entry: &ModelEntry) -> Result<Box<dyn Predictor>> {
    let model: Box<dyn Predictor> = match &entry.format {
        ModelFormat::Gbdt => Box::new(GbdtModel::load(&entry.path)?),
        ModelFormat::XgboostDump {
            objective,
            n_features,
        } => Box::new(GbdtModel::load_xgboost_dump(
            &entry.path,
            objective,
            *n_features,
        )?),
        ModelFormat::Linear => Box::new(LinearModel::load(&entry.path)?),
    };
    Ok(model)
}

/// Like [`load_model`], with the model name attached to any error.
pub fn load_named_model(entry: &ModelEntry) -> Result<Box<dyn Predictor>> {
    load_model(entry).with_context(|| {
        format!(
            "Failed to load model '{}' ({}) from {}",
            entry.name,
            entry.format.name(),
            entry.path
        )
    })
}
