use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::PredictError;
use crate::features::FeatureBatch;
use crate::models::predictor::Predictor;

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Link {
    #[default]
    Identity,
    /// Maps the linear score to a probability in (0, 1).
    Logistic,
}

/// Linear (or logistic) regression exported as plain JSON:
/// `{"coefficients": [...], "intercept": 0.0, "link": "identity"}`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct LinearModel {
    pub coefficients: Vec<f64>,
    #[serde(default)]
    pub intercept: f64,
    #[serde(default)]
    pub link: Link,
}

impl LinearModel {
    pub fn new(coefficients: Vec<f64>, intercept: f64, link: Link) -> Result<Self> {
        let model = LinearModel {
            coefficients,
            intercept,
            link,
        };
        model.check()?;
        Ok(model)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read model: {}", path.display()))?;
        let model: LinearModel = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse linear model: {}", path.display()))?;
        model
            .check()
            .with_context(|| format!("Invalid linear model: {}", path.display()))?;
        Ok(model)
    }

    fn check(&self) -> Result<()> {
        if self.coefficients.is_empty() {
            anyhow::bail!("Linear model has no coefficients");
        }
        if !self.intercept.is_finite() || self.coefficients.iter().any(|c| !c.is_finite()) {
            anyhow::bail!("Linear model has non-finite parameters");
        }
        Ok(())
    }

    fn score(&self, row: &[f64]) -> f64 {
        let linear: f64 = self
            .coefficients
            .iter()
            .zip(row)
            .map(|(w, x)| w * x)
            .sum::<f64>()
            + self.intercept;

        match self.link {
            Link::Identity => linear,
            Link::Logistic => 1.0 / (1.0 + (-linear).exp()),
        }
    }
}

impl Predictor for LinearModel {
    fn predict(&self, batch: &FeatureBatch) -> Result<Vec<f64>, PredictError> {
        batch.ensure_width(self.coefficients.len())?;
        Ok(batch.rows().map(|row| self.score(row)).collect())
    }

    fn n_features(&self) -> usize {
        self.coefficients.len()
    }

    fn kind(&self) -> &str {
        "linear"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_link_is_dot_plus_intercept() {
        let model = LinearModel::new(vec![2.0, -1.0], 0.5, Link::Identity).unwrap();
        let batch = FeatureBatch::from_rows(vec![vec![1.0, 1.0], vec![3.0, 2.0]]).unwrap();
        assert_eq!(model.predict(&batch).unwrap(), vec![1.5, 4.5]);
    }

    #[test]
    fn logistic_link_maps_zero_to_one_half() {
        let model = LinearModel::new(vec![1.0], 0.0, Link::Logistic).unwrap();
        let batch = FeatureBatch::from_rows(vec![vec![0.0], vec![50.0], vec![-50.0]]).unwrap();
        let p = model.predict(&batch).unwrap();
        assert!((p[0] - 0.5).abs() < 1e-12);
        assert!(p[1] > 0.999);
        assert!(p[2] < 0.001);
    }

    #[test]
    fn link_and_intercept_default_when_absent() {
        let model: LinearModel = serde_json::from_str(r#"{"coefficients": [1.0, 2.0]}"#).unwrap();
        assert_eq!(model.link, Link::Identity);
        assert_eq!(model.intercept, 0.0);
    }

    #[test]
    fn load_rejects_empty_coefficients() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.json");
        fs::write(&path, r#"{"coefficients": [], "intercept": 1.0}"#).unwrap();
        assert!(LinearModel::load(&path).is_err());
        assert!(LinearModel::new(vec![], 0.0, Link::Identity).is_err());
    }

    #[test]
    fn wrong_width_is_rejected() {
        let model = LinearModel::new(vec![1.0, 1.0, 1.0], 0.0, Link::Identity).unwrap();
        let batch = FeatureBatch::from_vector(vec![1.0, 2.0]).unwrap();
        assert_eq!(
            model.predict(&batch),
            Err(PredictError::FeatureCountMismatch {
                expected: 3,
                got: 2
            })
        );
    }
}
