use anyhow::{Context, Result};
use gbdt::decision_tree::{Data, DataVec, ValueType};
use gbdt::gradient_boost::GBDT;
use std::fs;
use std::path::Path;

use crate::error::PredictError;
use crate::features::FeatureBatch;
use crate::models::predictor::Predictor;

/// Gradient Boosting Decision Tree (GBDT) model backed by gbdt-rs.
pub struct GbdtModel {
    model: GBDT,
    n_features: usize,
}

fn path_str(path: &Path) -> Result<&str> {
    path.to_str()
        .with_context(|| format!("Model path is not valid UTF-8: {}", path.display()))
}

/// gbdt-rs does not expose its config after loading, so read the input width
/// straight from the saved model's `conf.feature_size`.
fn read_feature_size(path: &Path) -> Result<usize> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read model: {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("Model is not valid JSON: {}", path.display()))?;

    match value
        .get("conf")
        .and_then(|conf| conf.get("feature_size"))
        .and_then(serde_json::Value::as_u64)
    {
        Some(size) if size > 0 => Ok(size as usize),
        _ => anyhow::bail!(
            "Model has no positive conf.feature_size: {}",
            path.display()
        ),
    }
}

fn collect_max_split(node: &serde_json::Value, max: &mut Option<usize>) -> Result<()> {
    if let Some(split) = node.get("split") {
        let index = split
            .as_str()
            .and_then(|s| s.strip_prefix('f'))
            .and_then(|s| s.parse::<usize>().ok())
            .with_context(|| format!("Unsupported split feature {}, expected \"f<index>\"", split))?;
        *max = Some(max.map_or(index, |m| m.max(index)));
    }
    if let Some(children) = node.get("children").and_then(serde_json::Value::as_array) {
        for child in children {
            collect_max_split(child, max)?;
        }
    }
    Ok(())
}

/// Highest feature index any tree splits on in a converted XGBoost dump
/// (a base-score line followed by the JSON tree array), or `None` for
/// trees that are all leaves.
fn max_split_feature(path: &Path) -> Result<Option<usize>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read model: {}", path.display()))?;
    let (_base_score, trees) = content.split_once('\n').with_context(|| {
        format!("Expected a base-score line before the trees: {}", path.display())
    })?;
    let trees: serde_json::Value = serde_json::from_str(trees)
        .with_context(|| format!("Trees are not valid JSON: {}", path.display()))?;
    let trees = trees
        .as_array()
        .with_context(|| format!("Trees must be a JSON array: {}", path.display()))?;

    let mut max = None;
    for tree in trees {
        collect_max_split(tree, &mut max)?;
    }
    Ok(max)
}

impl GbdtModel {
    pub fn new(model: GBDT, n_features: usize) -> Self {
        GbdtModel { model, n_features }
    }

    /// Load a model written by `GBDT::save_model`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let n_features = read_feature_size(path)?;
        let model = GBDT::load_model(path_str(path)?).map_err(|e| {
            anyhow::anyhow!("Failed to load gbdt model {}: {}", path.display(), e)
        })?;
        Ok(Self::new(model, n_features))
    }

    /// Load an XGBoost model converted with gbdt-rs's `convert_xgboost.py`: a
    /// base-score line followed by the JSON tree dump. Raw `booster[0]:` text
    /// dumps are not accepted. `objective` is the XGBoost objective the model
    /// was trained with, e.g. "reg:linear" or "binary:logistic".
    ///
    /// Fails if any tree splits on a feature index `>= n_features`.
    pub fn load_xgboost_dump<P: AsRef<Path>>(
        path: P,
        objective: &str,
        n_features: usize,
    ) -> Result<Self> {
        let path = path.as_ref();
        if n_features == 0 {
            anyhow::bail!("n_features must be positive for {}", path.display());
        }
        if !path.exists() {
            anyhow::bail!("Model file does not exist: {}", path.display());
        }
        if let Some(max) = max_split_feature(path)? {
            if max >= n_features {
                anyhow::bail!(
                    "Trees split on feature f{} but n_features is {}: {}",
                    max,
                    n_features,
                    path.display()
                );
            }
        }
        let model = GBDT::from_xgboost_dump(path_str(path)?, objective).map_err(|e| {
            anyhow::anyhow!("Failed to load xgboost dump {}: {}", path.display(), e)
        })?;
        Ok(Self::new(model, n_features))
    }
}

impl Predictor for GbdtModel {
    fn predict(&self, batch: &FeatureBatch) -> Result<Vec<f64>, PredictError> {
        batch.ensure_width(self.n_features)?;

        let mut test_x = DataVec::new();
        for row in batch.rows() {
            let test_row: Vec<ValueType> = row.iter().map(|&v| v as ValueType).collect();
            test_x.push(Data::new_test_data(test_row, None));
        }

        let predictions = self.model.predict(&test_x);
        if predictions.len() != batch.nrows() {
            return Err(PredictError::Model(format!(
                "gbdt returned {} predictions for {} rows",
                predictions.len(),
                batch.nrows()
            )));
        }
        Ok(predictions.into_iter().map(|p| p as f64).collect())
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn kind(&self) -> &str {
        "gbdt"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gbdt::config::Config;

    fn train_small_model() -> GBDT {
        let mut config = Config::new();
        config.set_feature_size(2);
        config.set_shrinkage(0.3);
        config.set_max_depth(3);
        config.set_iterations(10);
        config.set_debug(false);
        config.set_loss("SquaredError");

        let mut gbdt = GBDT::new(&config);
        let mut train_x = DataVec::new();
        for i in 0..20 {
            let x = i as f32;
            let label = if i < 10 { 0.0 } else { 10.0 };
            train_x.push(Data::new_training_data(vec![x, 1.0], 1.0, label, None));
        }
        gbdt.fit(&mut train_x);
        gbdt
    }

    #[test]
    fn saved_model_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        train_small_model()
            .save_model(path.to_str().unwrap())
            .unwrap();

        let model = GbdtModel::load(&path).unwrap();
        assert_eq!(model.n_features(), 2);
        assert_eq!(model.kind(), "gbdt");

        let batch = FeatureBatch::from_rows(vec![vec![1.0, 1.0], vec![18.0, 1.0]]).unwrap();
        let predictions = model.predict(&batch).unwrap();
        assert_eq!(predictions.len(), 2);
        assert!(predictions[0] < predictions[1]);
    }

    #[test]
    fn wrong_width_is_an_error_not_a_panic() {
        let model = GbdtModel::new(train_small_model(), 2);
        let batch = FeatureBatch::from_vector(vec![1.0]).unwrap();
        assert_eq!(
            model.predict(&batch),
            Err(PredictError::FeatureCountMismatch {
                expected: 2,
                got: 1
            })
        );
    }

    #[test]
    fn missing_or_malformed_artifacts_fail_to_load() {
        let dir = tempfile::tempdir().unwrap();
        assert!(GbdtModel::load(dir.path().join("absent.json")).is_err());

        let garbage = dir.path().join("garbage.json");
        fs::write(&garbage, "{\"trees\": []}").unwrap();
        assert!(GbdtModel::load(&garbage).is_err());

        assert!(GbdtModel::load_xgboost_dump(dir.path().join("absent.dump"), "reg:linear", 3).is_err());
        assert!(GbdtModel::load_xgboost_dump(&garbage, "reg:linear", 0).is_err());
    }

    const CONVERTED_DUMP: &str = concat!(
        "0.5\n",
        r#"[{"nodeid":0,"depth":0,"split":"f2","split_condition":0.5,"yes":1,"no":2,"missing":1,"#,
        r#""children":[{"nodeid":1,"leaf":0.1},{"nodeid":2,"leaf":0.9}]}]"#,
        "\n"
    );

    #[test]
    fn converted_xgboost_dump_loads_and_predicts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("xgb.dump");
        fs::write(&path, CONVERTED_DUMP).unwrap();

        let model = GbdtModel::load_xgboost_dump(&path, "reg:linear", 3).unwrap();
        assert_eq!(model.n_features(), 3);

        let batch = FeatureBatch::from_rows(vec![vec![0.0, 0.0, 0.0], vec![0.0, 0.0, 1.0]]).unwrap();
        let predictions = model.predict(&batch).unwrap();
        assert_eq!(predictions.len(), 2);
        assert!(predictions.iter().all(|p| p.is_finite()));
        assert!(predictions[0] < predictions[1]);
    }

    #[test]
    fn dump_splitting_beyond_n_features_fails_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("xgb.dump");
        fs::write(&path, CONVERTED_DUMP).unwrap();

        let err = GbdtModel::load_xgboost_dump(&path, "reg:linear", 1).err().unwrap();
        assert!(format!("{:#}", err).contains("f2"));
        assert!(GbdtModel::load_xgboost_dump(&path, "reg:linear", 2).is_err());
    }

    #[test]
    fn raw_text_dump_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raw.dump");
        fs::write(
            &path,
            "booster[0]:\n0:[f2<0.5] yes=1,no=2,missing=1\n\t1:leaf=0.1\n\t2:leaf=0.9\n",
        )
        .unwrap();
        assert!(GbdtModel::load_xgboost_dump(&path, "reg:linear", 3).is_err());
    }
}
