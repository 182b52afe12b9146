//! Shared fixtures: small artifacts written into a temp directory.
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use gbdt::config::Config;
use gbdt::decision_tree::{Data, DataVec};
use gbdt::gradient_boost::GBDT;
use predict_server::config::{ModelEntry, ModelFormat, ServerConfig};

/// Train a tiny 3-feature regression forest whose output rises with the first feature.
pub fn write_gbdt_model(dir: &Path, file: &str) -> PathBuf {
    let mut config = Config::new();
    config.set_feature_size(3);
    config.set_shrinkage(0.3);
    config.set_max_depth(3);
    config.set_iterations(10);
    config.set_debug(false);
    config.set_loss("SquaredError");

    let mut train_x = DataVec::new();
    for i in 0..30 {
        let x = i as f32;
        let label = if i < 15 { 1.0 } else { 5.0 };
        train_x.push(Data::new_training_data(vec![x, 0.5, -0.5], 1.0, label, None));
    }

    let mut gbdt = GBDT::new(&config);
    gbdt.fit(&mut train_x);

    let path = dir.join(file);
    gbdt.save_model(path.to_str().unwrap()).unwrap();
    path
}

/// A 2-feature identity linear model: `2*x0 - x1 + 0.5`.
pub fn write_linear_model(dir: &Path, file: &str) -> PathBuf {
    let path = dir.join(file);
    fs::write(
        &path,
        r#"{"coefficients": [2.0, -1.0], "intercept": 0.5, "link": "identity"}"#,
    )
    .unwrap();
    path
}

/// Default-shaped config: `model1` is gbdt, `model2` is linear.
pub fn two_model_config(dir: &Path) -> ServerConfig {
    let gbdt_path = write_gbdt_model(dir, "model1.json");
    let linear_path = write_linear_model(dir, "model2.json");
    ServerConfig {
        models: vec![
            ModelEntry::new("model1", gbdt_path.to_str().unwrap(), ModelFormat::Gbdt),
            ModelEntry::new("model2", linear_path.to_str().unwrap(), ModelFormat::Linear),
        ],
        ..ServerConfig::default()
    }
}

pub fn write_config(dir: &Path, config: &ServerConfig) -> PathBuf {
    let path = dir.join("server.json");
    fs::write(&path, serde_json::to_string_pretty(config).unwrap()).unwrap();
    path
}

/// An XGBoost model in the converted form gbdt-rs reads: base score, then the
/// JSON tree array. The single tree splits on `f2`.
pub fn write_xgboost_dump(dir: &Path, file: &str) -> PathBuf {
    let path = dir.join(file);
    fs::write(
        &path,
        concat!(
            "0.5\n",
            r#"[{"nodeid":0,"depth":0,"split":"f2","split_condition":0.5,"yes":1,"no":2,"missing":1,"#,
            r#""children":[{"nodeid":1,"leaf":0.1},{"nodeid":2,"leaf":0.9}]}]"#,
            "\n"
        ),
    )
    .unwrap();
    path
}
