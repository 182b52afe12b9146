use anyhow::{Context, Result};
use clap::ArgMatches;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// How a model artifact is laid out on disk.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
#[serde(tag = "format", rename_all = "snake_case")]
pub enum ModelFormat {
    /// A gbdt-rs model written by `GBDT::save_model`.
    #[default]
    Gbdt,
    /// An XGBoost JSON dump converted by gbdt-rs's `convert_xgboost.py`: a
    /// base-score line, then the tree array. Raw `booster[0]:` text dumps are
    /// not accepted. The file carries neither the objective nor the input width.
    XgboostDump { objective: String, n_features: usize },
    /// Coefficients, intercept and link function as JSON.
    Linear,
}

impl ModelFormat {
    pub fn name(&self) -> &'static str {
        match self {
            ModelFormat::Gbdt => "gbdt",
            ModelFormat::XgboostDump { .. } => "xgboost_dump",
            ModelFormat::Linear => "linear",
        }
    }
}

/// One model served under `/predict/<name>`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ModelEntry {
    pub name: String,
    pub path: String,

    #[serde(flatten)]
    pub format: ModelFormat,
}

impl ModelEntry {
    pub fn new(name: &str, path: &str, format: ModelFormat) -> Self {
        Self {
            name: name.to_string(),
            path: path.to_string(),
            format,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ServerConfig {
    pub version: String,
    pub bind_address: String,
    pub models: Vec<ModelEntry>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            version: clap::crate_version!().to_string(),
            bind_address: String::from("127.0.0.1:8000"),
            models: vec![
                ModelEntry::new("model1", "model1.json", ModelFormat::Gbdt),
                ModelEntry::new("model2", "model2.json", ModelFormat::Gbdt),
            ],
        }
    }
}

/// Strictly parse a server config: every field must be present and valid.
pub fn load_server_config<P: AsRef<Path>>(path: P) -> Result<ServerConfig> {
    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config: {}", path.as_ref().display()))?;
    let config: ServerConfig = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config: {}", path.as_ref().display()))?;
    Ok(config)
}

/// Split a `NAME=PATH` command-line override.
pub fn parse_model_override(value: &str) -> Result<(String, String)> {
    match value.split_once('=') {
        Some((name, path)) if !name.is_empty() && !path.is_empty() => {
            Ok((name.to_string(), path.to_string()))
        }
        _ => anyhow::bail!("Model override must look like NAME=PATH, got: {}", value),
    }
}

fn is_path_safe(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
}

impl ServerConfig {
    /// Leniently load `config_path`, then apply command-line overrides.
    /// A missing field, or an invalid `bind_address`, falls back to the default
    /// with a warning. An invalid `models` list is an error: defaulting it would
    /// serve different artifacts than the ones configured.
    pub fn from_arguments(config_path: Option<&PathBuf>, matches: &ArgMatches) -> Result<Self> {
        let mut config = ServerConfig::default();

        if let Some(config_path) = config_path {
            let config_json = fs::read_to_string(config_path)
                .with_context(|| format!("Failed to read config file: {:?}", config_path))?;
            let partial: serde_json::Value = serde_json::from_str(&config_json)
                .with_context(|| format!("Failed to parse config file: {:?}", config_path))?;

            macro_rules! load_or_default {
                ($field:ident) => {
                    if let Some(val) = partial.get(stringify!($field)) {
                        if let Ok(parsed) = serde_json::from_value(val.clone()) {
                            config.$field = parsed;
                        } else {
                            log::warn!(
                                "Config Invalid value for '{}', using default: {:?}",
                                stringify!($field), config.$field
                            );
                        }
                    } else {
                        log::warn!(
                            "Config Missing field '{}', using default: {:?}",
                            stringify!($field), config.$field
                        );
                    }
                };
            }

            load_or_default!(bind_address);
            match partial.get("models") {
                Some(val) => {
                    config.models = serde_json::from_value(val.clone()).with_context(|| {
                        format!("Invalid 'models' in config file: {:?}", config_path)
                    })?;
                }
                None => log::warn!(
                    "Config Missing field 'models', using default: {:?}",
                    config.models
                ),
            }
        }

        if let Some(bind) = matches.try_get_one::<String>("bind").ok().flatten() {
            config.bind_address = bind.clone();
        }
        if let Some(overrides) = matches.try_get_many::<String>("model").ok().flatten() {
            for value in overrides {
                let (name, path) = parse_model_override(value)?;
                config.set_model_path(&name, &path);
            }
        }

        Ok(config)
    }

    /// Point `name` at a new artifact, keeping its format if it is already configured.
    pub fn set_model_path(&mut self, name: &str, path: &str) {
        match self.models.iter_mut().find(|m| m.name == name) {
            Some(entry) => entry.path = path.to_string(),
            None => self
                .models
                .push(ModelEntry::new(name, path, ModelFormat::default())),
        }
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.bind_address
            .parse()
            .with_context(|| format!("Invalid bind address: {}", self.bind_address))
    }

    pub fn validate(&self) -> Result<()> {
        if self.models.is_empty() {
            anyhow::bail!("At least one model must be configured");
        }

        let mut seen = HashSet::new();
        for entry in &self.models {
            if !is_path_safe(&entry.name) {
                anyhow::bail!(
                    "Model name '{}' may only contain ASCII letters, digits, '-', '_' and '.'",
                    entry.name
                );
            }
            if !seen.insert(entry.name.as_str()) {
                anyhow::bail!("Model '{}' is configured more than once", entry.name);
            }
        }

        self.socket_addr()?;
        Ok(())
    }
}
