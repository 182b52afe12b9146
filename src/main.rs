use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command, ValueHint};
use log::LevelFilter;
use std::path::PathBuf;

use predict_server::batch::{predict_batch, read_feature_csv, write_predictions, DEFAULT_CHUNK_ROWS};
use predict_server::config::ServerConfig;
use predict_server::registry::ModelRegistry;
use predict_server::server;

fn config_arg() -> Arg {
    Arg::new("config")
        .help("Path to the server JSON configuration file. Defaults serve model1.json and model2.json.")
        .required(false)
        .value_parser(clap::value_parser!(PathBuf))
        .value_hint(ValueHint::FilePath)
}

fn main() -> Result<()> {
    env_logger::Builder::default()
        .filter_level(LevelFilter::Error)
        .parse_env(env_logger::Env::default().filter_or("PREDICT_SERVER_LOG", "error,predict_server=info"))
        .init();

    let matches = Command::new("predict-server")
        .version(clap::crate_version!())
        .about("Serve pre-trained predictive models over HTTP")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("serve")
                .about("Load the configured models and serve POST /predict/<model>")
                .arg(config_arg())
                .arg(
                    Arg::new("bind")
                        .short('b')
                        .long("bind")
                        .help("Address to listen on, e.g. 0.0.0.0:8000. Overrides bind_address in the config.")
                        .value_parser(clap::builder::NonEmptyStringValueParser::new())
                        .value_hint(ValueHint::Other),
                )
                .arg(
                    Arg::new("model")
                        .short('m')
                        .long("model")
                        .help("Serve the artifact at PATH under NAME (NAME=PATH). May be repeated.")
                        .action(ArgAction::Append)
                        .value_parser(clap::builder::NonEmptyStringValueParser::new())
                        .value_hint(ValueHint::Other),
                ),
        )
        .subcommand(
            Command::new("predict")
                .about("Score a CSV/TSV file of feature rows with one configured model")
                .arg(config_arg())
                .arg(
                    Arg::new("model_name")
                        .short('m')
                        .long("model")
                        .help("Name of the configured model to use")
                        .required(true)
                        .value_parser(clap::builder::NonEmptyStringValueParser::new())
                        .value_hint(ValueHint::Other),
                )
                .arg(
                    Arg::new("input")
                        .short('i')
                        .long("input")
                        .help("Path to the feature rows (*.csv or *.tsv)")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("output_file")
                        .short('o')
                        .long("output")
                        .help("Path to write predictions (CSV). Defaults to stdout.")
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("no_header")
                        .long("no-header")
                        .help("The input file has no header row.")
                        .action(ArgAction::SetTrue),
                ),
        )
        .get_matches();

    match matches.subcommand() {
        Some(("serve", sub_m)) => handle_serve(sub_m),
        Some(("predict", sub_m)) => handle_predict(sub_m),
        _ => unreachable!("Subcommand is required by CLI configuration"),
    }
}

fn load_config(matches: &ArgMatches) -> Result<ServerConfig> {
    let config_path = matches.get_one::<PathBuf>("config");
    match config_path {
        Some(path) => log::info!("[PredictServer] Using config: {:?}", path),
        None => log::info!("[PredictServer] No config provided; using defaults."),
    }

    let config = ServerConfig::from_arguments(config_path, matches)?;
    if config_path.is_none() {
        let default_json = serde_json::to_string_pretty(&config).unwrap_or_default();
        log::info!("[PredictServer] Effective config:\n{}", default_json);
    }
    Ok(config)
}

fn handle_serve(matches: &ArgMatches) -> Result<()> {
    let config = load_config(matches)?;

    let runtime = tokio::runtime::Runtime::new()?;
    match runtime.block_on(server::serve(&config)) {
        Ok(_) => Ok(()),
        Err(e) => {
            log::error!("Server failed: {:#}", e);
            std::process::exit(1)
        }
    }
}

fn handle_predict(matches: &ArgMatches) -> Result<()> {
    let mut config = load_config(matches)?;
    let model_name = matches
        .get_one::<String>("model_name")
        .map(String::as_str)
        .unwrap_or_default();
    let input: &PathBuf = matches
        .get_one("input")
        .ok_or_else(|| anyhow::anyhow!("--input is required"))?;
    let output = matches.get_one::<PathBuf>("output_file");

    // Only the requested model needs to load.
    config.models.retain(|m| m.name == model_name);
    if config.models.is_empty() {
        anyhow::bail!("Model '{}' is not configured", model_name);
    }
    let registry = ModelRegistry::load(&config)?;
    let model = registry.get(model_name)?;

    let batch = read_feature_csv(input, !matches.get_flag("no_header"))?;
    let predictions = predict_batch(model.as_ref(), &batch, DEFAULT_CHUNK_ROWS)?;
    write_predictions(output.map(PathBuf::as_path), model_name, &predictions)?;

    log::info!(
        "[PredictServer::Batch] Completed {} predictions with '{}'.",
        predictions.len(),
        model_name
    );
    Ok(())
}
