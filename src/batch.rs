//! Offline scoring of a CSV/TSV file of feature rows with one loaded model.
use anyhow::{Context, Result};
use rayon::prelude::*;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::error::PredictError;
use crate::features::FeatureBatch;
use crate::models::Predictor;

pub const DEFAULT_CHUNK_ROWS: usize = 1024;

fn delimiter_for(path: &Path) -> Result<u8> {
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_lowercase());
    match ext.as_deref() {
        Some("csv") => Ok(b','),
        Some("tsv") => Ok(b'\t'),
        _ => anyhow::bail!("File must have a .tsv or .csv extension: {}", path.display()),
    }
}

/// Read every record of `path` as one feature row. Each field must parse as a number.
pub fn read_feature_csv<P: AsRef<Path>>(path: P, has_headers: bool) -> Result<FeatureBatch> {
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter_for(path)?)
        .has_headers(has_headers)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to open input: {}", path.display()))?;

    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Failed to read row {} of {}", i, path.display()))?;
        let row = record
            .iter()
            .enumerate()
            .map(|(j, field)| {
                field.parse::<f64>().with_context(|| {
                    format!("Row {}, column {}: '{}' is not a number", i, j, field)
                })
            })
            .collect::<Result<Vec<f64>>>()?;
        rows.push(row);
    }

    log::info!(
        "[PredictServer::Batch] Read {} rows from {}",
        rows.len(),
        path.display()
    );
    FeatureBatch::from_rows(rows).with_context(|| format!("Invalid feature rows in {}", path.display()))
}

/// Score `batch` in chunks of `chunk_rows` spread across the rayon pool.
/// Output order matches input row order.
pub fn predict_batch(
    model: &dyn Predictor,
    batch: &FeatureBatch,
    chunk_rows: usize,
) -> Result<Vec<f64>, PredictError> {
    let scored = batch
        .chunks(chunk_rows)
        .par_iter()
        .map(|chunk| model.predict(chunk))
        .collect::<Result<Vec<Vec<f64>>, PredictError>>()?;
    Ok(scored.into_iter().flatten().collect())
}

/// Write `row,model,prediction` records to `output`, or stdout when absent.
pub fn write_predictions(
    output: Option<&Path>,
    model_name: &str,
    predictions: &[f64],
) -> Result<()> {
    let sink: Box<dyn Write> = match output {
        Some(path) => Box::new(
            File::create(path)
                .with_context(|| format!("Failed to create output: {}", path.display()))?,
        ),
        None => Box::new(io::stdout()),
    };

    let mut writer = csv::Writer::from_writer(sink);
    writer.write_record(["row", "model", "prediction"])?;
    for (i, prediction) in predictions.iter().enumerate() {
        writer.write_record([i.to_string(), model_name.to_string(), prediction.to_string()])?;
    }
    writer.flush()?;
    Ok(())
}
