//! Dense feature batches handed to models.
//!
//! A request carries a single feature vector, but models score row-major
//! batches so the same call serves both the HTTP path (a one-row batch) and
//! offline CSV scoring.
use crate::error::PredictError;

#[derive(Clone, Debug, PartialEq)]
pub struct FeatureBatch {
    data: Vec<f64>,
    rows: usize,
    cols: usize,
}

impl FeatureBatch {
    /// Wrap one feature vector as a single-row batch.
    pub fn from_vector(features: Vec<f64>) -> Result<Self, PredictError> {
        if features.is_empty() {
            return Err(PredictError::EmptyFeatures);
        }
        let cols = features.len();
        Ok(Self {
            data: features,
            rows: 1,
            cols,
        })
    }

    /// Build a batch from rows that must all share the width of the first row.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, PredictError> {
        let cols = match rows.first() {
            Some(first) if !first.is_empty() => first.len(),
            _ => return Err(PredictError::EmptyFeatures),
        };

        let mut data = Vec::with_capacity(rows.len() * cols);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != cols {
                return Err(PredictError::RaggedRows {
                    row: i,
                    expected: cols,
                    got: row.len(),
                });
            }
            data.extend_from_slice(row);
        }

        Ok(Self {
            data,
            rows: rows.len(),
            cols,
        })
    }

    pub fn nrows(&self) -> usize {
        self.rows
    }

    pub fn ncols(&self) -> usize {
        self.cols
    }

    pub fn row(&self, row: usize) -> &[f64] {
        let start = row * self.cols;
        &self.data[start..start + self.cols]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> + '_ {
        self.data.chunks(self.cols)
    }

    /// Split into consecutive sub-batches of at most `max_rows` rows, in order.
    pub fn chunks(&self, max_rows: usize) -> Vec<FeatureBatch> {
        let step = max_rows.max(1) * self.cols;
        self.data
            .chunks(step)
            .map(|slice| FeatureBatch {
                data: slice.to_vec(),
                rows: slice.len() / self.cols,
                cols: self.cols,
            })
            .collect()
    }

    /// Check the batch width against what a model was trained on.
    pub fn ensure_width(&self, expected: usize) -> Result<(), PredictError> {
        if self.cols != expected {
            return Err(PredictError::FeatureCountMismatch {
                expected,
                got: self.cols,
            });
        }
        Ok(())
    }
}
