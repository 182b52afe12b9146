use crate::error::PredictError;
use crate::features::FeatureBatch;

/// A loaded model artifact. Implementations are immutable after loading, so a
/// single instance is shared by every request handler.
pub trait Predictor: Send + Sync {
    /// Score every row of `batch`, returning one output per row in row order.
    /// Implementations reject batches whose width differs from `n_features`.
    fn predict(&self, batch: &FeatureBatch) -> Result<Vec<f64>, PredictError>;

    /// Input width the model was trained on.
    fn n_features(&self) -> usize;

    /// Short artifact kind, e.g. "gbdt".
    fn kind(&self) -> &str;
}
