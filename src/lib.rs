//! predict-server: serve pre-trained predictive models over HTTP.
//!
//! Model artifacts (gbdt-rs models, XGBoost dumps, or linear models as JSON)
//! are loaded once at startup into a read-only [`registry::ModelRegistry`].
//! Each request forwards a feature vector to one model and returns its
//! prediction. The same models can also score CSV/TSV files offline.
pub mod api;
pub mod batch;
pub mod config;
pub mod error;
pub mod features;
pub mod models;
pub mod registry;
pub mod server;
