//! HTTP endpoints.
//!
//! `POST /predict/:model` forwards the caller's feature vector to the named
//! model and returns its prediction. `GET /models` and `GET /health` describe
//! what was loaded at startup.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::PredictError;
use crate::features::FeatureBatch;
use crate::registry::{ModelInfo, ModelRegistry};

/// Body of `POST /predict/:model`.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct PredictRequest {
    pub features: Vec<f64>,
}

/// One prediction per input row; a single feature vector yields a one-element list.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct PredictResponse {
    pub model: String,
    pub prediction: Vec<f64>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize)]
pub struct ModelsResponse {
    pub models: Vec<ModelInfo>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub models: usize,
}

impl PredictError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            PredictError::UnknownModel(_) => StatusCode::NOT_FOUND,
            PredictError::EmptyFeatures
            | PredictError::FeatureCountMismatch { .. }
            | PredictError::RaggedRows { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            PredictError::Model(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for PredictError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("[PredictServer::Api] {}", self);
        } else {
            log::warn!("[PredictServer::Api] {}", self);
        }
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

pub fn router(registry: Arc<ModelRegistry>) -> Router {
    Router::new()
        .route("/predict/:model", post(predict))
        .route("/models", get(list_models))
        .route("/health", get(health))
        .with_state(registry)
}

async fn predict(
    State(registry): State<Arc<ModelRegistry>>,
    Path(name): Path<String>,
    Json(request): Json<PredictRequest>,
) -> Result<Json<PredictResponse>, PredictError> {
    let model = registry.get(&name)?;
    let batch = FeatureBatch::from_vector(request.features)?;
    log::debug!(
        "[PredictServer::Api] Predicting with '{}' on {} features",
        name,
        batch.ncols()
    );

    // Models are CPU-bound; keep them off the async workers.
    let prediction = tokio::task::spawn_blocking(move || model.predict(&batch))
        .await
        .map_err(|e| PredictError::Model(format!("prediction task failed: {}", e)))??;

    Ok(Json(PredictResponse {
        model: name,
        prediction,
    }))
}

async fn list_models(State(registry): State<Arc<ModelRegistry>>) -> Json<ModelsResponse> {
    Json(ModelsResponse {
        models: registry.describe(),
    })
}

async fn health(State(registry): State<Arc<ModelRegistry>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        models: registry.len(),
    })
}
