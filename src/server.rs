use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::{HeaderValue, Method},
    routing::{get, post},
};
use metrics::counter;
use serde_json::Value;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::classifier::{SharedClassifier, class_one_probability};
use crate::config::CorsPolicy;
use crate::error::PredictError;
use crate::features;
use crate::types::RiskResponse;

pub const LIVENESS_MESSAGE: &str = "PCOS Prediction API is running!";

#[derive(Clone)]
pub struct AppState {
    model: SharedClassifier,
}

impl AppState {
    pub fn new(model: SharedClassifier) -> Self {
        Self { model }
    }
}

/// Routes and middleware, without the process-global metrics layer.
pub fn router(state: AppState, cors: &CorsPolicy) -> anyhow::Result<Router> {
    Ok(Router::new()
        .route("/", get(home_handler))
        .route("/predict_pcos", post(predict_handler))
        .layer(cors_layer(cors)?)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

pub fn cors_layer(policy: &CorsPolicy) -> anyhow::Result<CorsLayer> {
    let layer = match policy {
        CorsPolicy::AnyOrigin => CorsLayer::permissive(),
        CorsPolicy::SingleOrigin(origin) => CorsLayer::new()
            .allow_origin([origin.parse::<HeaderValue>()?])
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(Any),
    };
    Ok(layer)
}

async fn home_handler() -> &'static str {
    LIVENESS_MESSAGE
}

#[tracing::instrument(skip(state, payload), fields(request_id = %uuid::Uuid::new_v4().simple()))]
async fn predict_handler(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<RiskResponse>, PredictError> {
    tracing::debug!("Received prediction request");

    match predict(&state, payload) {
        Ok(risk) => {
            counter!("risk_predictions_total", "outcome" => "ok").increment(1);
            tracing::info!(risk_percentage = risk, "Predicted PCOS risk");
            Ok(Json(RiskResponse {
                success: true,
                risk,
            }))
        }
        Err(err) => {
            counter!("risk_predictions_total", "outcome" => "error").increment(1);
            tracing::warn!(error = %err, "Prediction failed");
            Err(err)
        }
    }
}

fn predict(
    state: &AppState,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<i64, PredictError> {
    let Json(body) =
        payload.map_err(|rejection| PredictError::InvalidBody(rejection.body_text()))?;

    let model = &state.model;
    let matrix = features::validate(&body, model.n_features(), model.name())?;
    let probs = model.predict_proba(&matrix)?;
    let p = class_one_probability(&probs)?;

    risk_percentage(p)
}

/// Scales a probability to a whole percentage: round to two decimals, then
/// truncate toward zero.
pub fn risk_percentage(p: f64) -> Result<i64, PredictError> {
    let percent = p * 100.0;
    if !percent.is_finite() {
        return Err(PredictError::NonFinite);
    }
    // Formatting rounds the exact binary value half-to-even, so ties like
    // 0.125 resolve the same way a decimal round would.
    let rounded: f64 = format!("{percent:.2}")
        .parse()
        .map_err(|_| PredictError::NonFinite)?;
    Ok(rounded.trunc() as i64)
}
