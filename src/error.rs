use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::types::ErrorResponse;

/// Failures raised by a loaded classifier while scoring a matrix.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("tensor error: {0}")]
    Tensor(#[from] candle_core::Error),

    #[error("X has {got} features, but {model} is expecting {expected} features as input")]
    FeatureCount {
        got: usize,
        expected: usize,
        model: String,
    },

    #[error("model returned no probability rows")]
    EmptyOutput,

    #[error("index {index} is out of bounds for a model with {n_classes} classes")]
    MissingClass { index: usize, n_classes: usize },
}

/// Everything that can go wrong in a single `/predict_pcos` request.
/// Every variant is reported as 400 with its message.
#[derive(Error, Debug)]
pub enum PredictError {
    #[error("invalid request body: {0}")]
    InvalidBody(String),

    #[error("missing 'features' field")]
    MissingFeatures,

    #[error("features{path} is not a number")]
    NotNumeric { path: String },

    #[error("features must be a rectangular array of numbers")]
    Ragged,

    #[error("X has {got} features, but {model} is expecting {expected} features as input")]
    FeatureCount {
        got: usize,
        expected: usize,
        model: String,
    },

    #[error("risk percentage is not a finite number")]
    NonFinite,

    #[error(transparent)]
    Model(#[from] ModelError),
}

impl IntoResponse for PredictError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.to_string(),
        });
        (StatusCode::BAD_REQUEST, body).into_response()
    }
}
