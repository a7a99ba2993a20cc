//! HTTP request handlers.

use axum::{
    extract::{rejection::JsonRejection, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use super::server::AppState;
use crate::error::Error;
use crate::watson::PatientData;

/// Body of `POST /chat`.
#[derive(Debug, Deserialize)]
pub struct ChatBody {
    #[serde(default)]
    pub message: Option<String>,
}

/// Body of `POST /predict`.
#[derive(Debug, Deserialize)]
pub struct PredictBody {
    #[serde(default)]
    pub symptoms: Option<String>,
    #[serde(default, rename = "patientData")]
    pub patient_data: Option<PatientData>,
}

fn read_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, Error> {
    payload.map(|Json(body)| body).map_err(|rejection| {
        tracing::warn!(error = %rejection.body_text(), "Rejected request body");
        Error::InvalidBody(rejection.body_text())
    })
}

/// Handle POST /chat
pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatBody>, JsonRejection>,
) -> Result<Json<serde_json::Value>, Error> {
    let body = read_body(payload)?;
    let message = body.message.unwrap_or_default();

    tracing::info!(message_len = message.len(), "Received chat request");

    let response = state.watson.chat(&message).await?;
    Ok(Json(response))
}

/// Handle POST /predict
pub async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<PredictBody>, JsonRejection>,
) -> Result<Json<serde_json::Value>, Error> {
    let body = read_body(payload)?;
    let symptoms = body.symptoms.unwrap_or_default();
    let patient = body.patient_data.unwrap_or_default();

    tracing::info!(symptoms_len = symptoms.len(), "Received prediction request");

    let prediction = state.watson.predict(&symptoms, &patient).await?;
    Ok(Json(serde_json::json!({ "prediction": prediction })))
}

/// Handle GET /health
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "medrelay"
    }))
}
