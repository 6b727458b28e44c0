//! Patient endpoint handlers.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use hospital_records_core::{Patient, RecordResult};
use serde_json::{json, Map, Value};

use super::error::{ApiError, ApiResult};
use super::AppState;

/// Run a store call on the blocking pool.
async fn blocking<T, F>(f: F) -> ApiResult<T>
where
    F: FnOnce() -> RecordResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(format!("Storage task failed: {}", e)))?
        .map_err(ApiError::from)
}

fn into_object(body: Result<Json<Value>, JsonRejection>) -> ApiResult<Map<String, Value>> {
    let Json(value) = body?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(ApiError::BadRequest(format!(
            "Invalid data format: expected a JSON object, got {}",
            other
        ))),
    }
}

// GET /health
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

// GET /patients
pub async fn list_patients(State(state): State<AppState>) -> ApiResult<Json<Vec<Patient>>> {
    let records = state.records.clone();
    let patients = blocking(move || records.list()).await?;
    Ok(Json(patients))
}

// GET /patients/:id
pub async fn get_patient(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Patient>> {
    let Path(id) = id?;
    let records = state.records.clone();
    let patient = blocking(move || records.get(id)).await?;
    Ok(Json(patient))
}

// POST /patients
pub async fn create_patient(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Patient>)> {
    let payload = into_object(body)?;
    let records = state.records.clone();
    let patient = blocking(move || records.create(&payload)).await?;
    tracing::info!(id = patient.id, "patient created");
    Ok((StatusCode::CREATED, Json(patient)))
}

// PUT /patients/:id
pub async fn update_patient(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Patient>> {
    let Path(id) = id?;
    let payload = into_object(body)?;
    let records = state.records.clone();
    let patient = blocking(move || records.update(id, &payload)).await?;
    tracing::info!(id, "patient updated");
    Ok(Json(patient))
}

// DELETE /patients/:id
pub async fn delete_patient(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = id?;
    let records = state.records.clone();
    blocking(move || records.delete(id)).await?;
    tracing::info!(id, "patient deleted");
    Ok(Json(json!({ "message": "Patient deleted" })))
}
