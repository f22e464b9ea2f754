use axum::{extract::{Path, State}, http::StatusCode, Json};
use serde_json::Value;

use super::{AppJson, AppState};
use crate::models::{AppError, Exercise, ExerciseFields};

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Exercise>>, AppError> {
    Ok(Json(state.exercises.list().await?))
}

pub async fn find_by_name(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Vec<Exercise>>, AppError> {
    Ok(Json(state.exercises.find_by_name(&name).await?))
}

pub async fn create(
    State(state): State<AppState>,
    AppJson(body): AppJson<Value>,
) -> Result<Json<Exercise>, AppError> {
    let fields = ExerciseFields::from_body(&body)?;
    let exercise = state.exercises.create(fields).await?;
    tracing::info!(id = exercise.id, name = %exercise.name, "exercise created");
    Ok(Json(exercise))
}

/// Overwrites every field of the exercise. An unknown id inserts the payload as a new row
/// under a freshly generated id instead of failing.
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    AppJson(body): AppJson<Value>,
) -> Result<Json<Exercise>, AppError> {
    let fields = ExerciseFields::from_body(&body)?;
    if let Some(exercise) = state.exercises.update(id, &fields).await? {
        tracing::info!(id, "exercise updated");
        return Ok(Json(exercise));
    }
    let exercise = state.exercises.create(fields).await?;
    tracing::info!(requested = id, id = exercise.id, "exercise missing; inserted as new row");
    Ok(Json(exercise))
}

pub async fn delete(State(state): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode, AppError> {
    state.exercises.delete(id).await?;
    tracing::info!(id, "exercise deleted");
    Ok(StatusCode::OK)
}
