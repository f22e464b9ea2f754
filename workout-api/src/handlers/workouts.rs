use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::Value;

use super::{AppJson, AppState};
use crate::models::{AppError, UpsertOutcome, Workout, WorkoutExercise, WorkoutFields};

#[derive(Debug, Deserialize)]
pub struct DayQuery {
    day: String,
}

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Workout>>, AppError> {
    Ok(Json(state.workouts.list().await?))
}

pub async fn get_by_id(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Workout>, AppError> {
    Ok(Json(state.workouts.find_by_id(id).await?))
}

pub async fn add_exercise(
    State(state): State<AppState>,
    AppJson(body): AppJson<Value>,
) -> Result<Json<Workout>, AppError> {
    let fields = WorkoutFields::from_body(&body)?;
    let workout = match state.workouts.add_exercise(fields).await? {
        UpsertOutcome::Inserted(w) => {
            tracing::info!(id = w.id, user_id = %w.user_id, plan = %w.workout_plan_name, "workout exercise added");
            w
        }
        UpsertOutcome::Updated(w) => {
            tracing::info!(id = w.id, day = %w.day, sets = w.sets, reps = w.reps, "workout exercise updated");
            w
        }
    };
    Ok(Json(workout))
}

pub async fn exercises_for_day(
    State(state): State<AppState>,
    Path((user_id, plan)): Path<(String, String)>,
    Query(query): Query<DayQuery>,
) -> Result<Json<Vec<WorkoutExercise>>, AppError> {
    let rows = state.workouts.find_for_day(&user_id, &plan, &query.day).await?;
    Ok(Json(rows.into_iter().map(WorkoutExercise::from).collect()))
}

pub async fn delete_by_id(State(state): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode, AppError> {
    state.workouts.delete(id).await?;
    tracing::info!(id, "workout deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_by_user_and_plan(
    State(state): State<AppState>,
    Path((user_id, plan)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    let removed = state.workouts.delete_by_user_and_plan(&user_id, &plan).await?;
    if removed == 0 {
        return Err(AppError::NotFound(format!("Workout plan not found: {}/{}", user_id, plan)));
    }
    tracing::info!(user_id = %user_id, plan = %plan, removed, "workout plan deleted");
    Ok(StatusCode::NO_CONTENT)
}
