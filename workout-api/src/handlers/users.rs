use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};

use serde_json::Value;

use super::{AppJson, AppState};
use crate::models::{emails_match, AppError, CreateUserRequest, UpdateUserRequest, UserResponse};

/// Creates a user; 201 with a `Location` header and the masked user.
pub async fn create(
    State(state): State<AppState>,
    AppJson(body): AppJson<Value>,
) -> Result<impl IntoResponse, AppError> {
    let payload = CreateUserRequest::from_body(&body)?;
    if state.users.exists_by_email(&payload.email).await? {
        return Err(AppError::email_taken());
    }
    let user = state.users.create(payload.into()).await?;
    tracing::info!(id = user.id, "user created");
    let location = format!("/api/users/{}", user.id);
    Ok((StatusCode::CREATED, [(header::LOCATION, location)], Json(UserResponse::from(user))))
}

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<UserResponse>>, AppError> {
    let users = state.users.list().await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

pub async fn get_one(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<UserResponse>, AppError> {
    let user = state.users.find_by_id(id).await?;
    Ok(Json(UserResponse::from(user)))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    AppJson(body): AppJson<Value>,
) -> Result<Json<UserResponse>, AppError> {
    let payload = UpdateUserRequest::from_body(&body)?;
    let mut user = state.users.find_by_id(id).await?;

    if !emails_match(&user.email, &payload.email) {
        if let Some(owner) = state.users.find_by_email(&payload.email).await? {
            if owner.id != id {
                return Err(AppError::email_taken());
            }
        }
    }

    payload.apply_to(&mut user);
    let user = state.users.update(user).await?;
    tracing::info!(id, "user updated");
    Ok(Json(UserResponse::from(user)))
}

pub async fn delete(State(state): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode, AppError> {
    state.users.delete(id).await?;
    tracing::info!(id, "user deleted");
    Ok(StatusCode::NO_CONTENT)
}
