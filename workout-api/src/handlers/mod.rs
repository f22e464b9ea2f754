//! HTTP surface: shared state, the router, and one handler module per resource.

use std::sync::Arc;

use axum::{
    extract::{FromRequest, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};

use crate::{
    models::AppError,
    repository::{ExerciseRepository, Repositories, UserRepository, WorkoutRepository},
};

pub mod exercises;
pub mod users;
pub mod workouts;

/// JSON body extractor whose rejections (bad syntax, wrong content type) surface as a 400 `AppError`.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

#[derive(Clone)]
pub struct AppState {
    pub exercises: Arc<dyn ExerciseRepository>,
    pub users: Arc<dyn UserRepository>,
    pub workouts: Arc<dyn WorkoutRepository>,
    /// `None` when running on the in-memory store.
    pub db: Option<sqlx::PgPool>,
}

impl AppState {
    pub fn new(repos: Repositories, db: Option<sqlx::PgPool>) -> Self {
        Self { exercises: repos.exercises, users: repos.users, workouts: repos.workouts, db }
    }
}

pub fn app(state: AppState) -> Router {
    let user_routes = Router::new()
        .route("/", get(users::list).post(users::create))
        .route("/:id", get(users::get_one).put(users::update).delete(users::delete));

    // Segments sharing a position share a parameter name; handlers extract by position.
    let workout_routes = Router::new()
        .route("/", get(workouts::list))
        .route("/add-exercise", post(workouts::add_exercise))
        .route("/:id", get(workouts::get_by_id))
        .route("/:id/:plan/exercises", get(workouts::exercises_for_day))
        .route("/delete/:id", delete(workouts::delete_by_id))
        .route("/delete/:id/:plan", delete(workouts::delete_by_user_and_plan));

    Router::new()
        .route("/exercises", get(exercises::list).post(exercises::create))
        .route(
            "/exercises/:key",
            get(exercises::find_by_name).put(exercises::update).delete(exercises::delete),
        )
        .route("/exercise", get(exercises::list).post(exercises::create))
        .route("/exercise/:key", delete(exercises::delete))
        .nest("/api/users", user_routes)
        .nest("/api/workout", workout_routes)
        .route("/healthz", get(health))
        .with_state(state)
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let Some(ref pool) = state.db else {
        return (StatusCode::OK, Json(serde_json::json!({ "status": "ok", "storage": "memory" })));
    };
    if sqlx::query("SELECT 1").fetch_one(pool).await.is_ok() {
        (StatusCode::OK, Json(serde_json::json!({ "status": "ok", "storage": "postgres" })))
    } else {
        tracing::warn!("health probe failed: postgres unreachable");
        (StatusCode::SERVICE_UNAVAILABLE, Json(serde_json::json!({ "status": "degraded", "storage": "postgres" })))
    }
}
