//! Persistence gateways for exercises, users and workouts.
//! Each resource has an async trait plus two implementations: PostgreSQL via sqlx,
//! and an in-memory table used by tests and as a fallback when the database is unreachable.

use std::sync::Arc;

use sqlx::PgPool;

use crate::models::AppError;

mod memory;
pub mod exercise;
pub mod user;
pub mod workout;

pub use exercise::{ExerciseRepository, InMemoryExerciseRepository, PostgresExerciseRepository};
pub use user::{InMemoryUserRepository, PostgresUserRepository, UserRepository};
pub use workout::{InMemoryWorkoutRepository, PostgresWorkoutRepository, WorkoutRepository};

/// One gateway per resource, built together so they share a backend.
#[derive(Clone)]
pub struct Repositories {
    pub exercises: Arc<dyn ExerciseRepository>,
    pub users: Arc<dyn UserRepository>,
    pub workouts: Arc<dyn WorkoutRepository>,
}

/// Factory for repositories; selects between drivers at startup.
#[derive(Debug, Clone)]
pub struct RepositoryFactory;

impl RepositoryFactory {
    pub fn postgres(pool: PgPool) -> Repositories {
        Repositories {
            exercises: Arc::new(PostgresExerciseRepository::new(pool.clone())),
            users: Arc::new(PostgresUserRepository::new(pool.clone())),
            workouts: Arc::new(PostgresWorkoutRepository::new(pool)),
        }
    }

    pub fn in_memory() -> Repositories {
        Repositories {
            exercises: Arc::new(InMemoryExerciseRepository::new()),
            users: Arc::new(InMemoryUserRepository::new()),
            workouts: Arc::new(InMemoryWorkoutRepository::new()),
        }
    }
}

const SCHEMA: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS exercises (
        id BIGSERIAL PRIMARY KEY,
        name TEXT NOT NULL,
        "type" TEXT NOT NULL,
        muscle TEXT NOT NULL,
        equipment TEXT NOT NULL,
        difficulty TEXT NOT NULL,
        instructions TEXT NOT NULL
    )"#,
    "CREATE INDEX IF NOT EXISTS exercises_name_idx ON exercises (name)",
    r#"CREATE TABLE IF NOT EXISTS users (
        id BIGSERIAL PRIMARY KEY,
        name TEXT NOT NULL,
        email TEXT NOT NULL,
        password TEXT NOT NULL
    )"#,
    "CREATE UNIQUE INDEX IF NOT EXISTS users_email_key ON users (lower(email))",
    r#"CREATE TABLE IF NOT EXISTS workout (
        id BIGSERIAL PRIMARY KEY,
        user_id TEXT NOT NULL,
        workout_plan_name TEXT NOT NULL,
        exercise_name TEXT NOT NULL,
        day TEXT NOT NULL,
        sets INTEGER NOT NULL CHECK (sets >= 0),
        reps INTEGER NOT NULL CHECK (reps >= 0),
        CONSTRAINT uk_plan_user_name UNIQUE (user_id, workout_plan_name, exercise_name, day)
    )"#,
];

/// Creates the tables and indexes when they are missing. Existing tables are left untouched.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), AppError> {
    for ddl in SCHEMA {
        sqlx::query(ddl).execute(pool).await?;
    }
    Ok(())
}

/// Maps a unique-constraint violation to the given conflict; anything else is a repository error.
pub(crate) fn conflict_on_unique(conflict: fn() -> AppError) -> impl Fn(sqlx::Error) -> AppError {
    move |e| match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => conflict(),
        _ => AppError::Repo(e.to_string()),
    }
}
