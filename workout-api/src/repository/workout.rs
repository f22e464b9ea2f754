use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, Row};
use tokio::sync::RwLock;

use super::{conflict_on_unique, memory::MemoryTable};
use crate::models::{AppError, UpsertOutcome, Workout, WorkoutFields};

/// Rows are unique over (user, plan, exercise, day).
#[async_trait]
pub trait WorkoutRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<Workout>, AppError>;
    async fn find_by_id(&self, id: i64) -> Result<Workout, AppError>;
    async fn find_for_day(&self, user_id: &str, plan: &str, day: &str) -> Result<Vec<Workout>, AppError>;
    /// Upsert keyed by (user, plan, exercise): an existing row gets the new day, sets and reps;
    /// otherwise the fields are inserted as a new row. With several candidates the lowest id wins.
    async fn add_exercise(&self, fields: WorkoutFields) -> Result<UpsertOutcome, AppError>;
    async fn delete(&self, id: i64) -> Result<(), AppError>;
    /// Removes every row of the plan and returns how many were removed.
    async fn delete_by_user_and_plan(&self, user_id: &str, plan: &str) -> Result<u64, AppError>;
}

#[derive(Clone)]
pub struct PostgresWorkoutRepository { pub pool: PgPool }

impl PostgresWorkoutRepository {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

const COLUMNS: &str = "id, user_id, workout_plan_name, exercise_name, day, sets, reps";

fn workout_from_row(row: &PgRow) -> Workout {
    Workout {
        id: row.get("id"),
        user_id: row.get("user_id"),
        workout_plan_name: row.get("workout_plan_name"),
        exercise_name: row.get("exercise_name"),
        day: row.get("day"),
        sets: row.get("sets"),
        reps: row.get("reps"),
    }
}

#[async_trait]
impl WorkoutRepository for PostgresWorkoutRepository {
    async fn list(&self) -> Result<Vec<Workout>, AppError> {
        let rows = sqlx::query(&format!("SELECT {} FROM workout ORDER BY id", COLUMNS))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(workout_from_row).collect())
    }

    async fn find_by_id(&self, id: i64) -> Result<Workout, AppError> {
        let row = sqlx::query(&format!("SELECT {} FROM workout WHERE id = $1", COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::workout_not_found(id))?;
        Ok(workout_from_row(&row))
    }

    async fn find_for_day(&self, user_id: &str, plan: &str, day: &str) -> Result<Vec<Workout>, AppError> {
        let rows = sqlx::query(&format!(
            r#"SELECT {} FROM workout
               WHERE user_id = $1 AND workout_plan_name = $2 AND day = $3
               ORDER BY id"#,
            COLUMNS
        ))
        .bind(user_id)
        .bind(plan)
        .bind(day)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(workout_from_row).collect())
    }

    async fn add_exercise(&self, fields: WorkoutFields) -> Result<UpsertOutcome, AppError> {
        let mut tx = self.pool.begin().await?;
        let existing = sqlx::query(
            r#"SELECT id FROM workout
               WHERE user_id = $1 AND workout_plan_name = $2 AND exercise_name = $3
               ORDER BY id LIMIT 1
               FOR UPDATE"#,
        )
        .bind(&fields.user_id)
        .bind(&fields.workout_plan_name)
        .bind(&fields.exercise_name)
        .fetch_optional(&mut *tx)
        .await?;

        let outcome = match existing {
            Some(row) => {
                let id: i64 = row.get("id");
                let row = sqlx::query(&format!(
                    "UPDATE workout SET day = $2, sets = $3, reps = $4 WHERE id = $1 RETURNING {}",
                    COLUMNS
                ))
                .bind(id)
                .bind(&fields.day)
                .bind(fields.sets)
                .bind(fields.reps)
                .fetch_one(&mut *tx)
                .await
                .map_err(conflict_on_unique(AppError::workout_slot_taken))?;
                UpsertOutcome::Updated(workout_from_row(&row))
            }
            None => {
                let row = sqlx::query(&format!(
                    r#"INSERT INTO workout (user_id, workout_plan_name, exercise_name, day, sets, reps)
                       VALUES ($1, $2, $3, $4, $5, $6)
                       RETURNING {}"#,
                    COLUMNS
                ))
                .bind(&fields.user_id)
                .bind(&fields.workout_plan_name)
                .bind(&fields.exercise_name)
                .bind(&fields.day)
                .bind(fields.sets)
                .bind(fields.reps)
                .fetch_one(&mut *tx)
                .await
                .map_err(conflict_on_unique(AppError::workout_slot_taken))?;
                UpsertOutcome::Inserted(workout_from_row(&row))
            }
        };
        tx.commit().await?;
        Ok(outcome)
    }

    async fn delete(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM workout WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 { return Err(AppError::workout_not_found(id)); }
        Ok(())
    }

    async fn delete_by_user_and_plan(&self, user_id: &str, plan: &str) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM workout WHERE user_id = $1 AND workout_plan_name = $2")
            .bind(user_id)
            .bind(plan)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryWorkoutRepository { inner: Arc<RwLock<MemoryTable<Workout>>> }

impl InMemoryWorkoutRepository {
    pub fn new() -> Self { Self::default() }
}

#[async_trait]
impl WorkoutRepository for InMemoryWorkoutRepository {
    async fn list(&self) -> Result<Vec<Workout>, AppError> {
        let table = self.inner.read().await;
        Ok(table.rows().cloned().collect())
    }

    async fn find_by_id(&self, id: i64) -> Result<Workout, AppError> {
        let table = self.inner.read().await;
        table.get(id).cloned().ok_or_else(|| AppError::workout_not_found(id))
    }

    async fn find_for_day(&self, user_id: &str, plan: &str, day: &str) -> Result<Vec<Workout>, AppError> {
        let table = self.inner.read().await;
        Ok(table.filter(|w| w.user_id == user_id && w.workout_plan_name == plan && w.day == day))
    }

    async fn add_exercise(&self, fields: WorkoutFields) -> Result<UpsertOutcome, AppError> {
        let mut table = self.inner.write().await;
        let existing = table
            .rows()
            .find(|w| {
                w.user_id == fields.user_id
                    && w.workout_plan_name == fields.workout_plan_name
                    && w.exercise_name == fields.exercise_name
            })
            .map(|w| w.id);

        let Some(id) = existing else {
            return Ok(UpsertOutcome::Inserted(table.insert_with(|id| fields.into_workout(id))));
        };

        let slot_taken = table.rows().any(|w| {
            w.id != id
                && w.user_id == fields.user_id
                && w.workout_plan_name == fields.workout_plan_name
                && w.exercise_name == fields.exercise_name
                && w.day == fields.day
        });
        if slot_taken {
            return Err(AppError::workout_slot_taken());
        }

        let row = table.get_mut(id).ok_or_else(|| AppError::workout_not_found(id))?;
        row.day = fields.day;
        row.sets = fields.sets;
        row.reps = fields.reps;
        Ok(UpsertOutcome::Updated(row.clone()))
    }

    async fn delete(&self, id: i64) -> Result<(), AppError> {
        let mut table = self.inner.write().await;
        table.remove(id).ok_or_else(|| AppError::workout_not_found(id))?;
        Ok(())
    }

    async fn delete_by_user_and_plan(&self, user_id: &str, plan: &str) -> Result<u64, AppError> {
        let mut table = self.inner.write().await;
        Ok(table.remove_where(|w| w.user_id == user_id && w.workout_plan_name == plan))
    }
}
