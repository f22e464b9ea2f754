use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, Row};
use tokio::sync::RwLock;

use super::memory::MemoryTable;
use crate::models::{AppError, Exercise, ExerciseFields};

#[async_trait]
pub trait ExerciseRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<Exercise>, AppError>;
    /// Exact, case-sensitive name match. Empty when nothing matches.
    async fn find_by_name(&self, name: &str) -> Result<Vec<Exercise>, AppError>;
    async fn create(&self, fields: ExerciseFields) -> Result<Exercise, AppError>;
    /// Overwrites every field of row `id`. `None` when the row does not exist.
    async fn update(&self, id: i64, fields: &ExerciseFields) -> Result<Option<Exercise>, AppError>;
    /// Removing a missing id is not an error.
    async fn delete(&self, id: i64) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct PostgresExerciseRepository { pub pool: PgPool }

impl PostgresExerciseRepository {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

const COLUMNS: &str = r#"id, name, "type", muscle, equipment, difficulty, instructions"#;

fn exercise_from_row(row: &PgRow) -> Exercise {
    Exercise {
        id: row.get("id"),
        name: row.get("name"),
        kind: row.get("type"),
        muscle: row.get("muscle"),
        equipment: row.get("equipment"),
        difficulty: row.get("difficulty"),
        instructions: row.get("instructions"),
    }
}

#[async_trait]
impl ExerciseRepository for PostgresExerciseRepository {
    async fn list(&self) -> Result<Vec<Exercise>, AppError> {
        let rows = sqlx::query(&format!("SELECT {} FROM exercises ORDER BY id", COLUMNS))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(exercise_from_row).collect())
    }

    async fn find_by_name(&self, name: &str) -> Result<Vec<Exercise>, AppError> {
        let rows = sqlx::query(&format!("SELECT {} FROM exercises WHERE name = $1 ORDER BY id", COLUMNS))
            .bind(name)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(exercise_from_row).collect())
    }

    async fn create(&self, fields: ExerciseFields) -> Result<Exercise, AppError> {
        let row = sqlx::query(&format!(
            r#"INSERT INTO exercises (name, "type", muscle, equipment, difficulty, instructions)
               VALUES ($1, $2, $3, $4, $5, $6)
               RETURNING {}"#,
            COLUMNS
        ))
        .bind(&fields.name)
        .bind(&fields.kind)
        .bind(&fields.muscle)
        .bind(&fields.equipment)
        .bind(&fields.difficulty)
        .bind(&fields.instructions)
        .fetch_one(&self.pool)
        .await?;
        Ok(exercise_from_row(&row))
    }

    async fn update(&self, id: i64, fields: &ExerciseFields) -> Result<Option<Exercise>, AppError> {
        let row = sqlx::query(&format!(
            r#"UPDATE exercises
               SET name = $2, "type" = $3, muscle = $4, equipment = $5, difficulty = $6, instructions = $7
               WHERE id = $1
               RETURNING {}"#,
            COLUMNS
        ))
        .bind(id)
        .bind(&fields.name)
        .bind(&fields.kind)
        .bind(&fields.muscle)
        .bind(&fields.equipment)
        .bind(&fields.difficulty)
        .bind(&fields.instructions)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(exercise_from_row))
    }

    async fn delete(&self, id: i64) -> Result<(), AppError> {
        sqlx::query("DELETE FROM exercises WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryExerciseRepository { inner: Arc<RwLock<MemoryTable<Exercise>>> }

impl InMemoryExerciseRepository {
    pub fn new() -> Self { Self::default() }
}

#[async_trait]
impl ExerciseRepository for InMemoryExerciseRepository {
    async fn list(&self) -> Result<Vec<Exercise>, AppError> {
        let table = self.inner.read().await;
        Ok(table.rows().cloned().collect())
    }

    async fn find_by_name(&self, name: &str) -> Result<Vec<Exercise>, AppError> {
        let table = self.inner.read().await;
        Ok(table.filter(|e| e.name == name))
    }

    async fn create(&self, fields: ExerciseFields) -> Result<Exercise, AppError> {
        let mut table = self.inner.write().await;
        Ok(table.insert_with(|id| fields.into_exercise(id)))
    }

    async fn update(&self, id: i64, fields: &ExerciseFields) -> Result<Option<Exercise>, AppError> {
        let mut table = self.inner.write().await;
        Ok(table.get_mut(id).map(|row| {
            *row = fields.clone().into_exercise(id);
            row.clone()
        }))
    }

    async fn delete(&self, id: i64) -> Result<(), AppError> {
        let mut table = self.inner.write().await;
        table.remove(id);
        Ok(())
    }
}
