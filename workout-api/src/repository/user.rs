use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, Row};
use tokio::sync::RwLock;

use super::{conflict_on_unique, memory::MemoryTable};
use crate::models::{emails_match, AppError, NewUser, User};

/// Email comparisons ignore case (Unicode lowercase) in every implementation.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with `Conflict` when the email is already taken.
    async fn create(&self, user: NewUser) -> Result<User, AppError>;
    async fn find_by_id(&self, id: i64) -> Result<User, AppError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
    async fn exists_by_email(&self, email: &str) -> Result<bool, AppError>;
    async fn list(&self) -> Result<Vec<User>, AppError>;
    /// Fails with `NotFound` for a missing id and `Conflict` when another user owns the email.
    async fn update(&self, user: User) -> Result<User, AppError>;
    async fn delete(&self, id: i64) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct PostgresUserRepository { pub pool: PgPool }

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

fn user_from_row(row: &PgRow) -> User {
    User {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        password: row.get("password"),
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn create(&self, user: NewUser) -> Result<User, AppError> {
        let row = sqlx::query(
            r#"INSERT INTO users (name, email, password)
               VALUES ($1, $2, $3)
               RETURNING id, name, email, password"#,
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password)
        .fetch_one(&self.pool)
        .await
        .map_err(conflict_on_unique(AppError::email_taken))?;
        Ok(user_from_row(&row))
    }

    async fn find_by_id(&self, id: i64) -> Result<User, AppError> {
        let row = sqlx::query("SELECT id, name, email, password FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(AppError::user_not_found)?;
        Ok(user_from_row(&row))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query("SELECT id, name, email, password FROM users WHERE lower(email) = lower($1)")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(user_from_row))
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool, AppError> {
        let row = sqlx::query("SELECT EXISTS (SELECT 1 FROM users WHERE lower(email) = lower($1))")
            .bind(email)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get::<bool, _>(0))
    }

    async fn list(&self) -> Result<Vec<User>, AppError> {
        let rows = sqlx::query("SELECT id, name, email, password FROM users ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(user_from_row).collect())
    }

    async fn update(&self, user: User) -> Result<User, AppError> {
        let row = sqlx::query(
            r#"UPDATE users SET name = $2, email = $3, password = $4
               WHERE id = $1
               RETURNING id, name, email, password"#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password)
        .fetch_optional(&self.pool)
        .await
        .map_err(conflict_on_unique(AppError::email_taken))?
        .ok_or_else(AppError::user_not_found)?;
        Ok(user_from_row(&row))
    }

    async fn delete(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 { return Err(AppError::user_not_found()); }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryUserRepository { inner: Arc<RwLock<MemoryTable<User>>> }

impl InMemoryUserRepository {
    pub fn new() -> Self { Self::default() }
}

fn email_owned_by_other(table: &MemoryTable<User>, email: &str, id: Option<i64>) -> bool {
    table.rows().any(|u| Some(u.id) != id && emails_match(&u.email, email))
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: NewUser) -> Result<User, AppError> {
        let mut table = self.inner.write().await;
        if email_owned_by_other(&table, &user.email, None) {
            return Err(AppError::email_taken());
        }
        Ok(table.insert_with(|id| User { id, name: user.name, email: user.email, password: user.password }))
    }

    async fn find_by_id(&self, id: i64) -> Result<User, AppError> {
        let table = self.inner.read().await;
        table.get(id).cloned().ok_or_else(AppError::user_not_found)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let table = self.inner.read().await;
        let found = table.rows().find(|u| emails_match(&u.email, email)).cloned();
        Ok(found)
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool, AppError> {
        let table = self.inner.read().await;
        Ok(email_owned_by_other(&table, email, None))
    }

    async fn list(&self) -> Result<Vec<User>, AppError> {
        let table = self.inner.read().await;
        Ok(table.rows().cloned().collect())
    }

    async fn update(&self, user: User) -> Result<User, AppError> {
        let mut table = self.inner.write().await;
        if table.get(user.id).is_none() {
            return Err(AppError::user_not_found());
        }
        if email_owned_by_other(&table, &user.email, Some(user.id)) {
            return Err(AppError::email_taken());
        }
        let row = table.get_mut(user.id).ok_or_else(AppError::user_not_found)?;
        *row = user.clone();
        Ok(user)
    }

    async fn delete(&self, id: i64) -> Result<(), AppError> {
        let mut table = self.inner.write().await;
        table.remove(id).ok_or_else(AppError::user_not_found)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(name: &str, email: &str) -> NewUser {
        NewUser { name: name.into(), email: email.into(), password: "pw".into() }
    }

    #[tokio::test]
    async fn in_memory_enforces_case_insensitive_email_uniqueness() {
        let repo = InMemoryUserRepository::new();
        let kass = repo.create(new_user("Kass", "kass@example.com")).await.unwrap();
        assert_eq!(kass.id, 1);

        let dup = repo.create(new_user("Other", "KASS@example.com")).await;
        assert!(matches!(dup, Err(AppError::Conflict(_))));
        assert_eq!(repo.list().await.unwrap().len(), 1);

        assert!(repo.exists_by_email("Kass@Example.com").await.unwrap());
        let found = repo.find_by_email("KASS@EXAMPLE.COM").await.unwrap().unwrap();
        assert_eq!(found.id, kass.id);
    }

    #[tokio::test]
    async fn in_memory_update_and_delete() {
        let repo = InMemoryUserRepository::new();
        let a = repo.create(new_user("A", "a@example.com")).await.unwrap();
        let b = repo.create(new_user("B", "b@example.com")).await.unwrap();

        let stolen = User { email: "A@example.com".into(), ..b.clone() };
        assert!(matches!(repo.update(stolen).await, Err(AppError::Conflict(_))));

        let recased = User { email: "A@EXAMPLE.com".into(), ..a.clone() };
        assert_eq!(repo.update(recased).await.unwrap().email, "A@EXAMPLE.com");

        let ghost = User { id: 77, ..a.clone() };
        assert!(matches!(repo.update(ghost).await, Err(AppError::NotFound(_))));

        repo.delete(b.id).await.unwrap();
        assert!(matches!(repo.delete(b.id).await, Err(AppError::NotFound(_))));
        assert!(matches!(repo.find_by_id(b.id).await, Err(AppError::NotFound(_))));
        assert_eq!(repo.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn in_memory_folds_non_ascii_email_case() {
        let repo = InMemoryUserRepository::new();
        let elodie = repo.create(new_user("Élodie", "ÉLODIE@example.com")).await.unwrap();

        let dup = repo.create(new_user("Other", "élodie@example.com")).await;
        assert!(matches!(dup, Err(AppError::Conflict(_))));
        assert!(repo.exists_by_email("Élodie@Example.com").await.unwrap());
        let found = repo.find_by_email("élodie@EXAMPLE.com").await.unwrap().unwrap();
        assert_eq!(found.id, elodie.id);
    }
}
