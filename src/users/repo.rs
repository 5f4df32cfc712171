use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;

use crate::pagination::{Page, PageRequest};
use crate::users::repo_types::{NewUser, User, UserChanges};
use crate::users::store::{StoreError, UserStore};

const USER_COLUMNS: &str =
    "id, first_name, last_name, email, phone_number, created_at, updated_at";

/// Postgres-backed store. Uniqueness comes from the `users_email_key`
/// constraint; writes run in a transaction that rolls back on drop.
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn write_error(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::EmailTaken,
        _ => StoreError::Database(err),
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create(&self, new_user: NewUser) -> Result<User, StoreError> {
        let mut tx = self.pool.begin().await?;
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (first_name, last_name, email, phone_number)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&new_user.first_name)
        .bind(&new_user.last_name)
        .bind(&new_user.email)
        .bind(&new_user.phone_number)
        .fetch_one(&mut *tx)
        .await
        .map_err(write_error)?;
        tx.commit().await.map_err(write_error)?;

        debug!(user_id = user.id, "user row inserted");
        Ok(user)
    }

    async fn get(&self, id: i64) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound(id))
    }

    async fn update(&self, id: i64, changes: UserChanges) -> Result<User, StoreError> {
        if changes.is_empty() {
            return self.get(id).await;
        }

        let set_phone = changes.phone_number.is_some();
        let phone_number = changes.phone_number.flatten();

        let mut tx = self.pool.begin().await?;
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
               SET first_name   = COALESCE($2, first_name),
                   last_name    = COALESCE($3, last_name),
                   email        = COALESCE($4, email),
                   phone_number = CASE WHEN $5 THEN $6 ELSE phone_number END,
                   updated_at   = GREATEST(now(), updated_at + INTERVAL '1 microsecond')
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(changes.first_name)
        .bind(changes.last_name)
        .bind(changes.email)
        .bind(set_phone)
        .bind(phone_number)
        .fetch_optional(&mut *tx)
        .await
        .map_err(write_error)?
        .ok_or(StoreError::NotFound(id))?;
        tx.commit().await.map_err(write_error)?;

        debug!(user_id = id, "user row updated");
        Ok(user)
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        tx.commit().await?;

        debug!(user_id = id, "user row deleted");
        Ok(())
    }

    async fn list(&self, req: PageRequest) -> Result<Page<User>, StoreError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&mut *tx)
            .await?;
        let items = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS}
              FROM users
             ORDER BY id ASC
             LIMIT $1 OFFSET $2
            "#
        ))
        .bind(req.limit())
        .bind(req.offset())
        .fetch_all(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(Page::new(items, total, req))
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
