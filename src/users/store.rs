use async_trait::async_trait;
use thiserror::Error;

use crate::pagination::{Page, PageRequest};
use crate::users::repo_types::{NewUser, User, UserChanges};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("user {0} not found")]
    NotFound(i64),

    #[error("email already exists")]
    EmailTaken,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Owns User persistence and the email uniqueness invariant.
///
/// Every mutation is atomic: it is either fully applied or not at all.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create(&self, new_user: NewUser) -> Result<User, StoreError>;

    async fn get(&self, id: i64) -> Result<User, StoreError>;

    /// Applies only the fields present in `changes` and refreshes
    /// `updated_at`. An empty change set returns the record untouched.
    async fn update(&self, id: i64, changes: UserChanges) -> Result<User, StoreError>;

    async fn delete(&self, id: i64) -> Result<(), StoreError>;

    /// Users ordered by id, sliced to the requested page. Count and slice
    /// come from the same snapshot.
    async fn list(&self, req: PageRequest) -> Result<Page<User>, StoreError>;

    async fn close(&self) {}
}
