use axum::{
    async_trait,
    extract::{FromRequestParts, Path},
    http::request::Parts,
};
use tracing::debug;

use crate::errors::AppError;

/// The `{id}` segment of `/users/{id}`. Anything that isn't an integer can't
/// name a user, so it is reported as not found rather than a bad request.
#[derive(Debug, Clone, Copy)]
pub struct UserId(pub i64);

#[async_trait]
impl<S> FromRequestParts<S> for UserId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<i64>::from_request_parts(parts, state)
            .await
            .map_err(|e| {
                debug!(error = %e, "non-integer user id");
                AppError::user_not_found()
            })?;
        Ok(UserId(id))
    }
}
