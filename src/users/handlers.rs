use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    errors::{AppError, AppResult},
    extract::JsonBody,
    pagination::{PageQuery, PageRequest},
    state::AppState,
    users::{
        dto::{CreateUserRequest, MessageResponse, UpdateUserRequest, UserListResponse},
        extractors::UserId,
        repo_types::User,
        store::StoreError,
    },
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<UserListResponse>> {
    let req = PageRequest::from(query);
    let page = state.store.list(req).await?;

    Ok(Json(UserListResponse {
        users: page.items,
        total: page.total,
        page: page.page,
        per_page: page.per_page,
        pages: page.pages,
    }))
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<User>)> {
    let new_user = payload.into_new_user().map_err(|e| {
        warn!(error = %e, "create user rejected");
        e
    })?;

    let user = match state.store.create(new_user).await {
        Ok(u) => u,
        Err(StoreError::EmailTaken) => {
            warn!("email already registered");
            return Err(StoreError::EmailTaken.into());
        }
        Err(e) => return Err(e.into()),
    };

    info!(user_id = user.id, "user created");
    Ok((StatusCode::CREATED, Json(user)))
}

#[instrument(skip(state))]
pub async fn get_user(State(state): State<AppState>, UserId(id): UserId) -> AppResult<Json<User>> {
    let user = state.store.get(id).await?;
    Ok(Json(user))
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    UserId(id): UserId,
    JsonBody(payload): JsonBody<UpdateUserRequest>,
) -> AppResult<Json<User>> {
    state.store.get(id).await?;

    let changes = payload.into_changes().map_err(|e| {
        warn!(error = %e, user_id = id, "update user rejected");
        e
    })?;

    let user = match state.store.update(id, changes).await {
        Ok(u) => u,
        Err(StoreError::EmailTaken) => {
            warn!(user_id = id, "email already registered");
            return Err(StoreError::EmailTaken.into());
        }
        Err(e) => return Err(e.into()),
    };

    info!(user_id = id, "user updated");
    Ok(Json(user))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    UserId(id): UserId,
) -> AppResult<Json<MessageResponse>> {
    match state.store.delete(id).await {
        Ok(()) => {
            info!(user_id = id, "user deleted");
            Ok(Json(MessageResponse {
                message: format!("User {id} deleted"),
            }))
        }
        Err(StoreError::NotFound(_)) => Err(AppError::user_not_found()),
        // the cause is logged when the error is rendered, never sent
        Err(e) => Err(AppError::internal("Failed to delete user", e)),
    }
}
