use axum::extract::State;
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::auth::Principal;
use crate::errors::AppError;
use crate::models::user::{NewUser, User, UserPatch};
use crate::response::{ApiResponse, PathParams, ValidJson};
use crate::state::AppState;
use crate::store::{self, ParentDocument};

#[derive(Debug, Serialize)]
pub struct AccountCreated {
    pub user: User,
    pub token: String,
}

/// POST /users
///
/// Creates an account and returns a bearer token for it.
pub async fn handle_create_user(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<NewUser>,
) -> Result<ApiResponse<AccountCreated>, AppError> {
    let user = req.into_user(Utc::now())?;

    let existing: Option<User> =
        store::find_one(state.store(), json!({ "email": user.email })).await?;
    if existing.is_some() {
        return Err(AppError::Conflict(format!(
            "An account with email {} already exists",
            user.email
        )));
    }

    store::insert_document(state.store(), &user).await?;
    let token = state.tokens.issue(user.id, user.role)?;
    info!("Created user {} ({:?})", user.id, user.role);

    Ok(ApiResponse::created(AccountCreated { user, token }).with_message("Account created"))
}

#[derive(Debug, Serialize)]
pub struct TokenRefreshed {
    pub token: String,
}

/// POST /users/me/token
///
/// Exchanges a still-valid token for a fresh one. The role is re-read from the
/// account, and deleted accounts get 404. An expired token cannot be renewed.
pub async fn handle_refresh_token(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<ApiResponse<TokenRefreshed>, AppError> {
    let user: User = store::load(state.store(), principal.id).await?;
    let token = state.tokens.issue(user.id, user.role)?;
    Ok(ApiResponse::ok(TokenRefreshed { token }).with_message("Token refreshed"))
}

/// GET /users/me
pub async fn handle_get_me(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<ApiResponse<User>, AppError> {
    let user: User = store::load(state.store(), principal.id).await?;
    Ok(ApiResponse::ok(user))
}

/// GET /users/:id
pub async fn handle_get_user(
    State(state): State<AppState>,
    _principal: Principal,
    PathParams(user_id): PathParams<Uuid>,
) -> Result<ApiResponse<User>, AppError> {
    let user: User = store::load(state.store(), user_id).await?;
    Ok(ApiResponse::ok(user))
}

/// PUT /users/:id
///
/// Updates top-level profile fields. Sections go through the embedded routes.
pub async fn handle_update_user(
    State(state): State<AppState>,
    principal: Principal,
    PathParams(user_id): PathParams<Uuid>,
    ValidJson(patch): ValidJson<UserPatch>,
) -> Result<ApiResponse<User>, AppError> {
    principal.ensure_user_owner(user_id)?;
    let (user, ()) = store::modify::<User, (), _>(state.store(), user_id, |user| patch.apply(user))
        .await?;
    info!("Updated profile of user {}", user.id());
    Ok(ApiResponse::ok(user).with_message("Profile updated"))
}

/// DELETE /users/:id
///
/// Removes the user document and every embedded section with it.
pub async fn handle_delete_user(
    State(state): State<AppState>,
    principal: Principal,
    PathParams(user_id): PathParams<Uuid>,
) -> Result<ApiResponse<serde_json::Value>, AppError> {
    principal.ensure_user_owner(user_id)?;
    if !state.store().delete(User::COLLECTION, user_id).await? {
        return Err(store::not_found::<User>(user_id));
    }
    info!("Deleted user {user_id}");
    Ok(ApiResponse::ok(json!({ "id": user_id })).with_message("Account deleted"))
}
