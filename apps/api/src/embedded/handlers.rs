//! HTTP surface for embedded collections.
//!
//! `/users/:id/:kind[/:item_id]` and `/jobs/:id/:kind[/:item_id]` resolve the
//! kind segment and hand off to the generic mutator.

use axum::extract::State;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use super::{mutator, EmbeddedItem, Kind, Presentable};
use crate::auth::Principal;
use crate::errors::AppError;
use crate::models::job::Application;
use crate::models::profile::{
    Accomplishment, Certification, Education, Employment, ItSkill, Project,
};
use crate::response::{decode_body, ApiResponse, PathParams, ValidJson};
use crate::state::AppState;
use crate::store::Collection;

/// Calls `$op::<Item>(args..)` for the item type behind `$kind`.
macro_rules! for_kind {
    ($kind:expr, $op:ident ( $($arg:expr),* $(,)? )) => {
        match $kind {
            Kind::Employments => $op::<Employment>($($arg),*).await,
            Kind::Educations => $op::<Education>($($arg),*).await,
            Kind::ItSkills => $op::<ItSkill>($($arg),*).await,
            Kind::Projects => $op::<Project>($($arg),*).await,
            Kind::Accomplishments => $op::<Accomplishment>($($arg),*).await,
            Kind::Certifications => $op::<Certification>($($arg),*).await,
            Kind::Applications => $op::<Application>($($arg),*).await,
        }
    };
}

async fn append_as<K: EmbeddedItem>(
    state: &AppState,
    principal: Principal,
    parent_id: Uuid,
    body: Value,
) -> Result<Value, AppError> {
    let draft = decode_body::<K::Draft>(body)?;
    let (parent, _) = mutator::append::<K>(state.store(), principal, parent_id, draft).await?;
    parent.present(state.store(), &principal).await
}

async fn patch_as<K: EmbeddedItem>(
    state: &AppState,
    principal: Principal,
    parent_id: Uuid,
    item_id: Uuid,
    body: Value,
) -> Result<Value, AppError> {
    let patch = decode_body::<K::Patch>(body)?;
    let (parent, _) =
        mutator::patch::<K>(state.store(), principal, parent_id, item_id, patch).await?;
    parent.present(state.store(), &principal).await
}

async fn remove_as<K: EmbeddedItem>(
    state: &AppState,
    principal: Principal,
    parent_id: Uuid,
    item_id: Uuid,
) -> Result<Value, AppError> {
    let (parent, _) = mutator::remove::<K>(state.store(), principal, parent_id, item_id).await?;
    parent.present(state.store(), &principal).await
}

async fn append_item(
    state: &AppState,
    principal: Principal,
    collection: Collection,
    (parent_id, kind): (Uuid, String),
    body: Value,
) -> Result<ApiResponse<Value>, AppError> {
    let kind = Kind::within(collection, &kind)?;
    let parent = for_kind!(kind, append_as(state, principal, parent_id, body))?;
    Ok(ApiResponse::created(parent).with_message(format!("Added {kind} entry")))
}

async fn patch_item(
    state: &AppState,
    principal: Principal,
    collection: Collection,
    (parent_id, kind, item_id): (Uuid, String, Uuid),
    body: Value,
) -> Result<ApiResponse<Value>, AppError> {
    let kind = Kind::within(collection, &kind)?;
    let parent = for_kind!(kind, patch_as(state, principal, parent_id, item_id, body))?;
    Ok(ApiResponse::ok(parent).with_message(format!("Updated {kind} entry")))
}

async fn remove_item(
    state: &AppState,
    principal: Principal,
    collection: Collection,
    (parent_id, kind, item_id): (Uuid, String, Uuid),
) -> Result<ApiResponse<Value>, AppError> {
    let kind = Kind::within(collection, &kind)?;
    let parent = for_kind!(kind, remove_as(state, principal, parent_id, item_id))?;
    Ok(ApiResponse::ok(parent).with_message(format!("Removed {kind} entry")))
}

/// POST /users/:id/:kind
pub async fn handle_append_user_item(
    State(state): State<AppState>,
    principal: Principal,
    PathParams(path): PathParams<(Uuid, String)>,
    ValidJson(body): ValidJson<Value>,
) -> Result<ApiResponse<Value>, AppError> {
    append_item(&state, principal, Collection::Users, path, body).await
}

/// PUT /users/:id/:kind/:item_id
pub async fn handle_patch_user_item(
    State(state): State<AppState>,
    principal: Principal,
    PathParams(path): PathParams<(Uuid, String, Uuid)>,
    ValidJson(body): ValidJson<Value>,
) -> Result<ApiResponse<Value>, AppError> {
    patch_item(&state, principal, Collection::Users, path, body).await
}

/// DELETE /users/:id/:kind/:item_id
pub async fn handle_remove_user_item(
    State(state): State<AppState>,
    principal: Principal,
    PathParams(path): PathParams<(Uuid, String, Uuid)>,
) -> Result<ApiResponse<Value>, AppError> {
    remove_item(&state, principal, Collection::Users, path).await
}

/// POST /jobs/:id/:kind
pub async fn handle_append_job_item(
    State(state): State<AppState>,
    principal: Principal,
    PathParams(path): PathParams<(Uuid, String)>,
    ValidJson(body): ValidJson<Value>,
) -> Result<ApiResponse<Value>, AppError> {
    append_item(&state, principal, Collection::Jobs, path, body).await
}

/// PUT /jobs/:id/:kind/:item_id
pub async fn handle_patch_job_item(
    State(state): State<AppState>,
    principal: Principal,
    PathParams(path): PathParams<(Uuid, String, Uuid)>,
    ValidJson(body): ValidJson<Value>,
) -> Result<ApiResponse<Value>, AppError> {
    patch_item(&state, principal, Collection::Jobs, path, body).await
}

/// DELETE /jobs/:id/:kind/:item_id
pub async fn handle_remove_job_item(
    State(state): State<AppState>,
    principal: Principal,
    PathParams(path): PathParams<(Uuid, String, Uuid)>,
) -> Result<ApiResponse<Value>, AppError> {
    remove_item(&state, principal, Collection::Jobs, path).await
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StatusChange {
    pub status: String,
}

/// PUT /applications/:application_id
pub async fn handle_update_application_status(
    State(state): State<AppState>,
    principal: Principal,
    PathParams(application_id): PathParams<Uuid>,
    ValidJson(req): ValidJson<StatusChange>,
) -> Result<ApiResponse<Application>, AppError> {
    let application = mutator::transition_application_status(
        state.store(),
        principal,
        application_id,
        &req.status,
    )
    .await?;
    let message = format!("Application {}", application.status);
    Ok(ApiResponse::ok(application).with_message(message))
}
