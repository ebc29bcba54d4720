//! Identifier-addressed operations on an embedded array, generic over kind.
//!
//! Each operation is one read-modify-write of the parent document: guard and
//! validation failures abort before anything is saved.

use chrono::Utc;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use super::{Access, EmbeddedItem, ItemContext};
use crate::auth::Principal;
use crate::errors::AppError;
use crate::models::job::{Application, ApplicationStatus, Job};
use crate::store::{self, DocumentStore};

fn item_not_found<K: EmbeddedItem>(item_id: Uuid) -> AppError {
    AppError::NotFound(format!("{} entry {item_id} not found", K::KIND))
}

/// A fresh id that no sibling already uses.
fn unused_id<K: EmbeddedItem>(siblings: &[K]) -> Uuid {
    loop {
        let id = Uuid::new_v4();
        if siblings.iter().all(|item| item.id() != id) {
            return id;
        }
    }
}

/// Appends a new item built from `draft`. Returns the saved parent and the new item.
pub async fn append<K: EmbeddedItem>(
    store: &dyn DocumentStore,
    principal: Principal,
    parent_id: Uuid,
    draft: K::Draft,
) -> Result<(K::Parent, K), AppError> {
    let (parent, item) = store::modify::<K::Parent, K, _>(store, parent_id, move |parent| {
        K::guard(parent, &principal, Access::Append, None)?;

        let ctx = ItemContext {
            principal,
            now: Utc::now(),
        };
        let item = K::from_draft(unused_id(K::items(parent)), draft, &ctx);
        item.validate()?;

        K::items_mut(parent).push(item.clone());
        Ok(item)
    })
    .await?;

    info!("Appended {} entry {} to {parent_id}", K::KIND, item.id());
    Ok((parent, item))
}

/// Merges `patch` into the item with `item_id`. Missing item is NotFound.
pub async fn patch<K: EmbeddedItem>(
    store: &dyn DocumentStore,
    principal: Principal,
    parent_id: Uuid,
    item_id: Uuid,
    patch: K::Patch,
) -> Result<(K::Parent, K), AppError> {
    let (parent, item) = store::modify::<K::Parent, K, _>(store, parent_id, move |parent| {
        let position = K::items(parent).iter().position(|item| item.id() == item_id);
        let target = position.and_then(|i| K::items(parent).get(i));
        K::guard(parent, &principal, Access::Patch, target)?;

        let mut updated = target.cloned().ok_or_else(|| item_not_found::<K>(item_id))?;
        let ctx = ItemContext {
            principal,
            now: Utc::now(),
        };
        updated.apply_patch(patch, &ctx);
        updated.validate()?;

        if let Some(slot) = position.and_then(|i| K::items_mut(parent).get_mut(i)) {
            *slot = updated.clone();
        }
        Ok(updated)
    })
    .await?;

    info!("Patched {} entry {item_id} on {parent_id}", K::KIND);
    Ok((parent, item))
}

/// Removes the item with `item_id`. An already-absent item is not an error.
/// Returns the saved parent and whether anything was removed.
pub async fn remove<K: EmbeddedItem>(
    store: &dyn DocumentStore,
    principal: Principal,
    parent_id: Uuid,
    item_id: Uuid,
) -> Result<(K::Parent, bool), AppError> {
    let (parent, removed) = store::modify::<K::Parent, bool, _>(store, parent_id, move |parent| {
        let target = K::items(parent).iter().find(|item| item.id() == item_id);
        K::guard(parent, &principal, Access::Remove, target)?;

        let items = K::items_mut(parent);
        let before = items.len();
        items.retain(|item| item.id() != item_id);
        Ok(items.len() != before)
    })
    .await?;

    if removed {
        info!("Removed {} entry {item_id} from {parent_id}", K::KIND);
    } else {
        info!("{} entry {item_id} already absent from {parent_id}", K::KIND);
    }
    Ok((parent, removed))
}

/// Sets the status of an application, addressed by its id alone. The owning
/// job is found by searching all jobs. Only that job's employer may do this.
///
/// Checks run in order: application exists, caller is the employer, status is
/// valid. All of them happen before anything is written.
pub async fn transition_application_status(
    store: &dyn DocumentStore,
    principal: Principal,
    application_id: Uuid,
    requested: &str,
) -> Result<Application, AppError> {
    let not_found = || AppError::NotFound(format!("Application {application_id} not found"));
    let job: Job = store::find_one(
        store,
        json!({ "applications": [{ "id": application_id }] }),
    )
    .await?
    .ok_or_else(not_found)?;
    principal.ensure_job_employer(job.employer_id)?;
    let status: ApplicationStatus = requested.parse()?;

    let (_, application) = store::modify::<Job, Application, _>(store, job.id, move |job| {
        principal.ensure_job_employer(job.employer_id)?;
        let application = job
            .applications
            .iter_mut()
            .find(|a| a.id == application_id)
            .ok_or_else(not_found)?;
        application.status = status;
        application.updated_at = Utc::now();
        Ok(application.clone())
    })
    .await?;

    info!(
        "Application {application_id} on job {} set to {status}",
        job.id
    );
    Ok(application)
}
