use axum::extract::State;
use chrono::Utc;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::auth::Principal;
use crate::errors::AppError;
use crate::jobs::views::{expand_applications, JobDetail, JobSummary};
use crate::models::job::{Job, JobPatch, NewJob};
use crate::response::{ApiResponse, PathParams, ValidJson};
use crate::state::AppState;
use crate::store::{self, ParentDocument};

/// POST /jobs
pub async fn handle_create_job(
    State(state): State<AppState>,
    principal: Principal,
    ValidJson(req): ValidJson<NewJob>,
) -> Result<ApiResponse<JobSummary>, AppError> {
    principal.ensure_can_post_jobs()?;
    let job = req.into_job(principal.id, Utc::now())?;
    store::insert_document(state.store(), &job).await?;
    info!("Employer {} posted job {}", principal.id, job.id);
    Ok(ApiResponse::created(JobSummary::from(&job)).with_message("Job posted"))
}

/// GET /jobs
///
/// Public listing, newest first. Applications are never included.
pub async fn handle_list_jobs(
    State(state): State<AppState>,
) -> Result<ApiResponse<Vec<JobSummary>>, AppError> {
    let jobs: Vec<Job> = store::find_all(state.store(), json!({})).await?;
    Ok(ApiResponse::ok(jobs.iter().map(JobSummary::from).collect()))
}

/// GET /jobs/mine
///
/// Every posting owned by the caller, each with its applications expanded.
pub async fn handle_my_jobs(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<ApiResponse<Vec<JobDetail>>, AppError> {
    let jobs: Vec<Job> =
        store::find_all(state.store(), json!({ "employerId": principal.id })).await?;
    let mut details = Vec::with_capacity(jobs.len());
    for job in &jobs {
        details.push(expand_applications(state.store(), job).await?);
    }
    Ok(ApiResponse::ok(details))
}

/// GET /jobs/:id
///
/// The owning employer sees applications; everyone else gets the summary.
pub async fn handle_get_job(
    State(state): State<AppState>,
    principal: Principal,
    PathParams(job_id): PathParams<Uuid>,
) -> Result<ApiResponse<Value>, AppError> {
    let job: Job = store::load(state.store(), job_id).await?;
    let body = if job.employer_id == principal.id {
        serde_json::to_value(expand_applications(state.store(), &job).await?)?
    } else {
        serde_json::to_value(JobSummary::from(&job))?
    };
    Ok(ApiResponse::ok(body))
}

/// PUT /jobs/:id
pub async fn handle_update_job(
    State(state): State<AppState>,
    principal: Principal,
    PathParams(job_id): PathParams<Uuid>,
    ValidJson(patch): ValidJson<JobPatch>,
) -> Result<ApiResponse<JobSummary>, AppError> {
    let (job, ()) = store::modify::<Job, (), _>(state.store(), job_id, |job| {
        principal.ensure_job_manager(job.employer_id)?;
        patch.apply(job)
    })
    .await?;
    info!("Updated job {job_id}");
    Ok(ApiResponse::ok(JobSummary::from(&job)).with_message("Job updated"))
}

/// DELETE /jobs/:id
///
/// Deletes the posting together with its embedded applications.
pub async fn handle_delete_job(
    State(state): State<AppState>,
    principal: Principal,
    PathParams(job_id): PathParams<Uuid>,
) -> Result<ApiResponse<Value>, AppError> {
    let job: Job = store::load(state.store(), job_id).await?;
    principal.ensure_job_manager(job.employer_id)?;
    if !state.store().delete(Job::COLLECTION, job_id).await? {
        return Err(store::not_found::<Job>(job_id));
    }
    info!("Deleted job {job_id}");
    Ok(ApiResponse::ok(json!({ "id": job_id })).with_message("Job deleted"))
}
