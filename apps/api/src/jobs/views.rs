//! Response shapes for job postings.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::auth::Principal;
use crate::embedded::Presentable;
use crate::errors::AppError;
use crate::models::job::{Application, EmploymentType, Job};
use crate::models::user::{User, UserSummary};
use crate::store::{self, DocumentStore};

/// Public view of a posting: no applications, only their count.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    pub id: Uuid,
    pub employer_id: Uuid,
    pub title: String,
    pub company: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employment_type: Option<EmploymentType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salary_min: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salary_max: Option<u32>,
    pub skills: Vec<String>,
    pub application_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Job> for JobSummary {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id,
            employer_id: job.employer_id,
            title: job.title.clone(),
            company: job.company.clone(),
            location: job.location.clone(),
            description: job.description.clone(),
            employment_type: job.employment_type,
            salary_min: job.salary_min,
            salary_max: job.salary_max,
            skills: job.skills.clone(),
            application_count: job.applications.len(),
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationView {
    #[serde(flatten)]
    pub application: Application,
    /// `None` when the applicant's account no longer exists.
    pub applicant: Option<UserSummary>,
}

/// Employer's view of a posting with each application's applicant expanded.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDetail {
    #[serde(flatten)]
    pub job: JobSummary,
    pub applications: Vec<ApplicationView>,
}

/// Employer's view: every application with its applicant expanded.
pub async fn expand_applications(
    store: &dyn DocumentStore,
    job: &Job,
) -> Result<JobDetail, AppError> {
    expand_matching(store, job, |_| true).await
}

async fn expand_matching(
    store: &dyn DocumentStore,
    job: &Job,
    keep: impl Fn(&Application) -> bool,
) -> Result<JobDetail, AppError> {
    let mut applications = Vec::new();
    for application in job.applications.iter().filter(|&a| keep(a)) {
        let applicant = match store::load::<User>(store, application.applicant_id).await {
            Ok(user) => Some(UserSummary::from(&user)),
            Err(AppError::NotFound(_)) => None,
            Err(e) => return Err(e),
        };
        applications.push(ApplicationView {
            application: application.clone(),
            applicant,
        });
    }

    Ok(JobDetail {
        job: JobSummary::from(job),
        applications,
    })
}

/// The owning employer sees every application; anyone else sees only their own.
#[async_trait]
impl Presentable for Job {
    async fn present(
        self,
        store: &dyn DocumentStore,
        viewer: &Principal,
    ) -> Result<Value, AppError> {
        let detail = if self.employer_id == viewer.id {
            expand_applications(store, &self).await?
        } else {
            let viewer_id = viewer.id;
            expand_matching(store, &self, |a| a.applicant_id == viewer_id).await?
        };
        Ok(serde_json::to_value(detail)?)
    }
}
