use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::Principal;
use crate::embedded::{require_text, Access, EmbeddedItem, ItemContext, Kind};
use crate::errors::AppError;
use crate::store::{Collection, ParentDocument};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EmploymentType {
    FullTime,
    PartTime,
    Contract,
    Internship,
    Temporary,
}

/// Job posting document. Applications are embedded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: Uuid,
    pub employer_id: Uuid,
    pub title: String,
    pub company: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employment_type: Option<EmploymentType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salary_min: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salary_max: Option<u32>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub applications: Vec<Application>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ParentDocument for Job {
    const COLLECTION: Collection = Collection::Jobs;

    fn id(&self) -> Uuid {
        self.id
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

impl Job {
    fn validate(&self) -> Result<(), AppError> {
        require_text("title", &self.title)?;
        require_text("company", &self.company)?;
        if let (Some(min), Some(max)) = (self.salary_min, self.salary_max) {
            if min > max {
                return Err(AppError::Validation(
                    "salaryMin cannot exceed salaryMax".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewJob {
    pub title: String,
    pub company: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub employment_type: Option<EmploymentType>,
    #[serde(default)]
    pub salary_min: Option<u32>,
    #[serde(default)]
    pub salary_max: Option<u32>,
    #[serde(default)]
    pub skills: Vec<String>,
}

impl NewJob {
    pub fn into_job(self, employer_id: Uuid, now: DateTime<Utc>) -> Result<Job, AppError> {
        let job = Job {
            id: Uuid::new_v4(),
            employer_id,
            title: self.title.trim().to_string(),
            company: self.company.trim().to_string(),
            location: self.location,
            description: self.description,
            employment_type: self.employment_type,
            salary_min: self.salary_min,
            salary_max: self.salary_max,
            skills: self.skills,
            applications: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        job.validate()?;
        Ok(job)
    }
}

/// Top-level posting fields. Applications are only reachable through the
/// embedded-collection operations.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct JobPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub employment_type: Option<EmploymentType>,
    #[serde(default)]
    pub salary_min: Option<u32>,
    #[serde(default)]
    pub salary_max: Option<u32>,
    #[serde(default)]
    pub skills: Option<Vec<String>>,
}

impl JobPatch {
    /// Merges into `job`, leaving it untouched if the result is invalid.
    pub fn apply(self, job: &mut Job) -> Result<(), AppError> {
        let mut next = job.clone();
        if let Some(title) = self.title {
            next.title = title.trim().to_string();
        }
        if let Some(company) = self.company {
            next.company = company.trim().to_string();
        }
        if self.location.is_some() {
            next.location = self.location;
        }
        if self.description.is_some() {
            next.description = self.description;
        }
        if self.employment_type.is_some() {
            next.employment_type = self.employment_type;
        }
        if self.salary_min.is_some() {
            next.salary_min = self.salary_min;
        }
        if self.salary_max.is_some() {
            next.salary_max = self.salary_max;
        }
        if let Some(skills) = self.skills {
            next.skills = skills;
        }
        next.validate()?;
        *job = next;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Pending,
    Accepted,
    Rejected,
}

impl ApplicationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Accepted => "accepted",
            ApplicationStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = AppError;

    /// Exact, lowercase match only.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ApplicationStatus::Pending),
            "accepted" => Ok(ApplicationStatus::Accepted),
            "rejected" => Ok(ApplicationStatus::Rejected),
            other => Err(AppError::Validation(format!(
                "Invalid status '{other}': must be one of pending, accepted, rejected"
            ))),
        }
    }
}

/// A candidate's application, embedded in the job it targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: Uuid,
    pub applicant_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_letter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_url: Option<String>,
    pub status: ApplicationStatus,
    pub applied_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ApplicationDraft {
    #[serde(default)]
    pub cover_letter: Option<String>,
    #[serde(default)]
    pub resume_url: Option<String>,
}

/// What an applicant may edit. Status changes go through the status transition.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ApplicationPatch {
    #[serde(default)]
    pub cover_letter: Option<String>,
    #[serde(default)]
    pub resume_url: Option<String>,
}

impl EmbeddedItem for Application {
    type Parent = Job;
    type Draft = ApplicationDraft;
    type Patch = ApplicationPatch;

    const KIND: Kind = Kind::Applications;

    fn id(&self) -> Uuid {
        self.id
    }

    fn items(parent: &Job) -> &[Self] {
        &parent.applications
    }

    fn items_mut(parent: &mut Job) -> &mut Vec<Self> {
        &mut parent.applications
    }

    fn from_draft(id: Uuid, draft: ApplicationDraft, ctx: &ItemContext) -> Self {
        Self {
            id,
            applicant_id: ctx.principal.id,
            cover_letter: draft.cover_letter,
            resume_url: draft.resume_url,
            status: ApplicationStatus::Pending,
            applied_at: ctx.now,
            updated_at: ctx.now,
        }
    }

    fn apply_patch(&mut self, patch: ApplicationPatch, ctx: &ItemContext) {
        if patch.cover_letter.is_some() {
            self.cover_letter = patch.cover_letter;
        }
        if patch.resume_url.is_some() {
            self.resume_url = patch.resume_url;
        }
        self.updated_at = ctx.now;
    }

    fn validate(&self) -> Result<(), AppError> {
        Ok(())
    }

    fn guard(
        parent: &Job,
        principal: &Principal,
        access: Access,
        target: Option<&Self>,
    ) -> Result<(), AppError> {
        match access {
            Access::Append => {
                if parent.employer_id == principal.id {
                    return Err(AppError::Forbidden(
                        "You cannot apply to your own job posting".to_string(),
                    ));
                }
                if parent
                    .applications
                    .iter()
                    .any(|a| a.applicant_id == principal.id)
                {
                    return Err(AppError::Conflict(
                        "You have already applied to this job".to_string(),
                    ));
                }
                Ok(())
            }
            Access::Patch | Access::Remove => match target {
                Some(application)
                    if application.applicant_id != principal.id && !principal.is_admin() =>
                {
                    Err(AppError::Forbidden(
                        "Only the applicant can change this application".to_string(),
                    ))
                }
                _ => Ok(()),
            },
        }
    }
}
