use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::embedded::require_text;
use crate::errors::AppError;
use crate::models::profile::{
    Accomplishment, Certification, Education, Employment, ItSkill, Project,
};
use crate::store::{Collection, ParentDocument};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Jobseeker,
    Employer,
    Admin,
}

/// User document. Profile sections are embedded arrays.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default)]
    pub employments: Vec<Employment>,
    #[serde(default)]
    pub educations: Vec<Education>,
    #[serde(default)]
    pub it_skills: Vec<ItSkill>,
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub accomplishments: Vec<Accomplishment>,
    #[serde(default)]
    pub certifications: Vec<Certification>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ParentDocument for User {
    const COLLECTION: Collection = Collection::Users;

    fn id(&self) -> Uuid {
        self.id
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub headline: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
}

impl NewUser {
    /// Validates and normalizes a sign-up request. Emails are stored lowercased.
    pub fn into_user(self, now: DateTime<Utc>) -> Result<User, AppError> {
        require_text("name", &self.name)?;
        let email = normalize_email(&self.email)?;
        let role = self.role.unwrap_or(Role::Jobseeker);
        if role == Role::Admin {
            return Err(AppError::Validation(
                "role must be jobseeker or employer".to_string(),
            ));
        }

        Ok(User {
            id: Uuid::new_v4(),
            name: self.name.trim().to_string(),
            email,
            role,
            headline: self.headline,
            location: self.location,
            phone: self.phone,
            summary: self.summary,
            employments: Vec::new(),
            educations: Vec::new(),
            it_skills: Vec::new(),
            projects: Vec::new(),
            accomplishments: Vec::new(),
            certifications: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }
}

/// Top-level profile fields a user may change. Email and role are fixed.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UserPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub headline: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
}

impl UserPatch {
    pub fn apply(self, user: &mut User) -> Result<(), AppError> {
        if let Some(name) = &self.name {
            require_text("name", name)?;
        }
        if let Some(name) = self.name {
            user.name = name.trim().to_string();
        }
        if let Some(headline) = self.headline {
            user.headline = Some(headline);
        }
        if let Some(location) = self.location {
            user.location = Some(location);
        }
        if let Some(phone) = self.phone {
            user.phone = Some(phone);
        }
        if let Some(summary) = self.summary {
            user.summary = Some(summary);
        }
        Ok(())
    }
}

/// Reference shape used when another document points at a user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

fn normalize_email(raw: &str) -> Result<String, AppError> {
    let email = raw.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.contains('@'),
        None => false,
    };
    if valid {
        Ok(email)
    } else {
        Err(AppError::Validation(format!("'{raw}' is not a valid email")))
    }
}
