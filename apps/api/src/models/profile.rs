//! Profile sections embedded in a user document.
//!
//! Each section is declared once through `profile_section!`, which produces
//! the stored record, its draft (append) and patch records, and the
//! `EmbeddedItem` impl. Cross-field rules live in `SectionRules`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::Principal;
use crate::embedded::{require_text, Access, EmbeddedItem, ItemContext, Kind};
use crate::errors::AppError;
use crate::models::user::User;

/// Cross-field checks beyond "required text is present".
pub trait SectionRules {
    fn check(&self) -> Result<(), AppError> {
        Ok(())
    }
}

macro_rules! profile_section {
    (
        $(#[$meta:meta])*
        $name:ident, $draft:ident, $patch:ident => Kind::$kind:ident in $field:ident {
            required { $($req:ident = $req_json:literal),* $(,)? }
            optional { $($opt:ident : $opt_ty:ty),* $(,)? }
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        #[serde(rename_all = "camelCase")]
        pub struct $name {
            pub id: Uuid,
            $(pub $req: String,)*
            $(
                #[serde(default, skip_serializing_if = "Option::is_none")]
                pub $opt: Option<$opt_ty>,
            )*
        }

        #[derive(Debug, Deserialize)]
        #[serde(rename_all = "camelCase", deny_unknown_fields)]
        pub struct $draft {
            $(pub $req: String,)*
            $(
                #[serde(default)]
                pub $opt: Option<$opt_ty>,
            )*
        }

        #[derive(Debug, Default, Deserialize)]
        #[serde(rename_all = "camelCase", deny_unknown_fields)]
        pub struct $patch {
            $(
                #[serde(default)]
                pub $req: Option<String>,
            )*
            $(
                #[serde(default)]
                pub $opt: Option<$opt_ty>,
            )*
        }

        impl EmbeddedItem for $name {
            type Parent = User;
            type Draft = $draft;
            type Patch = $patch;

            const KIND: Kind = Kind::$kind;

            fn id(&self) -> Uuid {
                self.id
            }

            fn items(parent: &User) -> &[Self] {
                &parent.$field
            }

            fn items_mut(parent: &mut User) -> &mut Vec<Self> {
                &mut parent.$field
            }

            fn from_draft(id: Uuid, draft: $draft, _ctx: &ItemContext) -> Self {
                Self {
                    id,
                    $($req: draft.$req.trim().to_string(),)*
                    $($opt: draft.$opt,)*
                }
            }

            fn apply_patch(&mut self, patch: $patch, _ctx: &ItemContext) {
                $(
                    if let Some(value) = patch.$req {
                        self.$req = value.trim().to_string();
                    }
                )*
                $(
                    if let Some(value) = patch.$opt {
                        self.$opt = Some(value);
                    }
                )*
            }

            fn validate(&self) -> Result<(), AppError> {
                $(require_text($req_json, &self.$req)?;)*
                SectionRules::check(self)
            }

            fn guard(
                parent: &User,
                principal: &Principal,
                _access: Access,
                _target: Option<&Self>,
            ) -> Result<(), AppError> {
                principal.ensure_user_owner(parent.id)
            }
        }
    };
}

profile_section! {
    /// A past or current job held by the user.
    Employment, EmploymentDraft, EmploymentPatch => Kind::Employments in employments {
        required { job_title = "jobTitle", company = "company" }
        optional {
            location: String,
            start_date: NaiveDate,
            end_date: NaiveDate,
            currently_working: bool,
            description: String,
        }
    }
}

profile_section! {
    Education, EducationDraft, EducationPatch => Kind::Educations in educations {
        required { institution = "institution", degree = "degree" }
        optional {
            field_of_study: String,
            start_year: i32,
            end_year: i32,
            grade: String,
        }
    }
}

profile_section! {
    ItSkill, ItSkillDraft, ItSkillPatch => Kind::ItSkills in it_skills {
        required { skill = "skill" }
        optional {
            version: String,
            last_used_year: i32,
            experience_years: u8,
            experience_months: u8,
        }
    }
}

profile_section! {
    Project, ProjectDraft, ProjectPatch => Kind::Projects in projects {
        required { title = "title" }
        optional {
            client: String,
            description: String,
            start_date: NaiveDate,
            end_date: NaiveDate,
            project_url: String,
            technologies: Vec<String>,
        }
    }
}

profile_section! {
    /// Awards, publications, patents and the like.
    Accomplishment, AccomplishmentDraft, AccomplishmentPatch => Kind::Accomplishments in accomplishments {
        required { title = "title" }
        optional {
            description: String,
            url: String,
            date: NaiveDate,
        }
    }
}

profile_section! {
    Certification, CertificationDraft, CertificationPatch => Kind::Certifications in certifications {
        required { name = "name" }
        optional {
            issuer: String,
            issue_date: NaiveDate,
            expiry_date: NaiveDate,
            credential_id: String,
            credential_url: String,
        }
    }
}

fn ensure_ordered<T: PartialOrd>(
    start: Option<T>,
    end: Option<T>,
    message: &str,
) -> Result<(), AppError> {
    match (start, end) {
        (Some(start), Some(end)) if end < start => Err(AppError::Validation(message.to_string())),
        _ => Ok(()),
    }
}

impl SectionRules for Employment {
    fn check(&self) -> Result<(), AppError> {
        ensure_ordered(
            self.start_date,
            self.end_date,
            "endDate cannot be before startDate",
        )
    }
}

impl SectionRules for Education {
    fn check(&self) -> Result<(), AppError> {
        ensure_ordered(
            self.start_year,
            self.end_year,
            "endYear cannot be before startYear",
        )
    }
}

impl SectionRules for ItSkill {
    fn check(&self) -> Result<(), AppError> {
        match self.experience_months {
            Some(months) if months > 11 => Err(AppError::Validation(
                "experienceMonths must be between 0 and 11".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

impl SectionRules for Project {
    fn check(&self) -> Result<(), AppError> {
        ensure_ordered(
            self.start_date,
            self.end_date,
            "endDate cannot be before startDate",
        )
    }
}

impl SectionRules for Accomplishment {}

impl SectionRules for Certification {
    fn check(&self) -> Result<(), AppError> {
        ensure_ordered(
            self.issue_date,
            self.expiry_date,
            "expiryDate cannot be before issueDate",
        )
    }
}
