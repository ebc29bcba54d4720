//! Embedded collections: child items stored inside a parent document's array
//! field (profile sections on users, applications on jobs).
//!
//! Every kind is described once by an `EmbeddedItem` impl. `mutator` runs the
//! generic append / patch / remove cycle against any of them, and `handlers`
//! maps the kind segment of a URL onto the right impl.

pub mod handlers;
pub mod mutator;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::auth::Principal;
use crate::errors::AppError;
use crate::store::{Collection, DocumentStore, ParentDocument};

/// Name of an embedded array field. The string form is the JSON field name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Employments,
    Educations,
    ItSkills,
    Projects,
    Accomplishments,
    Certifications,
    Applications,
}

impl Kind {
    pub const ALL: [Kind; 7] = [
        Kind::Employments,
        Kind::Educations,
        Kind::ItSkills,
        Kind::Projects,
        Kind::Accomplishments,
        Kind::Certifications,
        Kind::Applications,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Kind::Employments => "employments",
            Kind::Educations => "educations",
            Kind::ItSkills => "itSkills",
            Kind::Projects => "projects",
            Kind::Accomplishments => "accomplishments",
            Kind::Certifications => "certifications",
            Kind::Applications => "applications",
        }
    }

    pub fn collection(self) -> Collection {
        match self {
            Kind::Applications => Collection::Jobs,
            _ => Collection::Users,
        }
    }

    /// Parses a URL segment, accepting only kinds embedded in `collection`.
    pub fn within(collection: Collection, raw: &str) -> Result<Kind, AppError> {
        raw.parse::<Kind>()
            .ok()
            .filter(|kind| kind.collection() == collection)
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "{} has no section named '{raw}'",
                    collection.label()
                ))
            })
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Kind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Kind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| AppError::NotFound(format!("Unknown section '{s}'")))
    }
}

/// Which mutation is being attempted, for `EmbeddedItem::guard`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Append,
    Patch,
    Remove,
}

/// Server-side values available when a draft becomes an item.
#[derive(Debug, Clone, Copy)]
pub struct ItemContext {
    pub principal: Principal,
    pub now: DateTime<Utc>,
}

/// A child item kind: its parent, its field schema (draft and patch records,
/// both rejecting unknown fields), its validation rules and its access policy.
pub trait EmbeddedItem: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    type Parent: Presentable;
    type Draft: DeserializeOwned + Send;
    type Patch: DeserializeOwned + Send;

    const KIND: Kind;

    fn id(&self) -> Uuid;

    fn items(parent: &Self::Parent) -> &[Self];

    fn items_mut(parent: &mut Self::Parent) -> &mut Vec<Self>;

    fn from_draft(id: Uuid, draft: Self::Draft, ctx: &ItemContext) -> Self;

    /// Field merge: fields present in `patch` overwrite, the rest stay as they are.
    fn apply_patch(&mut self, patch: Self::Patch, ctx: &ItemContext);

    /// Checked on the resulting item before anything is persisted.
    fn validate(&self) -> Result<(), AppError>;

    /// Runs against the loaded parent before any change is made. `target` is
    /// the addressed item for patch and remove, if it exists.
    fn guard(
        parent: &Self::Parent,
        principal: &Principal,
        access: Access,
        target: Option<&Self>,
    ) -> Result<(), AppError>;
}

/// Response shaping for a parent returned from a mutation. `viewer` is the
/// caller; parents may hide nested data the caller is not entitled to see.
#[async_trait]
pub trait Presentable: ParentDocument + Sync {
    async fn present(
        self,
        store: &dyn DocumentStore,
        viewer: &Principal,
    ) -> Result<Value, AppError>;
}

/// Rejects blank strings in required fields.
pub fn require_text(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        Err(AppError::Validation(format!("{field} is required")))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trips_through_its_field_name() {
        for kind in Kind::ALL {
            assert_eq!(kind.as_str().parse::<Kind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_kind_names_are_case_sensitive() {
        assert!("Employments".parse::<Kind>().is_err());
        assert!("itskills".parse::<Kind>().is_err());
    }

    #[test]
    fn test_kind_within_rejects_other_collection() {
        assert!(Kind::within(Collection::Users, "applications").is_err());
        assert!(Kind::within(Collection::Jobs, "employments").is_err());
        assert_eq!(
            Kind::within(Collection::Users, "itSkills").unwrap(),
            Kind::ItSkills
        );
    }

    #[test]
    fn test_require_text_rejects_whitespace() {
        assert!(require_text("company", "   ").is_err());
        assert!(require_text("company", "Acme").is_ok());
    }
}
