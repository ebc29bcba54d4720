//! Response shape for user documents.

use async_trait::async_trait;
use serde_json::Value;

use crate::auth::Principal;
use crate::embedded::Presentable;
use crate::errors::AppError;
use crate::models::user::User;
use crate::store::DocumentStore;

/// Profile sections are returned whole; mutating them already requires ownership.
#[async_trait]
impl Presentable for User {
    async fn present(
        self,
        _store: &dyn DocumentStore,
        _viewer: &Principal,
    ) -> Result<Value, AppError> {
        Ok(serde_json::to_value(self)?)
    }
}
