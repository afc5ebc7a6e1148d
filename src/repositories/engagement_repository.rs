// src/repositories/engagement_repository.rs - upvotes / saved_posts

use serde_json::json;
use uuid::Uuid;

use crate::backend::{Backend, BackendError};
use crate::models::engagement::{Engagement, EngagementKind};

pub struct EngagementRepository<'a> {
    backend: &'a dyn Backend,
}

impl<'a> EngagementRepository<'a> {
    pub fn new(backend: &'a dyn Backend) -> Self {
        Self { backend }
    }

    /// Plain insert; a repeat surfaces as the table's unique violation.
    pub async fn insert(
        &self,
        kind: EngagementKind,
        user_id: Uuid,
        post_id: Uuid,
    ) -> Result<Engagement, BackendError> {
        let row = self
            .backend
            .insert_row(kind.table(), json!({ "user_id": user_id, "post_id": post_id }))
            .await?;
        Ok(serde_json::from_value(row)?)
    }
}
