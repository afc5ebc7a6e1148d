// src/services/engagement_services.rs - upvote / save

use std::sync::Arc;

use log::{debug, info};
use uuid::Uuid;

use crate::backend::Backend;
use crate::models::engagement::{Engagement, EngagementKind};
use crate::repositories::engagement_repository::EngagementRepository;
use crate::services::ServiceError;

#[derive(Clone)]
pub struct EngagementService {
    backend: Arc<dyn Backend>,
}

impl EngagementService {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    pub async fn upvote(&self, user_id: Uuid, post_id: Uuid) -> Result<Engagement, ServiceError> {
        self.record(EngagementKind::Upvote, user_id, post_id).await
    }

    pub async fn save(&self, user_id: Uuid, post_id: Uuid) -> Result<Engagement, ServiceError> {
        self.record(EngagementKind::Save, user_id, post_id).await
    }

    /// Insert without reading first: the unique constraint decides whether
    /// the action was already performed.
    pub async fn record(
        &self,
        kind: EngagementKind,
        user_id: Uuid,
        post_id: Uuid,
    ) -> Result<Engagement, ServiceError> {
        debug!("{} post {} by {}", kind, post_id, user_id);
        match EngagementRepository::new(self.backend.as_ref())
            .insert(kind, user_id, post_id)
            .await
        {
            Ok(engagement) => Ok(engagement),
            Err(e) if e.is_unique_violation() => {
                info!("duplicate {} of post {} by {}", kind, post_id, user_id);
                Err(ServiceError::AlreadyPerformed(format!(
                    "You have already {} this post.",
                    kind.past_tense()
                )))
            }
            Err(e) => Err(e.into()),
        }
    }
}
