// src/services/tag_services.rs - tag resolution (reuse or create) and tag follows

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use log::{debug, warn};
use uuid::Uuid;

use crate::backend::{Backend, BackendError};
use crate::models::tag::{Tag, TagFollow};
use crate::repositories::tag_repository::TagRepository;
use crate::services::ServiceError;

/// Identifiers resolved for one request. `create_error` is set when the
/// batch insert of missing names failed; `tag_ids` then holds only the tags
/// that already existed.
#[derive(Debug)]
pub struct TagResolution {
    pub tag_ids: Vec<Uuid>,
    pub created: Vec<Tag>,
    pub create_error: Option<BackendError>,
}

/// Trims names, drops blanks and repeats. Case is kept: tag names are
/// case-sensitive as stored.
pub fn normalize_tag_names<S: AsRef<str>>(names: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .iter()
        .map(|n| n.as_ref().trim())
        .filter(|n| !n.is_empty())
        .filter(|n| seen.insert(n.to_string()))
        .map(str::to_string)
        .collect()
}

#[derive(Clone)]
pub struct TagService {
    backend: Arc<dyn Backend>,
}

impl TagService {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    fn repo(&self) -> TagRepository<'_> {
        TagRepository::new(self.backend.as_ref())
    }

    /// Maps each distinct name to a tag id, creating only the names the
    /// lookup did not find. Lookup failure is returned as `Err` and nothing is
    /// created, since creating blind could duplicate existing names.
    pub async fn resolve<S: AsRef<str>>(&self, names: &[S]) -> Result<TagResolution, BackendError> {
        let names = normalize_tag_names(names);
        if names.is_empty() {
            return Ok(TagResolution {
                tag_ids: Vec::new(),
                created: Vec::new(),
                create_error: None,
            });
        }

        let existing = self.repo().find_by_names(&names).await?;
        let mut by_name: HashMap<String, Uuid> =
            existing.into_iter().map(|t| (t.name, t.id)).collect();

        let missing: Vec<String> = names
            .iter()
            .filter(|n| !by_name.contains_key(n.as_str()))
            .cloned()
            .collect();
        debug!(
            "tag resolution: {} existing, {} to create",
            names.len() - missing.len(),
            missing.len()
        );

        let mut created = Vec::new();
        let mut create_error = None;
        if !missing.is_empty() {
            match self.repo().insert_names(&missing).await {
                Ok(rows) => {
                    for tag in &rows {
                        by_name.insert(tag.name.clone(), tag.id);
                    }
                    created = rows;
                }
                Err(e) => {
                    warn!("creating tags {:?} failed: {}", missing, e);
                    create_error = Some(e);
                }
            }
        }

        let tag_ids = names.iter().filter_map(|n| by_name.get(n).copied()).collect();
        Ok(TagResolution {
            tag_ids,
            created,
            create_error,
        })
    }

    pub async fn list_tags(&self) -> Result<Vec<Tag>, ServiceError> {
        Ok(self.repo().list_all().await?)
    }

    pub async fn followed_tag_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>, ServiceError> {
        Ok(self.repo().followed_tag_ids(user_id).await?)
    }

    pub async fn follow_tag(&self, user_id: Uuid, tag_id: Uuid) -> Result<TagFollow, ServiceError> {
        match self.repo().follow(user_id, tag_id).await {
            Ok(follow) => Ok(follow),
            Err(e) if e.is_unique_violation() => Err(ServiceError::AlreadyPerformed(
                "You are already following this tag.".to_string(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn unfollow_tag(&self, user_id: Uuid, tag_id: Uuid) -> Result<(), ServiceError> {
        Ok(self.repo().unfollow(user_id, tag_id).await?)
    }
}
