use serde::Serialize;
use uuid::Uuid;

use crate::models::tag::Tag;

#[derive(Debug, Serialize)]
pub struct TagsOut {
    pub tags: Vec<Tag>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct FollowedTagsOut {
    pub tag_ids: Vec<Uuid>,
}
