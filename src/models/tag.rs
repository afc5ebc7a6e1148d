use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    pub id: Uuid,
    /// Unique and case-sensitive as stored.
    pub name: String,
}

/// Row of the `post_tags` junction table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostTagLink {
    pub post_id: Uuid,
    pub tag_id: Uuid,
}

/// Row of `user_follows_tags`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagFollow {
    pub user_id: Uuid,
    pub tag_id: Uuid,
}
