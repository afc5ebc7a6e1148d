// src/repositories/post_repository.rs - posts table, with author and tag joins

use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::backend::{Backend, BackendError, Filter, Order, SelectQuery};
use crate::models::post::{NewPost, Post};
use crate::models::tag::Tag;
use crate::models::user::Author;

pub const POSTS_TABLE: &str = "posts";

/// Post columns plus the author row and the junction rows with their tag.
pub const FEED_SELECT: &str = "*,users(name,avatar_url),post_tags(tags(id,name))";

/// Inner-joined alias of the junction table used only for filtering, so the
/// unfiltered `post_tags` embed still carries every tag of a matching post.
pub const FOLLOWED_ALIAS: &str = "followed";

#[derive(Debug, Clone, Deserialize)]
pub struct PostTagRow {
    #[serde(default)]
    pub tags: Option<Tag>,
}

/// Junction row of the filtering alias; carries only the matched tag id.
#[derive(Debug, Clone, Deserialize)]
pub struct FollowedTagRow {
    pub tag_id: Uuid,
}

/// One row of the joined feed select.
#[derive(Debug, Clone, Deserialize)]
pub struct PostRow {
    #[serde(flatten)]
    pub post: Post,
    #[serde(default)]
    pub users: Option<Author>,
    #[serde(default)]
    pub post_tags: Vec<PostTagRow>,
    /// Present only on the tagged feed select.
    #[serde(default)]
    pub followed: Vec<FollowedTagRow>,
}

impl PostRow {
    /// Whether the filtering alias matched any of `tag_ids`.
    pub fn matched_any(&self, tag_ids: &[Uuid]) -> bool {
        self.followed.iter().any(|f| tag_ids.contains(&f.tag_id))
    }
}

pub struct PostRepository<'a> {
    backend: &'a dyn Backend,
}

impl<'a> PostRepository<'a> {
    pub fn new(backend: &'a dyn Backend) -> Self {
        Self { backend }
    }

    pub async fn insert(&self, new_post: &NewPost) -> Result<Post, BackendError> {
        let row = self
            .backend
            .insert_row(POSTS_TABLE, serde_json::to_value(new_post)?)
            .await?;
        Ok(serde_json::from_value(row)?)
    }

    /// Every post, newest first.
    pub async fn feed_rows(&self) -> Result<Vec<PostRow>, BackendError> {
        let query = SelectQuery::new(FEED_SELECT).order(Order::desc("created_at"));
        let rows = self.backend.select_rows(POSTS_TABLE, &query).await?;
        decode_rows(rows)
    }

    /// Posts carrying at least one of `tag_ids`, newest first.
    pub async fn feed_rows_tagged(&self, tag_ids: &[Uuid]) -> Result<Vec<PostRow>, BackendError> {
        let columns = format!("{},{}:post_tags!inner(tag_id)", FEED_SELECT, FOLLOWED_ALIAS);
        let query = SelectQuery::new(&columns)
            .filter(Filter::is_in(&format!("{}.tag_id", FOLLOWED_ALIAS), tag_ids))
            .order(Order::desc("created_at"));
        let rows = self.backend.select_rows(POSTS_TABLE, &query).await?;
        decode_rows(rows)
    }
}

fn decode_rows(rows: Vec<Value>) -> Result<Vec<PostRow>, BackendError> {
    rows.into_iter()
        .map(|r| serde_json::from_value(r).map_err(BackendError::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn joined_row_decodes_nested_author_and_tags() {
        let row: PostRow = serde_json::from_value(json!({
            "id": "7f1c2f1e-0000-4000-8000-000000000001",
            "user_id": "7f1c2f1e-0000-4000-8000-0000000000aa",
            "title": "Hi",
            "description": null,
            "image_url": null,
            "lat": 44.97,
            "lng": -93.26,
            "created_at": "2025-07-28T10:00:00.123456+00:00",
            "users": { "name": "Ada", "avatar_url": null },
            "post_tags": [
                { "tags": { "id": "7f1c2f1e-0000-4000-8000-0000000000b1", "name": "news" } },
                { "tags": null }
            ],
            "followed": [ { "tag_id": "7f1c2f1e-0000-4000-8000-000000000001" } ]
        }))
        .unwrap();

        assert_eq!(row.post.title, "Hi");
        assert_eq!(row.post.lat, Some(44.97));
        assert_eq!(row.users.unwrap().name.as_deref(), Some("Ada"));
        assert_eq!(row.post_tags.len(), 2);
        assert!(row.post_tags[1].tags.is_none());
        assert_eq!(row.followed.len(), 1);
    }

    #[test]
    fn missing_joins_default_to_empty() {
        let row: PostRow = serde_json::from_value(json!({
            "id": "7f1c2f1e-0000-4000-8000-000000000001",
            "user_id": "7f1c2f1e-0000-4000-8000-0000000000aa",
            "title": "bare",
            "created_at": "2025-07-28T10:00:00+00:00"
        }))
        .unwrap();
        assert!(row.users.is_none());
        assert!(row.post_tags.is_empty());
        assert!(row.followed.is_empty());
        assert!(row.post.description.is_none());
    }
}
