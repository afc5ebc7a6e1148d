// src/repositories/tag_repository.rs - tags, post_tags and user_follows_tags

use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::backend::{Backend, BackendError, Filter, Order, SelectQuery};
use crate::models::tag::{PostTagLink, Tag, TagFollow};

pub const TAGS_TABLE: &str = "tags";
pub const POST_TAGS_TABLE: &str = "post_tags";
pub const FOLLOWS_TABLE: &str = "user_follows_tags";

pub struct TagRepository<'a> {
    backend: &'a dyn Backend,
}

impl<'a> TagRepository<'a> {
    pub fn new(backend: &'a dyn Backend) -> Self {
        Self { backend }
    }

    /// Single batched lookup for all `names`.
    pub async fn find_by_names(&self, names: &[String]) -> Result<Vec<Tag>, BackendError> {
        let query = SelectQuery::new("id,name").filter(Filter::is_in("name", names));
        let rows = self.backend.select_rows(TAGS_TABLE, &query).await?;
        decode(rows)
    }

    /// Single batched insert; returns the created rows.
    pub async fn insert_names(&self, names: &[String]) -> Result<Vec<Tag>, BackendError> {
        let rows = names.iter().map(|name| json!({ "name": name })).collect();
        let created = self.backend.batch_insert(TAGS_TABLE, rows).await?;
        decode(created)
    }

    pub async fn list_all(&self) -> Result<Vec<Tag>, BackendError> {
        let query = SelectQuery::new("id,name").order(Order::asc("name"));
        let rows = self.backend.select_rows(TAGS_TABLE, &query).await?;
        decode(rows)
    }

    pub async fn link_post(
        &self,
        post_id: Uuid,
        tag_ids: &[Uuid],
    ) -> Result<Vec<PostTagLink>, BackendError> {
        let rows = tag_ids
            .iter()
            .map(|tag_id| json!({ "post_id": post_id, "tag_id": tag_id }))
            .collect();
        let linked = self.backend.batch_insert(POST_TAGS_TABLE, rows).await?;
        decode(linked)
    }

    pub async fn followed_tag_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>, BackendError> {
        #[derive(Deserialize)]
        struct Row {
            tag_id: Uuid,
        }

        let query = SelectQuery::new("tag_id").filter(Filter::eq("user_id", user_id));
        let rows = self.backend.select_rows(FOLLOWS_TABLE, &query).await?;
        let rows: Vec<Row> = decode(rows)?;
        Ok(rows.into_iter().map(|r| r.tag_id).collect())
    }

    pub async fn follow(&self, user_id: Uuid, tag_id: Uuid) -> Result<TagFollow, BackendError> {
        let row = self
            .backend
            .insert_row(FOLLOWS_TABLE, json!({ "user_id": user_id, "tag_id": tag_id }))
            .await?;
        Ok(serde_json::from_value(row)?)
    }

    pub async fn unfollow(&self, user_id: Uuid, tag_id: Uuid) -> Result<(), BackendError> {
        self.backend
            .delete_rows(
                FOLLOWS_TABLE,
                &[Filter::eq("user_id", user_id), Filter::eq("tag_id", tag_id)],
            )
            .await
    }
}

fn decode<T: serde::de::DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<T>, BackendError> {
    rows.into_iter()
        .map(|r| serde_json::from_value(r).map_err(BackendError::from))
        .collect()
}
