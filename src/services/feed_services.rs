// src/services/feed_services.rs - global and personalized feeds

use std::collections::HashSet;
use std::sync::Arc;

use log::{debug, error};
use uuid::Uuid;

use crate::backend::Backend;
use crate::models::post::FeedPost;
use crate::repositories::post_repository::{PostRepository, PostRow};
use crate::repositories::tag_repository::TagRepository;
use crate::services::ServiceError;

/// Pulls the author up and turns junction rows into a plain tag list.
/// Pure: the same rows always give the same output.
pub fn flatten_row(row: &PostRow) -> FeedPost {
    let author = row.users.clone().unwrap_or_default();

    let mut seen = HashSet::new();
    let tags = row
        .post_tags
        .iter()
        .filter_map(|pt| pt.tags.clone())
        .filter(|t| seen.insert(t.id))
        .collect();

    let post = &row.post;
    FeedPost {
        id: post.id,
        user_id: post.user_id,
        title: post.title.clone(),
        description: post.description.clone(),
        image_url: post.image_url.clone(),
        lat: post.lat,
        lng: post.lng,
        created_at: post.created_at,
        user_name: author.name,
        user_avatar_url: author.avatar_url,
        tags,
    }
}

pub fn flatten_feed(rows: &[PostRow]) -> Vec<FeedPost> {
    rows.iter().map(flatten_row).collect()
}

#[derive(Clone)]
pub struct FeedService {
    backend: Arc<dyn Backend>,
}

impl FeedService {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    pub async fn global_feed(&self) -> Result<Vec<FeedPost>, ServiceError> {
        let rows = PostRepository::new(self.backend.as_ref())
            .feed_rows()
            .await
            .map_err(|e| {
                error!("global feed query failed: {}", e);
                ServiceError::from(e)
            })?;
        Ok(flatten_feed(&rows))
    }

    /// Posts with ANY tag the user follows, each with its full tag list.
    /// Following nothing is an empty feed, and the posts query is skipped.
    pub async fn personalized_feed(&self, user_id: Uuid) -> Result<Vec<FeedPost>, ServiceError> {
        let followed = TagRepository::new(self.backend.as_ref())
            .followed_tag_ids(user_id)
            .await?;
        if followed.is_empty() {
            debug!("user {} follows no tags", user_id);
            return Ok(Vec::new());
        }

        let rows = PostRepository::new(self.backend.as_ref())
            .feed_rows_tagged(&followed)
            .await
            .map_err(|e| {
                error!("personalized feed query for {} failed: {}", user_id, e);
                ServiceError::from(e)
            })?;

        // Guard on the alias the backend filtered on, not on the display
        // tags: a tag hidden from the join must not hide the post.
        Ok(rows
            .iter()
            .filter(|r| r.matched_any(&followed))
            .map(flatten_row)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::{BackendCall, MockBackend};
    use crate::backend::{BackendError, Filter};
    use serde_json::{Value, json};

    fn row(id: u128, created_at: &str, author: Value, tags: &[(u128, &str)]) -> Value {
        json!({
            "id": Uuid::from_u128(id),
            "user_id": Uuid::from_u128(999),
            "title": format!("post {}", id),
            "description": null,
            "image_url": null,
            "lat": null,
            "lng": null,
            "created_at": created_at,
            "users": author,
            "post_tags": tags
                .iter()
                .map(|(tid, name)| json!({ "tags": { "id": Uuid::from_u128(*tid), "name": name } }))
                .collect::<Vec<_>>(),
        })
    }

    fn decode(rows: Vec<Value>) -> Vec<PostRow> {
        rows.into_iter()
            .map(|r| serde_json::from_value(r).unwrap())
            .collect()
    }

    #[test]
    fn flattening_pulls_up_author_and_tags() {
        let rows = decode(vec![row(
            1,
            "2025-07-28T10:00:00+00:00",
            json!({ "name": "Ada", "avatar_url": "https://cdn/ada.png" }),
            &[(10, "news"), (11, "local")],
        )]);

        let feed = flatten_feed(&rows);

        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].user_name.as_deref(), Some("Ada"));
        assert_eq!(feed[0].user_avatar_url.as_deref(), Some("https://cdn/ada.png"));
        let names: Vec<_> = feed[0].tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["news", "local"]);
    }

    #[test]
    fn flattening_is_repeatable_and_keeps_row_order() {
        let rows = decode(vec![
            row(2, "2025-07-29T10:00:00+00:00", json!(null), &[(10, "news")]),
            row(1, "2025-07-28T10:00:00+00:00", json!({ "name": "Ada" }), &[]),
        ]);

        let first = flatten_feed(&rows);
        let second = flatten_feed(&rows);

        assert_eq!(first, second);
        assert_eq!(first[0].id, Uuid::from_u128(2));
        assert_eq!(first[1].id, Uuid::from_u128(1));
        assert!(first[0].user_name.is_none());
        assert!(first[1].tags.is_empty());
    }

    #[test]
    fn null_and_repeated_junction_tags_are_dropped() {
        let mut raw = row(1, "2025-07-28T10:00:00+00:00", json!(null), &[(10, "news"), (10, "news")]);
        raw["post_tags"]
            .as_array_mut()
            .unwrap()
            .push(json!({ "tags": null }));

        let feed = flatten_feed(&decode(vec![raw]));

        assert_eq!(feed[0].tags.len(), 1);
    }

    #[tokio::test]
    async fn global_feed_orders_newest_first_with_joins() {
        let mock = Arc::new(MockBackend::new().with_select(
            "posts",
            Ok(vec![row(1, "2025-07-28T10:00:00+00:00", json!({ "name": "Ada" }), &[(10, "news")])]),
        ));
        let svc = FeedService::new(mock.clone());

        let feed = svc.global_feed().await.unwrap();

        assert_eq!(feed.len(), 1);
        let calls = mock.calls();
        let BackendCall::Select { query, .. } = &calls[0] else {
            panic!("expected select");
        };
        assert_eq!(query.columns, "*,users(name,avatar_url),post_tags(tags(id,name))");
        let order = query.order.as_ref().unwrap();
        assert_eq!(order.column, "created_at");
        assert!(!order.ascending);
        assert!(query.filters.is_empty());
    }

    #[tokio::test]
    async fn following_nothing_skips_the_posts_query() {
        let mock = Arc::new(MockBackend::new().with_select("user_follows_tags", Ok(vec![])));
        let svc = FeedService::new(mock.clone());

        let feed = svc.personalized_feed(Uuid::new_v4()).await.unwrap();

        assert!(feed.is_empty());
        assert!(mock.calls_to("posts").is_empty());
    }

    #[tokio::test]
    async fn personalized_feed_keeps_full_tag_list_of_matching_posts() {
        let followed = Uuid::from_u128(10);
        let mut matching =
            row(1, "2025-07-29T10:00:00+00:00", json!(null), &[(10, "news"), (11, "local")]);
        matching["followed"] = json!([{ "tag_id": followed }]);
        let mock = Arc::new(
            MockBackend::new()
                .with_select("user_follows_tags", Ok(vec![json!({ "tag_id": followed })]))
                .with_select(
                    "posts",
                    Ok(vec![
                        matching,
                        // No followed junction row: dropped.
                        row(2, "2025-07-28T10:00:00+00:00", json!(null), &[(12, "sports")]),
                    ]),
                ),
        );
        let svc = FeedService::new(mock.clone());

        let feed = svc.personalized_feed(Uuid::new_v4()).await.unwrap();

        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].tags.len(), 2);

        let posts_calls = mock.calls_to("posts");
        let BackendCall::Select { query, .. } = &posts_calls[0] else {
            panic!("expected posts select");
        };
        assert!(query.columns.ends_with(",followed:post_tags!inner(tag_id)"));
        assert_eq!(query.filters, vec![Filter::is_in("followed.tag_id", [followed])]);
    }

    #[tokio::test]
    async fn matched_post_with_hidden_tag_objects_is_kept() {
        let followed = Uuid::from_u128(10);
        let mut raw = row(1, "2025-07-29T10:00:00+00:00", json!(null), &[]);
        raw["post_tags"] = json!([{ "tags": null }]);
        raw["followed"] = json!([{ "tag_id": followed }]);
        let mock = Arc::new(
            MockBackend::new()
                .with_select("user_follows_tags", Ok(vec![json!({ "tag_id": followed })]))
                .with_select("posts", Ok(vec![raw])),
        );
        let svc = FeedService::new(mock);

        let feed = svc.personalized_feed(Uuid::new_v4()).await.unwrap();

        assert_eq!(feed.len(), 1);
        assert!(feed[0].tags.is_empty());
    }

    #[tokio::test]
    async fn feed_errors_are_returned_as_is() {
        let mock = Arc::new(
            MockBackend::new().with_select("posts", Err(BackendError::new("JWT expired"))),
        );
        let svc = FeedService::new(mock);

        let err = svc.global_feed().await.unwrap_err();
        assert_eq!(err.to_string(), "JWT expired");
    }

    #[tokio::test]
    async fn follows_lookup_error_is_returned() {
        let mock = Arc::new(
            MockBackend::new()
                .with_select("user_follows_tags", Err(BackendError::new("denied"))),
        );
        let svc = FeedService::new(mock.clone());

        assert!(svc.personalized_feed(Uuid::new_v4()).await.is_err());
        assert!(mock.calls_to("posts").is_empty());
    }
}
