use actix_web::http::StatusCode;
use actix_web::{Responder, delete, get, post, web};
use uuid::Uuid;

use crate::AppState;
use crate::dtos::tag_dtos::{FollowedTagsOut, TagsOut};
use crate::handlers::{error_response, success};
use crate::middleware::auth_extractor::AuthenticatedUser;

/// GET /api/tags
#[get("/tags")]
pub async fn list_tags(
    state: web::Data<AppState>,
    user: Option<AuthenticatedUser>,
) -> impl Responder {
    match state.tags(user.as_ref()).list_tags().await {
        Ok(tags) => {
            let total = tags.len();
            success(StatusCode::OK, "Tags retrieved", TagsOut { tags, total })
        }
        Err(e) => error_response(&e),
    }
}

/// GET /api/tags/following
#[get("/tags/following")]
pub async fn followed_tags(state: web::Data<AppState>, user: AuthenticatedUser) -> impl Responder {
    match state.tags(Some(&user)).followed_tag_ids(user.user_id).await {
        Ok(tag_ids) => success(StatusCode::OK, "Followed tags", FollowedTagsOut { tag_ids }),
        Err(e) => error_response(&e),
    }
}

/// POST /api/tags/{id}/follow
#[post("/tags/{id}/follow")]
pub async fn follow_tag(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> impl Responder {
    match state.tags(Some(&user)).follow_tag(user.user_id, path.into_inner()).await {
        Ok(follow) => success(StatusCode::CREATED, "Tag followed", follow),
        Err(e) => error_response(&e),
    }
}

/// DELETE /api/tags/{id}/follow
#[delete("/tags/{id}/follow")]
pub async fn unfollow_tag(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> impl Responder {
    match state.tags(Some(&user)).unfollow_tag(user.user_id, path.into_inner()).await {
        Ok(()) => success(StatusCode::OK, "Tag unfollowed", ()),
        Err(e) => error_response(&e),
    }
}
