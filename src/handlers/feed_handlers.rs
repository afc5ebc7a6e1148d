use actix_web::http::StatusCode;
use actix_web::{Responder, get, web};

use crate::AppState;
use crate::dtos::post_dtos::FeedOut;
use crate::handlers::{error_response, success};
use crate::middleware::auth_extractor::AuthenticatedUser;

/// GET /api/feed/global
#[get("/feed/global")]
pub async fn global_feed(
    state: web::Data<AppState>,
    user: Option<AuthenticatedUser>,
) -> impl Responder {
    match state.feed(user.as_ref()).global_feed().await {
        Ok(posts) => success(StatusCode::OK, "Posts retrieved successfully", FeedOut::from(posts)),
        Err(e) => error_response(&e),
    }
}

/// GET /api/feed/personalized
#[get("/feed/personalized")]
pub async fn personalized_feed(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> impl Responder {
    match state.feed(Some(&user)).personalized_feed(user.user_id).await {
        Ok(posts) if posts.is_empty() => success(
            StatusCode::OK,
            "No personalized posts available. Follow some tags!",
            FeedOut::from(posts),
        ),
        Ok(posts) => success(StatusCode::OK, "Posts retrieved successfully", FeedOut::from(posts)),
        Err(e) => error_response(&e),
    }
}
