use actix_web::http::StatusCode;
use actix_web::{Responder, post, web};
use uuid::Uuid;

use crate::AppState;
use crate::handlers::{error_response, success};
use crate::middleware::auth_extractor::AuthenticatedUser;
use crate::models::engagement::EngagementKind;

/// POST /api/posts/{id}/upvote
#[post("/posts/{id}/upvote")]
pub async fn upvote_post(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> impl Responder {
    engage(&state, &user, EngagementKind::Upvote, path.into_inner()).await
}

/// POST /api/posts/{id}/save
#[post("/posts/{id}/save")]
pub async fn save_post(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> impl Responder {
    engage(&state, &user, EngagementKind::Save, path.into_inner()).await
}

async fn engage(
    state: &AppState,
    user: &AuthenticatedUser,
    kind: EngagementKind,
    post_id: Uuid,
) -> actix_web::HttpResponse {
    match state.engagement(user).record(kind, user.user_id, post_id).await {
        Ok(engagement) => success(StatusCode::CREATED, &format!("Post {}", kind.past_tense()), engagement),
        Err(e) => error_response(&e),
    }
}
