use actix_web::http::StatusCode;
use actix_web::{Responder, post, web};
use log::debug;

use crate::AppState;
use crate::dtos::post_dtos::{CreatePostDTO, UploadImageRequest, UploadImageResponse};
use crate::handlers::{error_response, success};
use crate::middleware::auth_extractor::AuthenticatedUser;
use crate::services::post_services::{TagLinkOutcome, decode_image_payload};

/// POST /api/posts
#[post("/posts")]
pub async fn create_post(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    body: web::Json<CreatePostDTO>,
) -> impl Responder {
    debug!("create post by {}: {:?}", user.user_id, body.title);

    match state
        .posts(&user)
        .create_post(Some(user.user_id), body.into_inner())
        .await
    {
        Ok(submission) => {
            let message = match &submission.tag_link {
                TagLinkOutcome::Partial { .. } | TagLinkOutcome::Failed { .. } => {
                    "Post created, but some tags could not be added"
                }
                _ => "Post created successfully",
            };
            success(StatusCode::CREATED, message, submission)
        }
        Err(e) => error_response(&e),
    }
}

/// POST /api/posts/image
/// Base64 image upload; the returned URL goes into the post's image_url.
#[post("/posts/image")]
pub async fn upload_post_image(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    body: web::Json<UploadImageRequest>,
) -> impl Responder {
    let image = match decode_image_payload(&body.image_data, &body.content_type) {
        Ok(image) => image,
        Err(e) => return error_response(&e),
    };
    debug!("image upload by {}: {} bytes", user.user_id, image.bytes.len());

    match state.posts(&user).upload_image(Some(user.user_id), image).await {
        Ok(image_url) => success(
            StatusCode::CREATED,
            "Image uploaded",
            UploadImageResponse { image_url },
        ),
        Err(e) => error_response(&e),
    }
}
