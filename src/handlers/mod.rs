pub mod auth_handlers;
pub mod engagement_handlers;
pub mod feed_handlers;
pub mod post_handlers;
pub mod tag_handlers;

use actix_web::HttpResponse;
use actix_web::http::StatusCode;
use log::error;
use serde::Serialize;

use crate::services::ServiceError;

#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub status: String,
    pub message: String,
    pub data: Option<T>,
}

pub fn success<T: Serialize>(status: StatusCode, message: &str, data: T) -> HttpResponse {
    HttpResponse::build(status).json(ApiResponse {
        status: "success".to_string(),
        message: message.to_string(),
        data: Some(data),
    })
}

pub fn status_for(err: &ServiceError) -> StatusCode {
    match err {
        ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
        ServiceError::Unauthenticated | ServiceError::AuthFailed(_) => StatusCode::UNAUTHORIZED,
        ServiceError::AlreadyPerformed(_) => StatusCode::CONFLICT,
        ServiceError::Backend { .. } => StatusCode::BAD_GATEWAY,
    }
}

/// Only the message travels to the client.
pub fn error_response(err: &ServiceError) -> HttpResponse {
    let status = status_for(err);
    if status.is_server_error() {
        error!("request failed: {}", err);
    }
    HttpResponse::build(status).json(ApiResponse::<()> {
        status: "error".to_string(),
        message: err.to_string(),
        data: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_map_to_distinct_statuses() {
        assert_eq!(
            status_for(&ServiceError::Validation("x".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&ServiceError::AuthFailed("x".into())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_for(&ServiceError::AlreadyPerformed("x".into())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_for(&ServiceError::Backend { message: "x".into() }),
            StatusCode::BAD_GATEWAY
        );
    }

    #[actix_web::test]
    async fn error_body_carries_only_the_message() {
        let resp = error_response(&ServiceError::AlreadyPerformed(
            "You have already upvoted this post.".into(),
        ));
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let body = actix_web::body::to_bytes(resp.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["message"], "You have already upvoted this post.");
        assert!(json["data"].is_null());
    }
}
