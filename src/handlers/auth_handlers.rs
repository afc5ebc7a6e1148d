use actix_web::http::StatusCode;
use actix_web::{HttpResponse, Responder, get, post, web};
use log::{info, warn};

use crate::AppState;
use crate::dtos::auth::{
    LoginResponse, NextStepOut, OAuthCallbackIn, OAuthStartOut, OAuthStartQuery, SessionOut,
};
use crate::handlers::{ApiResponse, error_response, success};
use crate::middleware::auth_extractor::AuthenticatedUser;
use crate::services::ServiceError;

/// GET /auth/oauth/start?redirect_uri=...
/// Returns the provider URL the app opens in its auth browser.
#[get("/oauth/start")]
pub async fn oauth_start(
    state: web::Data<AppState>,
    query: web::Query<OAuthStartQuery>,
) -> impl Responder {
    match state.auth(None).sign_in(&query.redirect_uri) {
        Ok(authorization_url) => success(
            StatusCode::OK,
            "Open the authorization URL to continue",
            OAuthStartOut { authorization_url },
        ),
        Err(e) => error_response(&e),
    }
}

/// POST /auth/oauth/callback
/// Body carries the redirect URL; its fragment holds the tokens.
#[post("/oauth/callback")]
pub async fn oauth_callback(
    state: web::Data<AppState>,
    body: web::Json<OAuthCallbackIn>,
) -> impl Responder {
    let auth = state.auth(None);
    let mut changes = auth.subscribe();

    match auth.complete_oauth_redirect(&body.url).await {
        Ok(session) => {
            if let Some(change) = changes.try_next() {
                info!("session change {:?} for {:?}", change.event, change.user.map(|u| u.id));
            }
            success(
                StatusCode::OK,
                "Signed in",
                LoginResponse {
                    session: SessionOut::from(session),
                    next_step: "feed".to_string(),
                },
            )
        }
        // Not a crash: the app goes back to the login screen.
        Err(ServiceError::AuthFailed(reason)) => {
            warn!("oauth callback rejected: {}", reason);
            HttpResponse::Unauthorized().json(ApiResponse {
                status: "error".to_string(),
                message: "Authentication failed. Please sign in again.".to_string(),
                data: Some(NextStepOut {
                    next_step: "login".to_string(),
                }),
            })
        }
        Err(e) => error_response(&e),
    }
}

/// POST /auth/logout
#[post("/logout")]
pub async fn logout(state: web::Data<AppState>, user: AuthenticatedUser) -> impl Responder {
    match state.auth(Some(&user)).sign_out().await {
        Ok(()) => success(
            StatusCode::OK,
            "Signed out",
            NextStepOut {
                next_step: "login".to_string(),
            },
        ),
        Err(e) => error_response(&e),
    }
}

/// GET /auth/me
#[get("/me")]
pub async fn me(state: web::Data<AppState>, user: AuthenticatedUser) -> impl Responder {
    match state.auth(Some(&user)).current_user().await {
        Ok(Some(current)) => success(StatusCode::OK, "Current user", current),
        Ok(None) => error_response(&ServiceError::Unauthenticated),
        Err(e) => error_response(&e),
    }
}
