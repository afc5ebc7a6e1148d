use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::backend::Session;

#[derive(Deserialize)]
pub struct OAuthStartQuery {
    pub redirect_uri: String,
}

#[derive(Serialize)]
pub struct OAuthStartOut {
    pub authorization_url: String,
}

#[derive(Deserialize)]
pub struct OAuthCallbackIn {
    /// Full redirect URL the app was opened with.
    pub url: String,
}

#[derive(Serialize)]
pub struct SessionOut {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
    pub token_type: Option<String>,
    pub user_id: Option<Uuid>,
}

impl From<Session> for SessionOut {
    fn from(s: Session) -> Self {
        SessionOut {
            access_token: s.access_token,
            refresh_token: Some(s.refresh_token).filter(|t| !t.is_empty()),
            expires_in: s.expires_in,
            token_type: s.token_type,
            user_id: s.user.map(|u| u.id),
        }
    }
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub session: SessionOut,
    pub next_step: String,
}

#[derive(Serialize)]
pub struct NextStepOut {
    pub next_step: String,
}
