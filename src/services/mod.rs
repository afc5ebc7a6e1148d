pub mod auth_services;
pub mod engagement_services;
pub mod feed_services;
pub mod post_services;
pub mod tag_services;

use thiserror::Error;
use uuid::Uuid;

use crate::backend::BackendError;

/// Uniform error handed to callers: a message, plus the few cases the UI
/// reacts to differently.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),
    #[error("You must be signed in to do that.")]
    Unauthenticated,
    #[error("authentication failed: {0}")]
    AuthFailed(String),
    #[error("{0}")]
    AlreadyPerformed(String),
    #[error("{message}")]
    Backend { message: String },
}

impl From<BackendError> for ServiceError {
    fn from(e: BackendError) -> Self {
        // The forwarded token was rejected: the caller has to sign in again.
        if e.is_unauthorized() {
            return ServiceError::Unauthenticated;
        }
        ServiceError::Backend { message: e.message }
    }
}

pub(crate) fn require_user(user_id: Option<Uuid>) -> Result<Uuid, ServiceError> {
    user_id.ok_or(ServiceError::Unauthenticated)
}
