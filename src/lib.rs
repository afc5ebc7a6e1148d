pub mod backend;
pub mod config;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod services;

use std::sync::Arc;

use crate::backend::{Backend, SupabaseClient};
use crate::config::AppConfig;
use crate::middleware::auth_extractor::AuthenticatedUser;
use crate::services::auth_services::AuthService;
use crate::services::engagement_services::EngagementService;
use crate::services::feed_services::FeedService;
use crate::services::post_services::PostService;
use crate::services::tag_services::TagService;

/// Shared across workers. Services are built per request on a backend handle
/// carrying the caller's token, so no session state crosses requests.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub supabase: SupabaseClient,
}

impl AppState {
    pub fn new(config: AppConfig, supabase: SupabaseClient) -> Self {
        Self { config, supabase }
    }

    pub fn backend_for(&self, user: Option<&AuthenticatedUser>) -> Arc<dyn Backend> {
        match user {
            Some(u) => Arc::new(self.supabase.with_access_token(&u.access_token)),
            None => Arc::new(self.supabase.detached()),
        }
    }

    pub fn auth(&self, user: Option<&AuthenticatedUser>) -> AuthService {
        AuthService::new(self.backend_for(user), &self.config.oauth_provider)
    }

    pub fn posts(&self, user: &AuthenticatedUser) -> PostService {
        PostService::new(self.backend_for(Some(user)), &self.config.storage_bucket)
    }

    pub fn feed(&self, user: Option<&AuthenticatedUser>) -> FeedService {
        FeedService::new(self.backend_for(user))
    }

    pub fn tags(&self, user: Option<&AuthenticatedUser>) -> TagService {
        TagService::new(self.backend_for(user))
    }

    pub fn engagement(&self, user: &AuthenticatedUser) -> EngagementService {
        EngagementService::new(self.backend_for(Some(user)))
    }
}
