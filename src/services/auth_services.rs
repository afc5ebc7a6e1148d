// src/services/auth_services.rs - OAuth sign-in, redirect handling, session access

use std::sync::Arc;

use log::{debug, info, warn};
use serde::Serialize;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use urlencoding::decode;

use crate::backend::{AuthUser, Backend, SessionEvent, SessionEventKind, Session};
use crate::services::ServiceError;

/// Tokens carried in the fragment of the provider redirect.
#[derive(Debug, Clone, PartialEq)]
pub struct OAuthTokens {
    pub access_token: String,
    pub refresh_token: String,
}

/// Session change as re-published to consumers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthChange {
    pub event: SessionEventKind,
    pub user: Option<AuthUser>,
}

impl From<SessionEvent> for AuthChange {
    fn from(ev: SessionEvent) -> Self {
        AuthChange {
            event: ev.kind,
            user: ev.session.and_then(|s| s.user),
        }
    }
}

pub struct SessionSubscription {
    rx: broadcast::Receiver<SessionEvent>,
}

impl SessionSubscription {
    /// Next change, or `None` once the backend handle is gone.
    pub async fn next(&mut self) -> Option<AuthChange> {
        loop {
            match self.rx.recv().await {
                Ok(ev) => return Some(ev.into()),
                Err(RecvError::Lagged(n)) => warn!("session subscriber lagged, {} events dropped", n),
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking variant of [`next`](Self::next).
    pub fn try_next(&mut self) -> Option<AuthChange> {
        loop {
            match self.rx.try_recv() {
                Ok(ev) => return Some(ev.into()),
                Err(TryRecvError::Lagged(n)) => {
                    warn!("session subscriber lagged, {} events dropped", n)
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }
}

#[derive(Clone)]
pub struct AuthService {
    backend: Arc<dyn Backend>,
    provider: String,
}

impl AuthService {
    pub fn new(backend: Arc<dyn Backend>, provider: &str) -> Self {
        Self {
            backend,
            provider: provider.to_string(),
        }
    }

    /// Authorization URL of the provider-hosted flow; the provider redirects
    /// back to `redirect_uri` with the tokens in the fragment.
    pub fn sign_in(&self, redirect_uri: &str) -> Result<String, ServiceError> {
        if redirect_uri.trim().is_empty() {
            return Err(ServiceError::Validation("redirect_uri is required".to_string()));
        }
        let url = self.backend.sign_in_with_oauth(
            &self.provider,
            redirect_uri,
            &[("access_type", "offline"), ("prompt", "consent")],
        )?;
        debug!("oauth sign-in via {} redirecting to {}", self.provider, redirect_uri);
        Ok(url)
    }

    /// Establishes the session from the provider redirect. Anything missing
    /// or rejected is an `AuthFailed`, which sends the user back to login.
    pub async fn complete_oauth_redirect(&self, redirect_url: &str) -> Result<Session, ServiceError> {
        let tokens = parse_oauth_redirect(redirect_url)?;
        match self
            .backend
            .set_session(&tokens.access_token, &tokens.refresh_token)
            .await
        {
            Ok(session) => {
                info!(
                    "session established for {:?}",
                    session.user.as_ref().map(|u| u.id)
                );
                Ok(session)
            }
            Err(e) => {
                warn!("setting session from redirect failed: {}", e);
                Err(ServiceError::AuthFailed(e.message))
            }
        }
    }

    pub async fn sign_out(&self) -> Result<(), ServiceError> {
        Ok(self.backend.sign_out().await?)
    }

    pub async fn current_session(&self) -> Option<Session> {
        self.backend.get_session().await
    }

    /// Session first, then the user behind it; no session is `Ok(None)`.
    pub async fn current_user(&self) -> Result<Option<AuthUser>, ServiceError> {
        if self.backend.get_session().await.is_none() {
            return Ok(None);
        }
        Ok(self.backend.get_current_user().await?)
    }

    pub fn subscribe(&self) -> SessionSubscription {
        SessionSubscription {
            rx: self.backend.on_session_change(),
        }
    }
}

/// Extracts `access_token` / `refresh_token` from the redirect fragment.
/// Expo dev-client links (`exp://...?url=<encoded>`) are unwrapped first.
pub fn parse_oauth_redirect(url: &str) -> Result<OAuthTokens, ServiceError> {
    let url = unwrap_expo_url(url.trim());

    let fragment = match url.split_once('#') {
        Some((_, f)) if !f.is_empty() => f,
        _ => return Err(ServiceError::AuthFailed("redirect has no fragment".to_string())),
    };

    let params = parse_query(fragment);
    let get = |key: &str| {
        params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
            .filter(|v| !v.is_empty())
    };

    match (get("access_token"), get("refresh_token")) {
        (Some(access_token), Some(refresh_token)) => Ok(OAuthTokens {
            access_token,
            refresh_token,
        }),
        _ => Err(ServiceError::AuthFailed(
            "redirect is missing access_token or refresh_token".to_string(),
        )),
    }
}

fn unwrap_expo_url(url: &str) -> String {
    if !url.starts_with("exp://") || !url.contains("url=") {
        return url.to_string();
    }
    let Some((_, query)) = url.split_once('?') else {
        return url.to_string();
    };
    parse_query(query)
        .into_iter()
        .find(|(k, _)| k == "url")
        .map(|(_, v)| v)
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| url.to_string())
}

/// `application/x-www-form-urlencoded` pairs; undecodable pairs are skipped.
fn parse_query(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| {
            let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
            let k = decode(&k.replace('+', " ")).ok()?.into_owned();
            let v = decode(&v.replace('+', " ")).ok()?.into_owned();
            Some((k, v))
        })
        .collect()
}
