// src/backend/mod.rs - contract of the hosted backend (rows, auth session, storage)

pub mod supabase;
#[cfg(test)]
pub mod mock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::broadcast;
use uuid::Uuid;

pub use supabase::SupabaseClient;

/// Postgres SQLSTATE for `unique_violation`.
pub const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct BackendError {
    pub message: String,
    /// Provider error code (PostgREST exposes the SQLSTATE here).
    pub code: Option<String>,
    pub status: Option<u16>,
}

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            status: None,
        }
    }

    pub fn with_code(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: Some(code.into()),
            status: None,
        }
    }

    pub fn is_unique_violation(&self) -> bool {
        self.code.as_deref() == Some(UNIQUE_VIOLATION)
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self.status, Some(401) | Some(403))
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        Self {
            message: format!("http error: {}", e),
            code: None,
            status: e.status().map(|s| s.as_u16()),
        }
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(e: serde_json::Error) -> Self {
        Self::new(format!("invalid json: {}", e))
    }
}

/// Row filter, rendered as a PostgREST operator by the Supabase client.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, String),
    In(String, Vec<String>),
}

impl Filter {
    pub fn eq(column: &str, value: impl ToString) -> Self {
        Filter::Eq(column.to_string(), value.to_string())
    }

    pub fn is_in<I, S>(column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        Filter::In(
            column.to_string(),
            values.into_iter().map(|v| v.to_string()).collect(),
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

impl Order {
    pub fn desc(column: &str) -> Self {
        Self {
            column: column.to_string(),
            ascending: false,
        }
    }

    pub fn asc(column: &str) -> Self {
        Self {
            column: column.to_string(),
            ascending: true,
        }
    }
}

/// A select against one table. `columns` uses PostgREST select syntax, so
/// embedded joins (`users(name)`) are expressed there.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    pub columns: String,
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
}

impl SelectQuery {
    pub fn new(columns: &str) -> Self {
        Self {
            columns: columns.to_string(),
            filters: Vec::new(),
            order: None,
        }
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order(mut self, order: Order) -> Self {
        self.order = Some(order);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub user: Option<AuthUser>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionEventKind {
    SignedIn,
    SignedOut,
    TokenRefreshed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionEvent {
    pub kind: SessionEventKind,
    pub session: Option<Session>,
}

#[async_trait]
pub trait Backend: Send + Sync {
    /// Insert one row and return its stored representation.
    async fn insert_row(&self, table: &str, values: Value) -> Result<Value, BackendError>;

    async fn select_rows(&self, table: &str, query: &SelectQuery)
    -> Result<Vec<Value>, BackendError>;

    async fn batch_insert(&self, table: &str, rows: Vec<Value>)
    -> Result<Vec<Value>, BackendError>;

    async fn delete_rows(&self, table: &str, filters: &[Filter]) -> Result<(), BackendError>;

    async fn get_session(&self) -> Option<Session>;

    async fn get_current_user(&self) -> Result<Option<AuthUser>, BackendError>;

    /// Build the provider-hosted authorization URL. No network call.
    fn sign_in_with_oauth(
        &self,
        provider: &str,
        redirect_uri: &str,
        extra_params: &[(&str, &str)],
    ) -> Result<String, BackendError>;

    async fn set_session(
        &self,
        access_token: &str,
        refresh_token: &str,
    ) -> Result<Session, BackendError>;

    async fn sign_out(&self) -> Result<(), BackendError>;

    /// Fires on sign-in, sign-out and token refresh.
    fn on_session_change(&self) -> broadcast::Receiver<SessionEvent>;

    /// Store an object and return its public URL.
    async fn upload_object(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, BackendError>;
}
