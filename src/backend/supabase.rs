// src/backend/supabase.rs - Backend over Supabase REST (PostgREST, GoTrue, Storage)

use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, error};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::{RwLock, broadcast};
use urlencoding::encode;

use super::{
    AuthUser, Backend, BackendError, Filter, SelectQuery, Session, SessionEvent, SessionEventKind,
};

const EVENT_CAPACITY: usize = 16;

/// Handle on one Supabase project. Clones share the session slot; use
/// [`SupabaseClient::with_access_token`] for a handle scoped to one caller.
#[derive(Clone)]
pub struct SupabaseClient {
    client: Client,
    base_url: String,
    anon_key: String,
    session: Arc<RwLock<Option<Session>>>,
    events: broadcast::Sender<SessionEvent>,
}

#[derive(Deserialize)]
struct TokenResp {
    access_token: String,
    refresh_token: String,
    expires_in: Option<i64>,
    token_type: Option<String>,
    user: Option<AuthUser>,
}

impl SupabaseClient {
    pub fn new(client: Client, supabase_url: &str, anon_key: &str) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            client,
            base_url: supabase_url.trim().trim_end_matches('/').to_string(),
            anon_key: anon_key.trim().to_string(),
            session: Arc::new(RwLock::new(None)),
            events,
        }
    }

    /// New handle sharing the HTTP pool but carrying its own session, so
    /// row-level security is evaluated as the token's user.
    pub fn with_access_token(&self, access_token: &str) -> Self {
        self.scoped(Some(Session {
            access_token: access_token.to_string(),
            refresh_token: String::new(),
            expires_in: None,
            token_type: Some("bearer".to_string()),
            user: None,
        }))
    }

    /// New handle with an empty session slot of its own, for flows that
    /// establish a session (OAuth callback) without touching other callers.
    pub fn detached(&self) -> Self {
        self.scoped(None)
    }

    fn scoped(&self, session: Option<Session>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            anon_key: self.anon_key.clone(),
            session: Arc::new(RwLock::new(session)),
            events,
        }
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    pub fn public_url(&self, bucket: &str, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url,
            bucket,
            encode_object_path(path)
        )
    }

    async fn bearer(&self) -> String {
        match self.session.read().await.as_ref() {
            Some(s) => s.access_token.clone(),
            None => self.anon_key.clone(),
        }
    }

    fn headers_for(&self, bearer: &str) -> Result<HeaderMap, BackendError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert("apikey", header_value(&self.anon_key)?);
        headers.insert(AUTHORIZATION, header_value(&format!("Bearer {}", bearer))?);
        Ok(headers)
    }

    async fn headers(&self) -> Result<HeaderMap, BackendError> {
        let bearer = self.bearer().await;
        self.headers_for(&bearer)
    }

    async fn fetch_user(&self, access_token: &str) -> Result<AuthUser, BackendError> {
        let resp = self
            .client
            .get(self.auth_url("user"))
            .headers(self.headers_for(access_token)?)
            .send()
            .await?;
        let text = expect_success(resp).await?;
        Ok(serde_json::from_str(&text)?)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session, BackendError> {
        let resp = self
            .client
            .post(self.auth_url("token?grant_type=refresh_token"))
            .headers(self.headers_for(&self.anon_key)?)
            .json(&serde_json::json!({ "refresh_token": refresh_token }))
            .send()
            .await?;
        let text = expect_success(resp).await?;
        let tr: TokenResp = serde_json::from_str(&text)?;
        Ok(Session {
            access_token: tr.access_token,
            refresh_token: tr.refresh_token,
            expires_in: tr.expires_in,
            token_type: tr.token_type,
            user: tr.user,
        })
    }

    /// Trades the stored refresh token for a new pair and publishes
    /// `TokenRefreshed`.
    pub async fn refresh_session(&self) -> Result<Session, BackendError> {
        let Some(current) = self.get_session().await else {
            return Err(BackendError::new("no session to refresh"));
        };
        if current.refresh_token.is_empty() {
            return Err(BackendError::new("session has no refresh token"));
        }
        let session = self.refresh(&current.refresh_token).await?;
        self.store_session(Some(session.clone()), SessionEventKind::TokenRefreshed)
            .await;
        Ok(session)
    }

    async fn store_session(&self, session: Option<Session>, kind: SessionEventKind) {
        *self.session.write().await = session.clone();
        // Nobody listening is fine.
        let _ = self.events.send(SessionEvent { kind, session });
    }
}

#[async_trait]
impl Backend for SupabaseClient {
    async fn insert_row(&self, table: &str, values: Value) -> Result<Value, BackendError> {
        debug!("insert into {}", table);
        let resp = self
            .client
            .post(self.rest_url(table))
            .headers(self.headers().await?)
            .header("Prefer", "return=representation")
            .json(&values)
            .send()
            .await?;
        let rows = read_rows(resp).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| BackendError::new(format!("insert into {} returned no rows", table)))
    }

    async fn select_rows(
        &self,
        table: &str,
        query: &SelectQuery,
    ) -> Result<Vec<Value>, BackendError> {
        let params = query_params(query);
        debug!("select from {} {:?}", table, params);
        let resp = self
            .client
            .get(self.rest_url(table))
            .headers(self.headers().await?)
            .query(&params)
            .send()
            .await?;
        read_rows(resp).await
    }

    async fn batch_insert(
        &self,
        table: &str,
        rows: Vec<Value>,
    ) -> Result<Vec<Value>, BackendError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        debug!("batch insert of {} rows into {}", rows.len(), table);
        let resp = self
            .client
            .post(self.rest_url(table))
            .headers(self.headers().await?)
            .header("Prefer", "return=representation")
            .json(&Value::Array(rows))
            .send()
            .await?;
        read_rows(resp).await
    }

    async fn delete_rows(&self, table: &str, filters: &[Filter]) -> Result<(), BackendError> {
        if filters.is_empty() {
            return Err(BackendError::new(format!(
                "refusing unfiltered delete on {}",
                table
            )));
        }
        let params: Vec<(String, String)> = filters.iter().map(render_filter).collect();
        let resp = self
            .client
            .delete(self.rest_url(table))
            .headers(self.headers().await?)
            .query(&params)
            .send()
            .await?;
        expect_success(resp).await.map(|_| ())
    }

    async fn get_session(&self) -> Option<Session> {
        self.session.read().await.clone()
    }

    async fn get_current_user(&self) -> Result<Option<AuthUser>, BackendError> {
        let Some(session) = self.get_session().await else {
            return Ok(None);
        };
        self.fetch_user(&session.access_token).await.map(Some)
    }

    fn sign_in_with_oauth(
        &self,
        provider: &str,
        redirect_uri: &str,
        extra_params: &[(&str, &str)],
    ) -> Result<String, BackendError> {
        if provider.trim().is_empty() {
            return Err(BackendError::new("oauth provider is required"));
        }
        let mut url = format!(
            "{}?provider={}&redirect_to={}",
            self.auth_url("authorize"),
            encode(provider),
            encode(redirect_uri)
        );
        for (k, v) in extra_params {
            url.push_str(&format!("&{}={}", encode(k), encode(v)));
        }
        Ok(url)
    }

    async fn set_session(
        &self,
        access_token: &str,
        refresh_token: &str,
    ) -> Result<Session, BackendError> {
        let session = match self.fetch_user(access_token).await {
            Ok(user) => Session {
                access_token: access_token.to_string(),
                refresh_token: refresh_token.to_string(),
                expires_in: None,
                token_type: Some("bearer".to_string()),
                user: Some(user),
            },
            // Expired access token: trade the refresh token for a new pair.
            Err(e) if e.is_unauthorized() => self.refresh(refresh_token).await?,
            Err(e) => return Err(e),
        };
        // Establishing a session is a sign-in even when it took a refresh.
        self.store_session(Some(session.clone()), SessionEventKind::SignedIn)
            .await;
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        if let Some(session) = self.get_session().await {
            let resp = self
                .client
                .post(self.auth_url("logout"))
                .headers(self.headers_for(&session.access_token)?)
                .send()
                .await?;
            let status = resp.status();
            // Session already gone on the server side still counts as signed out.
            let gone = matches!(
                status,
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND
            );
            if !gone {
                expect_success(resp).await?;
            }
        }
        self.store_session(None, SessionEventKind::SignedOut).await;
        Ok(())
    }

    fn on_session_change(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    async fn upload_object(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, BackendError> {
        let url = format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url,
            bucket,
            encode_object_path(path)
        );
        debug!("upload {} bytes to {}", bytes.len(), url);
        let mut headers = self.headers().await?;
        headers.insert(CONTENT_TYPE, header_value(content_type)?);
        let resp = self
            .client
            .post(&url)
            .headers(headers)
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await?;
        expect_success(resp).await?;
        Ok(self.public_url(bucket, path))
    }
}

fn header_value(v: &str) -> Result<HeaderValue, BackendError> {
    HeaderValue::from_str(v).map_err(|e| BackendError::new(format!("invalid header value: {}", e)))
}

fn encode_object_path(path: &str) -> String {
    path.split('/')
        .map(|segment| encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// PostgREST reserves `,.:()"` inside `in.(...)`, so every value is quoted.
fn quote_value(v: &str) -> String {
    format!("\"{}\"", v.replace('\\', "\\\\").replace('"', "\\\""))
}

fn render_filter(filter: &Filter) -> (String, String) {
    match filter {
        Filter::Eq(column, value) => (column.clone(), format!("eq.{}", value)),
        Filter::In(column, values) => {
            let list = values
                .iter()
                .map(|v| quote_value(v))
                .collect::<Vec<_>>()
                .join(",");
            (column.clone(), format!("in.({})", list))
        }
    }
}

fn query_params(query: &SelectQuery) -> Vec<(String, String)> {
    let mut params = vec![("select".to_string(), query.columns.clone())];
    params.extend(query.filters.iter().map(render_filter));
    if let Some(order) = &query.order {
        let dir = if order.ascending { "asc" } else { "desc" };
        params.push(("order".to_string(), format!("{}.{}", order.column, dir)));
    }
    params
}

async fn expect_success(resp: Response) -> Result<String, BackendError> {
    let status = resp.status();
    let text = resp.text().await.unwrap_or_default();
    if !status.is_success() {
        let err = parse_error(status, &text);
        error!("supabase request failed: {} {:?}", status, err);
        return Err(err);
    }
    Ok(text)
}

async fn read_rows(resp: Response) -> Result<Vec<Value>, BackendError> {
    let text = expect_success(resp).await?;
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    match serde_json::from_str::<Value>(&text)? {
        Value::Array(rows) => Ok(rows),
        Value::Null => Ok(Vec::new()),
        single => Ok(vec![single]),
    }
}

/// Normalizes the PostgREST (`message`, `code`) and GoTrue (`msg`,
/// `error_description`, `error_code`) error bodies.
fn parse_error(status: StatusCode, body: &str) -> BackendError {
    let fallback = || format!("{} {}", status, body.trim());
    let Ok(json) = serde_json::from_str::<Value>(body) else {
        return BackendError {
            message: fallback(),
            code: None,
            status: Some(status.as_u16()),
        };
    };

    let message = ["message", "msg", "error_description", "error"]
        .iter()
        .find_map(|k| json.get(*k).and_then(|v| v.as_str()))
        .map(|s| s.to_string())
        .unwrap_or_else(fallback);

    let code = ["code", "error_code"]
        .iter()
        .find_map(|k| json.get(*k))
        .and_then(|v| match v {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        });

    BackendError {
        message,
        code,
        status: Some(status.as_u16()),
    }
}
