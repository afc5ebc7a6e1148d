// Scripted in-memory Backend for service tests.
//
// Every call is recorded; responses are queued per table and fall back to
// echoing the written rows (with a generated id) or an empty result set.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast;
use uuid::Uuid;

use super::{
    AuthUser, Backend, BackendError, Filter, SelectQuery, Session, SessionEvent, SessionEventKind,
};

#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    Insert { table: String, values: Value },
    Select { table: String, query: SelectQuery },
    BatchInsert { table: String, rows: Vec<Value> },
    Delete { table: String, filters: Vec<Filter> },
    SetSession { access_token: String, refresh_token: String },
    SignOut,
    Upload { bucket: String, path: String, content_type: String },
}

type Queue<T> = Mutex<HashMap<String, VecDeque<Result<T, BackendError>>>>;

pub struct MockBackend {
    calls: Mutex<Vec<BackendCall>>,
    inserts: Queue<Value>,
    selects: Queue<Vec<Value>>,
    batches: Queue<Vec<Value>>,
    session: Mutex<Option<Session>>,
    set_session_error: Mutex<Option<BackendError>>,
    events: broadcast::Sender<SessionEvent>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            calls: Mutex::new(Vec::new()),
            inserts: Mutex::new(HashMap::new()),
            selects: Mutex::new(HashMap::new()),
            batches: Mutex::new(HashMap::new()),
            session: Mutex::new(None),
            set_session_error: Mutex::new(None),
            events,
        }
    }

    pub fn with_insert(self, table: &str, result: Result<Value, BackendError>) -> Self {
        push(&self.inserts, table, result);
        self
    }

    pub fn with_select(self, table: &str, result: Result<Vec<Value>, BackendError>) -> Self {
        push(&self.selects, table, result);
        self
    }

    pub fn with_batch(self, table: &str, result: Result<Vec<Value>, BackendError>) -> Self {
        push(&self.batches, table, result);
        self
    }

    pub fn with_session(self, session: Session) -> Self {
        *self.session.lock().unwrap() = Some(session);
        self
    }

    pub fn failing_set_session(self, err: BackendError) -> Self {
        *self.set_session_error.lock().unwrap() = Some(err);
        self
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, table: &str) -> Vec<BackendCall> {
        self.calls()
            .into_iter()
            .filter(|c| match c {
                BackendCall::Insert { table: t, .. }
                | BackendCall::Select { table: t, .. }
                | BackendCall::BatchInsert { table: t, .. }
                | BackendCall::Delete { table: t, .. } => t == table,
                _ => false,
            })
            .collect()
    }

    fn record(&self, call: BackendCall) {
        self.calls.lock().unwrap().push(call);
    }
}

fn push<T>(queue: &Queue<T>, table: &str, result: Result<T, BackendError>) {
    queue
        .lock()
        .unwrap()
        .entry(table.to_string())
        .or_default()
        .push_back(result);
}

fn pop<T>(queue: &Queue<T>, table: &str) -> Option<Result<T, BackendError>> {
    queue
        .lock()
        .unwrap()
        .get_mut(table)
        .and_then(|q| q.pop_front())
}

fn with_generated_id(mut row: Value) -> Value {
    if let Value::Object(map) = &mut row {
        map.entry("id")
            .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
        map.entry("created_at")
            .or_insert_with(|| Value::String("2025-07-28T10:00:00+00:00".to_string()));
    }
    row
}

#[async_trait]
impl Backend for MockBackend {
    async fn insert_row(&self, table: &str, values: Value) -> Result<Value, BackendError> {
        self.record(BackendCall::Insert {
            table: table.to_string(),
            values: values.clone(),
        });
        pop(&self.inserts, table).unwrap_or_else(|| Ok(with_generated_id(values)))
    }

    async fn select_rows(
        &self,
        table: &str,
        query: &SelectQuery,
    ) -> Result<Vec<Value>, BackendError> {
        self.record(BackendCall::Select {
            table: table.to_string(),
            query: query.clone(),
        });
        pop(&self.selects, table).unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn batch_insert(
        &self,
        table: &str,
        rows: Vec<Value>,
    ) -> Result<Vec<Value>, BackendError> {
        self.record(BackendCall::BatchInsert {
            table: table.to_string(),
            rows: rows.clone(),
        });
        pop(&self.batches, table)
            .unwrap_or_else(|| Ok(rows.into_iter().map(with_generated_id).collect()))
    }

    async fn delete_rows(&self, table: &str, filters: &[Filter]) -> Result<(), BackendError> {
        self.record(BackendCall::Delete {
            table: table.to_string(),
            filters: filters.to_vec(),
        });
        Ok(())
    }

    async fn get_session(&self) -> Option<Session> {
        self.session.lock().unwrap().clone()
    }

    async fn get_current_user(&self) -> Result<Option<AuthUser>, BackendError> {
        Ok(self.get_session().await.and_then(|s| s.user))
    }

    fn sign_in_with_oauth(
        &self,
        provider: &str,
        redirect_uri: &str,
        _extra_params: &[(&str, &str)],
    ) -> Result<String, BackendError> {
        Ok(format!(
            "https://mock.local/authorize?provider={}&redirect_to={}",
            provider, redirect_uri
        ))
    }

    async fn set_session(
        &self,
        access_token: &str,
        refresh_token: &str,
    ) -> Result<Session, BackendError> {
        self.record(BackendCall::SetSession {
            access_token: access_token.to_string(),
            refresh_token: refresh_token.to_string(),
        });
        if let Some(err) = self.set_session_error.lock().unwrap().clone() {
            return Err(err);
        }
        let session = Session {
            access_token: access_token.to_string(),
            refresh_token: refresh_token.to_string(),
            expires_in: Some(3600),
            token_type: Some("bearer".to_string()),
            user: Some(AuthUser {
                id: Uuid::nil(),
                email: Some("mock@example.com".to_string()),
            }),
        };
        *self.session.lock().unwrap() = Some(session.clone());
        let _ = self.events.send(SessionEvent {
            kind: SessionEventKind::SignedIn,
            session: Some(session.clone()),
        });
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        self.record(BackendCall::SignOut);
        *self.session.lock().unwrap() = None;
        let _ = self.events.send(SessionEvent {
            kind: SessionEventKind::SignedOut,
            session: None,
        });
        Ok(())
    }

    fn on_session_change(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    async fn upload_object(
        &self,
        bucket: &str,
        path: &str,
        _bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, BackendError> {
        self.record(BackendCall::Upload {
            bucket: bucket.to_string(),
            path: path.to_string(),
            content_type: content_type.to_string(),
        });
        Ok(format!("https://mock.local/public/{}/{}", bucket, path))
    }
}
