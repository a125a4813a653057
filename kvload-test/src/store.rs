//! An in-memory key-value store exposed over HTTP.
//!
//! The API mirrors the services kvload is pointed at:
//!
//! - `POST /set` with `{"key", "value"}` stores the value.
//! - `POST /get` with `{"key"}` returns the stored value, or a `Key not found` error.
//! - `DELETE /delete` with `{"key"}` removes the key.
//!
//! All endpoints reply with `{"value": string | null, "error": string | null}`. Request bodies must
//! be JSON objects sent with `Content-Type: application/json`.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, Method, StatusCode};
use axum::{Json, Router, routing};
use serde::Serialize;
use serde_json::{Map, Value};

/// Error message returned by `get` for unknown keys.
pub const KEY_NOT_FOUND: &str = "Key not found";

/// Shared reference to the [`Store`].
pub type SharedStore = Arc<Store>;

/// A request the store accepted, kept for assertions in tests.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: &'static str,
    /// The `Content-Type` header as sent by the client.
    pub content_type: Option<String>,
    /// The JSON object received as body.
    pub body: Map<String, Value>,
}

/// In-memory state behind the test server.
#[derive(Debug, Default)]
pub struct Store {
    entries: Mutex<BTreeMap<String, String>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Store {
    /// Returns the value currently stored under `key`.
    pub fn get(&self, key: &str) -> Option<String> {
        lock(&self.entries).get(key).cloned()
    }

    /// Returns the number of stored keys.
    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns all requests received so far, in arrival order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.requests).clone()
    }

    fn record(
        &self,
        method: Method,
        path: &'static str,
        headers: &HeaderMap,
        body: &Map<String, Value>,
    ) {
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);

        lock(&self.requests).push(RecordedRequest {
            method,
            path,
            content_type,
            body: body.clone(),
        });
    }
}

/// The reply body of all key-value endpoints.
#[derive(Debug, Default, Serialize)]
struct Message {
    value: Option<String>,
    error: Option<String>,
}

/// Creates the router serving the key-value API on top of `store`.
pub fn router(store: SharedStore) -> Router {
    Router::new()
        .route("/health", routing::get(health))
        .route("/set", routing::post(set))
        .route("/get", routing::post(get))
        .route("/delete", routing::delete(delete))
        .with_state(store)
}

fn string_field(body: &Map<String, Value>, field: &str) -> Result<String, StatusCode> {
    match body.get(field) {
        Some(Value::String(s)) => Ok(s.clone()),
        _ => Err(StatusCode::UNPROCESSABLE_ENTITY),
    }
}

async fn health() -> &'static str {
    "OK"
}

async fn set(
    State(store): State<SharedStore>,
    headers: HeaderMap,
    Json(body): Json<Map<String, Value>>,
) -> Result<Json<Message>, StatusCode> {
    store.record(Method::POST, "/set", &headers, &body);
    let key = string_field(&body, "key")?;
    let value = string_field(&body, "value")?;

    tracing::trace!(%key, "set");
    lock(&store.entries).insert(key, value.clone());

    Ok(Json(Message {
        value: Some(value),
        error: None,
    }))
}

async fn get(
    State(store): State<SharedStore>,
    headers: HeaderMap,
    Json(body): Json<Map<String, Value>>,
) -> Result<Json<Message>, StatusCode> {
    store.record(Method::POST, "/get", &headers, &body);
    let key = string_field(&body, "key")?;

    tracing::trace!(%key, "get");
    let message = match store.get(&key) {
        Some(value) => Message {
            value: Some(value),
            error: None,
        },
        None => Message {
            value: None,
            error: Some(KEY_NOT_FOUND.to_owned()),
        },
    };

    Ok(Json(message))
}

async fn delete(
    State(store): State<SharedStore>,
    headers: HeaderMap,
    Json(body): Json<Map<String, Value>>,
) -> Result<Json<Message>, StatusCode> {
    store.record(Method::DELETE, "/delete", &headers, &body);
    let key = string_field(&body, "key")?;

    tracing::trace!(%key, "delete");
    lock(&store.entries).remove(&key);

    Ok(Json(Message::default()))
}
