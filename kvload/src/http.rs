//! Contains a remote implementation using HTTP to interact with the key-value service.

use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, HeaderValue};
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::request::{KeyRequest, Request, SetRequest};

const USER_AGENT: &str = concat!("kvload/", env!("CARGO_PKG_VERSION"));

/// The reply body of the key-value service.
///
/// A `get` for an unknown key replies with `value: null` and an error message.
#[derive(Debug, Default, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// What the remote did with a request.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Outcome {
    /// A `set` was acknowledged.
    Stored,
    /// A `get` returned the stored value.
    Found(String),
    /// A `get` found no value for the key.
    Missing,
    /// A `delete` was acknowledged.
    Deleted,
}

/// The result of a successful request.
#[derive(Clone, Debug)]
pub struct Reply {
    pub outcome: Outcome,
    /// Size of the JSON body that was sent.
    pub bytes_sent: u64,
}

/// A remote implementation using HTTP to interact with the key-value service.
#[derive(Debug, Clone)]
pub struct HttpRemote {
    /// Base URL of the service, without a trailing slash.
    remote: String,
    /// The client used to talk to the service.
    client: reqwest::Client,
}

impl HttpRemote {
    /// Creates a new `HttpRemote` for the given base URL using default client settings.
    pub fn new(remote: impl Into<String>) -> Result<Self> {
        Self::with_client(remote, reqwest::Client::builder())
    }

    /// Creates a new `HttpRemote` that gives up on each request after `timeout`.
    pub fn with_timeout(remote: impl Into<String>, timeout: Duration) -> Result<Self> {
        Self::with_client(remote, reqwest::Client::builder().timeout(timeout))
    }

    fn with_client(remote: impl Into<String>, builder: reqwest::ClientBuilder) -> Result<Self> {
        let remote = remote.into();
        if reqwest::Url::parse(&remote).is_err() {
            return Err(Error::InvalidUrl { url: remote });
        }

        let client = builder.user_agent(USER_AGENT).build()?;
        let remote = remote.trim_end_matches('/').to_owned();
        Ok(Self { remote, client })
    }

    /// Returns the full URL for the given endpoint path.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.remote, path.trim_start_matches('/'))
    }

    /// Sends the request to its endpoint.
    ///
    /// Nothing is retried. Non-success status codes are returned as [`Error::Status`].
    pub async fn send(&self, request: &Request) -> Result<Reply> {
        let task = request.task();
        let body = request.to_body()?;
        let bytes_sent = body.len() as u64;

        tracing::trace!(%task, key = request.key(), "sending request");
        let response = self
            .client
            .request(task.method(), self.url(task.path()))
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status { task, status });
        }

        let outcome = match request {
            Request::Set(_) => Outcome::Stored,
            Request::Get(_) => match response.json::<Message>().await?.value {
                Some(value) => Outcome::Found(value),
                None => Outcome::Missing,
            },
            Request::Delete(_) => Outcome::Deleted,
        };

        Ok(Reply {
            outcome,
            bytes_sent,
        })
    }

    /// Sends `POST /set` with the given key and value.
    pub async fn set(&self, request: SetRequest) -> Result<Reply> {
        self.send(&Request::Set(request)).await
    }

    /// Sends `POST /get` for the given key.
    pub async fn get(&self, request: KeyRequest) -> Result<Reply> {
        self.send(&Request::Get(request)).await
    }

    /// Sends `DELETE /delete` for the given key.
    pub async fn delete(&self, request: KeyRequest) -> Result<Reply> {
        self.send(&Request::Delete(request)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_paths_onto_remote() {
        let remote = HttpRemote::new("http://localhost:8000/").unwrap();
        assert_eq!(remote.url("/set"), "http://localhost:8000/set");

        let remote = HttpRemote::new("http://localhost:8000/kv").unwrap();
        assert_eq!(remote.url("/delete"), "http://localhost:8000/kv/delete");
    }

    #[test]
    fn rejects_invalid_remote() {
        let result = HttpRemote::new("not a url");
        assert!(matches!(result, Err(Error::InvalidUrl { .. })));
    }

    #[test]
    fn message_fields_are_optional() {
        let message: Message = serde_json::from_str(r#"{"value": null}"#).unwrap();
        assert_eq!(message.value, None);
        assert_eq!(message.error, None);

        let message: Message =
            serde_json::from_str(r#"{"value": null, "error": "Key not found"}"#).unwrap();
        assert_eq!(message.error.as_deref(), Some("Key not found"));
    }
}
