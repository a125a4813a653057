//! Randomized requests against the key-value API.
//!
//! Every request carries a freshly generated key. Keys and values are drawn uniformly from
//! [`ALPHABET`] and are never reused or tracked across requests.

use std::fmt;

use rand::Rng;
use reqwest::Method;
use serde::{Deserialize, Serialize};

/// The symbols keys and values are drawn from: uppercase ASCII letters and digits.
pub const ALPHABET: &[u8; 36] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Length of every generated key.
pub const KEY_LEN: usize = 10;

/// Length of every generated value.
pub const VALUE_LEN: usize = 20;

/// Generates a random string of `len` symbols from [`ALPHABET`].
fn random_string<R: Rng>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| char::from(ALPHABET[rng.random_range(0..ALPHABET.len())]))
        .collect()
}

/// Generates a random key of [`KEY_LEN`] symbols.
pub fn random_key<R: Rng>(rng: &mut R) -> String {
    random_string(rng, KEY_LEN)
}

/// Generates a random value of [`VALUE_LEN`] symbols.
pub fn random_value<R: Rng>(rng: &mut R) -> String {
    random_string(rng, VALUE_LEN)
}

/// Body of a `set` request.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct SetRequest {
    pub key: String,
    pub value: String,
}

/// Body of a `get` or `delete` request.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct KeyRequest {
    pub key: String,
}

/// One of the units of work a workload issues.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Task {
    /// Store a value under a key.
    Set,
    /// Look up a key.
    Get,
    /// Remove a key.
    Delete,
}

impl Task {
    /// All tasks, in the order used for weights and reports.
    pub const ALL: [Task; 3] = [Task::Set, Task::Get, Task::Delete];

    /// The HTTP method this task is sent with.
    pub fn method(self) -> Method {
        match self {
            Task::Set | Task::Get => Method::POST,
            Task::Delete => Method::DELETE,
        }
    }

    /// The endpoint path, relative to the remote's base URL.
    pub fn path(self) -> &'static str {
        match self {
            Task::Set => "/set",
            Task::Get => "/get",
            Task::Delete => "/delete",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Task::Set => "set",
            Task::Get => "get",
            Task::Delete => "delete",
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single randomized request, created right before it is sent and dropped afterwards.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Request {
    Set(SetRequest),
    Get(KeyRequest),
    Delete(KeyRequest),
}

impl Request {
    /// Creates a `set` request with a random key and value.
    pub fn set<R: Rng>(rng: &mut R) -> Self {
        let key = random_key(rng);
        let value = random_value(rng);
        Self::Set(SetRequest { key, value })
    }

    /// Creates a `get` request for a random key.
    pub fn get<R: Rng>(rng: &mut R) -> Self {
        Self::Get(KeyRequest {
            key: random_key(rng),
        })
    }

    /// Creates a `delete` request for a random key.
    pub fn delete<R: Rng>(rng: &mut R) -> Self {
        Self::Delete(KeyRequest {
            key: random_key(rng),
        })
    }

    /// Creates a fresh request for the given task.
    pub fn for_task<R: Rng>(task: Task, rng: &mut R) -> Self {
        match task {
            Task::Set => Self::set(rng),
            Task::Get => Self::get(rng),
            Task::Delete => Self::delete(rng),
        }
    }

    pub fn task(&self) -> Task {
        match self {
            Request::Set(_) => Task::Set,
            Request::Get(_) => Task::Get,
            Request::Delete(_) => Task::Delete,
        }
    }

    pub fn key(&self) -> &str {
        match self {
            Request::Set(request) => &request.key,
            Request::Get(request) | Request::Delete(request) => &request.key,
        }
    }

    /// Serializes the JSON body of this request.
    pub fn to_body(&self) -> serde_json::Result<Vec<u8>> {
        match self {
            Request::Set(request) => serde_json::to_vec(request),
            Request::Get(request) | Request::Delete(request) => serde_json::to_vec(request),
        }
    }
}
