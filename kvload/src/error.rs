use reqwest::StatusCode;

use crate::request::Task;

/// Errors that can happen while generating or sending requests.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Any error emitted from the underlying [`reqwest`] client, including timeouts, connection
    /// failures and undecodable replies.
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),
    /// Errors serializing a request body.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// The remote replied with a non-success status code.
    #[error("{task} failed with status {status}")]
    Status {
        /// The task whose request was rejected.
        task: Task,
        /// The status code returned by the remote.
        status: StatusCode,
    },
    /// The remote base URL could not be parsed.
    #[error("invalid remote url `{url}`")]
    InvalidUrl {
        /// The URL as given.
        url: String,
    },
    /// Task weights that can never select a task.
    #[error("invalid task weights")]
    InvalidWeights(#[from] rand_distr::weighted::Error),
}

/// A convenience alias that defaults our [`Error`] type.
pub type Result<T, E = Error> = std::result::Result<T, E>;
