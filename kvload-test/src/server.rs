//! Exposes an in-process test server for use in integration tests.
//!
//! ```
//! use kvload_test::server::TestServer;
//!
//! #[tokio::main]
//! async fn main() {
//!    let server = TestServer::new().await;
//!    let url = server.url("/health");
//!    // use the URL in tests...
//! }
//! ```

use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;

use crate::store::{self, RecordedRequest, SharedStore, Store};

/// An in-process key-value server for use in integration tests.
///
/// The server keeps all data in memory and records every request it accepts. It listens on a
/// random available port on localhost and stops when dropped.
#[derive(Debug)]
pub struct TestServer {
    handle: tokio::task::JoinHandle<()>,
    socket: SocketAddr,
    store: SharedStore,
}

impl TestServer {
    pub async fn new() -> Self {
        let addr = SocketAddr::from(([127, 0, 0, 1], 0));
        let listener = TcpListener::bind(addr).unwrap();
        listener.set_nonblocking(true).unwrap();
        let socket = listener.local_addr().unwrap();

        let store = Arc::new(Store::default());
        let app = store::router(Arc::clone(&store));

        let handle = tokio::spawn(async move {
            let listener = tokio::net::TcpListener::from_std(listener).unwrap();
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            handle,
            socket,
            store,
        }
    }

    /// Returns a full URL pointing to the given path.
    ///
    /// This URL uses `localhost` as hostname.
    pub fn url(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        format!("http://localhost:{}/{}", self.socket.port(), path)
    }

    /// Returns all requests the server accepted so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.store.requests()
    }

    /// Returns the value currently stored under `key`.
    pub fn get_value(&self, key: &str) -> Option<String> {
        self.store.get(key)
    }

    pub fn store(&self) -> &Store {
        &self.store
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
