use std::net::TcpListener;
use std::time::Duration;

use kvload::http::Outcome;
use kvload::request::{ALPHABET, KEY_LEN, KeyRequest, SetRequest, VALUE_LEN};
use kvload::{Error, HttpRemote, Request, Task, Workload};
use kvload_test::server::TestServer;
use kvload_test::store::RecordedRequest;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use reqwest::Method;
use serde_json::Value;

fn field<'a>(request: &'a RecordedRequest, name: &str) -> &'a str {
    request.body[name].as_str().unwrap()
}

fn assert_symbols(s: &str, len: usize) {
    assert_eq!(s.len(), len, "unexpected length of {s}");
    assert!(
        s.bytes().all(|b| ALPHABET.contains(&b)),
        "unexpected symbol in {s}"
    );
}

#[tokio::test]
async fn set_posts_key_and_value() {
    kvload_test::tracing::init();
    let server = TestServer::new().await;
    let remote = HttpRemote::new(server.url("/")).unwrap();

    let mut rng = SmallRng::from_os_rng();
    let request = Request::set(&mut rng);
    let reply = remote.send(&request).await.unwrap();
    assert_eq!(reply.outcome, Outcome::Stored);

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    let received = &requests[0];
    assert_eq!(received.method, Method::POST);
    assert_eq!(received.path, "/set");
    assert_eq!(received.content_type.as_deref(), Some("application/json"));
    assert_eq!(received.body.len(), 2);
    assert_symbols(field(received, "key"), KEY_LEN);
    assert_symbols(field(received, "value"), VALUE_LEN);

    assert_eq!(
        server.get_value(field(received, "key")).as_deref(),
        Some(field(received, "value"))
    );
}

#[tokio::test]
async fn get_posts_only_key() {
    let server = TestServer::new().await;
    let remote = HttpRemote::new(server.url("/")).unwrap();

    let mut rng = SmallRng::from_os_rng();
    let reply = remote.send(&Request::get(&mut rng)).await.unwrap();
    assert_eq!(reply.outcome, Outcome::Missing);

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    let received = &requests[0];
    assert_eq!(received.method, Method::POST);
    assert_eq!(received.path, "/get");
    assert_eq!(received.content_type.as_deref(), Some("application/json"));
    assert_eq!(received.body.len(), 1);
    assert_symbols(field(received, "key"), KEY_LEN);
}

#[tokio::test]
async fn delete_sends_only_key() {
    let server = TestServer::new().await;
    let remote = HttpRemote::new(server.url("/")).unwrap();

    let mut rng = SmallRng::from_os_rng();
    let reply = remote.send(&Request::delete(&mut rng)).await.unwrap();
    assert_eq!(reply.outcome, Outcome::Deleted);

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    let received = &requests[0];
    assert_eq!(received.method, Method::DELETE);
    assert_eq!(received.path, "/delete");
    assert_eq!(received.content_type.as_deref(), Some("application/json"));
    assert_eq!(received.body.len(), 1);
    assert_symbols(field(received, "key"), KEY_LEN);
}

#[tokio::test]
async fn get_finds_value_after_set() {
    let server = TestServer::new().await;
    let remote = HttpRemote::new(server.url("/")).unwrap();

    let key = "ABCDE12345".to_owned();
    let value = "VALUEVALUEVALUE01234".to_owned();

    remote
        .set(SetRequest {
            key: key.clone(),
            value: value.clone(),
        })
        .await
        .unwrap();

    let reply = remote.get(KeyRequest { key: key.clone() }).await.unwrap();
    assert_eq!(reply.outcome, Outcome::Found(value));

    remote.delete(KeyRequest { key: key.clone() }).await.unwrap();
    let reply = remote.get(KeyRequest { key }).await.unwrap();
    assert_eq!(reply.outcome, Outcome::Missing);
    assert!(server.store().is_empty());
}

#[tokio::test]
async fn reports_bytes_sent() {
    let server = TestServer::new().await;
    let remote = HttpRemote::new(server.url("/")).unwrap();

    let mut rng = SmallRng::from_os_rng();
    let request = Request::set(&mut rng);
    let expected = request.to_body().unwrap().len() as u64;

    let reply = remote.send(&request).await.unwrap();
    assert_eq!(reply.bytes_sent, expected);
}

#[tokio::test]
async fn non_success_status_is_an_error() {
    let server = TestServer::new().await;
    let remote = HttpRemote::new(server.url("/unknown-prefix")).unwrap();

    let mut rng = SmallRng::from_os_rng();
    let err = remote.send(&Request::get(&mut rng)).await.unwrap_err();

    match err {
        Error::Status { task, status } => {
            assert_eq!(task, Task::Get);
            assert_eq!(status.as_u16(), 404);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(server.requests().is_empty());
}

#[tokio::test]
async fn server_requires_json_content_type() {
    let server = TestServer::new().await;

    let response = reqwest::Client::new()
        .post(server.url("/set"))
        .body(r#"{"key": "ABCDE12345", "value": "VALUEVALUEVALUE01234"}"#)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 415);
    assert!(server.requests().is_empty());
    assert!(server.store().is_empty());
}

#[tokio::test]
async fn server_requires_string_fields() {
    let server = TestServer::new().await;
    let client = reqwest::Client::new();

    let response = client
        .post(server.url("/set"))
        .json(&serde_json::json!({"key": "A"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 422);

    let response = client
        .post(server.url("/get"))
        .json(&serde_json::json!({"key": 42}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 422);

    assert!(server.store().is_empty());
}

#[tokio::test]
async fn health_is_ok() {
    let server = TestServer::new().await;
    let response = reqwest::get(server.url("/health")).await.unwrap();
    assert!(response.status().is_success());
}

#[tokio::test]
async fn runs_mixed_workload() {
    kvload_test::tracing::init();
    let server = TestServer::new().await;
    let remote = HttpRemote::new(server.url("/")).unwrap();

    let workload = Workload::builder("mixed").concurrency(4).build().unwrap();
    let summary = kvload::run(remote, vec![workload], Duration::from_secs(1))
        .await
        .unwrap();

    let total = &summary.total;
    assert_eq!(summary.workloads.len(), 1);
    assert_eq!(summary.workloads[0].name, "mixed");
    assert_eq!(total.total_failures(), 0);
    assert!(total.ops(Task::Set) > 0);
    assert!(total.ops(Task::Get) > 0);
    assert!(total.ops(Task::Delete) > 0);

    // keys are never reused, so every lookup misses
    assert_eq!(total.get_hits(), 0);
    assert_eq!(total.get_misses(), total.ops(Task::Get) as u64);

    let requests = server.requests();
    assert_eq!(requests.len(), total.total_ops());
    for request in &requests {
        let fields: Vec<_> = request.body.keys().map(String::as_str).collect();
        match request.path {
            "/set" => assert_eq!(fields, ["key", "value"]),
            "/get" | "/delete" => assert_eq!(fields, ["key"]),
            other => panic!("unexpected path {other}"),
        }
        assert!(request.body.values().all(Value::is_string));
    }
}

#[tokio::test]
async fn runs_multiple_workloads_with_weights() {
    let server = TestServer::new().await;
    let remote = HttpRemote::new(server.url("/")).unwrap();

    let writes = Workload::builder("writes")
        .concurrency(2)
        .task_weights(1, 0, 0)
        .build()
        .unwrap();
    let reads = Workload::builder("reads")
        .concurrency(2)
        .task_weights(0, 1, 0)
        .build()
        .unwrap();

    let summary = kvload::run(remote, vec![writes, reads], Duration::from_millis(500))
        .await
        .unwrap();

    let writes = &summary.workloads[0].metrics;
    assert!(writes.ops(Task::Set) > 0);
    assert_eq!(writes.ops(Task::Get), 0);
    assert_eq!(writes.ops(Task::Delete), 0);

    let reads = &summary.workloads[1].metrics;
    assert_eq!(reads.ops(Task::Set), 0);
    assert!(reads.ops(Task::Get) > 0);

    assert_eq!(
        summary.total.total_ops(),
        writes.total_ops() + reads.total_ops()
    );
    assert_eq!(server.store().len(), writes.ops(Task::Set));
}

#[tokio::test]
async fn unreachable_remote_counts_failures() {
    // Grab a free port and release it again so nothing is listening there.
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let remote =
        HttpRemote::with_timeout(format!("http://127.0.0.1:{port}"), Duration::from_secs(1))
            .unwrap();

    let workload = Workload::builder("offline").concurrency(2).build().unwrap();
    let summary = kvload::run(remote, vec![workload], Duration::from_millis(300))
        .await
        .unwrap();

    assert_eq!(summary.total.total_ops(), 0);
    assert!(summary.total.total_failures() > 0);
}
