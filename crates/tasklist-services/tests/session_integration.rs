//! End-to-end session tests against a mock task store.

use std::time::Duration;

use tasklist_services::{
    LoadState, Mutation, RetryConfig, Session, TaskBackend, TaskClient, TaskListOptions,
    UserAction,
};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn remote_task(id: &str, name: &str, done: bool) -> serde_json::Value {
    serde_json::json!({ "_id": id, "name": name, "done": done })
}

fn session_for(server: &MockServer) -> Session {
    let client = TaskClient::new(&server.uri(), Duration::from_secs(5))
        .unwrap()
        .with_retry(RetryConfig::none());
    Session::new(
        TaskBackend::http(client),
        TaskListOptions::default(),
        tokio::runtime::Handle::current(),
    )
}

#[tokio::test]
async fn test_load_failure_blocks_rendering() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let mut session = session_for(&mock_server);
    session.start();
    session.settle().await;

    assert!(matches!(session.state().load_state(), LoadState::Failed(_)));
    assert!(session.state().visible_rows().is_none());
}

#[tokio::test]
async fn test_create_attaches_remote_id_without_duplicates() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/create"))
        .and(body_json(serde_json::json!({ "task": "test", "done": false })))
        .respond_with(ResponseTemplate::new(200).set_body_json(remote_task("abc123", "test", false)))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!([remote_task("abc123", "test", false)])),
        )
        .mount(&mock_server)
        .await;

    let mut session = session_for(&mock_server);
    session.start();
    session.settle().await;

    session.dispatch(UserAction::SetInput("test".into()));
    session.dispatch(UserAction::Submit);

    let rows = session.state().rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].task().id, None);
    assert!(!rows[0].task().done);
    let key = rows[0].key();

    session.settle().await;

    let rows = session.state().rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].key(), key);
    assert_eq!(rows[0].task().id.as_deref(), Some("abc123"));
    assert_eq!(session.state().reference().len(), 1);
}

#[tokio::test]
async fn test_toggle_failure_rolls_back_and_records() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            remote_task("m1", "buy milk", false),
            remote_task("d1", "walk dog", true),
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/update"))
        .respond_with(ResponseTemplate::new(400))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut session = session_for(&mock_server);
    session.start();
    session.settle().await;

    session.dispatch(UserAction::Toggle(0));
    assert!(session.state().rows()[0].task().done);

    session.settle().await;

    assert!(!session.state().rows()[0].task().done);
    let failures = session.state().failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(
        failures[0].mutation,
        Mutation::Update {
            id: "m1".into(),
            done: true
        }
    );
    assert!(failures[0].message.contains("400"));
}

#[tokio::test]
async fn test_search_after_refresh_uses_latest_reference() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            remote_task("m1", "buy milk", false),
        ])))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/delete"))
        .and(body_json(serde_json::json!({ "id": "m1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "message": "ok" })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&mock_server)
        .await;

    let mut session = session_for(&mock_server);
    session.start();
    session.settle().await;
    assert!(session.state().show_search());

    session.dispatch(UserAction::Delete(0));
    session.settle().await;

    session.dispatch(UserAction::Search(String::new()));
    assert!(session.state().rows().is_empty());
    assert!(!session.state().show_search());
}
