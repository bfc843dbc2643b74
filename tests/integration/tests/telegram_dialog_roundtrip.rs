use std::sync::Arc;

use httpmock::prelude::*;
use serde_json::{json, Value};
use tempfile::tempdir;

use apiary_dialog::{DialogRouter, DialogState, SessionStore};
use apiary_storage::Database;
use apiary_telegram::{TelegramRuntime, TelegramRuntimeConfig};

fn message_update(update_id: u64, chat_id: i64, text: &str) -> Value {
    json!({
        "update_id": update_id,
        "message": {
            "message_id": update_id,
            "date": 1_760_100_000_u64,
            "text": text,
            "chat": {"id": chat_id},
            "from": {"id": chat_id, "username": "keeper"}
        }
    })
}

fn document_update(update_id: u64, chat_id: i64) -> Value {
    json!({
        "update_id": update_id,
        "message": {
            "message_id": update_id,
            "date": 1_760_100_000_u64,
            "document": {"file_id": "doc-1", "file_name": "hive-notes.pdf"},
            "chat": {"id": chat_id},
            "from": {"id": chat_id, "username": "keeper"}
        }
    })
}

fn mock_updates_batch<'a>(
    server: &'a MockServer,
    offset: &str,
    rows: Value,
) -> httpmock::Mock<'a> {
    let offset = offset.to_string();
    server.mock(move |when, then| {
        when.method(GET)
            .path("/bottest-token/getUpdates")
            .query_param("offset", offset.as_str());
        then.status(200)
            .json_body(json!({"ok": true, "result": rows}));
    })
}

fn mock_send_ok(server: &MockServer) -> httpmock::Mock<'_> {
    server.mock(|when, then| {
        when.method(POST).path("/bottest-token/sendMessage");
        then.status(200)
            .json_body(json!({"ok": true, "result": {"message_id": 99}}));
    })
}

fn build_runtime(server: &MockServer, database: Database) -> (TelegramRuntime, Arc<DialogRouter>) {
    let router = Arc::new(DialogRouter::new(database, Arc::new(SessionStore::new())));
    let mut config = TelegramRuntimeConfig::new("test-token");
    config.api_base = server.base_url();
    config.poll_timeout_seconds = 0;
    config.retry_max_attempts = 1;
    config.retry_base_delay_ms = 1;
    let runtime = TelegramRuntime::new(&config, router.clone()).expect("runtime must build");
    (runtime, router)
}

#[tokio::test]
async fn integration_registration_flow_persists_profile_over_the_wire() {
    let temp = tempdir().expect("tempdir");
    let database = Database::open(temp.path().join("apiary.db")).expect("open database");
    let server = MockServer::start();

    let first = mock_updates_batch(&server, "0", json!([message_update(1001, 42, "/reg")]));
    let second = mock_updates_batch(
        &server,
        "1002",
        json!([message_update(1002, 42, "Anna Petrova senior keeper")]),
    );
    let third = mock_updates_batch(
        &server,
        "1003",
        json!([message_update(1003, 42, "hive-master-9")]),
    );
    let sent = mock_send_ok(&server);

    let (mut runtime, _router) = build_runtime(&server, database.clone());
    for _ in 0..3 {
        let report = runtime.run_poll_cycle().await.expect("cycle must run");
        assert_eq!(report.polled_updates, 1);
        assert_eq!(report.handled_events, 1);
        assert_eq!(report.replies_sent, 1);
    }

    first.assert_calls(1);
    second.assert_calls(1);
    third.assert_calls(1);
    sent.assert_calls(3);

    let profile = database
        .find_keeper(42)
        .expect("keeper lookup must work")
        .expect("keeper must be registered");
    assert_eq!(profile.first_name, "Anna");
    assert_eq!(profile.last_name, "Petrova");
    assert_eq!(profile.position, "senior keeper");
    assert_eq!(profile.password, "hive-master-9");
}

#[tokio::test]
async fn integration_family_add_then_delete_updates_storage() {
    let database = Database::open_in_memory().expect("open database");
    let server = MockServer::start();

    let add_command = mock_updates_batch(
        &server,
        "0",
        json!([message_update(2001, 42, "/add_family")]),
    );
    let add_details = mock_updates_batch(
        &server,
        "2002",
        json!([message_update(2002, 42, "77, 2021, Карпатка, Медонос")]),
    );
    let delete_command = mock_updates_batch(
        &server,
        "2003",
        json!([message_update(2003, 42, "/delete_family")]),
    );
    let delete_number = mock_updates_batch(&server, "2004", json!([message_update(2004, 42, "77")]));
    let sent = mock_send_ok(&server);

    let (mut runtime, _router) = build_runtime(&server, database.clone());

    runtime.run_poll_cycle().await.expect("add prompt cycle");
    runtime.run_poll_cycle().await.expect("add details cycle");

    let family = database
        .find_family_by_number("77")
        .expect("family lookup must work")
        .expect("family must be stored");
    assert_eq!(family.birth_year, 2021);
    assert_eq!(family.breed, "Карпатка");
    assert_eq!(family.species, "Медонос");
    assert_eq!(database.family_count().expect("count"), 1);

    runtime.run_poll_cycle().await.expect("delete prompt cycle");
    runtime.run_poll_cycle().await.expect("delete number cycle");

    assert_eq!(database.family_count().expect("count"), 0);
    assert!(database
        .find_family_by_number("77")
        .expect("family lookup must work")
        .is_none());

    add_command.assert_calls(1);
    add_details.assert_calls(1);
    delete_command.assert_calls(1);
    delete_number.assert_calls(1);
    sent.assert_calls(4);
}

#[tokio::test]
async fn integration_poll_offset_advances_across_mixed_batches() {
    let database = Database::open_in_memory().expect("open database");
    let server = MockServer::start();

    let mixed_batch = mock_updates_batch(
        &server,
        "0",
        json!([
            {"update_id": 5001, "edited_message": {"message_id": 9}},
            message_update(5002, 42, "/help")
        ]),
    );
    let empty_batch = mock_updates_batch(&server, "5003", json!([]));
    let sent = mock_send_ok(&server);

    let (mut runtime, _router) = build_runtime(&server, database);

    let report = runtime.run_poll_cycle().await.expect("mixed cycle");
    assert_eq!(report.polled_updates, 2);
    assert_eq!(report.parse_failures, 1);
    assert_eq!(report.handled_events, 1);
    assert_eq!(report.replies_sent, 1);
    assert_eq!(report.next_offset, 5003);

    let report = runtime.run_poll_cycle().await.expect("empty cycle");
    assert_eq!(report.polled_updates, 0);
    assert_eq!(report.next_offset, 5003);

    mixed_batch.assert_calls(1);
    empty_batch.assert_calls(1);
    sent.assert_calls(1);
}

#[tokio::test]
async fn integration_unsupported_content_keeps_the_armed_session() {
    let database = Database::open_in_memory().expect("open database");
    let server = MockServer::start();

    let register = mock_updates_batch(&server, "0", json!([message_update(6001, 42, "/reg")]));
    let document = mock_updates_batch(&server, "6002", json!([document_update(6002, 42)]));
    let sent = mock_send_ok(&server);

    let (mut runtime, router) = build_runtime(&server, database);

    runtime.run_poll_cycle().await.expect("register cycle");
    assert_eq!(router.sessions().state("42"), DialogState::AwaitingProfile);

    let report = runtime.run_poll_cycle().await.expect("document cycle");
    assert_eq!(report.handled_events, 1);
    assert_eq!(report.replies_sent, 1);
    assert_eq!(router.sessions().state("42"), DialogState::AwaitingProfile);

    register.assert_calls(1);
    document.assert_calls(1);
    sent.assert_calls(2);
}
