mod common;

use common::{build_client, sse_body, RecordingView, ViewEvent};
use portal_chat::{
    ChatError, ChatOptions, FileSessionStore, MemorySessionStore, SessionStore, TurnOutcome,
    CLEAR_CONFIRM_PROMPT, SESSION_INIT_FAILED,
};
use std::sync::Arc;
use tempfile::TempDir;

const MOBILE_KEY: &str = "chat_session_id";
const PC_KEY: &str = "pc_chat_session_id";

#[tokio::test]
async fn test_ensure_session_creates_and_persists() {
    let mut server = mockito::Server::new_async().await;
    let create = server
        .mock("POST", "/api/chat/session")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"success":true,"session_id":"NEW-1"}"#)
        .expect(1)
        .create_async()
        .await;

    let store = Arc::new(MemorySessionStore::new());
    let mut client = build_client(
        &server.url(),
        store.clone(),
        RecordingView::default(),
        ChatOptions::new(MOBILE_KEY),
    );

    assert_eq!(client.ensure_session().await.unwrap(), "NEW-1");
    // second call reuses the stored id
    assert_eq!(client.ensure_session().await.unwrap(), "NEW-1");
    create.assert_async().await;

    assert_eq!(store.get(MOBILE_KEY).as_deref(), Some("NEW-1"));
    assert_eq!(store.get(PC_KEY), None);
}

#[tokio::test]
async fn test_done_session_id_survives_a_restart_without_network() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/api/chat/session")
        .with_status(200)
        .with_body(r#"{"success":true,"session_id":"S0"}"#)
        .expect(1)
        .create_async()
        .await;
    server
        .mock("POST", "/api/chat/stream")
        .with_status(200)
        .with_body(sse_body(&[
            r#"{"type":"chunk","content":"您好"}"#,
            r#"{"type":"done","session_id":"S1"}"#,
        ]))
        .create_async()
        .await;

    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("sessions");

    let mut first = build_client(
        &server.url(),
        Arc::new(FileSessionStore::new(&path)),
        RecordingView::default(),
        ChatOptions::new(PC_KEY),
    );
    first.init().await.unwrap();
    assert_eq!(first.session_id(), Some("S0"));

    first.send_message("hi").await.unwrap();
    assert_eq!(first.session_id(), Some("S1"));
    assert!(first
        .view()
        .events
        .contains(&ViewEvent::Session(Some("S1".to_string()))));
    drop(first);

    // a fresh client pointed at a dead server still restores S1
    let mut second = build_client(
        "http://127.0.0.1:9",
        Arc::new(FileSessionStore::new(&path)),
        RecordingView::default(),
        ChatOptions::new(PC_KEY),
    );
    assert_eq!(second.ensure_session().await.unwrap(), "S1");
    assert!(second.view().notices().is_empty());
}

#[tokio::test]
async fn test_rejected_session_leaves_id_unset() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/api/chat/session")
        .with_status(200)
        .with_body(r#"{"success":false}"#)
        .create_async()
        .await;

    let store = Arc::new(MemorySessionStore::new());
    let mut client = build_client(
        &server.url(),
        store.clone(),
        RecordingView::default(),
        ChatOptions::new(MOBILE_KEY),
    );

    assert!(matches!(
        client.ensure_session().await,
        Err(ChatError::SessionRejected)
    ));
    assert_eq!(client.session_id(), None);
    assert_eq!(store.get(MOBILE_KEY), None);
    assert_eq!(client.view().notices(), vec![SESSION_INIT_FAILED.to_string()]);
}

#[tokio::test]
async fn test_init_tolerates_unreachable_server() {
    let mut client = build_client(
        "http://127.0.0.1:9",
        Arc::new(MemorySessionStore::new()),
        RecordingView::default(),
        ChatOptions::new(MOBILE_KEY),
    );

    client.init().await.unwrap();
    assert_eq!(client.session_id(), None);
    assert_eq!(client.view().notices(), vec![SESSION_INIT_FAILED.to_string()]);
}

#[tokio::test]
async fn test_confirmed_clear_resets_and_creates_new_session() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/api/chat/stream")
        .with_status(200)
        .with_body(sse_body(&[
            r#"{"type":"chunk","content":"好的"}"#,
            r#"{"type":"done","session_id":"S1"}"#,
        ]))
        .create_async()
        .await;
    let delete = server
        .mock("DELETE", "/api/chat/history/S1")
        .with_status(200)
        .with_body(r#"{"success":true}"#)
        .expect(1)
        .create_async()
        .await;
    let create = server
        .mock("POST", "/api/chat/session")
        .with_status(200)
        .with_body(r#"{"success":true,"session_id":"S2"}"#)
        .expect(1)
        .create_async()
        .await;

    let store = Arc::new(MemorySessionStore::with_entry(PC_KEY, "S1"));
    let mut client = build_client(
        &server.url(),
        store.clone(),
        RecordingView::confirming(),
        ChatOptions::new(PC_KEY),
    );
    client.init().await.unwrap();
    client.send_message("hi").await.unwrap();
    assert_eq!(client.messages().len(), 2);

    assert!(client.clear_chat().await.unwrap());
    delete.assert_async().await;
    create.assert_async().await;

    assert!(client.messages().is_empty());
    assert_eq!(client.session_id(), Some("S2"));
    assert_eq!(store.load(PC_KEY).await.unwrap().as_deref(), Some("S2"));

    let events = &client.view().events;
    let confirm_at = events
        .iter()
        .position(|e| *e == ViewEvent::Confirm(CLEAR_CONFIRM_PROMPT.to_string()))
        .unwrap();
    assert_eq!(
        &events[confirm_at..],
        &[
            ViewEvent::Confirm(CLEAR_CONFIRM_PROMPT.to_string()),
            ViewEvent::Cleared,
            ViewEvent::Session(None),
            ViewEvent::Session(Some("S2".to_string())),
        ]
    );
}

#[tokio::test]
async fn test_clear_survives_failed_history_delete() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("DELETE", "/api/chat/history/S1")
        .with_status(500)
        .create_async()
        .await;
    server
        .mock("POST", "/api/chat/session")
        .with_status(200)
        .with_body(r#"{"success":true,"session_id":"S2"}"#)
        .create_async()
        .await;

    let mut client = build_client(
        &server.url(),
        Arc::new(MemorySessionStore::with_entry(PC_KEY, "S1")),
        RecordingView::confirming(),
        ChatOptions::new(PC_KEY),
    );
    client.init().await.unwrap();

    assert!(client.clear_chat().await.unwrap());
    assert_eq!(client.session_id(), Some("S2"));
    assert!(client.view().notices().is_empty());
}

#[tokio::test]
async fn test_declined_clear_makes_no_calls() {
    let mut server = mockito::Server::new_async().await;
    let delete = server
        .mock("DELETE", mockito::Matcher::Any)
        .expect(0)
        .create_async()
        .await;
    let create = server
        .mock("POST", "/api/chat/session")
        .expect(0)
        .create_async()
        .await;

    let store = Arc::new(MemorySessionStore::with_entry(PC_KEY, "S1"));
    let mut client = build_client(
        &server.url(),
        store.clone(),
        RecordingView::default(),
        ChatOptions::new(PC_KEY),
    );
    client.init().await.unwrap();

    assert!(!client.clear_chat().await.unwrap());
    delete.assert_async().await;
    create.assert_async().await;
    assert_eq!(store.get(PC_KEY).as_deref(), Some("S1"));
}

#[tokio::test]
async fn test_fetch_history_for_current_session() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/api/chat/history/S1")
        .with_status(200)
        .with_body(
            r#"{"success":true,"history":[{"role":"user","content":"hi"},{"role":"assistant","content":"您好"}],"message_count":2}"#,
        )
        .create_async()
        .await;

    let mut client = build_client(
        &server.url(),
        Arc::new(MemorySessionStore::with_entry(MOBILE_KEY, "S1")),
        RecordingView::default(),
        ChatOptions::new(MOBILE_KEY),
    );
    client.init().await.unwrap();

    let history = client.fetch_history().await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].content, "您好");
}

#[tokio::test]
async fn test_blank_send_touches_nothing() {
    let mut server = mockito::Server::new_async().await;
    let stream = server
        .mock("POST", "/api/chat/stream")
        .expect(0)
        .create_async()
        .await;

    let mut client = build_client(
        &server.url(),
        Arc::new(MemorySessionStore::with_entry(MOBILE_KEY, "S1")),
        RecordingView::default(),
        ChatOptions::new(MOBILE_KEY),
    );
    client.init().await.unwrap();

    assert_eq!(client.send_message("   ").await.unwrap(), TurnOutcome::Ignored);
    stream.assert_async().await;
    assert!(client.messages().is_empty());
}
