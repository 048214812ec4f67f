mod common;

use common::{build_client, sse_body, RecordingView, ViewEvent};
use mockito::Matcher;
use portal_chat::{
    ChatError, ChatOptions, DiscardReason, Lifecycle, MemorySessionStore, TurnOutcome,
};
use serde_json::json;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

const KEY: &str = "pc_chat_session_id";

/// First chunk right away, then the server goes quiet
fn stalled_body(w: &mut dyn Write) -> std::io::Result<()> {
    w.write_all(b"data: {\"type\":\"chunk\",\"content\":\"A\"}\n")?;
    w.flush()?;
    std::thread::sleep(Duration::from_secs(3));
    Ok(())
}

#[tokio::test]
async fn test_stop_turn_discards_quietly() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/api/chat/stream")
        .match_body(Matcher::PartialJson(json!({"message": "first"})))
        .with_status(200)
        .with_chunked_body(stalled_body)
        .create_async()
        .await;
    server
        .mock("POST", "/api/chat/stream")
        .match_body(Matcher::PartialJson(json!({"message": "again"})))
        .with_status(200)
        .with_body(sse_body(&[
            r#"{"type":"chunk","content":"B"}"#,
            r#"{"type":"done"}"#,
        ]))
        .create_async()
        .await;

    let mut client = build_client(
        &server.url(),
        Arc::new(MemorySessionStore::with_entry(KEY, "S1")),
        RecordingView::default(),
        ChatOptions::new(KEY),
    );
    client.init().await.unwrap();
    let handle = client.handle();
    client.view_mut().stop_on_update = Some(handle.clone());

    let outcome = client.send_message("first").await.unwrap();
    assert_eq!(outcome, TurnOutcome::Discarded(DiscardReason::Stopped));
    assert_eq!(client.messages().len(), 1);
    assert!(client.view().notices().is_empty());
    assert!(client.view().events.contains(&ViewEvent::Discarded(1)));
    assert!(!handle.stop_turn());

    // the client stays usable after a stopped turn
    let outcome = client.send_message("again").await.unwrap();
    assert!(matches!(outcome, TurnOutcome::Finalized(ref m) if m.content == "B"));
    assert_eq!(client.lifecycle(), Lifecycle::Active);
}

#[tokio::test]
async fn test_stop_from_another_task() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/api/chat/stream")
        .with_status(200)
        .with_chunked_body(|w| {
            std::thread::sleep(Duration::from_secs(3));
            w.write_all(b"data: {\"type\":\"done\"}\n")
        })
        .create_async()
        .await;

    let mut client = build_client(
        &server.url(),
        Arc::new(MemorySessionStore::with_entry(KEY, "S1")),
        RecordingView::default(),
        ChatOptions::new(KEY),
    );
    client.init().await.unwrap();

    let handle = client.handle();
    let stopper = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        handle.stop_turn()
    });

    let outcome = client.send_message("hi").await.unwrap();
    assert!(stopper.await.unwrap());
    assert_eq!(outcome, TurnOutcome::Discarded(DiscardReason::Stopped));
    assert_eq!(client.messages().len(), 1);
}

#[tokio::test]
async fn test_dispose_mid_stream_silences_view() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/api/chat/stream")
        .with_status(200)
        .with_chunked_body(stalled_body)
        .create_async()
        .await;

    let mut client = build_client(
        &server.url(),
        Arc::new(MemorySessionStore::with_entry(KEY, "S1")),
        RecordingView::default(),
        ChatOptions::new(KEY),
    );
    client.init().await.unwrap();
    let handle = client.handle();
    client.view_mut().dispose_on_update = Some(handle.clone());

    let outcome = client.send_message("hi").await.unwrap();
    assert_eq!(outcome, TurnOutcome::Discarded(DiscardReason::Stopped));
    assert_eq!(client.lifecycle(), Lifecycle::Disposed);
    assert!(handle.is_disposed());

    let events = &client.view().events;
    assert!(matches!(events.last(), Some(ViewEvent::Updated(_))));
    assert!(client.view().notices().is_empty());

    assert!(matches!(
        client.send_message("again").await,
        Err(ChatError::Disposed)
    ));
    assert!(matches!(client.ensure_session().await, Err(ChatError::Disposed)));
    assert!(matches!(client.init().await, Err(ChatError::Disposed)));
}

#[tokio::test]
async fn test_dispose_through_client() {
    let mut client = build_client(
        "http://127.0.0.1:9",
        Arc::new(MemorySessionStore::with_entry(KEY, "S1")),
        RecordingView::default(),
        ChatOptions::new(KEY),
    );
    client.init().await.unwrap();
    let handle = client.handle();

    client.dispose();
    assert!(handle.is_disposed());
    assert!(matches!(client.clear_chat().await, Err(ChatError::Disposed)));
    assert!(matches!(client.fetch_history().await, Err(ChatError::Disposed)));
}
