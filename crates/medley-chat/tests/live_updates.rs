//! End-to-end live updates over a real socket.

use std::sync::Arc;
use std::time::Duration;

use medley_chat::client::{ChatApi, EventStreamClient};
use medley_chat::{build_router, ChatEvent, ChatState};
use medley_config::ChatConfig;
use medley_security::PasswordHasher;
use medley_test_utils::spawn_server;
use pretty_assertions::assert_eq;
use tokio::sync::mpsc;
use tokio::time::timeout;

async fn server() -> String {
    let state = ChatState::with_hasher(ChatConfig::default(), PasswordHasher::new(1024, 1).unwrap());
    let addr = spawn_server(build_router(Arc::new(state))).await;
    format!("http://{addr}")
}

async fn next(rx: &mut mpsc::Receiver<ChatEvent>) -> ChatEvent {
    timeout(Duration::from_secs(5), rx.recv()).await.expect("event in time").expect("stream open")
}

#[tokio::test]
async fn subscriber_sees_connected_messages_typing_and_undo() {
    let base = server().await;

    let mut alice = ChatApi::new(&base);
    alice.register("alice", "secret1", "Alice").await.unwrap();
    alice.login("alice", "secret1").await.unwrap();

    let mut bobby = ChatApi::new(&base);
    bobby.register("bobby", "secret1", "").await.unwrap();
    bobby.login("bobby", "secret1").await.unwrap();

    let (tx, mut rx) = mpsc::channel(16);
    let handle = EventStreamClient::new(&base, "general", alice.token().unwrap()).spawn(tx);

    assert_eq!(next(&mut rx).await, ChatEvent::Connected { username: "alice".into() });

    let sent = bobby.send("general", "hi @alice", "text").await.unwrap();
    match next(&mut rx).await {
        ChatEvent::NewMessage { message } => assert_eq!(message, sent),
        other => panic!("unexpected event {other:?}"),
    }

    bobby.typing("general", true).await.unwrap();
    assert_eq!(next(&mut rx).await, ChatEvent::Typing { username: "bobby".into(), is_typing: true });

    let undone = bobby.undo("general").await.unwrap();
    assert_eq!(next(&mut rx).await, ChatEvent::MessageDeleted { message_id: undone });

    handle.shutdown().await;
}

#[tokio::test]
async fn own_typing_is_not_echoed() {
    let base = server().await;
    let mut alice = ChatApi::new(&base);
    alice.register("alice", "secret1", "").await.unwrap();
    alice.login("alice", "secret1").await.unwrap();

    let (tx, mut rx) = mpsc::channel(16);
    let handle = EventStreamClient::new(&base, "general", alice.token().unwrap()).spawn(tx);
    next(&mut rx).await;

    alice.typing("general", true).await.unwrap();
    alice.send("general", "after typing", "text").await.unwrap();
    match next(&mut rx).await {
        ChatEvent::NewMessage { message } => assert_eq!(message.content, "after typing"),
        other => panic!("unexpected event {other:?}"),
    }
    handle.shutdown().await;
}

#[tokio::test]
async fn joining_is_announced_to_others_only() {
    let base = server().await;
    let mut alice = ChatApi::new(&base);
    alice.register("alice", "secret1", "").await.unwrap();
    alice.login("alice", "secret1").await.unwrap();
    let mut bobby = ChatApi::new(&base);
    bobby.register("bobby", "secret1", "Bobby").await.unwrap();
    bobby.login("bobby", "secret1").await.unwrap();

    let (alice_tx, mut alice_rx) = mpsc::channel(16);
    let alice_stream = EventStreamClient::new(&base, "general", alice.token().unwrap()).spawn(alice_tx);
    assert_eq!(next(&mut alice_rx).await, ChatEvent::Connected { username: "alice".into() });

    let (bobby_tx, mut bobby_rx) = mpsc::channel(16);
    let bobby_stream = EventStreamClient::new(&base, "general", bobby.token().unwrap()).spawn(bobby_tx);
    assert_eq!(next(&mut bobby_rx).await, ChatEvent::Connected { username: "bobby".into() });

    match next(&mut alice_rx).await {
        ChatEvent::UserJoined { username, display_name, avatar_color } => {
            assert_eq!(username, "bobby");
            assert_eq!(display_name, "Bobby");
            assert!(avatar_color.starts_with('#'), "{avatar_color}");
        }
        other => panic!("unexpected event {other:?}"),
    }

    alice.send("general", "welcome", "text").await.unwrap();
    match next(&mut bobby_rx).await {
        ChatEvent::NewMessage { message } => assert_eq!(message.content, "welcome"),
        other => panic!("unexpected event {other:?}"),
    }

    bobby_stream.shutdown().await;
    alice_stream.shutdown().await;
}

#[tokio::test]
async fn rejected_token_keeps_retrying() {
    let base = server().await;
    let (tx, _rx) = mpsc::channel(4);
    let handle = EventStreamClient::new(&base, "general", "bogus")
        .with_retry_delay(Duration::from_millis(25))
        .spawn(tx);

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(handle.attempts() >= 3, "attempts = {}", handle.attempts());
    assert!(!handle.is_finished());
    handle.shutdown().await;
}
