//! Saving and loading client history.

mod common;

use pretty_assertions::assert_eq;

use colloquy::prelude::*;
use common::*;

#[tokio::test]
async fn history_moves_between_clients_as_json() {
    let transport = ScriptedTransport::new("mock-chat");
    transport.push(text("The north gate."));
    let source = ready_npc(&transport, with_prompt("You are a guard."));
    source.talk("Which way out?", None).await.unwrap();

    let json = source.save_history().await.unwrap();
    let target = NpcClient::new(with_prompt("Someone else."));
    target.load_history(&json).await.unwrap();

    assert_eq!(target.history().await, source.history().await);
    assert_eq!(target.system_prompt().await.as_deref(), Some("You are a guard."));
}

#[tokio::test]
async fn malformed_history_is_rejected_without_change() {
    let npc = NpcClient::new(with_prompt("p"));
    npc.append_message("user", "kept").await.unwrap();
    let before = npc.history().await;

    let err = npc.load_history("{\"history\": 7}").await.unwrap_err();

    assert!(matches!(err, ColloquyError::InvalidFormat(_)));
    assert_eq!(npc.history().await, before);
}

#[tokio::test]
async fn history_round_trips_through_a_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mira.json");

    let npc = NpcClient::new(with_prompt("You are Mira."));
    npc.append_message("user", "Hello, Mira.").await.unwrap();
    npc.append_message("assistant", "Hello, stranger.").await.unwrap();
    npc.save_history_to(&path).await.unwrap();

    let restored = NpcClient::new(NpcConfig::default());
    restored.load_history_from(&path).await.unwrap();

    assert_eq!(restored.snapshot().await, npc.snapshot().await);
}

#[tokio::test]
async fn loading_a_missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let npc = NpcClient::new(NpcConfig::default());

    let err = npc
        .load_history_from(dir.path().join("absent.json"))
        .await
        .unwrap_err();

    assert!(matches!(err, ColloquyError::Io(_)));
}

#[tokio::test]
async fn typed_snapshot_restore_replaces_history() {
    let npc = NpcClient::new(with_prompt("old"));
    npc.append_message("user", "drop me").await.unwrap();

    npc.restore(ConversationSnapshot {
        prompt: None,
        history: vec![ChatMessage::user("u"), ChatMessage::assistant("a")],
    })
    .await;

    assert_eq!(
        npc.history().await,
        vec![ChatMessage::user("u"), ChatMessage::assistant("a")]
    );
    assert_eq!(npc.system_prompt().await, None);
}
