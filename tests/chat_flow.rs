//! Integration tests for the built-in chat room commands over TCP.

mod common;

use common::{TestClient, TestServer};

#[tokio::test]
async fn test_welcome_and_connect_announcement() {
    let server = TestServer::spawn().await.expect("Failed to spawn test server");
    let mut client = server.connect().await.expect("Failed to connect");

    assert_eq!(client.recv().await.unwrap(), common::server::WELCOME);
    assert_eq!(client.recv().await.unwrap(), "127.0.0.1 has connected.");
}

#[tokio::test]
async fn test_say_and_emote_reach_everyone() {
    let server = TestServer::spawn().await.expect("Failed to spawn test server");
    let mut alice = TestClient::join(&server.address(), "Alice").await.unwrap();
    let mut bob = TestClient::join(&server.address(), "Bob").await.unwrap();

    alice.send("say hello").await.unwrap();
    alice.expect("Alice: hello").await.unwrap();
    bob.expect("Alice: hello").await.unwrap();

    bob.send("'hi there").await.unwrap();
    alice.expect("Bob: hi there").await.unwrap();

    bob.send(":waves").await.unwrap();
    alice.expect("Bob waves").await.unwrap();
    bob.expect("Bob waves").await.unwrap();
}

#[tokio::test]
async fn test_unknown_command_and_argument_mismatch() {
    let server = TestServer::spawn().await.expect("Failed to spawn test server");
    let mut alice = TestClient::join(&server.address(), "Alice").await.unwrap();

    alice.send("dance").await.unwrap();
    assert_eq!(alice.recv().await.unwrap(), "I don't understand that.");

    alice.send("who is there").await.unwrap();
    assert_eq!(alice.recv().await.unwrap(), "who:");
    assert_eq!(alice.recv().await.unwrap(), "List everyone who is connected.");
}

#[tokio::test]
async fn test_name_conflict_and_prompt() {
    let server = TestServer::spawn().await.expect("Failed to spawn test server");
    let mut alice = TestClient::join(&server.address(), "Alice").await.unwrap();
    let mut bob = TestClient::join(&server.address(), "Bob").await.unwrap();

    bob.send("name ALICE").await.unwrap();
    assert_eq!(bob.recv().await.unwrap(), "That name is already taken.");

    bob.send("name").await.unwrap();
    assert_eq!(bob.recv().await.unwrap(), "What would you like to be called?");
    bob.send("Robert").await.unwrap();
    alice.expect("Bob is now known as Robert.").await.unwrap();
    bob.expect("Bob is now known as Robert.").await.unwrap();

    bob.send("who").await.unwrap();
    let lines = bob.recv_until(|line| line == "  Robert").await.unwrap();
    assert!(lines.contains(&"Connected (2):".to_string()));
}

#[tokio::test]
async fn test_post_reader_over_the_wire() {
    let server = TestServer::spawn().await.expect("Failed to spawn test server");
    let mut alice = TestClient::join(&server.address(), "Alice").await.unwrap();
    let mut bob = TestClient::join(&server.address(), "Bob").await.unwrap();

    alice.send("post").await.unwrap();
    assert_eq!(
        alice.recv().await.unwrap(),
        "Enter lines of text. Type a full stop (.) on a blank line to finish or @abort to abort."
    );
    alice.send("Roses are red").await.unwrap();
    alice.send("say is not a command here").await.unwrap();
    alice.send(".").await.unwrap();

    bob.expect("Alice posts:").await.unwrap();
    assert_eq!(bob.recv().await.unwrap(), "Roses are red");
    assert_eq!(bob.recv().await.unwrap(), "say is not a command here");
}

#[tokio::test]
async fn test_abort_returns_to_commands() {
    let server = TestServer::spawn().await.expect("Failed to spawn test server");
    let mut alice = TestClient::join(&server.address(), "Alice").await.unwrap();

    alice.send("post").await.unwrap();
    alice.recv().await.unwrap();
    alice.send("draft").await.unwrap();
    alice.send("@abort").await.unwrap();
    assert_eq!(alice.recv().await.unwrap(), "Aborted.");

    alice.send("say back").await.unwrap();
    assert_eq!(alice.recv().await.unwrap(), "Alice: back");
}

#[tokio::test]
async fn test_help_menu_selection() {
    let server = TestServer::spawn().await.expect("Failed to spawn test server");
    let mut alice = TestClient::join(&server.address(), "Alice").await.unwrap();

    alice.send("help").await.unwrap();
    assert_eq!(alice.recv().await.unwrap(), "Showing help for 7 commands.");
    alice
        .expect("Type a number or @abort to abort.")
        .await
        .unwrap();

    alice.send("3").await.unwrap();
    assert_eq!(alice.recv().await.unwrap(), "say:");
    assert_eq!(
        alice.recv().await.unwrap(),
        "Instead of typing \"say \", you can type '."
    );

    assert_eq!(alice.recv().await.unwrap(), "Say something to everyone.");
    assert_eq!(alice.recv().await.unwrap(), "say <text>");

    alice.send("help emote").await.unwrap();
    assert_eq!(alice.recv().await.unwrap(), "emote or me:");
    assert_eq!(
        alice.recv().await.unwrap(),
        "Instead of typing \"emote \", you can type :."
    );
}

#[tokio::test]
async fn test_quit_confirmation_and_disconnect() {
    let server = TestServer::spawn().await.expect("Failed to spawn test server");
    let mut alice = TestClient::join(&server.address(), "Alice").await.unwrap();
    let mut bob = TestClient::join(&server.address(), "Bob").await.unwrap();

    bob.send("quit").await.unwrap();
    assert_eq!(bob.recv().await.unwrap(), "Are you sure you want to quit?");
    bob.send("nope").await.unwrap();
    assert_eq!(bob.recv().await.unwrap(), "Cancelled.");

    bob.send("exit").await.unwrap();
    bob.recv().await.unwrap();
    bob.send("y").await.unwrap();
    assert_eq!(bob.recv().await.unwrap(), "Goodbye.");
    bob.closed().await.unwrap();

    alice.expect("Bob has disconnected.").await.unwrap();
    assert_eq!(server.hub().len(), 1);
}
