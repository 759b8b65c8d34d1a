//! Integration tests for registry invariants under concurrency.
//!
//! These tests verify that name uniqueness and the client ceiling hold when
//! many sessions race for them, both through the registry handle directly
//! and through real TCP connections.
//!
//! Tests CAN use `.unwrap()` and `.expect()` - this is allowed.

mod common;

use common::{TestServer, FULL_NOTICE, NAME_PROMPT, TAKEN_NOTICE};
use netchat_core::{ConnectionId, Username};
use netchatd::registry::{spawn_registry, RegistryError};
use netchatd::server::client_writer;
use tokio::task::JoinSet;

// ============================================================================
// Handle-level races
// ============================================================================

#[tokio::test]
async fn test_concurrent_same_name_claims_succeed_once() {
    let registry = spawn_registry(100);
    let mut tasks = JoinSet::new();

    for i in 0..50u64 {
        let registry = registry.clone();
        // Mixed case: all of these are the same claim
        let name = if i % 2 == 0 { "Alice" } else { "aLICE" };
        tasks.spawn(async move {
            registry
                .register(
                    ConnectionId::new(i),
                    Username::parse(name).unwrap(),
                    client_writer(tokio::io::sink()),
                )
                .await
        });
    }

    let mut won = 0;
    while let Some(result) = tasks.join_next().await {
        match result.unwrap() {
            Ok(()) => won += 1,
            Err(RegistryError::UsernameTaken(_)) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert_eq!(won, 1);
    assert_eq!(registry.count().await, 1);
}

#[tokio::test]
async fn test_ceiling_holds_under_contention() {
    let registry = spawn_registry(10);
    let mut tasks = JoinSet::new();

    for i in 0..40u64 {
        let registry = registry.clone();
        tasks.spawn(async move {
            registry
                .register(
                    ConnectionId::new(i),
                    Username::parse(&format!("user{i}")).unwrap(),
                    client_writer(tokio::io::sink()),
                )
                .await
        });
    }

    let mut won = 0;
    let mut full = 0;
    while let Some(result) = tasks.join_next().await {
        match result.unwrap() {
            Ok(()) => won += 1,
            Err(RegistryError::RegistryFull { max }) => {
                assert_eq!(max, 10);
                full += 1;
            }
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert_eq!(won, 10);
    assert_eq!(full, 30);
    assert_eq!(registry.snapshot().await.len(), 10);
}

#[tokio::test]
async fn test_unregister_frees_slot_and_name() {
    let registry = spawn_registry(1);
    let alice = Username::parse("alice").unwrap();

    registry
        .register(ConnectionId::new(1), alice.clone(), client_writer(tokio::io::sink()))
        .await
        .unwrap();

    assert_eq!(registry.unregister(ConnectionId::new(1)).await, Some(alice));
    assert_eq!(registry.unregister(ConnectionId::new(1)).await, None);

    registry
        .register(
            ConnectionId::new(2),
            Username::parse("ALICE").unwrap(),
            client_writer(tokio::io::sink()),
        )
        .await
        .unwrap();
    assert!(registry.snapshot().await.iter().all(|c| c.conn_id != ConnectionId::new(1)));
}

// ============================================================================
// Over the wire
// ============================================================================

#[tokio::test]
async fn test_racing_clients_for_one_name() {
    let server = TestServer::spawn().await;

    let mut clients = Vec::new();
    for _ in 0..6 {
        let mut client = server.connect().await;
        client.expect(NAME_PROMPT).await;
        clients.push(client);
    }

    // Everyone answers before anyone reads the outcome
    for client in clients.iter_mut() {
        client.send_line("alice").await;
    }

    let mut winners = 0;
    for client in clients.iter_mut() {
        let (which, _) = client.expect_any(&["][alice]: ", TAKEN_NOTICE]).await;
        if which == 0 {
            winners += 1;
        }
    }

    assert_eq!(winners, 1);
    assert_eq!(server.registry.count().await, 1);
}

#[tokio::test]
async fn test_losers_can_pick_another_name() {
    let server = TestServer::spawn().await;
    let _alice = server.join("alice").await;

    let mut second = server.connect().await;
    second.expect(NAME_PROMPT).await;
    second.send_line("ALICE").await;
    second.expect(TAKEN_NOTICE).await;
    second.claim("alice2").await;

    assert_eq!(server.registry.count().await, 2);
}

#[tokio::test]
async fn test_racing_clients_for_the_last_slots() {
    let server = TestServer::spawn_with(|config| config.max_clients = 3).await;

    let mut clients = Vec::new();
    for _ in 0..8 {
        let mut client = server.connect().await;
        let (which, _) = client.expect_any(&[NAME_PROMPT, FULL_NOTICE]).await;
        if which == 0 {
            clients.push(client);
        }
    }

    for (i, client) in clients.iter_mut().enumerate() {
        client.send_line(&format!("user{i}")).await;
    }

    let mut joined = 0;
    for (i, client) in clients.iter_mut().enumerate() {
        let prompt = format!("][user{i}]: ");
        let (which, _) = client.expect_any(&[prompt.as_str(), FULL_NOTICE]).await;
        if which == 0 {
            joined += 1;
        }
    }

    assert_eq!(joined, 3);
    assert_eq!(server.registry.count().await, 3);
}
