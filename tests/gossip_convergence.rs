//! Gossip convergence between two in-process replicas (§8, scenario 4, P7).
//!
//! Each replica runs a real HTTP listener for its `/updates` endpoint; the
//! broadcast is triggered manually (via `broadcast_tick`) instead of waiting
//! on the interval timer, so the test is deterministic.

use rate_limiter_replica::config::ReplicaConfig;
use rate_limiter_replica::server::{run_request_server, ReplicaState};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

async fn spawn_replica(listen: &str, peers: Vec<String>) -> ReplicaState {
    let config = ReplicaConfig {
        listen: listen.to_string(),
        window_secs: 60,
        threshold: 5,
        peers,
        ..Default::default()
    };
    let (state, submit_rx) = ReplicaState::new(config);

    let shutdown = Arc::new(Notify::new());
    tokio::spawn({
        let updater = state.updater.clone();
        let shutdown = shutdown.clone();
        async move { updater.run_consumer(submit_rx, shutdown).await }
    });

    let listen = listen.to_string();
    let state_clone = state.clone();
    tokio::spawn(async move {
        let _ = run_request_server(&listen, state_clone, shutdown).await;
    });

    // Give the listener a moment to bind before the test starts sending.
    tokio::time::sleep(Duration::from_millis(50)).await;
    state
}

#[tokio::test]
async fn p7_gossip_delivery_convergence() {
    let state_a = spawn_replica("127.0.0.1:18180", vec!["127.0.0.1:18181".to_string()]).await;
    let state_b = spawn_replica("127.0.0.1:18181", vec!["127.0.0.1:18180".to_string()]).await;

    let client_id = "shared-client";

    for _ in 0..3 {
        let decision = state_a.store.admit(client_id).await;
        assert_eq!(decision, rate_limiter_replica::store::Decision::Admit);
        state_a.updater.submit(client_id, chrono::Utc::now());
    }
    for _ in 0..3 {
        let decision = state_b.store.admit(client_id).await;
        assert_eq!(decision, rate_limiter_replica::store::Decision::Admit);
        state_b.updater.submit(client_id, chrono::Utc::now());
    }

    // Exchange digests.
    state_a.updater.broadcast_tick().await;
    state_b.updater.broadcast_tick().await;

    // Allow the HTTP round trip + merge to land.
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(
        state_a.store.admit(client_id).await,
        rate_limiter_replica::store::Decision::Deny
    );
    assert_eq!(
        state_b.store.admit(client_id).await,
        rate_limiter_replica::store::Decision::Deny
    );
}

#[tokio::test]
async fn p5_merge_commutativity_survives_a_real_http_round_trip() {
    let state_a = spawn_replica("127.0.0.1:18182", vec!["127.0.0.1:18183".to_string()]).await;
    let state_b = spawn_replica("127.0.0.1:18183", vec![]).await;

    state_a.store.admit("x").await;
    state_a.updater.submit("x", chrono::Utc::now());
    state_a.store.admit("y").await;
    state_a.updater.submit("y", chrono::Utc::now());

    state_a.updater.broadcast_tick().await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(state_b.store.tracked_clients(), 2);
}
