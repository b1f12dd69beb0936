//! End-to-end HTTP round trips against the admit and gossip listeners (§6, §8b).

use rate_limiter_replica::config::ReplicaConfig;
use rate_limiter_replica::server::{run_request_server, ReplicaState};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

async fn spawn_replica(listen: &str, threshold: u64) -> ReplicaState {
    let config = ReplicaConfig {
        listen: listen.to_string(),
        window_secs: 60,
        threshold,
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

    tokio::time::sleep(Duration::from_millis(50)).await;
    state
}

#[tokio::test]
async fn admit_then_deny_over_http() {
    spawn_replica("127.0.0.1:18190", 2).await;
    let http = reqwest::Client::new();

    let url = "http://127.0.0.1:18190/foo?clientId=alice";
    let r1 = http.get(url).send().await.unwrap();
    assert_eq!(r1.status(), 200);
    let r2 = http.get(url).send().await.unwrap();
    assert_eq!(r2.status(), 200);
    let r3 = http.get(url).send().await.unwrap();
    assert_eq!(r3.status(), 503);
}

#[tokio::test]
async fn missing_client_id_is_a_client_error() {
    spawn_replica("127.0.0.1:18191", 10).await;
    let http = reqwest::Client::new();

    let resp = http
        .get("http://127.0.0.1:18191/foo")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn duplicate_client_id_is_a_client_error() {
    spawn_replica("127.0.0.1:18192", 10).await;
    let http = reqwest::Client::new();

    let resp = http
        .get("http://127.0.0.1:18192/foo?clientId=a&clientId=b")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn valid_gossip_body_is_merged_and_acknowledged() {
    let state = spawn_replica("127.0.0.1:18193", 10).await;
    let http = reqwest::Client::new();

    let body = serde_json::json!({
        "UsersAccess": [
            { "ClientID": "peer-client", "LastRequest": chrono::Utc::now().to_rfc3339(), "Count": 4 }
        ]
    });

    let resp = http
        .post("http://127.0.0.1:18193/updates")
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(state.store.tracked_clients(), 1);
}

#[tokio::test]
async fn malformed_gossip_body_is_a_client_error_and_store_is_unchanged() {
    let state = spawn_replica("127.0.0.1:18194", 10).await;
    let http = reqwest::Client::new();

    let resp = http
        .post("http://127.0.0.1:18194/updates")
        .body("{ not json")
        .header("content-type", "application/json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    assert_eq!(state.store.tracked_clients(), 0);
}

#[tokio::test]
async fn unknown_path_is_not_found() {
    spawn_replica("127.0.0.1:18195", 10).await;
    let http = reqwest::Client::new();

    let resp = http
        .get("http://127.0.0.1:18195/nonexistent")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}
