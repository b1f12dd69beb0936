use super::context::{empty_body, full_body, BoxBody};
use crate::gossip::digest::PeerDigest;
use crate::server::ReplicaState;
use crate::store::Decision;
use bytes::Bytes;
use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use std::time::Instant;
use tracing::debug;

/// The url param used to "authenticate" the client (trusted as supplied, §1).
const CLIENT_ID_PARAM: &str = "clientId";

fn response(status: StatusCode, body: BoxBody) -> Response<BoxBody> {
    Response::builder().status(status).body(body).unwrap()
}

/// Extract the `clientId` query parameter. Missing or repeated occurrences
/// are both rejected as `InvalidRequest` (§6).
fn extract_client_id(uri: &http::Uri) -> Option<String> {
    let query = uri.query()?;
    let mut found: Option<&str> = None;
    for pair in query.split('&') {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        if key == CLIENT_ID_PARAM {
            if found.is_some() {
                return None;
            }
            found = Some(value);
        }
    }
    found.filter(|v| !v.is_empty()).map(|v| v.to_string())
}

/// Admit endpoint (`/foo` by convention, §6): extract the client id, consult
/// the access store, map the decision onto a response status.
pub async fn handle_admit(
    req: Request<Incoming>,
    state: ReplicaState,
) -> Result<Response<BoxBody>, hyper::Error> {
    let client_id = match extract_client_id(req.uri()) {
        Some(id) => id,
        None => {
            debug!("gateway: admit: missing or duplicate clientId");
            metrics::counter!(
                "rate_limiter_invalid_request_total",
                "reason" => "bad_client_id",
            )
            .increment(1);
            return Ok(response(StatusCode::BAD_REQUEST, empty_body()));
        }
    };

    let start = Instant::now();
    let decision = state.store.admit(&client_id).await;
    metrics::histogram!("rate_limiter_admit_duration_seconds").record(start.elapsed().as_secs_f64());

    if decision == Decision::Admit {
        state.updater.submit(&client_id, chrono::Utc::now());
    }

    let (status, label) = match decision {
        Decision::Admit => (StatusCode::OK, "admit"),
        Decision::Deny => (StatusCode::SERVICE_UNAVAILABLE, "deny"),
        Decision::Transient => (StatusCode::SERVICE_UNAVAILABLE, "transient"),
    };

    metrics::counter!(
        "rate_limiter_admit_total",
        "result" => label,
    )
    .increment(1);
    metrics::gauge!("rate_limiter_clients_tracked").set(state.store.tracked_clients() as f64);

    Ok(response(status, empty_body()))
}

/// Gossip endpoint (`/updates`, §6): decode a `PeerDigest` and merge it into
/// the access store. A parse error rejects the whole digest with a client
/// error (§4.2); a valid body is merged and acknowledged unconditionally.
pub async fn handle_updates(
    req: Request<Incoming>,
    state: ReplicaState,
) -> Result<Response<BoxBody>, hyper::Error> {
    let body_bytes = match req.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(_) => Bytes::new(),
    };

    let digest: PeerDigest = match serde_json::from_slice(&body_bytes) {
        Ok(d) => d,
        Err(e) => {
            debug!("gateway: updates: malformed body, error={}", e);
            metrics::counter!(
                "rate_limiter_gossip_received_total",
                "result" => "parse_error",
            )
            .increment(1);
            return Ok(response(
                StatusCode::BAD_REQUEST,
                full_body(format!(r#"{{"error":"{}"}}"#, e)),
            ));
        }
    };

    state.updater.ingest(&state.store, digest).await;

    metrics::counter!(
        "rate_limiter_gossip_received_total",
        "result" => "success",
    )
    .increment(1);

    Ok(response(StatusCode::OK, empty_body()))
}
