use super::ReplicaState;
use crate::gateway::context::{full_body, BoxBody};
use hyper::body::Incoming;
use hyper::{Request, Response};

pub fn handle_admin(
    req: Request<Incoming>,
    state: ReplicaState,
) -> Result<Response<BoxBody>, hyper::Error> {
    match req.uri().path() {
        "/health" | "/healthz" => Ok(Response::builder()
            .status(200)
            .body(full_body(r#"{"status":"ok"}"#))
            .unwrap()),

        "/ready" | "/readyz" => {
            let cfg = &state.config;
            Ok(Response::builder()
                .status(200)
                .header("content-type", "application/json")
                .body(full_body(format!(
                    r#"{{"status":"ready","window_secs":{},"threshold":{},"peers":{}}}"#,
                    cfg.window_secs,
                    cfg.threshold,
                    cfg.peers.len(),
                )))
                .unwrap())
        }

        "/metrics" => {
            let body = state.metrics.render();
            Ok(Response::builder()
                .status(200)
                .header("content-type", "text/plain; version=0.0.4; charset=utf-8")
                .body(full_body(body))
                .unwrap())
        }

        _ => Ok(Response::builder()
            .status(404)
            .body(full_body(r#"{"error":"not found"}"#))
            .unwrap()),
    }
}
