//! The JSON side endpoints served on the signaling port.
//!
//! | method | path | response |
//! |---|---|---|
//! | `POST` | `/create-room` | `{"room_id": "..."}` |
//! | `GET` | `/status`, `/health` | the status report |
//! | anything else | | 404 `{"error": "not found"}` |

use std::net::SocketAddr;

use serde_json::json;
use tether_protocol::Codec;
use tether_transport::{Body, Method, Request, Response, StatusCode, json_response};

use crate::server::ServerState;

/// Answers one plain HTTP request. The request body is never read.
pub(crate) async fn handle_request<C: Codec>(
    request: Request<Body>,
    addr: SocketAddr,
    state: &ServerState<C>,
) -> Response<Body> {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    drop(request);

    match (&method, path.as_str()) {
        (&Method::POST, "/create-room") => {
            let room_id = state.rooms.lock().await.create_room();
            state.persistence.request();
            json_response(StatusCode::OK, json!({ "room_id": room_id }).to_string())
        }
        (&Method::GET, "/status" | "/health") => {
            let report = state.rooms.lock().await.status();
            match serde_json::to_string(&report) {
                Ok(body) => json_response(StatusCode::OK, body),
                Err(e) => {
                    tracing::warn!(error = %e, "could not encode status");
                    json_response(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        json!({ "error": "internal error" }).to_string(),
                    )
                }
            }
        }
        (method, path) => {
            tracing::debug!(%addr, %method, path, "no such endpoint");
            json_response(StatusCode::NOT_FOUND, json!({ "error": "not found" }).to_string())
        }
    }
}
