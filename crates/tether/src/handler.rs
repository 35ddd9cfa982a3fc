//! Per-connection handler: session setup and event routing.
//!
//! Each accepted WebSocket gets its own Tokio task running this handler.
//! The flow is:
//!   1. Register the session's outbound queue and start its writer task
//!   2. Loop: receive frames → decode → apply to the registry
//!   3. On close or idle timeout, drop the session and tell its rooms

use std::sync::Arc;

use tether_protocol::{ClientEvent, Codec, ServerEvent, room_of};
use tether_room::RoomError;
use tether_transport::{Connection, ConnectionId, WebSocketConnection};

use crate::server::ServerState;
use crate::TetherError;

/// Drop guard that disconnects a session when the handler exits.
///
/// Cleanup happens even if the handler panics. Since `Drop` is
/// synchronous, we spawn a task for the async locks.
struct SessionGuard<C: Codec> {
    conn_id: ConnectionId,
    state: Arc<ServerState<C>>,
}

impl<C: Codec> Drop for SessionGuard<C> {
    fn drop(&mut self) {
        let conn_id = self.conn_id;
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            state.disconnect(conn_id).await;
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), TetherError> {
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    tracing::info!(%conn_id, addr = %conn.peer_addr(), "client connected");

    let (mut outbound, idle_timeout) = {
        let mut sessions = state.sessions.lock().await;
        let outbound = sessions.register(conn_id)?;
        (outbound, sessions.config().idle_timeout())
    };
    let _guard = SessionGuard {
        conn_id,
        state: Arc::clone(&state),
    };

    // Writer: drains this session's queue in order. Ends when the queue
    // closes (session unregistered) or the socket stops accepting.
    let writer = tokio::spawn({
        let conn = Arc::clone(&conn);
        let state = Arc::clone(&state);
        async move {
            while let Some(event) = outbound.recv().await {
                let bytes = match state.codec.encode(&event) {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        tracing::warn!(%conn_id, event = event.name(), error = %e, "failed to encode event");
                        continue;
                    }
                };
                if let Err(e) = conn.send(&bytes).await {
                    tracing::debug!(%conn_id, error = %e, "send failed");
                    break;
                }
            }
        }
    });

    loop {
        let data = match tokio::time::timeout(idle_timeout, conn.recv()).await {
            Ok(Ok(Some(data))) => data,
            Ok(Ok(None)) => {
                tracing::debug!(%conn_id, "connection closed cleanly");
                break;
            }
            Ok(Err(e)) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                break;
            }
            Err(_) => {
                tracing::info!(%conn_id, "connection idle, closing");
                break;
            }
        };

        let event: ClientEvent = match state.codec.decode(&data) {
            Ok(event) => event,
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "failed to decode event");
                continue;
            }
        };

        handle_event(&state, conn_id, event).await;
    }

    writer.abort();
    let _ = conn.close().await;
    tracing::info!(%conn_id, "client disconnected");

    // _guard drops here → session disconnect fires.
    Ok(())
}

/// Applies one inbound event and dispatches whatever it produced.
async fn handle_event<C: Codec>(
    state: &ServerState<C>,
    conn_id: ConnectionId,
    event: ClientEvent,
) {
    tracing::debug!(%conn_id, event = event.name(), "event received");

    match event {
        ClientEvent::JoinRoom { room_id, peer_id } => {
            let room_id = room_id.unwrap_or_default();
            let result = state.rooms.lock().await.join(&room_id, peer_id, conn_id);
            match result {
                Ok(outcome) => {
                    state.dispatch(outcome.deliveries).await;
                    state.persistence.request();
                }
                Err(e) => {
                    tracing::debug!(%conn_id, %room_id, error = %e, "join refused");
                    reply(state, conn_id, ServerEvent::room_not_found()).await;
                }
            }
        }

        ClientEvent::Signal {
            room_id,
            to,
            from,
            signal,
        } => {
            let room_id = room_id.unwrap_or_default();
            let to = to.unwrap_or_default();
            let result = state.rooms.lock().await.relay(&room_id, from, &to, signal);
            match result {
                Ok(delivery) => state.dispatch(vec![delivery]).await,
                Err(RoomError::NotFound(_)) => {
                    reply(state, conn_id, ServerEvent::room_not_found()).await;
                }
                Err(e) => {
                    tracing::warn!(%conn_id, error = %e, "signal dropped");
                }
            }
        }

        ClientEvent::FileList(payload) => {
            let Some(room_id) = room_of(&payload) else {
                tracing::debug!(%conn_id, "file_list without room_id");
                return;
            };
            let deliveries = state
                .rooms
                .lock()
                .await
                .broadcast(&room_id, ServerEvent::FileList(payload));
            state.dispatch(deliveries).await;
        }

        ClientEvent::Heartbeat { room_id, peer_id } => {
            let room_id = room_id.unwrap_or_default();
            let peer_id = peer_id.unwrap_or_default();
            let outcome = state.rooms.lock().await.heartbeat(&room_id, &peer_id, conn_id);
            if outcome.sweep.as_ref().is_some_and(|report| report.changed()) {
                state.persistence.request();
            }
            state.dispatch(outcome.deliveries).await;
        }

        ClientEvent::CreateRoom => {
            let room_id = state.rooms.lock().await.create_room();
            state.persistence.request();
            reply(state, conn_id, ServerEvent::RoomCreated { room_id }).await;
        }

        ClientEvent::Status => {
            let report = state.rooms.lock().await.status();
            reply(state, conn_id, ServerEvent::Status(report)).await;
        }
    }
}

/// Queues a single event for the calling session.
async fn reply<C: Codec>(state: &ServerState<C>, conn_id: ConnectionId, event: ServerEvent) {
    state.dispatch(vec![(conn_id, event)]).await;
}
