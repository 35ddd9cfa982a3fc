//! `TetherServer` builder and server loop.
//!
//! This is the entry point for running a relay. It ties the layers
//! together: transport → protocol → session queues → room registry, with
//! the janitor and the snapshot writer running beside the accept loop.

use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tether_janitor::{Janitor, JanitorConfig, SweepStats, Sweeper};
use tether_protocol::{Codec, JsonCodec};
use tether_room::{
    Clock, Delivery, JsonFileStore, PersistError, PresenceConfig,
    RegistrySnapshot, RoomRegistry, SnapshotStore, load_snapshot,
};
use tether_session::{SessionConfig, SessionManager};
use tether_transport::{
    Body, ConnectionId, Endpoint, IncomingConnection, Request, Response,
    WebSocketConnection, WebSocketTransport,
};
use tokio::sync::{Mutex, Notify};

use crate::handler::handle_connection;
use crate::http::handle_request;
use crate::persistence::SnapshotWriter;
use crate::TetherError;

/// Shared server state passed to each connection task.
///
/// Lock order: never hold `rooms` and `sessions` at the same time.
/// Registry operations return their deliveries; those are dispatched
/// after the `rooms` guard is gone.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) sessions: Mutex<SessionManager>,
    pub(crate) rooms: Mutex<RoomRegistry>,
    pub(crate) codec: C,
    pub(crate) persistence: SnapshotWriter,
}

impl<C: Codec> ServerState<C> {
    /// Queues deliveries on their sessions' outbound queues.
    pub(crate) async fn dispatch(&self, deliveries: Vec<Delivery>) {
        if deliveries.is_empty() {
            return;
        }
        self.sessions.lock().await.deliver_all(deliveries);
    }

    /// Tears down everything bound to a closed session.
    pub(crate) async fn disconnect(&self, conn_id: ConnectionId) {
        if let Err(e) = self.sessions.lock().await.unregister(conn_id) {
            tracing::debug!(%conn_id, error = %e, "session already gone");
        }
        let outcome = self.rooms.lock().await.disconnect(conn_id);
        self.dispatch(outcome.deliveries).await;
        if !outcome.departed.is_empty() {
            self.persistence.request();
        }
    }

    /// Snapshots the registry and writes it out, logging failures.
    pub(crate) async fn flush_snapshot(&self) {
        if !self.persistence.is_enabled() {
            return;
        }
        let snapshot = self.rooms.lock().await.snapshot();
        if let Err(e) = self.persistence.save(snapshot).await {
            tracing::warn!(error = %e, "could not save snapshot");
        }
    }
}

impl<C: Codec> Sweeper for ServerState<C> {
    async fn sweep(&self) -> SweepStats {
        let report = self.rooms.lock().await.sweep();
        let stats = SweepStats {
            peers_removed: report.expired_peers,
            rooms_removed: report.removed_rooms.len(),
        };
        if report.changed() {
            self.persistence.request();
        }
        self.dispatch(report.deliveries).await;
        stats
    }
}

impl<C: Codec> Endpoint for ServerState<C> {
    async fn respond(&self, request: Request<Body>, addr: SocketAddr) -> Response<Body> {
        handle_request(request, addr, self).await
    }

    async fn session(self: Arc<Self>, conn: WebSocketConnection) {
        let addr = conn.peer_addr();
        if let Err(e) = handle_connection(conn, self).await {
            tracing::debug!(%addr, error = %e, "connection ended with error");
        }
    }
}

/// Builder for configuring and starting a relay.
///
/// # Example
///
/// ```rust,ignore
/// use tether::prelude::*;
///
/// let server = TetherServer::builder()
///     .bind("0.0.0.0:8080")
///     .snapshot_path("rooms.json")
///     .janitor_config(JanitorConfig::with_interval(30))
///     .build()
///     .await?;
/// server.run().await
/// ```
pub struct TetherServerBuilder {
    bind_addr: String,
    presence_config: PresenceConfig,
    session_config: SessionConfig,
    janitor_config: JanitorConfig,
    store: Option<Arc<dyn SnapshotStore>>,
    clock: Option<Arc<dyn Clock>>,
    clear_snapshot_on_shutdown: bool,
}

impl TetherServerBuilder {
    /// Creates a new builder with default settings and no persistence.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            presence_config: PresenceConfig::default(),
            session_config: SessionConfig::default(),
            janitor_config: JanitorConfig::default(),
            store: None,
            clock: None,
            clear_snapshot_on_shutdown: false,
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets liveness, room age, and id settings.
    pub fn presence_config(mut self, config: PresenceConfig) -> Self {
        self.presence_config = config;
        self
    }

    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    pub fn janitor_config(mut self, config: JanitorConfig) -> Self {
        self.janitor_config = config;
        self
    }

    /// Persists the registry to a JSON file at `path`.
    pub fn snapshot_path(self, path: impl Into<PathBuf>) -> Self {
        self.snapshot_store(JsonFileStore::new(path))
    }

    /// Persists the registry to an arbitrary store.
    pub fn snapshot_store(mut self, store: impl SnapshotStore) -> Self {
        self.store = Some(Arc::new(store));
        self
    }

    /// Replaces wall time, mostly for tests.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Writes an empty snapshot on shutdown instead of the live registry,
    /// so the next start begins with no rooms.
    pub fn clear_snapshot_on_shutdown(mut self, clear: bool) -> Self {
        self.clear_snapshot_on_shutdown = clear;
        self
    }

    /// Binds the listener and restores the registry from the snapshot
    /// store, if one is configured.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`. A missing or corrupt
    /// snapshot starts the relay empty; only a failed bind is an error.
    pub async fn build(self) -> Result<TetherServer<JsonCodec>, TetherError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let mut rooms = match self.clock {
            Some(clock) => RoomRegistry::with_clock(self.presence_config, clock),
            None => RoomRegistry::new(self.presence_config),
        };
        if let Some(store) = self.store.as_ref().map(Arc::clone) {
            let snapshot =
                tokio::task::spawn_blocking(move || load_snapshot(&*store))
                    .await
                    .map_err(|e| PersistError::Io(std::io::Error::other(e)))?;
            rooms.restore(snapshot);
            tracing::info!(rooms = rooms.len(), "registry restored");
        }

        let state = Arc::new(ServerState {
            sessions: Mutex::new(SessionManager::new(self.session_config)),
            rooms: Mutex::new(rooms),
            codec: JsonCodec,
            persistence: SnapshotWriter::new(self.store),
        });

        Ok(TetherServer {
            transport,
            state,
            janitor_config: self.janitor_config,
            clear_snapshot_on_shutdown: self.clear_snapshot_on_shutdown,
        })
    }
}

impl Default for TetherServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound relay.
///
/// Call [`run()`](Self::run) or [`run_until()`](Self::run_until) to start
/// accepting connections.
pub struct TetherServer<C: Codec = JsonCodec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
    janitor_config: JanitorConfig,
    clear_snapshot_on_shutdown: bool,
}

impl TetherServer<JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> TetherServerBuilder {
        TetherServerBuilder::new()
    }
}

impl<C: Codec> TetherServer<C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the accept loop until the process is terminated.
    pub async fn run(self) -> Result<(), TetherError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the accept loop until `shutdown` completes, then stops the
    /// janitor and writes a final snapshot.
    ///
    /// Each accepted socket is served in its own task: WebSocket
    /// upgrades become signaling sessions, anything else is answered by
    /// the JSON endpoints.
    pub async fn run_until(
        self,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), TetherError> {
        let Self {
            transport,
            state,
            janitor_config,
            clear_snapshot_on_shutdown,
        } = self;

        let janitor = Janitor::spawn(Arc::clone(&state), janitor_config);
        let stop_writer = Arc::new(Notify::new());
        let writer = tokio::spawn({
            let state = Arc::clone(&state);
            let stop = Arc::clone(&stop_writer);
            async move {
                loop {
                    tokio::select! {
                        biased;
                        _ = stop.notified() => break,
                        _ = state.persistence.requested() => state.flush_snapshot().await,
                    }
                }
            }
        });

        tracing::info!(addr = ?transport.local_addr().ok(), "tether relay running");

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                accepted = transport.accept() => match accepted {
                    Ok(incoming) => {
                        tokio::spawn(serve(incoming, Arc::clone(&state)));
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                    }
                },
            }
        }

        tracing::info!("shutting down");
        janitor.stop().await;
        stop_writer.notify_one();
        let _ = writer.await;

        if clear_snapshot_on_shutdown {
            if let Err(e) = state.persistence.save(RegistrySnapshot::default()).await {
                tracing::warn!(error = %e, "could not clear snapshot");
            }
        } else {
            state.flush_snapshot().await;
        }
        drop(transport);
        tracing::info!("tether relay stopped");
        Ok(())
    }
}

/// Serves one accepted socket until its request (or session) is done.
async fn serve<C: Codec>(incoming: IncomingConnection, state: Arc<ServerState<C>>) {
    let addr = incoming.peer_addr();
    if let Err(e) = incoming.serve(state).await {
        tracing::debug!(%addr, error = %e, "dropping connection");
    }
}
