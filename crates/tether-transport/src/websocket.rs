//! The listener: one port for the signaling socket and the JSON endpoints.
//!
//! Every accepted TCP connection is served by hyper. A request asking for
//! a WebSocket upgrade is answered with `101 Switching Protocols` and the
//! upgraded socket goes to [`Endpoint::session`]; every other request goes
//! to [`Endpoint::respond`].

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use hyper::server::conn::Http;
use hyper::service::service_fn;
use hyper::upgrade::Upgraded;
use hyper::{Body, Request, Response, StatusCode};
use hyper_tungstenite::WebSocketStream;
use hyper_tungstenite::tungstenite::Message;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;

use crate::http::json_response;
use crate::{Connection, ConnectionId, TransportError};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Time allowed from accept until a plain response (or the `101`) is
/// written. Upgraded sockets are not bound by it.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

type WsStream = WebSocketStream<Upgraded>;

/// Whatever sits behind the listener.
pub trait Endpoint: Send + Sync + 'static {
    /// Answers one plain HTTP request.
    fn respond(
        &self,
        request: Request<Body>,
        addr: SocketAddr,
    ) -> impl Future<Output = Response<Body>> + Send;

    /// Runs a signaling session until the socket closes.
    fn session(
        self: Arc<Self>,
        conn: WebSocketConnection,
    ) -> impl Future<Output = ()> + Send;
}

/// TCP listener for the relay port.
pub struct WebSocketTransport {
    listener: TcpListener,
}

impl WebSocketTransport {
    /// Binds a new listener to the given address.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        tracing::info!(addr, "transport listening");
        Ok(Self { listener })
    }

    /// Returns the address the listener is actually bound to.
    ///
    /// Useful after binding to port 0.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts a TCP connection without reading from it.
    ///
    /// Serve the result in its own task so that one slow client can't
    /// hold up the accept loop.
    pub async fn accept(&self) -> Result<IncomingConnection, TransportError> {
        let (stream, addr) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;
        Ok(IncomingConnection { stream, addr })
    }
}

/// An accepted TCP connection that hasn't sent its request yet.
pub struct IncomingConnection {
    stream: TcpStream,
    addr: SocketAddr,
}

impl IncomingConnection {
    /// The remote address of the client.
    pub fn peer_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Serves one request on this connection.
    ///
    /// Keep-alive is off, so the connection closes after its response.
    /// A client that doesn't finish within [`REQUEST_TIMEOUT`] is
    /// dropped.
    pub async fn serve<E: Endpoint>(self, endpoint: Arc<E>) -> Result<(), TransportError> {
        let addr = self.addr;
        let service = service_fn(move |request: Request<Body>| {
            let endpoint = Arc::clone(&endpoint);
            async move { Ok::<_, Infallible>(route(request, addr, endpoint).await) }
        });

        let mut http = Http::new();
        http.http1_keep_alive(false);
        let connection = http.serve_connection(self.stream, service).with_upgrades();

        match tokio::time::timeout(REQUEST_TIMEOUT, connection).await {
            Ok(result) => result.map_err(TransportError::Http),
            Err(_) => Err(TransportError::RequestTimeout(REQUEST_TIMEOUT)),
        }
    }
}

async fn route<E: Endpoint>(
    mut request: Request<Body>,
    addr: SocketAddr,
    endpoint: Arc<E>,
) -> Response<Body> {
    if !hyper_tungstenite::is_upgrade_request(&request) {
        return endpoint.respond(request, addr).await;
    }

    match hyper_tungstenite::upgrade(&mut request, None) {
        Ok((response, websocket)) => {
            tokio::spawn(async move {
                match websocket.await {
                    Ok(ws) => endpoint.session(WebSocketConnection::new(ws, addr)).await,
                    Err(e) => tracing::debug!(%addr, error = %e, "websocket upgrade failed"),
                }
            });
            response
        }
        Err(e) => {
            tracing::debug!(%addr, error = %e, "bad upgrade request");
            json_response(StatusCode::BAD_REQUEST, r#"{"error":"bad upgrade request"}"#)
        }
    }
}

/// A single WebSocket connection.
///
/// The socket is split so that a task blocked in [`recv`](Connection::recv)
/// never holds up a concurrent [`send`](Connection::send).
pub struct WebSocketConnection {
    id: ConnectionId,
    addr: SocketAddr,
    sink: Mutex<SplitSink<WsStream, Message>>,
    stream: Mutex<SplitStream<WsStream>>,
}

impl WebSocketConnection {
    fn new(ws: WsStream, addr: SocketAddr) -> Self {
        let id = ConnectionId::new(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(%id, %addr, "accepted WebSocket connection");
        let (sink, stream) = ws.split();
        Self {
            id,
            addr,
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
        }
    }

    /// The remote address of the client.
    pub fn peer_addr(&self) -> SocketAddr {
        self.addr
    }
}

impl Connection for WebSocketConnection {
    type Error = TransportError;

    /// Sends UTF-8 data as a text frame (what browsers expect for JSON)
    /// and anything else as a binary frame.
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error> {
        let msg = match std::str::from_utf8(data) {
            Ok(text) => Message::Text(text.to_owned()),
            Err(_) => Message::Binary(data.to_vec()),
        };
        self.sink.lock().await.send(msg).await.map_err(|e| {
            TransportError::SendFailed(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                e,
            ))
        })
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        let mut stream = self.stream.lock().await;
        loop {
            match stream.next().await {
                Some(Ok(Message::Binary(data))) => return Ok(Some(data)),
                Some(Ok(Message::Text(text))) => return Ok(Some(text.into_bytes())),
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue, // skip ping/pong/frame
                Some(Err(e)) => {
                    return Err(TransportError::ReceiveFailed(
                        std::io::Error::new(
                            std::io::ErrorKind::ConnectionReset,
                            e,
                        ),
                    ));
                }
            }
        }
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.sink.lock().await.close().await.map_err(|e| {
            TransportError::SendFailed(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                e,
            ))
        })
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}
