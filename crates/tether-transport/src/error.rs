use std::time::Duration;

/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// Binding or accepting connections failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// hyper gave up on the connection (malformed request, reset, ...).
    #[cfg(feature = "websocket")]
    #[error("http connection failed: {0}")]
    Http(#[source] hyper::Error),

    /// The client did not finish its request in time.
    #[error("request not finished within {0:?}")]
    RequestTimeout(Duration),
}
