//! WebSocket transport for the remote-control endpoint.
//!
//! The delivery worker is a plain OS thread, so every async call here is
//! driven by `block_on` on a single-threaded Tokio runtime.  The runtime is
//! built lazily on the first connect, i.e. on the worker thread, and is
//! shared by every connection that connector opens.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::runtime::{Builder, Runtime};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{Error as WsError, Message as WsMessage},
    MaybeTlsStream, WebSocketStream,
};
use tracing::debug;

use super::{Connection, Connector, TransportError};

/// How long a liveness check waits for an inbound frame before concluding
/// the stream is quiet.
const LIVENESS_POLL: Duration = Duration::from_millis(5);

/// Remote-control URL for `host:port`.
pub fn remote_url(host: &str, port: u16) -> String {
    format!("ws://{host}:{port}/remote")
}

/// Opens WebSocket connections to one endpoint.
pub struct WebSocketConnector {
    url: String,
    runtime: Option<Arc<Runtime>>,
}

impl WebSocketConnector {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            url: remote_url(host, port),
            runtime: None,
        }
    }

    fn runtime(&mut self) -> Result<Arc<Runtime>, TransportError> {
        if let Some(runtime) = &self.runtime {
            return Ok(Arc::clone(runtime));
        }
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map(Arc::new)
            .map_err(|e| TransportError::Runtime(e.to_string()))?;
        self.runtime = Some(Arc::clone(&runtime));
        Ok(runtime)
    }
}

impl Connector for WebSocketConnector {
    fn connect(&mut self) -> Result<Box<dyn Connection>, TransportError> {
        let runtime = self.runtime()?;
        let (stream, _response) =
            runtime
                .block_on(connect_async(self.url.as_str()))
                .map_err(|e| TransportError::ConnectFailed {
                    endpoint: self.url.clone(),
                    reason: e.to_string(),
                })?;
        debug!("WebSocket handshake with {} complete", self.url);
        Ok(Box::new(WebSocketConnection {
            runtime,
            stream,
            open: true,
        }))
    }

    fn endpoint(&self) -> &str {
        &self.url
    }
}

/// An open WebSocket client connection.
pub struct WebSocketConnection {
    runtime: Arc<Runtime>,
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    open: bool,
}

impl Connection for WebSocketConnection {
    fn is_alive(&mut self) -> bool {
        if !self.open {
            return false;
        }
        let runtime = Arc::clone(&self.runtime);
        // Drain whatever the peer sent; replies are not interpreted.
        loop {
            let stream = &mut self.stream;
            let polled =
                runtime.block_on(async { tokio::time::timeout(LIVENESS_POLL, stream.next()).await });
            match polled {
                Err(_elapsed) => return true,
                Ok(Some(Ok(WsMessage::Close(_)))) | Ok(None) => {
                    debug!("peer closed the WebSocket");
                    self.open = false;
                    return false;
                }
                Ok(Some(Ok(message))) => {
                    debug!("ignoring inbound frame ({} bytes)", message.len());
                }
                Ok(Some(Err(e))) => {
                    debug!("WebSocket read error: {e}");
                    self.open = false;
                    return false;
                }
            }
        }
    }

    fn send_text(&mut self, payload: &str) -> Result<(), TransportError> {
        if !self.open {
            return Err(TransportError::Closed);
        }
        let message = WsMessage::Text(payload.to_string());
        let result = self.runtime.block_on(self.stream.send(message));
        result.map_err(|e| {
            self.open = false;
            match e {
                WsError::ConnectionClosed | WsError::AlreadyClosed => TransportError::Closed,
                other => TransportError::SendFailed(other.to_string()),
            }
        })
    }

    fn close(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;
        if let Err(e) = self.runtime.block_on(self.stream.close(None)) {
            debug!("error closing WebSocket: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_url_uses_remote_path() {
        assert_eq!(remote_url("localhost", 50001), "ws://localhost:50001/remote");
        assert_eq!(remote_url("10.0.0.5", 1025), "ws://10.0.0.5:1025/remote");
    }

    #[test]
    fn test_connect_to_closed_port_reports_connect_failed() {
        // Arrange: bind then drop a listener to get a port nobody listens on
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let mut connector = WebSocketConnector::new("127.0.0.1", port);

        // Act
        let result = connector.connect();

        // Assert
        match result {
            Err(TransportError::ConnectFailed { endpoint, .. }) => {
                assert_eq!(endpoint, remote_url("127.0.0.1", port));
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("connect unexpectedly succeeded"),
        }
    }
}
