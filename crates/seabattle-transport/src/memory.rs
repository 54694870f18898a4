//! In-process connection pairs, used by tests and local tooling.

use tokio::sync::{Mutex, mpsc, watch};

use crate::{Connection, ConnectionId, Transport, TransportError};

/// A [`Transport`] whose connections come from [`MemoryConnector::connect`].
///
/// Once every connector is dropped, `accept` fails with
/// [`TransportError::ConnectionClosed`], which ends a server's accept loop.
pub struct MemoryTransport {
    incoming: Mutex<mpsc::UnboundedReceiver<MemoryConnection>>,
}

/// Client-side handle for opening connections to a [`MemoryTransport`].
#[derive(Clone)]
pub struct MemoryConnector {
    outgoing: mpsc::UnboundedSender<MemoryConnection>,
}

impl MemoryTransport {
    /// Creates a transport and the connector that feeds it.
    pub fn pair() -> (MemoryTransport, MemoryConnector) {
        let (outgoing, incoming) = mpsc::unbounded_channel();
        (
            MemoryTransport {
                incoming: Mutex::new(incoming),
            },
            MemoryConnector { outgoing },
        )
    }
}

impl Transport for MemoryTransport {
    type Connection = MemoryConnection;

    async fn accept(&mut self) -> Result<MemoryConnection, TransportError> {
        self.incoming
            .get_mut()
            .recv()
            .await
            .ok_or_else(|| TransportError::ConnectionClosed("memory transport shut down".into()))
    }
}

impl MemoryConnector {
    /// Opens a connection; the server side is queued for `accept`.
    pub fn connect(&self) -> Result<MemoryClient, TransportError> {
        let (server, client) = MemoryConnection::pair();
        self.outgoing
            .send(server)
            .map_err(|_| TransportError::ConnectionClosed("memory transport dropped".into()))?;
        Ok(client)
    }
}

/// Server side of an in-memory connection.
///
/// Created together with its [`MemoryClient`] by [`MemoryConnection::pair`].
pub struct MemoryConnection {
    id: ConnectionId,
    outbound: mpsc::UnboundedSender<String>,
    inbound: Mutex<mpsc::UnboundedReceiver<String>>,
    closed: watch::Sender<bool>,
}

/// Client side of an in-memory connection.
///
/// Dropping the client closes the connection from the client's end.
pub struct MemoryClient {
    outbound: mpsc::UnboundedSender<String>,
    inbound: Mutex<mpsc::UnboundedReceiver<String>>,
    closed: watch::Receiver<bool>,
}

impl MemoryConnection {
    /// Creates a connected server/client pair.
    pub fn pair() -> (MemoryConnection, MemoryClient) {
        let (to_client, from_server) = mpsc::unbounded_channel();
        let (to_server, from_client) = mpsc::unbounded_channel();
        let (closed_tx, closed_rx) = watch::channel(false);

        let server = MemoryConnection {
            id: ConnectionId::next(),
            outbound: to_client,
            inbound: Mutex::new(from_client),
            closed: closed_tx,
        };
        let client = MemoryClient {
            outbound: to_server,
            inbound: Mutex::new(from_server),
            closed: closed_rx,
        };
        (server, client)
    }

    fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }
}

impl Connection for MemoryConnection {
    async fn send(&self, text: &str) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::ConnectionClosed(self.id.to_string()));
        }
        self.outbound
            .send(text.to_owned())
            .map_err(|_| TransportError::ConnectionClosed(self.id.to_string()))
    }

    async fn recv(&self) -> Result<Option<String>, TransportError> {
        if self.is_closed() {
            return Ok(None);
        }
        let mut closed = self.closed.subscribe();
        let mut inbound = self.inbound.lock().await;
        tokio::select! {
            biased;
            _ = closed.wait_for(|closed| *closed) => Ok(None),
            frame = inbound.recv() => Ok(frame),
        }
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.closed.send_replace(true);
        Ok(())
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}

impl MemoryClient {
    /// Sends one frame to the server side.
    pub fn send(&self, text: &str) -> Result<(), TransportError> {
        if *self.closed.borrow() {
            return Err(TransportError::ConnectionClosed("server closed".into()));
        }
        self.outbound
            .send(text.to_owned())
            .map_err(|_| TransportError::ConnectionClosed("server dropped".into()))
    }

    /// Receives the next frame from the server.
    ///
    /// Frames sent before the server closed the connection are still
    /// delivered; `None` follows once they are drained.
    pub async fn recv(&self) -> Option<String> {
        let mut closed = self.closed.clone();
        let mut inbound = self.inbound.lock().await;
        tokio::select! {
            biased;
            frame = inbound.recv() => frame,
            _ = closed.wait_for(|closed| *closed) => inbound.try_recv().ok(),
        }
    }

    /// Returns `true` once the server has closed the connection.
    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_frames_flow_both_ways() {
        let (server, client) = MemoryConnection::pair();

        client.send("hello").unwrap();
        assert_eq!(server.recv().await.unwrap().as_deref(), Some("hello"));

        server.send("world").await.unwrap();
        assert_eq!(client.recv().await.as_deref(), Some("world"));
    }

    #[tokio::test]
    async fn test_client_drop_ends_server_recv() {
        let (server, client) = MemoryConnection::pair();
        drop(client);
        assert_eq!(server.recv().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_close_wakes_pending_recv() {
        let (server, _client) = MemoryConnection::pair();
        let server = std::sync::Arc::new(server);

        let reader = tokio::spawn({
            let server = server.clone();
            async move { server.recv().await }
        });
        tokio::task::yield_now().await;
        server.close().await.unwrap();

        assert_eq!(reader.await.unwrap().unwrap(), None);
    }

    #[tokio::test]
    async fn test_frames_before_close_are_delivered() {
        let (server, client) = MemoryConnection::pair();
        server.send("Game Over!").await.unwrap();
        server.close().await.unwrap();

        assert_eq!(client.recv().await.as_deref(), Some("Game Over!"));
        assert_eq!(client.recv().await, None);
        assert!(client.is_closed());
    }

    #[tokio::test]
    async fn test_transport_accepts_connector_pairs() {
        let (mut transport, connector) = MemoryTransport::pair();
        let client = connector.connect().unwrap();

        let server = transport.accept().await.unwrap();
        client.send("token").unwrap();
        assert_eq!(server.recv().await.unwrap().as_deref(), Some("token"));
    }

    #[tokio::test]
    async fn test_transport_ends_when_connectors_dropped() {
        let (mut transport, connector) = MemoryTransport::pair();
        drop(connector);
        assert!(matches!(
            transport.accept().await,
            Err(TransportError::ConnectionClosed(_))
        ));
    }

    #[tokio::test]
    async fn test_send_after_close_fails() {
        let (server, client) = MemoryConnection::pair();
        server.close().await.unwrap();

        assert!(matches!(
            server.send("late").await,
            Err(TransportError::ConnectionClosed(_))
        ));
        assert!(client.send("late").is_err());
    }
}
