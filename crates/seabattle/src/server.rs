//! `SeabattleServer` builder and server loop.
//!
//! This is the entry point for running a Seabattle server. It ties
//! together all the layers: transport → protocol → session → room.

use std::sync::{Arc, Mutex};

use seabattle_room::{GameConfig, PubSub, RoomDirectory, RoomRegistry};
use seabattle_session::{CacheStore, IdentityProvider, ResumeCache, SessionManager};
use seabattle_transport::{Connection, Transport, TransportError, WebSocketTransport};

use crate::SeabattleError;
use crate::handler::handle_connection;

/// Shared server state passed to each connection handler task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks. The session
/// table is only touched in short synchronous steps, so a std mutex does.
pub(crate) struct ServerState<C: Connection, I, D, S> {
    pub(crate) sessions: Mutex<SessionManager>,
    pub(crate) registry: RoomRegistry<C>,
    pub(crate) identity: I,
    pub(crate) directory: D,
    pub(crate) resume: ResumeCache<S>,
}

/// Builder for configuring and starting a Seabattle server.
///
/// # Example
///
/// ```rust,ignore
/// let server = SeabattleServerBuilder::new()
///     .bind("0.0.0.0:8080")
///     .config(GameConfig::default())
///     .build(identity, directory, cache, pubsub)
///     .await?;
/// server.run().await
/// ```
pub struct SeabattleServerBuilder {
    bind_addr: String,
    config: GameConfig,
}

impl SeabattleServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            config: GameConfig::default(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the game configuration.
    pub fn config(mut self, config: GameConfig) -> Self {
        self.config = config;
        self
    }

    /// Binds a WebSocket listener and builds the server.
    pub async fn build<I, D, S>(
        self,
        identity: I,
        directory: D,
        cache: S,
        pubsub: Arc<dyn PubSub>,
    ) -> Result<SeabattleServer<WebSocketTransport, I, D, S>, SeabattleError>
    where
        I: IdentityProvider,
        D: RoomDirectory,
        S: CacheStore,
    {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;
        Ok(self.build_with_transport(transport, identity, directory, cache, pubsub))
    }

    /// Builds the server on an already constructed transport.
    ///
    /// The bind address is ignored.
    pub fn build_with_transport<T, I, D, S>(
        self,
        transport: T,
        identity: I,
        directory: D,
        cache: S,
        pubsub: Arc<dyn PubSub>,
    ) -> SeabattleServer<T, I, D, S>
    where
        T: Transport,
        I: IdentityProvider,
        D: RoomDirectory,
        S: CacheStore,
    {
        tracing::debug!(config = ?self.config, "building server");
        let state = Arc::new(ServerState {
            sessions: Mutex::new(SessionManager::new()),
            registry: RoomRegistry::new(self.config, pubsub),
            identity,
            directory,
            resume: ResumeCache::new(cache),
        });

        SeabattleServer { transport, state }
    }
}

impl Default for SeabattleServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A Seabattle game server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct SeabattleServer<T: Transport, I, D, S> {
    transport: T,
    state: Arc<ServerState<T::Connection, I, D, S>>,
}

impl<I, D, S> SeabattleServer<WebSocketTransport, I, D, S> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }
}

impl<T, I, D, S> SeabattleServer<T, I, D, S>
where
    T: Transport,
    I: IdentityProvider,
    D: RoomDirectory,
    S: CacheStore,
{
    /// Runs the server accept loop.
    ///
    /// Spawns a handler task for each accepted connection. Returns once
    /// the transport reports it is closed; a WebSocket listener never does.
    pub async fn run(mut self) -> Result<(), SeabattleError> {
        tracing::info!(node_id = self.state.registry.node_id(), "Seabattle server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(TransportError::ConnectionClosed(reason)) => {
                    tracing::info!(%reason, "transport closed, server stopping");
                    return Ok(());
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
