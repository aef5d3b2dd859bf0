//! `RideBusServer` builder and server loop.
//!
//! This is the entry point for running a Ride the Bus server. It ties
//! together all the layers: transport → protocol → room.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use ridebus_protocol::JsonCodec;
use ridebus_room::{Broadcaster, RoomRegistry, RoomSettings};
use ridebus_transport::{
    DEFAULT_HANDSHAKE_TIMEOUT, PendingConnection, Transport, WebSocketTransport,
};

use crate::RideBusError;
use crate::handler::handle_connection;

/// Shared server state passed to each connection handler task.
///
/// Created once when the server is built and torn down when it stops.
pub(crate) struct ServerState {
    pub(crate) registry: RoomRegistry,
    pub(crate) codec: JsonCodec,
    pub(crate) broadcaster: Broadcaster,
    /// Tell the acting client when its request is rejected.
    pub(crate) notify_rejections: bool,
}

/// Builder for configuring and starting a server.
///
/// # Example
///
/// ```rust,no_run
/// use ridebus::prelude::*;
///
/// # async fn start() -> Result<(), RideBusError> {
/// let server = RideBusServer::builder()
///     .bind("0.0.0.0:8080")
///     .room_settings(RoomSettings { pyramid_rows: 4, ..Default::default() })
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct RideBusServerBuilder {
    bind_addr: String,
    room_settings: RoomSettings,
    notify_rejections: bool,
    handshake_timeout: Duration,
}

impl RideBusServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            room_settings: RoomSettings::default(),
            notify_rejections: false,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the settings every new room is created with.
    pub fn room_settings(mut self, settings: RoomSettings) -> Self {
        self.room_settings = settings;
        self
    }

    /// Sends an `ERROR` message to a client whose request is rejected.
    /// Off by default: rejected requests are silent no-ops.
    pub fn notify_rejections(mut self, enabled: bool) -> Self {
        self.notify_rejections = enabled;
        self
    }

    /// How long a new peer gets to complete the WebSocket upgrade before
    /// it is dropped.
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Validates the room settings, binds the listener and builds the
    /// server.
    pub async fn build(self) -> Result<RideBusServer, RideBusError> {
        self.room_settings.validate()?;
        let transport = WebSocketTransport::bind(&self.bind_addr)
            .await?
            .with_handshake_timeout(self.handshake_timeout);

        let state = Arc::new(ServerState {
            registry: RoomRegistry::new(self.room_settings),
            codec: JsonCodec,
            broadcaster: Broadcaster::new(JsonCodec),
            notify_rejections: self.notify_rejections,
        });

        Ok(RideBusServer { transport, state })
    }
}

impl Default for RideBusServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Ride the Bus server.
///
/// Call [`run()`](Self::run) or [`run_until()`](Self::run_until) to
/// start accepting connections.
pub struct RideBusServer {
    transport: WebSocketTransport,
    state: Arc<ServerState>,
}

impl RideBusServer {
    /// Creates a new builder.
    pub fn builder() -> RideBusServerBuilder {
        RideBusServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, RideBusError> {
        Ok(self.transport.local_addr()?)
    }

    /// Runs the accept loop until the process is terminated.
    pub async fn run(self) -> Result<(), RideBusError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the accept loop until `shutdown` completes, then stops every
    /// room.
    ///
    /// Each accepted peer gets its own task, which runs the WebSocket
    /// handshake and then the connection handler.
    pub async fn run_until(
        mut self,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), RideBusError> {
        let addr = self.local_addr()?;
        tracing::info!(%addr, "ride the bus server running");

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                () = &mut shutdown => {
                    tracing::info!("shutdown requested");
                    break;
                }
                accepted = self.transport.accept() => match accepted {
                    Ok(pending) => {
                        let state = Arc::clone(&self.state);
                        tokio::spawn(async move {
                            let peer = pending.peer_addr();
                            let conn = match pending.establish().await {
                                Ok(conn) => conn,
                                Err(e) => {
                                    tracing::debug!(
                                        %peer,
                                        error = %e,
                                        "dropping peer"
                                    );
                                    return;
                                }
                            };
                            if let Err(e) = handle_connection(conn, state).await {
                                tracing::debug!(
                                    %peer,
                                    error = %e,
                                    "connection ended with error"
                                );
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                    }
                },
            }
        }

        self.state.registry.shutdown().await;
        tracing::info!("server stopped");
        Ok(())
    }
}
