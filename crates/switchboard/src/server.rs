//! `SwitchboardServer` builder and the accept loop.
//!
//! This is the entry point for running a server. It ties the layers
//! together: transport → registry → one worker task per connection.

use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;

use switchboard_protocol::TextCodec;
use switchboard_registry::Registry;
use switchboard_transport::{
    Connection, TcpConnection, TcpTransport, Transport, TransportError,
};
use tokio::task::{JoinError, JoinSet};

use crate::worker::Worker;
use crate::{ServerConfig, SwitchboardError};

/// Shared server state passed to each worker task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks. The
/// registry does its own locking; everything else is read-only.
pub(crate) struct ServerState {
    pub(crate) registry: Registry<TcpConnection>,
    pub(crate) codec: TextCodec,
    pub(crate) config: ServerConfig,
}

/// Builder for configuring and starting a Switchboard server.
///
/// # Example
///
/// ```rust,ignore
/// let server = SwitchboardServer::builder()
///     .bind("0.0.0.0:8888")
///     .build()
///     .await?;
/// server.run().await
/// ```
pub struct SwitchboardServerBuilder {
    config: ServerConfig,
}

impl SwitchboardServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Validates the configuration and binds the listening socket.
    ///
    /// # Errors
    /// Returns [`SwitchboardError::Config`] for an unusable configuration
    /// and [`TransportError::BindFailed`] if the address cannot be bound.
    /// The server cannot run without either.
    ///
    /// [`TransportError::BindFailed`]: switchboard_transport::TransportError::BindFailed
    pub async fn build(self) -> Result<SwitchboardServer, SwitchboardError> {
        self.config.validate()?;
        let transport = TcpTransport::bind(&self.config.bind_addr).await?;

        let state = Arc::new(ServerState {
            registry: Registry::new(),
            codec: TextCodec,
            config: self.config,
        });

        Ok(SwitchboardServer {
            transport,
            state,
            workers: JoinSet::new(),
        })
    }
}

impl Default for SwitchboardServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// What the accept loop woke up for.
enum Event {
    Shutdown,
    Accepted(Result<TcpConnection, TransportError>),
    Finished(Result<(), JoinError>),
}

/// A bound Switchboard server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct SwitchboardServer {
    transport: TcpTransport,
    state: Arc<ServerState>,
    /// One task per live connection. Handles are kept so shutdown can
    /// abort them.
    workers: JoinSet<()>,
}

impl SwitchboardServer {
    /// Creates a new builder.
    pub fn builder() -> SwitchboardServerBuilder {
        SwitchboardServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the accept loop until the process is terminated.
    pub async fn run(self) -> Result<(), SwitchboardError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the accept loop until `shutdown` completes, then aborts every
    /// connection task.
    ///
    /// Each accepted connection gets the next client id, a registry entry,
    /// and its own worker task. Accept failures are logged and the loop
    /// keeps going. Finished workers are collected as they end.
    pub async fn run_until(
        mut self,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), SwitchboardError> {
        tokio::pin!(shutdown);
        match self.local_addr() {
            Ok(addr) => tracing::info!(%addr, "switchboard server running"),
            Err(_) => tracing::info!("switchboard server running"),
        }

        loop {
            match self.next_event(shutdown.as_mut()).await {
                Event::Shutdown => break,
                Event::Accepted(Ok(conn)) => self.admit(conn),
                Event::Accepted(Err(e)) => {
                    tracing::error!(error = %e, "accept failed");
                }
                Event::Finished(result) => log_finished(result),
            }
        }

        tracing::info!(
            connections = self.workers.len(),
            "shutting down, aborting connection tasks"
        );
        self.workers.shutdown().await;
        Ok(())
    }

    /// Waits for shutdown, a new connection, or a worker ending, whichever
    /// comes first.
    async fn next_event<F>(&mut self, shutdown: Pin<&mut F>) -> Event
    where
        F: Future<Output = ()>,
    {
        let has_workers = !self.workers.is_empty();
        tokio::select! {
            () = shutdown => Event::Shutdown,
            accepted = self.transport.accept() => Event::Accepted(accepted),
            Some(finished) = self.workers.join_next(), if has_workers => {
                Event::Finished(finished)
            }
        }
    }

    /// Registers a new connection and starts its worker.
    fn admit(&mut self, conn: TcpConnection) {
        let conn = Arc::new(conn);
        let peer = conn.peer_addr();
        let client_id = self.state.registry.register(Arc::clone(&conn));
        tracing::info!(%client_id, %peer, "client connected");

        let worker = Worker::new(conn, client_id, Arc::clone(&self.state));
        self.workers.spawn(worker.run());
    }
}

/// Surfaces a panicked worker; normal exits and aborts are silent.
fn log_finished(result: Result<(), JoinError>) {
    if let Err(e) = result {
        if e.is_panic() {
            tracing::error!(error = %e, "connection task panicked");
        }
    }
}
