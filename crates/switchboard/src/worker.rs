//! Per-connection worker: read, frame, decode, dispatch, until the
//! connection ends.
//!
//! Each accepted connection gets its own Tokio task running a [`Worker`].
//! The worker is a two-state machine:
//!
//! ```text
//!   Active ──(end of stream | read error | reply failed)──→ Closed
//!     │ ↑
//!     └─┘ bytes read → frames → messages → dispatcher
//! ```
//!
//! Entering `Closed` unregisters the client and shuts the socket down.
//! Malformed frames never leave `Active`; they are logged and dropped.

use std::sync::Arc;

use switchboard_protocol::{ClientId, Codec, FrameReader};
use switchboard_transport::{Connection, TcpConnection};

use crate::dispatch::dispatch;
use crate::server::ServerState;
use crate::SwitchboardError;

/// Lifecycle of one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConnectionState {
    /// Reading and handling requests.
    Active,
    /// Terminal. The client is no longer registered.
    Closed,
}

/// Drop guard that unregisters the client when the worker goes away.
///
/// The normal close path unregisters explicitly; this covers a worker
/// that panics or is aborted at shutdown. Unregistering is idempotent, so
/// the second call is a no-op.
struct RegistrationGuard {
    client_id: ClientId,
    state: Arc<ServerState>,
}

impl Drop for RegistrationGuard {
    fn drop(&mut self) {
        self.state.registry.unregister(self.client_id);
    }
}

/// Only a failed write means the peer is gone. A response that could not
/// be encoded is the server's problem, not the connection's.
fn ends_connection(err: &SwitchboardError) -> bool {
    matches!(err, SwitchboardError::Transport(_))
}

/// Owns one connection for its whole lifetime.
pub(crate) struct Worker {
    conn: Arc<TcpConnection>,
    client_id: ClientId,
    state: Arc<ServerState>,
    frames: FrameReader,
    _guard: RegistrationGuard,
}

impl Worker {
    /// Creates a worker for a connection that is already registered as
    /// `client_id`.
    pub(crate) fn new(
        conn: Arc<TcpConnection>,
        client_id: ClientId,
        state: Arc<ServerState>,
    ) -> Self {
        let frames = FrameReader::with_max_frame_len(state.config.max_frame_len);
        let guard = RegistrationGuard {
            client_id,
            state: Arc::clone(&state),
        };
        Self {
            conn,
            client_id,
            state,
            frames,
            _guard: guard,
        }
    }

    /// Runs the connection until it closes.
    pub(crate) async fn run(mut self) {
        let mut state = ConnectionState::Active;
        while state == ConnectionState::Active {
            state = self.step().await;
        }
        self.close().await;
    }

    /// One blocking read and everything it makes possible.
    async fn step(&mut self) -> ConnectionState {
        let client_id = self.client_id;
        match self.conn.recv().await {
            Ok(Some(bytes)) => self.handle_bytes(&bytes).await,
            Ok(None) => {
                tracing::info!(%client_id, "client disconnected");
                ConnectionState::Closed
            }
            Err(e) => {
                tracing::debug!(%client_id, error = %e, "read failed");
                ConnectionState::Closed
            }
        }
    }

    /// Frames `bytes`, then decodes and dispatches each complete frame in
    /// arrival order.
    async fn handle_bytes(&mut self, bytes: &[u8]) -> ConnectionState {
        let client_id = self.client_id;
        let frames = self.frames.push(bytes);

        let discarded = self.frames.take_discarded();
        if discarded > 0 {
            tracing::warn!(
                %client_id,
                discarded,
                max_frame_len = self.state.config.max_frame_len,
                "dropped oversized frame data"
            );
        }

        for frame in frames {
            let msg = match self.state.codec.decode(&frame) {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::debug!(
                        %client_id, error = %e, "dropping malformed frame"
                    );
                    continue;
                }
            };

            match dispatch(&self.conn, &self.state, client_id, msg).await {
                Ok(()) => {}
                Err(e) if ends_connection(&e) => {
                    tracing::debug!(
                        %client_id, error = %e, "reply failed, closing connection"
                    );
                    return ConnectionState::Closed;
                }
                Err(e) => {
                    tracing::warn!(
                        %client_id, error = %e, "could not build response, skipping"
                    );
                }
            }
        }

        ConnectionState::Active
    }

    /// Unregisters the client (which also marks the handle closed, under
    /// the registry lock), then shuts the socket down outside the lock.
    async fn close(self) {
        let client_id = self.client_id;
        self.state.registry.unregister(client_id);
        if let Err(e) = self.conn.close().await {
            tracing::debug!(%client_id, error = %e, "socket shutdown failed");
        }
        tracing::info!(%client_id, "connection closed");
    }
}

#[cfg(test)]
mod tests {
    use switchboard_protocol::ProtocolError;
    use switchboard_transport::TransportError;

    use super::*;

    #[test]
    fn test_only_transport_errors_end_the_connection() {
        let write_failed =
            SwitchboardError::from(TransportError::ConnectionClosed("peer".into()));
        assert!(ends_connection(&write_failed));

        let unframeable =
            SwitchboardError::from(ProtocolError::PayloadContainsTerminator);
        assert!(!ends_connection(&unframeable));

        let config = SwitchboardError::Config("bad".into());
        assert!(!ends_connection(&config));
    }
}
