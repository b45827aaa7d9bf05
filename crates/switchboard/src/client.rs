//! Client side of the protocol.
//!
//! [`SwitchboardClient`] holds the connection for sending. A background
//! task reads the socket, frames and decodes what arrives, and hands each
//! [`Message`] to the [`Inbound`] receiver returned by
//! [`connect`](SwitchboardClient::connect). Replies and forwarded messages
//! come through the same receiver, in arrival order.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use switchboard_protocol::{
    ClientId, Codec, FrameReader, Message, MessageKind, TextCodec,
};
use switchboard_transport::{Connection, TcpConnection};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::SwitchboardError;

/// How long [`SwitchboardClient::disconnect`] waits for the server to
/// close its side.
const DISCONNECT_GRACE: Duration = Duration::from_secs(1);

/// Messages received from the server. Yields `None` once the connection
/// is gone.
pub type Inbound = mpsc::UnboundedReceiver<Message>;

/// A connection to a Switchboard server.
pub struct SwitchboardClient {
    conn: Arc<TcpConnection>,
    codec: TextCodec,
    reader: JoinHandle<()>,
}

impl SwitchboardClient {
    /// Connects to `host:port` and starts the background reader.
    ///
    /// # Errors
    /// [`TransportError::InvalidAddress`] if `host` neither parses as an IP
    /// address nor resolves, [`TransportError::ConnectFailed`] if the server
    /// cannot be reached.
    ///
    /// [`TransportError::InvalidAddress`]: switchboard_transport::TransportError::InvalidAddress
    /// [`TransportError::ConnectFailed`]: switchboard_transport::TransportError::ConnectFailed
    pub async fn connect(
        host: &str,
        port: u16,
    ) -> Result<(Self, Inbound), SwitchboardError> {
        let conn = Arc::new(TcpConnection::connect(host, port).await?);
        let (tx, rx) = mpsc::unbounded_channel();
        let reader = tokio::spawn(read_loop(Arc::clone(&conn), TextCodec, tx));

        let client = Self {
            conn,
            codec: TextCodec,
            reader,
        };
        Ok((client, rx))
    }

    /// Sends one request. `target` only matters for [`MessageKind::Send`];
    /// pass [`ClientId::SERVER`] otherwise.
    pub async fn send_request(
        &self,
        kind: MessageKind,
        payload: &str,
        target: ClientId,
    ) -> Result<(), SwitchboardError> {
        self.send(&Message::new(kind, target, payload)).await
    }

    /// Encodes and writes an arbitrary message.
    ///
    /// # Errors
    /// [`ProtocolError::PayloadContainsTerminator`] if the payload has a
    /// newline in it; nothing is written in that case.
    ///
    /// [`ProtocolError::PayloadContainsTerminator`]: switchboard_protocol::ProtocolError::PayloadContainsTerminator
    pub async fn send(&self, msg: &Message) -> Result<(), SwitchboardError> {
        let frame = self.codec.encode_frame(msg)?;
        self.conn.send(&frame).await?;
        Ok(())
    }

    /// The server's address.
    pub fn server_addr(&self) -> SocketAddr {
        self.conn.peer_addr()
    }

    /// Closes the write side so the server sees end of stream, then waits
    /// briefly for the server to close its side.
    ///
    /// Anything the server sent before closing is still delivered to the
    /// [`Inbound`] receiver.
    pub async fn disconnect(mut self) -> Result<(), SwitchboardError> {
        let closed = self.conn.close().await;
        if tokio::time::timeout(DISCONNECT_GRACE, &mut self.reader)
            .await
            .is_err()
        {
            tracing::debug!(
                server = %self.conn.peer_addr(),
                "server did not close in time, stopping reader"
            );
            self.reader.abort();
        }
        closed?;
        Ok(())
    }
}

impl Drop for SwitchboardClient {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

/// Reads until end of stream or until the receiver is dropped.
async fn read_loop(
    conn: Arc<TcpConnection>,
    codec: TextCodec,
    tx: mpsc::UnboundedSender<Message>,
) {
    let server = conn.peer_addr();
    let mut frames = FrameReader::new();

    loop {
        let bytes = match conn.recv().await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                tracing::debug!(%server, "server closed the connection");
                return;
            }
            Err(e) => {
                tracing::debug!(%server, error = %e, "read failed");
                return;
            }
        };

        for frame in frames.push(&bytes) {
            match codec.decode(&frame) {
                Ok(msg) => {
                    if tx.send(msg).is_err() {
                        return;
                    }
                }
                Err(e) => {
                    tracing::debug!(%server, error = %e, "dropping malformed frame");
                }
            }
        }
    }
}
