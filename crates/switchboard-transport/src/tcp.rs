//! TCP transport implementation.

use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;

use crate::{Connection, Transport, TransportError};

/// Maximum number of bytes returned by a single [`TcpConnection::recv`].
pub const READ_CHUNK: usize = 2048;

/// A TCP [`Transport`] that listens for incoming connections.
pub struct TcpTransport {
    listener: TcpListener,
}

impl TcpTransport {
    /// Binds a new TCP transport to the given address.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr).await.map_err(|source| {
            TransportError::BindFailed {
                addr: addr.to_string(),
                source,
            }
        })?;
        tracing::info!(addr, "TCP transport listening");
        Ok(Self { listener })
    }
}

impl Transport for TcpTransport {
    type Connection = TcpConnection;
    type Error = TransportError;

    async fn accept(&mut self) -> Result<Self::Connection, Self::Error> {
        let (stream, addr) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;

        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(%addr, error = %e, "could not disable Nagle");
        }
        tracing::debug!(%addr, "accepted TCP connection");

        Ok(TcpConnection::new(stream, addr))
    }

    fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

/// A single TCP connection.
///
/// The stream is split so a read blocked in [`recv`](Connection::recv)
/// never holds up a [`send`](Connection::send) from another task. Each
/// half has its own lock; a send writes its whole buffer under the write
/// lock, so concurrent senders never interleave bytes.
pub struct TcpConnection {
    peer_addr: SocketAddr,
    reader: Mutex<OwnedReadHalf>,
    writer: Mutex<OwnedWriteHalf>,
    closed: AtomicBool,
}

impl TcpConnection {
    fn new(stream: TcpStream, peer_addr: SocketAddr) -> Self {
        let (reader, writer) = stream.into_split();
        Self {
            peer_addr,
            reader: Mutex::new(reader),
            writer: Mutex::new(writer),
            closed: AtomicBool::new(false),
        }
    }

    /// Opens a connection to `host:port`.
    ///
    /// `host` may be an IP literal or a name to resolve.
    ///
    /// # Errors
    /// - [`TransportError::InvalidAddress`] if `host` is empty or does not
    ///   resolve.
    /// - [`TransportError::ConnectFailed`] if the connection is refused or
    ///   fails.
    pub async fn connect(host: &str, port: u16) -> Result<Self, TransportError> {
        let addr = resolve(host, port).await?;
        let stream = TcpStream::connect(addr).await.map_err(|source| {
            TransportError::ConnectFailed {
                addr: addr.to_string(),
                source,
            }
        })?;
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(%addr, error = %e, "could not disable Nagle");
        }
        tracing::debug!(%addr, "connected");
        Ok(Self::new(stream, addr))
    }
}

impl Connection for TcpConnection {
    type Error = TransportError;

    async fn send(&self, data: &[u8]) -> Result<(), Self::Error> {
        if self.is_closed() {
            return Err(TransportError::ConnectionClosed(
                self.peer_addr.to_string(),
            ));
        }
        let mut writer = self.writer.lock().await;
        writer
            .write_all(data)
            .await
            .map_err(TransportError::SendFailed)?;
        writer.flush().await.map_err(TransportError::SendFailed)
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        let mut buf = vec![0u8; READ_CHUNK];
        let n = self
            .reader
            .lock()
            .await
            .read(&mut buf)
            .await
            .map_err(TransportError::ReceiveFailed)?;
        if n == 0 {
            return Ok(None);
        }
        buf.truncate(n);
        Ok(Some(buf))
    }

    fn mark_closed(&self) {
        self.closed.store(true, Ordering::Release);
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.mark_closed();
        self.writer
            .lock()
            .await
            .shutdown()
            .await
            .map_err(TransportError::SendFailed)
    }

    fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }
}

async fn resolve(host: &str, port: u16) -> Result<SocketAddr, TransportError> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, port));
    }
    if host.is_empty() {
        return Err(TransportError::InvalidAddress("empty host".into()));
    }
    tokio::net::lookup_host((host, port))
        .await
        .map_err(|e| TransportError::InvalidAddress(format!("{host}: {e}")))?
        .next()
        .ok_or_else(|| {
            TransportError::InvalidAddress(format!("{host}: no addresses"))
        })
}
