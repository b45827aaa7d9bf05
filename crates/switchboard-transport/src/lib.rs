//! Transport abstraction layer for Switchboard.
//!
//! Provides the [`Transport`] and [`Connection`] traits that the server and
//! client are written against, and a TCP implementation of both
//! ([`TcpTransport`], [`TcpConnection`]).
//!
//! A connection moves raw bytes only. Framing and message decoding live in
//! `switchboard-protocol`.

#![allow(async_fn_in_trait)]

mod error;
mod tcp;

pub use error::TransportError;
pub use tcp::{TcpConnection, TcpTransport, READ_CHUNK};

use std::net::SocketAddr;

/// Accepts new incoming connections.
pub trait Transport: Send + Sync + 'static {
    /// The connection type produced by this transport.
    type Connection: Connection;
    /// The error type for transport operations.
    type Error: std::error::Error + Send + Sync;

    /// Waits for and accepts the next incoming connection.
    async fn accept(&mut self) -> Result<Self::Connection, Self::Error>;

    /// Returns the address the transport is listening on.
    fn local_addr(&self) -> std::io::Result<SocketAddr>;
}

/// A single bidirectional byte stream.
///
/// A connection is shared between the task that reads from it and any task
/// that writes to it (its own replies and messages forwarded by other
/// connections), so every method takes `&self`.
pub trait Connection: Send + Sync + 'static {
    /// The error type for connection operations.
    type Error: std::error::Error + Send + Sync;

    /// Writes all of `data` to the remote peer.
    ///
    /// Fails without touching the socket once the connection has been
    /// marked closed.
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error>;

    /// Reads whatever bytes are available next.
    ///
    /// Returns `Ok(None)` when the peer has closed its side.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Marks the connection closed without doing any I/O.
    ///
    /// Subsequent [`send`](Self::send) calls fail. Safe to call while
    /// holding a lock.
    fn mark_closed(&self);

    /// Returns `true` once [`mark_closed`](Self::mark_closed) or
    /// [`close`](Self::close) has been called.
    fn is_closed(&self) -> bool;

    /// Marks the connection closed and shuts down the write side, so the
    /// peer's pending read returns end of stream.
    async fn close(&self) -> Result<(), Self::Error>;

    /// The remote peer's address.
    fn peer_addr(&self) -> SocketAddr;
}
