//! Registry records and the id allocator.

use std::net::SocketAddr;
use std::sync::Arc;

use switchboard_protocol::ClientId;

/// The first id handed to a client.
pub const FIRST_CLIENT_ID: u64 = 100;

/// One connected client's registry record.
///
/// Created at accept time and owned by the [`Registry`](crate::Registry)
/// until the connection ends. Cloning is cheap: the connection handle is
/// shared, not duplicated.
pub struct ClientEntry<C> {
    /// Server-assigned id, fixed for the life of the connection.
    pub id: ClientId,
    /// Handle used to write to this client.
    pub connection: Arc<C>,
    /// The peer's network address, for display.
    pub remote_addr: SocketAddr,
}

impl<C> Clone for ClientEntry<C> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            connection: Arc::clone(&self.connection),
            remote_addr: self.remote_addr,
        }
    }
}

impl<C> std::fmt::Debug for ClientEntry<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientEntry")
            .field("id", &self.id)
            .field("remote_addr", &self.remote_addr)
            .finish_non_exhaustive()
    }
}

/// The display fields of an entry, copied out of the registry so a
/// listing can be rendered after the lock is released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientSummary {
    /// The client's id.
    pub id: ClientId,
    /// The client's network address.
    pub remote_addr: SocketAddr,
}

/// Monotonic id source. Ids are never reused, even after a disconnect.
#[derive(Debug)]
pub struct IdAllocator {
    next: u64,
}

impl IdAllocator {
    /// Starts allocating at [`FIRST_CLIENT_ID`].
    pub fn new() -> Self {
        Self::starting_at(FIRST_CLIENT_ID)
    }

    /// Starts allocating at `first`.
    pub fn starting_at(first: u64) -> Self {
        Self { next: first }
    }

    /// Returns the next id and advances the counter.
    pub fn next_id(&mut self) -> ClientId {
        let id = ClientId(self.next);
        self.next += 1;
        id
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}
