//! The registry: every client currently connected to the server.
//!
//! # Concurrency note
//!
//! All state sits behind one `std::sync::Mutex`, and every public method
//! takes the lock, does its map operation, and releases it before
//! returning. No method awaits or performs I/O while the lock is held, and
//! the lock is never handed out, so callers cannot hold it across a socket
//! write. Anything a caller needs for I/O (a connection handle, display
//! fields) is copied out first.
//!
//! The id allocator lives under the same lock as the map, so allocating an
//! id and inserting the entry is one atomic step.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use switchboard_protocol::ClientId;
use switchboard_transport::Connection;

use crate::{ClientEntry, ClientSummary, IdAllocator};

struct Clients<C> {
    /// Ordered by id, which is also accept order.
    entries: BTreeMap<ClientId, ClientEntry<C>>,
    ids: IdAllocator,
}

/// Thread-safe table of connected clients, keyed by server-assigned id.
///
/// ## Lifecycle
///
/// ```text
/// accept ──→ register() ──→ [present] ──→ unregister() ──→ [gone, handle closed]
///                              │
///                   find() / snapshot() read it
/// ```
pub struct Registry<C> {
    inner: Mutex<Clients<C>>,
}

impl<C: Connection> Registry<C> {
    /// Creates an empty registry whose first id is
    /// [`FIRST_CLIENT_ID`](crate::FIRST_CLIENT_ID).
    pub fn new() -> Self {
        Self::with_allocator(IdAllocator::new())
    }

    /// Creates an empty registry drawing ids from `ids`.
    pub fn with_allocator(ids: IdAllocator) -> Self {
        Self {
            inner: Mutex::new(Clients {
                entries: BTreeMap::new(),
                ids,
            }),
        }
    }

    /// Allocates an id for `connection` and inserts its entry.
    ///
    /// The allocator never repeats an id, so the insert cannot collide.
    pub fn register(&self, connection: Arc<C>) -> ClientId {
        let remote_addr = connection.peer_addr();
        let mut clients = self.lock();
        let id = clients.ids.next_id();
        let previous = clients.entries.insert(
            id,
            ClientEntry {
                id,
                connection,
                remote_addr,
            },
        );
        debug_assert!(previous.is_none(), "client id {id} issued twice");
        drop(clients);

        tracing::debug!(client_id = %id, peer = %remote_addr, "client registered");
        id
    }

    /// Removes the entry for `id` and marks its connection closed, both
    /// under the lock.
    ///
    /// Returns the removed entry so the caller can shut the transport down
    /// after the lock is released. Returns `None` if `id` was already gone,
    /// so calling this twice is harmless.
    pub fn unregister(&self, id: ClientId) -> Option<ClientEntry<C>> {
        let mut clients = self.lock();
        let entry = clients.entries.remove(&id)?;
        entry.connection.mark_closed();
        drop(clients);

        tracing::debug!(client_id = %id, "client unregistered");
        Some(entry)
    }

    /// Returns a point-in-time copy of every client's display fields, in
    /// ascending id order.
    pub fn snapshot(&self) -> Vec<ClientSummary> {
        self.lock()
            .entries
            .values()
            .map(|entry| ClientSummary {
                id: entry.id,
                remote_addr: entry.remote_addr,
            })
            .collect()
    }

    /// Looks up a single client.
    pub fn find(&self, id: ClientId) -> Option<ClientEntry<C>> {
        self.lock().entries.get(&id).cloned()
    }

    /// Number of connected clients.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Returns `true` if no client is connected.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every method leaves the map consistent before anything that could
    /// panic, so a poisoned lock still guards valid data.
    fn lock(&self) -> MutexGuard<'_, Clients<C>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<C: Connection> Default for Registry<C> {
    fn default() -> Self {
        Self::new()
    }
}
