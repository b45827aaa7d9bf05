//! Client registry for Switchboard.
//!
//! This crate tracks which clients are connected right now:
//!
//! 1. **Id allocation**: every accepted connection gets the next id from
//!    an [`IdAllocator`], starting at [`FIRST_CLIENT_ID`] and never reused.
//! 2. **Registration**: the [`Registry`] maps ids to [`ClientEntry`]
//!    records holding the connection handle and peer address.
//! 3. **Lookup**: request handlers find a forwarding target or take a
//!    [`ClientSummary`] snapshot for a listing.
//!
//! # How it fits in the stack
//!
//! ```text
//! Server (above)  ← registers on accept, unregisters on close, reads for list/forward
//!     ↕
//! Registry (this crate)  ← one mutex-guarded table shared by every connection
//!     ↕
//! Protocol / Transport (below)  ← provide ClientId and the Connection trait
//! ```

mod entry;
mod registry;

pub use entry::{ClientEntry, ClientSummary, IdAllocator, FIRST_CLIENT_ID};
pub use registry::Registry;
