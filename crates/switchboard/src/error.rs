//! Unified error type for Switchboard.

use switchboard_protocol::ProtocolError;
use switchboard_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum SwitchboardError {
    /// A transport-level error (bind, accept, connect, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (a message that cannot be framed).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A configuration value could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(String),
}
