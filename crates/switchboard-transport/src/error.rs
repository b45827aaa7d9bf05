/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The connection was closed.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// Binding the listening socket failed.
    #[error("bind to {addr} failed: {source}")]
    BindFailed {
        /// The address that could not be bound.
        addr: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Accepting an incoming connection failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// Connecting to a remote endpoint failed.
    #[error("connect to {addr} failed: {source}")]
    ConnectFailed {
        /// The address that refused or timed out.
        addr: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The host given to connect to is not a usable address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),
}
