//! Error types for the protocol layer.
//!
//! Every way a frame can fail to become a [`Message`](crate::Message) has
//! its own variant, so the server can log *why* a frame was dropped even
//! though the peer never hears about it.

/// Errors that can occur while encoding or decoding a frame.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// The frame does not start with the protocol head token.
    #[error("frame does not start with the protocol head")]
    MissingHead,

    /// Fewer than three delimiters follow the head token.
    #[error("frame has {found} of 3 required delimiters")]
    MissingDelimiter {
        /// How many delimiters were actually present.
        found: usize,
    },

    /// The target id field is not a base-10 unsigned integer.
    #[error("invalid target id {0:?}")]
    InvalidTargetId(String),

    /// The frame bytes are not valid UTF-8.
    #[error("frame is not valid UTF-8")]
    InvalidUtf8,

    /// The payload contains the frame terminator and cannot be framed.
    #[error("payload contains the frame terminator")]
    PayloadContainsTerminator,
}
