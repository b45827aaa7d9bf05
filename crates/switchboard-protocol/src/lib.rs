//! Wire protocol for Switchboard.
//!
//! This crate defines the "language" clients and the server speak:
//!
//! - **Types** ([`Message`], [`MessageKind`], [`ClientId`]): what a frame
//!   carries.
//! - **Codec** ([`Codec`] trait, [`TextCodec`]): how a message becomes a
//!   `LAB_PROTO|kind|target|payload` frame and back.
//! - **Framing** ([`FrameReader`]): how a byte stream becomes frames.
//! - **Errors** ([`ProtocolError`]): why a frame was rejected.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw bytes) and the server's
//! dispatcher. It does no I/O and knows nothing about connections.
//!
//! ```text
//! Transport (bytes) → FrameReader (frames) → Codec (Message) → Dispatcher
//! ```

mod codec;
mod error;
mod frame;
mod types;

pub use codec::{Codec, TextCodec, DELIMITER, HEAD, TERMINATOR};
pub use error::ProtocolError;
pub use frame::{FrameReader, DEFAULT_MAX_FRAME_LEN};
pub use types::{ClientId, Message, MessageKind};
