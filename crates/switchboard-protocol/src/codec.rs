//! Codec trait and the text codec for the Switchboard wire format.
//!
//! A frame looks like this (ASCII, case-sensitive):
//!
//! ```text
//! LAB_PROTO|<kind>|<target>|<payload>
//! ```
//!
//! Only the first three delimiters are structural. The payload is the last
//! field and runs verbatim to the end of the frame, so it may contain `|`.
//!
//! The frame itself carries no terminator. On the stream, frames are
//! separated by [`TERMINATOR`]; [`Codec::encode_frame`] appends it and the
//! [`FrameReader`](crate::FrameReader) splits on it.

use crate::{ClientId, Message, MessageKind, ProtocolError};

/// Literal token every frame starts with.
pub const HEAD: &str = "LAB_PROTO";

/// Field separator.
pub const DELIMITER: char = '|';

/// Byte that ends a frame on the stream.
pub const TERMINATOR: u8 = b'\n';

/// Converts a [`Message`] to a frame and back.
///
/// `Send + Sync + 'static` so one codec value can be shared by every
/// connection task for the lifetime of the server.
pub trait Codec: Send + Sync + 'static {
    /// Encodes a message as a bare frame, without the terminator.
    fn encode(&self, msg: &Message) -> String;

    /// Decodes one frame (terminator already stripped).
    ///
    /// # Errors
    /// Returns a [`ProtocolError`] describing the first structural problem
    /// found in the frame.
    fn decode(&self, frame: &[u8]) -> Result<Message, ProtocolError>;

    /// Encodes a message and appends the terminator, ready to write to
    /// the stream.
    ///
    /// # Errors
    /// Returns [`ProtocolError::PayloadContainsTerminator`] if the payload
    /// contains the terminator byte, since the receiver would split it
    /// into two frames.
    fn encode_frame(&self, msg: &Message) -> Result<Vec<u8>, ProtocolError> {
        if msg.payload.as_bytes().contains(&TERMINATOR) {
            return Err(ProtocolError::PayloadContainsTerminator);
        }
        let mut frame = self.encode(msg).into_bytes();
        frame.push(TERMINATOR);
        Ok(frame)
    }
}

/// The `LAB_PROTO|kind|target|payload` text codec.
///
/// ## Example
///
/// ```rust
/// use switchboard_protocol::{ClientId, Codec, Message, MessageKind, TextCodec};
///
/// let codec = TextCodec;
/// let msg = Message::new(MessageKind::Send, ClientId(101), "a|b");
///
/// let frame = codec.encode(&msg);
/// assert_eq!(frame, "LAB_PROTO|S|101|a|b");
/// assert_eq!(codec.decode(frame.as_bytes()).unwrap(), msg);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct TextCodec;

impl Codec for TextCodec {
    fn encode(&self, msg: &Message) -> String {
        format!(
            "{HEAD}{DELIMITER}{kind}{DELIMITER}{target}{DELIMITER}{payload}",
            kind = msg.kind,
            target = msg.target,
            payload = msg.payload,
        )
    }

    fn decode(&self, frame: &[u8]) -> Result<Message, ProtocolError> {
        let text =
            std::str::from_utf8(frame).map_err(|_| ProtocolError::InvalidUtf8)?;

        let rest = text.strip_prefix(HEAD).ok_or(ProtocolError::MissingHead)?;
        let (_, after_first) = rest
            .split_once(DELIMITER)
            .ok_or(ProtocolError::MissingDelimiter { found: 0 })?;

        // `splitn(3, ..)` leaves any further delimiters inside the payload.
        let mut fields = after_first.splitn(3, DELIMITER).skip(1);
        let target = fields
            .next()
            .ok_or(ProtocolError::MissingDelimiter { found: 1 })?;
        let payload = fields
            .next()
            .ok_or(ProtocolError::MissingDelimiter { found: 2 })?;

        // The kind is the character right after the first delimiter; the
        // rest of the kind field is ignored.
        let kind = after_first
            .chars()
            .next()
            .map(MessageKind::from_char)
            .ok_or(ProtocolError::MissingDelimiter { found: 1 })?;

        Ok(Message {
            kind,
            target: parse_target(target)?,
            payload: payload.to_owned(),
        })
    }
}

fn parse_target(field: &str) -> Result<ClientId, ProtocolError> {
    // `u64::from_str` would also accept a leading `+`.
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ProtocolError::InvalidTargetId(field.to_owned()));
    }
    field
        .parse::<u64>()
        .map(ClientId)
        .map_err(|_| ProtocolError::InvalidTargetId(field.to_owned()))
}
