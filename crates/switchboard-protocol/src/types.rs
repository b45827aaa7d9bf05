//! Core protocol types: the values that travel inside a frame.
//!
//! A frame carries exactly one [`Message`]. The message says what kind of
//! request or response it is ([`MessageKind`]), who it is addressed to or
//! came from ([`ClientId`]), and an arbitrary text payload.

use std::fmt;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// A server-assigned identifier for a connected client.
///
/// Ids are handed out by the server at accept time and never reused.
/// [`ClientId::SERVER`] (`0`) is reserved: a message addressed to it is a
/// request for the server itself.
///
/// `Display` prints the bare number because the number is what appears on
/// the wire and inside user-visible payloads like `[From 100]: hi`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ClientId(pub u64);

impl ClientId {
    /// The reserved id meaning "the server".
    pub const SERVER: Self = Self(0);

    /// Returns `true` if this id addresses the server.
    pub fn is_server(self) -> bool {
        self == Self::SERVER
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ClientId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

// ---------------------------------------------------------------------------
// MessageKind
// ---------------------------------------------------------------------------

/// The one-character discriminator of a message.
///
/// The same kind is used for a request and its response: a client sends
/// `Time` and the server answers with `Time`. Unknown characters are kept
/// as [`MessageKind::Other`] rather than rejected, because an unrecognised
/// kind is a dispatch decision (log and ignore), not a framing error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// `T`: server local time.
    Time,
    /// `N`: server host name.
    Name,
    /// `L`: list of connected clients.
    List,
    /// `S`: forward a text message to another client.
    Send,
    /// `D`: reserved for an explicit disconnect; currently unused.
    Disconnect,
    /// Any other character.
    Other(char),
}

impl MessageKind {
    /// Returns the wire character for this kind.
    pub fn as_char(self) -> char {
        match self {
            Self::Time => 'T',
            Self::Name => 'N',
            Self::List => 'L',
            Self::Send => 'S',
            Self::Disconnect => 'D',
            Self::Other(c) => c,
        }
    }

    /// Maps a wire character to a kind.
    pub fn from_char(c: char) -> Self {
        match c {
            'T' => Self::Time,
            'N' => Self::Name,
            'L' => Self::List,
            'S' => Self::Send,
            'D' => Self::Disconnect,
            other => Self::Other(other),
        }
    }
}

impl From<char> for MessageKind {
    fn from(c: char) -> Self {
        Self::from_char(c)
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// The unit of protocol exchange.
///
/// `target` means different things depending on direction:
/// - in a request, it is who the message is addressed to
///   ([`ClientId::SERVER`] for the server, a client id for forwarding);
/// - in a forwarded delivery, it is who the message came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// What this message is.
    pub kind: MessageKind,
    /// Addressee (requests) or originator (forwarded deliveries).
    pub target: ClientId,
    /// Free-form text. May contain the field delimiter.
    pub payload: String,
}

impl Message {
    /// Creates a message with every field given explicitly.
    pub fn new(
        kind: MessageKind,
        target: ClientId,
        payload: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            target,
            payload: payload.into(),
        }
    }

    /// A server-addressed request with an empty payload, e.g. a time or
    /// list request.
    pub fn request(kind: MessageKind) -> Self {
        Self::new(kind, ClientId::SERVER, String::new())
    }

    /// A server response: addressed from the server, carrying `payload`.
    pub fn response(kind: MessageKind, payload: impl Into<String>) -> Self {
        Self::new(kind, ClientId::SERVER, payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_kinds_map_to_their_characters() {
        for (kind, c) in [
            (MessageKind::Time, 'T'),
            (MessageKind::Name, 'N'),
            (MessageKind::List, 'L'),
            (MessageKind::Send, 'S'),
            (MessageKind::Disconnect, 'D'),
        ] {
            assert_eq!(kind.as_char(), c);
            assert_eq!(MessageKind::from_char(c), kind);
        }
    }

    #[test]
    fn test_unknown_kind_is_preserved() {
        let kind = MessageKind::from('x');
        assert_eq!(kind, MessageKind::Other('x'));
        assert_eq!(kind.as_char(), 'x');
        assert_eq!(kind.to_string(), "x");
    }

    #[test]
    fn test_kind_characters_are_case_sensitive() {
        assert_eq!(MessageKind::from_char('t'), MessageKind::Other('t'));
    }

    #[test]
    fn test_client_id_display_is_bare_number() {
        assert_eq!(ClientId(101).to_string(), "101");
    }

    #[test]
    fn test_server_id_is_zero() {
        assert!(ClientId::SERVER.is_server());
        assert!(!ClientId(100).is_server());
        assert_eq!(ClientId::default(), ClientId::SERVER);
    }

    #[test]
    fn test_request_is_addressed_to_server_with_empty_payload() {
        let msg = Message::request(MessageKind::List);
        assert_eq!(msg.target, ClientId::SERVER);
        assert!(msg.payload.is_empty());
    }
}
