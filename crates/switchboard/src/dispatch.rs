//! Routes a decoded message to its handler by kind.

use switchboard_protocol::{ClientId, Message, MessageKind};
use switchboard_transport::TcpConnection;

use crate::handlers;
use crate::server::ServerState;
use crate::SwitchboardError;

/// The handler a message kind maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Route {
    Time,
    Name,
    List,
    Forward,
}

impl Route {
    /// Returns `None` for kinds the server does not serve, including the
    /// reserved `D`.
    pub(crate) fn for_kind(kind: MessageKind) -> Option<Self> {
        match kind {
            MessageKind::Time => Some(Self::Time),
            MessageKind::Name => Some(Self::Name),
            MessageKind::List => Some(Self::List),
            MessageKind::Send => Some(Self::Forward),
            MessageKind::Disconnect | MessageKind::Other(_) => None,
        }
    }
}

/// Handles one message from `sender`.
///
/// An unrecognised kind is logged and produces no response; the peer is
/// never told. An `Err` means the reply to `sender` could not be written.
pub(crate) async fn dispatch(
    conn: &TcpConnection,
    state: &ServerState,
    sender: ClientId,
    msg: Message,
) -> Result<(), SwitchboardError> {
    let Some(route) = Route::for_kind(msg.kind) else {
        tracing::debug!(
            client_id = %sender,
            kind = %msg.kind,
            "unrecognized message kind, ignoring"
        );
        return Ok(());
    };

    match route {
        Route::Time => handlers::time(conn, state, sender).await,
        Route::Name => handlers::name(conn, state, sender).await,
        Route::List => handlers::list(conn, state, sender).await,
        Route::Forward => {
            handlers::forward(conn, state, sender, msg.target, &msg.payload)
                .await
        }
    }
}
