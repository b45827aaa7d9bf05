//! The four request handlers.
//!
//! Each handler reads what it needs from the registry (copying it out, so
//! the lock is released), then writes to a socket. Replies go to the
//! requester; a forward goes to the target, or an error goes back to the
//! source when the target is not connected.

use chrono::{DateTime, TimeZone};
use switchboard_protocol::{ClientId, Codec, Message, MessageKind};
use switchboard_registry::ClientSummary;
use switchboard_transport::{Connection, TcpConnection};

use crate::server::ServerState;
use crate::{ServerConfig, SwitchboardError};

/// `T`: the server's local time.
pub(crate) async fn time(
    conn: &TcpConnection,
    state: &ServerState,
    requester: ClientId,
) -> Result<(), SwitchboardError> {
    let now = format_time(&chrono::Local::now());
    tracing::info!(client_id = %requester, time = %now, "time requested");
    reply(conn, state, Message::response(MessageKind::Time, now)).await
}

/// `N`: the server's host name.
pub(crate) async fn name(
    conn: &TcpConnection,
    state: &ServerState,
    requester: ClientId,
) -> Result<(), SwitchboardError> {
    let name = server_name(&state.config);
    tracing::info!(client_id = %requester, %name, "name requested");
    reply(conn, state, Message::response(MessageKind::Name, name)).await
}

/// `L`: every connected client, the requester marked.
pub(crate) async fn list(
    conn: &TcpConnection,
    state: &ServerState,
    requester: ClientId,
) -> Result<(), SwitchboardError> {
    let clients = state.registry.snapshot();
    tracing::info!(
        client_id = %requester,
        clients = clients.len(),
        "client list requested"
    );
    let listing =
        render_client_list(&state.config.list_header, &clients, requester);
    reply(conn, state, Message::response(MessageKind::List, listing)).await
}

/// `S`: relay `text` from `source` to `target`.
///
/// Delivery is best-effort: a failed write to the target is logged and
/// not retried, and the source is not told. Only an unknown target
/// produces a reply to the source.
pub(crate) async fn forward(
    conn: &TcpConnection,
    state: &ServerState,
    source: ClientId,
    target: ClientId,
    text: &str,
) -> Result<(), SwitchboardError> {
    tracing::info!(client_id = %source, %target, "forward requested");

    let Some(entry) = state.registry.find(target) else {
        tracing::warn!(client_id = %source, %target, "forward target not found");
        let error = Message::response(MessageKind::Send, not_found_payload(target));
        return reply(conn, state, error).await;
    };

    let delivery =
        Message::new(MessageKind::Send, source, forward_payload(source, text));
    let frame = state.codec.encode_frame(&delivery)?;
    match entry.connection.send(&frame).await {
        Ok(()) => {
            tracing::info!(client_id = %source, %target, "message forwarded");
        }
        Err(e) => {
            tracing::debug!(
                client_id = %source, %target, error = %e,
                "forward delivery failed"
            );
        }
    }
    Ok(())
}

/// Writes `msg` to the requester's connection.
async fn reply(
    conn: &TcpConnection,
    state: &ServerState,
    msg: Message,
) -> Result<(), SwitchboardError> {
    let frame = state.codec.encode_frame(&msg)?;
    conn.send(&frame).await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Response text
// ---------------------------------------------------------------------------

fn format_time<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Configured name, else the host name, else the fallback.
fn server_name(config: &ServerConfig) -> String {
    if let Some(name) = &config.server_name {
        return name.clone();
    }
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .filter(|h| !h.is_empty() && !h.contains('\n'))
        .unwrap_or_else(|| config.hostname_fallback.clone())
}

/// `<header>[ID:100 10.0.0.1:5000(You)] [ID:101 10.0.0.2:5001] `
fn render_client_list(
    header: &str,
    clients: &[ClientSummary],
    requester: ClientId,
) -> String {
    let mut out = String::from(header);
    for client in clients {
        out.push_str(&format!(
            "[ID:{} {}:{}",
            client.id,
            client.remote_addr.ip(),
            client.remote_addr.port()
        ));
        if client.id == requester {
            out.push_str("(You)");
        }
        out.push_str("] ");
    }
    out
}

fn forward_payload(source: ClientId, text: &str) -> String {
    format!("[From {source}]: {text}")
}

fn not_found_payload(target: ClientId) -> String {
    format!("[System] Error: Client {target} not found.")
}
