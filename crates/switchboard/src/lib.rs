//! # Switchboard
//!
//! A multi-client TCP request/response server with client-to-client
//! message relay.
//!
//! Clients hold a persistent connection and send one-line requests in the
//! `LAB_PROTO|kind|target|payload` format: ask for the server's time
//! (`T`), host name (`N`), the list of connected clients (`L`), or forward
//! a text message to another client by id (`S`). The server answers each
//! request on the requester's connection and pushes forwarded messages to
//! the target's connection.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use switchboard::prelude::*;
//!
//! # async fn demo() -> Result<(), SwitchboardError> {
//! let server = SwitchboardServer::builder()
//!     .bind("127.0.0.1:8888")
//!     .build()
//!     .await?;
//! tokio::spawn(server.run());
//!
//! let (client, mut inbound) = SwitchboardClient::connect("127.0.0.1", 8888).await?;
//! client.send_request(MessageKind::Time, "", ClientId::SERVER).await?;
//! let reply = inbound.recv().await;
//! # let _ = reply;
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod dispatch;
mod error;
mod handlers;
mod server;
mod telemetry;
mod worker;

pub use client::{Inbound, SwitchboardClient};
pub use config::{ServerConfig, DEFAULT_BIND_ADDR};
pub use error::SwitchboardError;
pub use server::{SwitchboardServer, SwitchboardServerBuilder};
pub use telemetry::init_tracing;

/// Everything needed to run a server or a client.
pub mod prelude {
    pub use crate::{
        init_tracing, Inbound, ServerConfig, SwitchboardClient,
        SwitchboardError, SwitchboardServer, SwitchboardServerBuilder,
    };
    pub use switchboard_protocol::{
        ClientId, Codec, Message, MessageKind, ProtocolError, TextCodec,
    };
    pub use switchboard_registry::{ClientSummary, FIRST_CLIENT_ID};
    pub use switchboard_transport::TransportError;
}
