//! Standalone Switchboard server.
//!
//! ```text
//! cargo run -p switchboard-server
//! SWITCHBOARD_BIND=127.0.0.1:9000 RUST_LOG=switchboard=debug cargo run -p switchboard-server
//! ```
//!
//! Stops on Ctrl-C.

use switchboard::prelude::*;

#[tokio::main]
async fn main() -> Result<(), SwitchboardError> {
    init_tracing();

    let config = ServerConfig::from_env()?;
    let server = SwitchboardServer::builder().config(config).build().await?;

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "could not listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
            tracing::info!("Ctrl-C received");
        })
        .await
}
