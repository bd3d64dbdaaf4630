use std::io::{Error, ErrorKind};
use std::net::Ipv4Addr;
use std::ops::RangeInclusive;
use std::sync::Arc;

use anyhow::Context;
use readforme::{api, config, logging, upstream};
use tokio::net::TcpListener;

/// Ports tried in order when `SERVER_PORT` is unset.
const FALLBACK_PORTS: RangeInclusive<u16> = 8000..=8099;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_tracing();
    let config = Arc::new(config::load().context("Failed to load configuration")?);
    let http = upstream::http_client().context("Failed to build HTTP client")?;

    let state = api::AppState::from_config(Arc::clone(&config), http);
    tracing::info!(storage_mode = %state.store().mode(), "Storage strategy selected");
    let app = api::create_router(state);

    let (listener, port) = match config.server_port {
        Some(port) => TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))
            .await
            .map(|listener| (listener, port))
            .with_context(|| format!("Failed to bind configured port {port}"))?,
        None => first_free_port(FALLBACK_PORTS)
            .await
            .context("Failed to bind listener")?,
    };
    tracing::info!(port, "Listening on http://0.0.0.0:{port}");
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

async fn first_free_port(ports: RangeInclusive<u16>) -> Result<(TcpListener, u16), Error> {
    let (first, last) = (*ports.start(), *ports.end());
    for port in ports {
        match TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).await {
            Ok(listener) => return Ok((listener, port)),
            Err(err) if err.kind() == ErrorKind::AddrInUse => {
                tracing::debug!(port, "Port in use");
            }
            Err(err) => return Err(err),
        }
    }
    Err(Error::new(
        ErrorKind::AddrNotAvailable,
        format!("every port in {first}-{last} is in use"),
    ))
}
