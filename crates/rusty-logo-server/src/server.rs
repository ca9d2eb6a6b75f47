//! TCP accept loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

use rusty_logo_core::config::Config;

use crate::conn_limit::ConnectionLimiter;
use crate::connection::{ConnectionSettings, handle_connection};

/// Bind the configured address and serve until Ctrl-C.
pub async fn start_server(config: Config) -> anyhow::Result<()> {
    let addr = config.listen_addr();
    let listener = TcpListener::bind(&addr).await?;
    info!("Rusty Logo listening on {addr}");

    let shutdown = CancellationToken::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        trigger.cancel();
    });

    serve(listener, config, shutdown).await
}

/// Accept connections on `listener` until `shutdown` fires, running one
/// independent session per connection. On shutdown every live session is
/// cancelled and awaited before returning.
pub async fn serve(
    listener: TcpListener,
    config: Config,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let settings = Arc::new(ConnectionSettings::from_config(&config)?);
    let limiter = config
        .server()
        .max_connections_per_ip
        .map(ConnectionLimiter::new);

    let mut sessions = JoinSet::new();

    loop {
        let accepted = tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => accepted,
        };

        let (stream, peer) = match accepted {
            Ok(pair) => pair,
            Err(e) => {
                error!(%e, "Failed to accept connection");
                // usually fd exhaustion; give sessions a moment to finish
                tokio::time::sleep(Duration::from_millis(100)).await;
                continue;
            }
        };

        let permit = match &limiter {
            Some(limiter) => match limiter.try_acquire(peer.ip()) {
                Some(permit) => Some(permit),
                None => {
                    warn!(%peer, "Rejecting connection");
                    drop(stream);
                    continue;
                }
            },
            None => None,
        };

        if let Err(e) = stream.set_nodelay(true) {
            warn!(%peer, %e, "Failed to set TCP_NODELAY");
        }

        let conn_id = Uuid::new_v4();
        let span = info_span!("session", conn_id = %conn_id, %peer);
        span.in_scope(|| info!("New connection"));

        let settings = settings.clone();
        let cancel = shutdown.child_token();
        sessions.spawn(
            async move {
                let _permit = permit;
                handle_connection(stream, &settings, cancel).await
            }
            .instrument(span),
        );

        while sessions.try_join_next().is_some() {}
    }

    info!(open = sessions.len(), "Shutting down, waiting for open sessions");
    while sessions.join_next().await.is_some() {}
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            error!(%e, "Failed to install CTRL+C handler");
            std::future::pending::<()>().await;
        }
    }
}
