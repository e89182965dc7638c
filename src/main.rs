use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::Notify;
use tracing::info;
use tracing_subscriber::EnvFilter;

use roombook::config::Config;
use roombook::engine::Engine;
use roombook::http;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env();
    roombook::observability::init(config.metrics_addr())?;

    let engine = Arc::new(Engine::new());
    let app = http::router(engine);

    let addr = config.addr();
    let listener = TcpListener::bind(addr).await?;
    info!("roombook listening on {addr}");
    info!("  shutdown grace: {}s", config.shutdown_grace.as_secs());
    info!(
        "  metrics: {}",
        config
            .metrics_addr()
            .map_or("disabled".to_string(), |a| format!("http://{a}/metrics"))
    );

    // Graceful shutdown: stop accepting on SIGTERM/ctrl-c, drain in-flight requests
    let stopping = Arc::new(Notify::new());
    let server = axum::serve(listener, app).with_graceful_shutdown({
        let stopping = stopping.clone();
        async move {
            shutdown_signal().await;
            info!("shutdown signal received, draining requests...");
            stopping.notify_one();
        }
    });

    let drain_deadline = async {
        stopping.notified().await;
        tokio::time::sleep(config.shutdown_grace).await;
    };

    tokio::select! {
        result = server => result?,
        _ = drain_deadline => {
            tracing::warn!("drain timeout, closing remaining connections");
        }
    }

    info!("roombook stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                tracing::error!("failed to register SIGTERM handler: {e}");
                ctrl_c.await.ok();
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
    }
}
