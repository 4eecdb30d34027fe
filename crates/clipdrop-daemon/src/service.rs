//! Core Service - HTTP 上传服务的生命周期

use anyhow::Result;
use clipdrop_core::{ServerSettings, start_http_server};
use tokio::signal;

pub async fn run_service(settings: ServerSettings) -> Result<()> {
    tracing::info!(
        clipboard = settings.clipboard,
        notifications = settings.notifications,
        "核心服务初始化..."
    );

    start_http_server(&settings, shutdown_signal()).await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// 等待 Ctrl+C 或 SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown...");
        },
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}
