use std::sync::Arc;
use tokio::signal;
use tracing::info;

use chat_backend::infra::config::AppConfig;
use chat_backend::infra::remote_chain::RemoteChain;
use chat_backend::infra::telemetry;
use chat_backend::{router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init();

    let config = AppConfig::from_env()?;
    let chain = RemoteChain::new(&config.chain_url)?;
    info!(invoke_url = %chain.invoke_url(), "问答链已配置");

    let app = router(AppState {
        chain: Arc::new(chain),
    });

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!("🚀 Chat Backend 运行在 http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("服务已停止");
    Ok(())
}

/// Ctrl-C 或 SIGTERM 时停止接收新连接，已进入的请求继续处理完
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "无法监听 Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "无法监听 SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("收到停止信号，开始优雅退出");
}
