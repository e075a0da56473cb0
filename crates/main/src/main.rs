//! 主应用程序入口
//!
//! 加载配置，连接 OneBot 协议端，启动事件接收服务；退出前清理所有撤回任务。

use std::sync::Arc;

use application::{AutoRecallPlugin, AutoRecallPluginDependencies};
use config::AppConfig;
use infrastructure::OneBotHttpClient;
use tracing_subscriber::EnvFilter;
use web_api::{router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::load()?;
    tracing::info!(config = %config.sanitize(), "配置加载完成");

    let client = Arc::new(OneBotHttpClient::new(&config.onebot)?);
    tracing::info!(api = %config.onebot.api_base_url, "OneBot 协议端地址");

    let plugin = Arc::new(AutoRecallPlugin::new(
        config.recall.clone(),
        AutoRecallPluginDependencies {
            sender: client.clone(),
            deleter: client.clone(),
            history: client.clone(),
        },
    ));

    let state = AppState::new(plugin.clone(), client);
    let app = router(state);

    let address = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!("事件接收服务启动在 http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    plugin.terminate().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "监听退出信号失败");
    }
    tracing::info!("收到退出信号，开始关闭");
}
