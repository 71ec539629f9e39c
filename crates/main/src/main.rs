//! 主应用程序入口
//!
//! 加载配置、连接数据库并启动实时投递服务。

use std::sync::Arc;

use anyhow::Context;
use application::{ChannelHub, ChatGateway, GatewayDependencies, MemoryPresenceRegistry, SystemClock};
use config::AppConfig;
use infrastructure::{Infrastructure, InfrastructureConfig};
use tracing_subscriber::EnvFilter;
use web_api::{router, AppState, JwtIdentityVerifier};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::load().context("加载配置失败")?;
    tracing::info!(config = %config.sanitize(), "配置已加载");

    let infrastructure = Infrastructure::connect(InfrastructureConfig {
        database_url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        run_migrations: config.database.run_migrations,
    })
    .await
    .context("连接数据库失败")?;
    let storage = infrastructure.storage;

    let verifier = Arc::new(JwtIdentityVerifier::new(
        config.jwt.clone(),
        storage.user_repository.clone(),
    ));

    // 在线登记和频道订阅只在本进程内维护
    let gateway = ChatGateway::new(GatewayDependencies {
        identity_verifier: verifier,
        user_repository: storage.user_repository.clone(),
        room_repository: storage.room_repository.clone(),
        private_chat_repository: storage.private_chat_repository.clone(),
        message_repository: storage.message_repository.clone(),
        presence: Arc::new(MemoryPresenceRegistry::new()),
        hub: Arc::new(ChannelHub::new()),
        clock: Arc::new(SystemClock),
    });

    let app = router(
        AppState::new(Arc::new(gateway)),
        &config.server.cors_origins,
    );
    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("绑定地址 {address} 失败"))?;

    tracing::info!("实时投递服务启动在 http://{address}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "无法监听退出信号");
        std::future::pending::<()>().await;
    }
    tracing::info!("收到退出信号，正在关闭");
}
