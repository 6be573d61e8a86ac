use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use backend::{AppState, config::Config, router};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 加载配置
    let config = Config::from_env().expect("Failed to load configuration");

    #[cfg(debug_assertions)]
    tracing::info!("Running in debug mode with CORS enabled");

    #[cfg(not(debug_assertions))]
    tracing::info!("Running in production mode with CORS disabled");

    if config.places_api_key.is_none() {
        tracing::warn!("GOOGLE_PLACES_API_KEY is not set, nearby search will fail");
    }

    // Redis 为可选的共享缓存层
    let redis = match config.redis_url.as_deref() {
        Some(url) => match redis::Client::open(url) {
            Ok(client) => {
                tracing::info!("Shared query cache enabled");
                Some(Arc::new(client))
            }
            Err(e) => {
                tracing::warn!("Invalid REDIS_URL, using in-process cache only: {}", e);
                None
            }
        },
        None => None,
    };

    // 设置应用状态，存储客户端在第一次请求时创建
    let state = AppState::from_config(config.clone(), redis);

    let router = router(state).layer(TraceLayer::new_for_http());

    // 根据编译模式决定是否添加CORS
    #[cfg(debug_assertions)]
    let router = {
        tracing::debug!("Adding CORS layer for development mode");
        router.layer(tower_http::cors::CorsLayer::permissive())
    };

    // 启动服务器
    let addr = SocketAddr::new(
        config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid server_host, falling back to dual-stack default");
            IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
        }),
        config.server_port,
    );
    tracing::info!("Server listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind"),
        router,
    )
    .await
    .expect("Failed to start server");
}
