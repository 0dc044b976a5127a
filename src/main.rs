use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use todo_backend::{
    AppState,
    cache::CacheAsideFetcher,
    config::Config,
    limiter::ActionLimiters,
    routes,
    store::{RedisStore, SharedStore},
    upstream::{HttpTodoSource, TodoSource},
};
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// 所有读取共享的缓存槽
const TODOS_CACHE_KEY: &str = "todos";

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

    // 设置 Redis 客户端
    let redis_client =
        redis::Client::open(config.redis_url.clone()).expect("Failed to create Redis client");
    let store: Arc<dyn SharedStore> = Arc::new(RedisStore::new(Arc::new(redis_client)));

    // 设置上游客户端
    let upstream: Arc<dyn TodoSource> = Arc::new(HttpTodoSource::new(
        reqwest::Client::new(),
        &config.upstream_url,
    ));

    // 三类动作各自独立的限流器，以及共享的缓存读取器
    let limiters = ActionLimiters::from_config(store.clone(), &config);
    let fetcher = CacheAsideFetcher::new(
        store.clone(),
        upstream.clone(),
        TODOS_CACHE_KEY,
        config.cache_ttl_secs,
    );

    // 设置应用状态
    let state = AppState {
        config: config.clone(),
        store,
        upstream,
        limiters,
        fetcher,
    };

    let router = routes::create_router(state.clone());

    // 根据编译模式决定是否添加CORS
    #[cfg(debug_assertions)]
    let router = {
        tracing::debug!("Adding CORS layer for development mode");
        let cors = CorsLayer::permissive();
        router.layer(cors)
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
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Failed to start server");
}
