use crate::config::LocationConfig;
use crate::handlers;
use crate::services::{
    KeyValueCache, LocationService, LocationSnapshot, LocationStore, MongoDb, RedisCache,
};
use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::get,
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    metrics::metrics_middleware,
    rate_limit::{
        create_ip_rate_limiter, create_unkeyed_rate_limiter, ip_rate_limit_middleware,
        rate_limit_middleware, ClientIpResolver, IpRateLimit, UnkeyedRateLimiter,
    },
    tracing::request_id_middleware,
};
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::{
    catch_panic::CatchPanicLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer,
};

#[derive(Clone)]
pub struct AppState {
    pub locations: LocationService,
    pub global_rate_limiter: UnkeyedRateLimiter,
    pub ip_rate_limit: IpRateLimit,
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(
        config: &LocationConfig,
        store: Arc<dyn LocationStore>,
        cache: Arc<dyn KeyValueCache>,
    ) -> Self {
        let snapshot = LocationSnapshot::new(
            store.clone(),
            cache,
            config.cache.key.clone(),
            config.cache_ttl(),
        );
        let limits = &config.rate_limit;

        Self {
            locations: LocationService::new(store, snapshot),
            global_rate_limiter: create_unkeyed_rate_limiter(
                limits.global_limit,
                limits.global_window_seconds,
            ),
            ip_rate_limit: IpRateLimit::new(
                create_ip_rate_limiter(limits.ip_limit, limits.ip_window_seconds),
                ClientIpResolver::new(limits.trusted_proxies.clone()),
            ),
            request_timeout: config.request_timeout(),
        }
    }
}

/// Full HTTP surface. Both rate limits run before any handler, global first.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_endpoint))
        .route(
            "/location",
            get(handlers::get_location).post(handlers::create_location),
        )
        .route(
            "/locations",
            get(handlers::list_locations).patch(handlers::update_locations),
        )
        .route("/routes", get(handlers::get_routes))
        .layer(from_fn_with_state(
            state.ip_rate_limit.clone(),
            ip_rate_limit_middleware,
        ))
        .layer(from_fn_with_state(
            state.global_rate_limiter.clone(),
            rate_limit_middleware,
        ))
        .layer(from_fn(metrics_middleware))
        .layer(TimeoutLayer::new(state.request_timeout))
        .layer(from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(CatchPanicLayer::new())
        .with_state(state)
}

pub struct Application {
    port: u16,
    server: Box<dyn std::future::Future<Output = std::io::Result<()>> + Send + Unpin>,
}

impl Application {
    pub async fn build(config: LocationConfig) -> Result<Self, AppError> {
        let db = MongoDb::connect(
            &config.mongodb.uri,
            &config.mongodb.database,
            &config.mongodb.collection,
            config.scan_timeout(),
        )
        .await
        .map_err(|e| {
            tracing::error!("Failed to connect to MongoDB: {}", e);
            AppError::from(e)
        })?;

        let cache = RedisCache::connect(&config.redis.url).await.map_err(|e| {
            tracing::error!("Failed to connect to Redis: {}", e);
            AppError::InternalError(e)
        })?;

        let state = AppState::new(&config, Arc::new(db), Arc::new(cache));
        let app = build_router(state);

        let addr = config.common.socket_addr();
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Listening on {}", port);

        let server = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal());

        Ok(Self {
            port,
            server: Box::new(server.into_future()),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        self.server.await
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
