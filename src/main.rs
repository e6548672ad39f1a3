use customer_intel::{
    api::{build_router, AppState},
    config::Config,
    engine::EngineService,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "customer_intel=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {}", e);
        eprintln!("Using default configuration");
        Config::default()
    });

    tracing::info!("Starting Customer Intelligence Engine v{}", env!("CARGO_PKG_VERSION"));

    // Model registry starts empty; every family trains on demand.
    let engine = Arc::new(EngineService::new(config.engine.clone()));
    tracing::info!("Model registry initialized");

    let app_state = AppState::new(engine);
    let app = build_router(app_state);

    // Start HTTP server
    let http_addr = format!("{}:{}", config.server.host, config.server.http_port);
    let http_listener = tokio::net::TcpListener::bind(&http_addr).await?;

    tracing::info!("🚀 HTTP API server listening on http://{}", http_addr);
    tracing::info!("   Health check: http://{}/health", http_addr);
    tracing::info!("   Segmentation: http://{}/v1/segments/:family/predict", http_addr);
    tracing::info!("   Recommendations: http://{}/v1/recommendations", http_addr);

    axum::serve(http_listener, app).await?;

    Ok(())
}
