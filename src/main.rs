use std::sync::Arc;
use std::time::Duration;

use rust_stock::config::Config;
use rust_stock::db::{create_pool, ensure_schema};
use rust_stock::services::{ActivityLog, ItemsService};
use rust_stock::storage::{CloudinaryConfig, CloudinaryStore};
use rust_stock::web::{create_router, AppState};

use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rust_stock=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    tracing::info!("Starting rust-stock API server...");
    tracing::info!("Connecting to database...");

    // Create database pool and make sure the items table exists
    let pool = create_pool(&config.database_url).await?;
    ensure_schema(&pool).await?;
    tracing::info!("Database connection established");

    // Media host client
    let media = Arc::new(CloudinaryStore::new(
        CloudinaryConfig {
            cloud_name: config.cloudinary_cloud_name.clone(),
            api_key: config.cloudinary_api_key.clone(),
            api_secret: config.cloudinary_api_secret.clone(),
        },
        Duration::from_secs(config.media_timeout_secs),
    )?);
    tracing::info!(
        "Media host enabled: cloud={}, timeout={}s",
        config.cloudinary_cloud_name,
        config.media_timeout_secs
    );

    // Request-scoped activity recorder
    let activity = Arc::new(ActivityLog::open(&config.log_dir).await);

    let state = AppState {
        items: Arc::new(ItemsService::new(pool, media)),
        activity,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_headers(Any)
        .allow_methods(Any)
        .expose_headers(Any);

    let app = create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr = config.server_addr();
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
