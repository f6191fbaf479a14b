use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod favorites;
mod routes;
mod weather;

use config::Config;
use favorites::FavoritesStore;
use routes::{create_router, AppState};
use weather::{client::OpenWeatherClient, WeatherService};

/// How often expired cache entries are swept.
const CACHE_SWEEP_INTERVAL: Duration = Duration::from_secs(10 * 60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "weather_dashboard_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize favorites storage
    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "sqlite:./weather_dashboard.db?mode=rwc".to_string());
    let pool = sqlx::SqlitePool::connect(&database_url).await?;
    let favorites = Arc::new(FavoritesStore::new(pool));
    favorites.init_tables().await?;

    // Initialize weather service
    let client = OpenWeatherClient::new(&config)?;
    let service = Arc::new(WeatherService::new(client));

    // Sweep expired cache entries in the background
    let sweeper = Arc::clone(&service);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CACHE_SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            sweeper.evict_expired();
        }
    });

    let state = AppState { service, favorites };

    let app = create_router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
    tracing::info!("Server starting on http://0.0.0.0:8080");

    axum::serve(listener, app).await?;

    Ok(())
}
