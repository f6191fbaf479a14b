use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{
    favorites::{CreateFavorite, FavoriteCity, FavoritesStore},
    weather::{
        client::FetchError,
        daily::{daily_summaries, DailyForecast},
        history::HistoricalDay,
        types::{
            prominent_pollutants, AqiLevel, Coordinates, CurrentWeather, ForecastCity,
            ForecastSample, GeocodeResult, PollutantReading, UnitSystem,
        },
        QueryState, WeatherService,
    },
};

// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<WeatherService>,
    pub favorites: Arc<FavoritesStore>,
}

// Request/Response types
#[derive(Debug, Deserialize)]
pub struct LocationQuery {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub units: Option<UnitSystem>,
    pub refresh: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct GeocodeQuery {
    pub q: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub refresh: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct RemoveFavoriteQuery {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct UnitInfo {
    pub system: UnitSystem,
    pub temp_symbol: &'static str,
    pub wind_unit: &'static str,
}

impl From<UnitSystem> for UnitInfo {
    fn from(system: UnitSystem) -> Self {
        Self {
            system,
            temp_symbol: system.temp_symbol(),
            wind_unit: system.wind_unit(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CurrentWeatherResponse {
    pub weather: CurrentWeather,
    pub units: UnitInfo,
    pub generated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize)]
pub struct ForecastResponse {
    pub city: ForecastCity,
    pub list: Vec<ForecastSample>,
    pub daily: Vec<DailyForecast>,
    pub units: UnitInfo,
    pub generated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize)]
pub struct AqiLevelInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub color: &'static str,
}

#[derive(Debug, Serialize)]
pub struct AirQualityResponse {
    pub dt: i64,
    pub aqi: i64,
    pub level: AqiLevelInfo,
    pub pollutants: Vec<PollutantReading>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub days: Vec<HistoricalDay>,
    pub units: UnitInfo,
    pub generated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize)]
pub struct RemoveFavoriteResponse {
    pub removed: bool,
    pub message: String,
}

// Route handlers
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn get_current_weather(
    State(state): State<AppState>,
    Query(params): Query<LocationQuery>,
) -> Result<Json<CurrentWeatherResponse>, StatusCode> {
    let units = params.units.unwrap_or_default();
    let refresh = params.refresh.unwrap_or(false);

    match state
        .service
        .current_weather(coords_from(params.lat, params.lon), units, refresh)
        .await
    {
        Ok(QueryState::Ready(weather)) => Ok(Json(CurrentWeatherResponse {
            weather,
            units: units.into(),
            generated_at: chrono::Utc::now(),
        })),
        Ok(QueryState::NotReady) => Err(StatusCode::BAD_REQUEST),
        Err(e) => Err(fetch_error_status("current weather", e)),
    }
}

pub async fn get_forecast(
    State(state): State<AppState>,
    Query(params): Query<LocationQuery>,
) -> Result<Json<ForecastResponse>, StatusCode> {
    let units = params.units.unwrap_or_default();
    let refresh = params.refresh.unwrap_or(false);

    match state
        .service
        .forecast(coords_from(params.lat, params.lon), units, refresh)
        .await
    {
        Ok(QueryState::Ready(series)) => {
            let daily = daily_summaries(&series, chrono::Utc::now());
            Ok(Json(ForecastResponse {
                city: series.city,
                list: series.list,
                daily,
                units: units.into(),
                generated_at: chrono::Utc::now(),
            }))
        }
        Ok(QueryState::NotReady) => {
            // Either coordinates were missing or the provider sent an
            // incomplete (empty) series that is still loading upstream.
            if coords_from(params.lat, params.lon).is_some() {
                Err(StatusCode::BAD_GATEWAY)
            } else {
                Err(StatusCode::BAD_REQUEST)
            }
        }
        Err(e) => Err(fetch_error_status("forecast", e)),
    }
}

pub async fn get_air_quality(
    State(state): State<AppState>,
    Query(params): Query<LocationQuery>,
) -> Result<Json<AirQualityResponse>, StatusCode> {
    let refresh = params.refresh.unwrap_or(false);

    match state
        .service
        .air_quality(coords_from(params.lat, params.lon), refresh)
        .await
    {
        Ok(QueryState::Ready(response)) => {
            let Some(reading) = response.list.first() else {
                tracing::warn!("air quality payload contained no readings");
                return Err(StatusCode::BAD_GATEWAY);
            };
            let level = AqiLevel::from_index(reading.main.aqi);
            Ok(Json(AirQualityResponse {
                dt: reading.dt,
                aqi: reading.main.aqi,
                level: AqiLevelInfo {
                    name: level.name(),
                    description: level.description(),
                    color: level.color(),
                },
                pollutants: prominent_pollutants(&reading.components),
            }))
        }
        Ok(QueryState::NotReady) => Err(StatusCode::BAD_REQUEST),
        Err(e) => Err(fetch_error_status("air quality", e)),
    }
}

pub async fn get_history(
    State(state): State<AppState>,
    Query(params): Query<LocationQuery>,
) -> Result<Json<HistoryResponse>, StatusCode> {
    let units = params.units.unwrap_or_default();
    let refresh = params.refresh.unwrap_or(false);

    match state
        .service
        .history(coords_from(params.lat, params.lon), units, refresh)
        .await
    {
        Ok(QueryState::Ready(days)) => Ok(Json(HistoryResponse {
            days,
            units: units.into(),
            generated_at: chrono::Utc::now(),
        })),
        Ok(QueryState::NotReady) => Err(StatusCode::BAD_REQUEST),
        Err(e) => Err(fetch_error_status("history", e)),
    }
}

/// One handler covers both directions: `?q=` searches by name, `?lat&lon`
/// reverse-geocodes.
pub async fn geocode(
    State(state): State<AppState>,
    Query(params): Query<GeocodeQuery>,
) -> Result<Json<Vec<GeocodeResult>>, StatusCode> {
    let refresh = params.refresh.unwrap_or(false);

    let result = if let Some(coords) = coords_from(params.lat, params.lon) {
        state.service.reverse_geocode(Some(coords), refresh).await
    } else if let Some(query) = params.q.as_deref() {
        state.service.search_location(query, refresh).await
    } else {
        return Err(StatusCode::BAD_REQUEST);
    };

    match result {
        Ok(QueryState::Ready(results)) => Ok(Json(results)),
        Ok(QueryState::NotReady) => Err(StatusCode::BAD_REQUEST),
        Err(e) => Err(fetch_error_status("geocoding", e)),
    }
}

pub async fn list_favorites(
    State(state): State<AppState>,
) -> Result<Json<Vec<FavoriteCity>>, StatusCode> {
    match state.favorites.list().await {
        Ok(favorites) => Ok(Json(favorites)),
        Err(e) => {
            tracing::error!("Listing favorites failed: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

pub async fn add_favorite(
    State(state): State<AppState>,
    Json(favorite): Json<CreateFavorite>,
) -> Result<Json<FavoriteCity>, StatusCode> {
    if !Coordinates::new(favorite.lat, favorite.lon).in_range() {
        return Err(StatusCode::BAD_REQUEST);
    }
    match state.favorites.add(favorite).await {
        Ok(saved) => Ok(Json(saved)),
        Err(e) => {
            tracing::error!("Saving favorite failed: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

pub async fn remove_favorite(
    State(state): State<AppState>,
    Query(params): Query<RemoveFavoriteQuery>,
) -> Result<Json<RemoveFavoriteResponse>, StatusCode> {
    match state
        .favorites
        .remove_by_coordinates(params.lat, params.lon)
        .await
    {
        Ok(true) => Ok(Json(RemoveFavoriteResponse {
            removed: true,
            message: "Favorite removed".to_string(),
        })),
        Ok(false) => Ok(Json(RemoveFavoriteResponse {
            removed: false,
            message: "No favorite saved at these coordinates".to_string(),
        })),
        Err(e) => {
            tracing::error!("Removing favorite failed: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

fn coords_from(lat: Option<f64>, lon: Option<f64>) -> Option<Coordinates> {
    match (lat, lon) {
        (Some(lat), Some(lon)) => Some(Coordinates::new(lat, lon)),
        _ => None,
    }
}

fn fetch_error_status(context: &str, err: FetchError) -> StatusCode {
    tracing::error!("Fetching {} failed: {}", context, err);
    match err {
        FetchError::Provider { status: 404, .. } => StatusCode::NOT_FOUND,
        FetchError::Provider { .. } => StatusCode::BAD_GATEWAY,
        FetchError::Transport(_) => StatusCode::BAD_GATEWAY,
        FetchError::MalformedResponse(_) => StatusCode::BAD_GATEWAY,
        FetchError::InvalidCoordinates { .. } => StatusCode::BAD_REQUEST,
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/weather", get(get_current_weather))
        .route("/api/forecast", get(get_forecast))
        .route("/api/air-quality", get(get_air_quality))
        .route("/api/history", get(get_history))
        .route("/api/geocode", get(geocode))
        .route(
            "/api/favorites",
            get(list_favorites)
                .post(add_favorite)
                .delete(remove_favorite),
        )
        .with_state(state)
}
