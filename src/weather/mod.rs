pub mod cache;
pub mod client;
pub mod daily;
pub mod history;
pub mod types;

use std::time::Duration;

use cache::{CoordKey, QueryCache, WeatherKey};
use chrono::Utc;
use client::{FetchError, OpenWeatherClient};
use history::HistoricalDay;
use types::{
    AirPollutionResponse, Coordinates, CurrentWeather, ForecastSeries, GeocodeResult, UnitSystem,
};

/// Freshness window for frequently-changing resources (current weather,
/// forecast, geocoding).
const DEFAULT_STALE: Duration = Duration::from_secs(60);

/// Air quality and mock-historical data stay fresh for five minutes.
const SLOW_STALE: Duration = Duration::from_secs(5 * 60);

/// A text search only goes out once the query is this long.
const MIN_SEARCH_LEN: usize = 3;

/// Outcome of a gated query: `NotReady` means a precondition (coordinates
/// present, query long enough, upstream payload complete) has not been met
/// yet. It is a pending state, not an error, and nothing was fetched or
/// cached for it.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryState<T> {
    Ready(T),
    NotReady,
}

impl<T> QueryState<T> {
    pub fn ready(self) -> Option<T> {
        match self {
            QueryState::Ready(value) => Some(value),
            QueryState::NotReady => None,
        }
    }
}

/// Cached, coalesced access to every dashboard resource. One cache per
/// resource kind; unit-independent resources (air quality, geocoding) are
/// keyed by coordinates alone so a unit toggle never re-fetches them.
pub struct WeatherService {
    client: OpenWeatherClient,
    current: QueryCache<WeatherKey, CurrentWeather>,
    forecast: QueryCache<WeatherKey, ForecastSeries>,
    air_quality: QueryCache<CoordKey, AirPollutionResponse>,
    reverse: QueryCache<CoordKey, Vec<GeocodeResult>>,
    search: QueryCache<String, Vec<GeocodeResult>>,
    history: QueryCache<WeatherKey, Vec<HistoricalDay>>,
}

impl WeatherService {
    pub fn new(client: OpenWeatherClient) -> Self {
        Self {
            client,
            current: QueryCache::new(DEFAULT_STALE),
            forecast: QueryCache::new(DEFAULT_STALE),
            air_quality: QueryCache::new(SLOW_STALE),
            reverse: QueryCache::new(DEFAULT_STALE),
            search: QueryCache::new(DEFAULT_STALE),
            history: QueryCache::new(SLOW_STALE),
        }
    }

    pub async fn current_weather(
        &self,
        coords: Option<Coordinates>,
        units: UnitSystem,
        refresh: bool,
    ) -> Result<QueryState<CurrentWeather>, FetchError> {
        let Some(coords) = coords else {
            return Ok(QueryState::NotReady);
        };
        let client = &self.client;
        let value = self
            .current
            .get_with(WeatherKey::new(coords, units), refresh, move || async move {
                client.current_weather(coords, units).await
            })
            .await?;
        Ok(QueryState::Ready(value))
    }

    /// An empty forecast list is the resource still loading upstream, not a
    /// valid empty series; it is reported as `NotReady` and left uncached.
    pub async fn forecast(
        &self,
        coords: Option<Coordinates>,
        units: UnitSystem,
        refresh: bool,
    ) -> Result<QueryState<ForecastSeries>, FetchError> {
        let Some(coords) = coords else {
            return Ok(QueryState::NotReady);
        };
        let key = WeatherKey::new(coords, units);
        let client = &self.client;
        let series = self
            .forecast
            .get_with(key, refresh, move || async move {
                client.forecast(coords, units).await
            })
            .await?;
        if series.list.is_empty() {
            self.forecast.invalidate(&key);
            return Ok(QueryState::NotReady);
        }
        Ok(QueryState::Ready(series))
    }

    pub async fn air_quality(
        &self,
        coords: Option<Coordinates>,
        refresh: bool,
    ) -> Result<QueryState<AirPollutionResponse>, FetchError> {
        let Some(coords) = coords else {
            return Ok(QueryState::NotReady);
        };
        let client = &self.client;
        let value = self
            .air_quality
            .get_with(coords.into(), refresh, move || async move {
                client.air_quality(coords).await
            })
            .await?;
        Ok(QueryState::Ready(value))
    }

    pub async fn reverse_geocode(
        &self,
        coords: Option<Coordinates>,
        refresh: bool,
    ) -> Result<QueryState<Vec<GeocodeResult>>, FetchError> {
        let Some(coords) = coords else {
            return Ok(QueryState::NotReady);
        };
        let client = &self.client;
        let value = self
            .reverse
            .get_with(coords.into(), refresh, move || async move {
                client.reverse_geocode(coords).await
            })
            .await?;
        Ok(QueryState::Ready(value))
    }

    pub async fn search_location(
        &self,
        query: &str,
        refresh: bool,
    ) -> Result<QueryState<Vec<GeocodeResult>>, FetchError> {
        if query.chars().count() < MIN_SEARCH_LEN {
            return Ok(QueryState::NotReady);
        }
        let client = &self.client;
        let value = self
            .search
            .get_with(query.to_string(), refresh, move || async move {
                client.search_location(query).await
            })
            .await?;
        Ok(QueryState::Ready(value))
    }

    /// Historical data goes through the same cache interface as the real
    /// resources, so swapping the mock generator for a provider endpoint
    /// later does not touch callers.
    pub async fn history(
        &self,
        coords: Option<Coordinates>,
        units: UnitSystem,
        refresh: bool,
    ) -> Result<QueryState<Vec<HistoricalDay>>, FetchError> {
        let Some(coords) = coords else {
            return Ok(QueryState::NotReady);
        };
        let value = self
            .history
            .get_with(WeatherKey::new(coords, units), refresh, move || async move {
                Ok(history::mock_history(coords, units, Utc::now()))
            })
            .await?;
        Ok(QueryState::Ready(value))
    }

    /// Sweeps expired entries from every resource cache.
    pub fn evict_expired(&self) {
        self.current.evict_expired();
        self.forecast.evict_expired();
        self.air_quality.evict_expired();
        self.reverse.evict_expired();
        self.search.evict_expired();
        self.history.evict_expired();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(base_url: &str) -> Config {
        Config {
            openweather_api_key: "test-key".to_string(),
            openweather_base_url: base_url.to_string(),
            weather_path: "/data/2.5/weather".to_string(),
            forecast_path: "/data/2.5/forecast".to_string(),
            air_pollution_path: "/data/2.5/air_pollution".to_string(),
            geocode_direct_path: "/geo/1.0/direct".to_string(),
            geocode_reverse_path: "/geo/1.0/reverse".to_string(),
        }
    }

    fn service(base_url: &str) -> WeatherService {
        WeatherService::new(OpenWeatherClient::new(&test_config(base_url)).expect("client"))
    }

    fn current_weather_body() -> serde_json::Value {
        serde_json::json!({
            "coord": {"lat": 40.7, "lon": -74.0},
            "weather": [{"id": 800, "main": "Clear", "description": "clear sky", "icon": "01d"}],
            "main": {
                "temp": 21.4, "feels_like": 21.0, "temp_min": 19.0, "temp_max": 23.0,
                "pressure": 1015.0, "humidity": 53.0
            },
            "visibility": 10000,
            "wind": {"speed": 3.6, "deg": 220.0},
            "clouds": {"all": 0.0},
            "dt": 1756555200,
            "sys": {"country": "US", "sunrise": 1756531200, "sunset": 1756578000},
            "timezone": -14400,
            "id": 5128581,
            "name": "New York"
        })
    }

    fn aqi_body() -> serde_json::Value {
        serde_json::json!({
            "coord": [-74.0, 40.7],
            "list": [{
                "dt": 1756555200,
                "main": {"aqi": 2},
                "components": {
                    "co": 230.3, "no": 0.0, "no2": 12.5, "o3": 68.7,
                    "so2": 1.8, "pm2_5": 9.4, "pm10": 12.1, "nh3": 0.7
                }
            }]
        })
    }

    #[tokio::test]
    async fn repeated_requests_within_window_hit_upstream_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(ResponseTemplate::new(200).set_body_json(current_weather_body()))
            .expect(1)
            .mount(&server)
            .await;

        let service = service(&server.uri());
        let coords = Some(Coordinates::new(40.7, -74.0));

        let first = service
            .current_weather(coords, UnitSystem::Metric, false)
            .await
            .unwrap()
            .ready()
            .unwrap();
        let second = service
            .current_weather(coords, UnitSystem::Metric, false)
            .await
            .unwrap()
            .ready()
            .unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn unit_toggle_is_a_distinct_key_for_weather() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .and(query_param("units", "metric"))
            .respond_with(ResponseTemplate::new(200).set_body_json(current_weather_body()))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .and(query_param("units", "imperial"))
            .respond_with(ResponseTemplate::new(200).set_body_json(current_weather_body()))
            .expect(1)
            .mount(&server)
            .await;

        let service = service(&server.uri());
        let coords = Some(Coordinates::new(40.7, -74.0));

        service
            .current_weather(coords, UnitSystem::Metric, false)
            .await
            .unwrap();
        service
            .current_weather(coords, UnitSystem::Imperial, false)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn air_quality_key_ignores_units() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/air_pollution"))
            .respond_with(ResponseTemplate::new(200).set_body_json(aqi_body()))
            .expect(1)
            .mount(&server)
            .await;

        let service = service(&server.uri());
        let coords = Some(Coordinates::new(40.7, -74.0));

        // Fetched once no matter how many unit toggles happen around it.
        service.air_quality(coords, false).await.unwrap();
        service.air_quality(coords, false).await.unwrap();
    }

    #[tokio::test]
    async fn refresh_reaches_upstream_again() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(ResponseTemplate::new(200).set_body_json(current_weather_body()))
            .expect(2)
            .mount(&server)
            .await;

        let service = service(&server.uri());
        let coords = Some(Coordinates::new(40.7, -74.0));

        service
            .current_weather(coords, UnitSystem::Metric, false)
            .await
            .unwrap();
        service
            .current_weather(coords, UnitSystem::Metric, true)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn missing_coordinates_never_fetch() {
        let server = MockServer::start().await;
        // No mocks mounted; the request log below must stay empty.

        let service = service(&server.uri());
        let state = service
            .current_weather(None, UnitSystem::Metric, false)
            .await
            .unwrap();

        assert_eq!(state, QueryState::NotReady);
        assert_eq!(server.received_requests().await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn short_search_query_is_gated() {
        let server = MockServer::start().await;
        let service = service(&server.uri());

        let state = service.search_location("Lo", false).await.unwrap();

        assert_eq!(state, QueryState::NotReady);
        assert_eq!(server.received_requests().await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn empty_forecast_list_is_not_ready_and_not_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/forecast"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "list": [],
                "city": {"name": "Nowhere", "country": "XX"}
            })))
            .expect(2)
            .mount(&server)
            .await;

        let service = service(&server.uri());
        let coords = Some(Coordinates::new(40.7, -74.0));

        // Both calls go upstream because the empty payload was never cached.
        for _ in 0..2 {
            let state = service
                .forecast(coords, UnitSystem::Metric, false)
                .await
                .unwrap();
            assert_eq!(state, QueryState::NotReady);
        }
    }

    #[tokio::test]
    async fn history_is_served_through_the_cache() {
        let service = service("https://api.openweathermap.org");
        let coords = Some(Coordinates::new(40.7, -74.0));

        let first = service
            .history(coords, UnitSystem::Metric, false)
            .await
            .unwrap()
            .ready()
            .unwrap();
        let second = service
            .history(coords, UnitSystem::Metric, false)
            .await
            .unwrap()
            .ready()
            .unwrap();

        assert_eq!(first.len(), history::HISTORY_DAYS);
        assert_eq!(first, second);
    }
}
