use anyhow::Context;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;

use super::types::{
    AirPollutionResponse, Coordinates, CurrentWeather, ForecastSeries, GeocodeResult, UnitSystem,
};
use crate::config::Config;

/// Limit applied to every geocoding lookup; callers only use the first hit.
const GEOCODE_LIMIT: &str = "1";

#[derive(Error, Debug)]
pub enum FetchError {
    /// Network unreachable, timeout, connection reset. Not distinguished
    /// further.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// Non-2xx response; the message comes from the provider's error body
    /// when it has one, otherwise the HTTP status text.
    #[error("provider returned {status}: {message}")]
    Provider { status: u16, message: String },
    /// The body parsed as JSON but did not match the expected resource shape.
    #[error("unexpected response shape: {0}")]
    MalformedResponse(#[from] serde_json::Error),
    #[error("coordinates out of range: lat={lat}, lon={lon}")]
    InvalidCoordinates { lat: f64, lon: f64 },
}

pub struct OpenWeatherClient {
    http: Client,
    api_key: String,
    weather_url: Url,
    forecast_url: Url,
    air_pollution_url: Url,
    geocode_direct_url: Url,
    geocode_reverse_url: Url,
}

impl OpenWeatherClient {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let http = Client::builder()
            .user_agent("WeatherDashboard/1.0")
            .timeout(Duration::from_secs(30))
            .build()
            .context("failed to build HTTP client")?;

        let endpoint = |path: &str| -> anyhow::Result<Url> {
            Url::parse(&format!("{}{}", config.openweather_base_url, path))
                .with_context(|| format!("invalid endpoint URL for {path}"))
        };

        Ok(Self {
            http,
            api_key: config.openweather_api_key.clone(),
            weather_url: endpoint(&config.weather_path)?,
            forecast_url: endpoint(&config.forecast_path)?,
            air_pollution_url: endpoint(&config.air_pollution_path)?,
            geocode_direct_url: endpoint(&config.geocode_direct_path)?,
            geocode_reverse_url: endpoint(&config.geocode_reverse_path)?,
        })
    }

    pub async fn current_weather(
        &self,
        coords: Coordinates,
        units: UnitSystem,
    ) -> Result<CurrentWeather, FetchError> {
        self.check_coordinates(coords)?;
        let url = self.request_url(
            &self.weather_url,
            &[
                ("lat", coords.lat.to_string()),
                ("lon", coords.lon.to_string()),
                ("units", units.as_str().to_string()),
            ],
        );
        self.fetch_json(url).await
    }

    pub async fn forecast(
        &self,
        coords: Coordinates,
        units: UnitSystem,
    ) -> Result<ForecastSeries, FetchError> {
        self.check_coordinates(coords)?;
        let url = self.request_url(
            &self.forecast_url,
            &[
                ("lat", coords.lat.to_string()),
                ("lon", coords.lon.to_string()),
                ("units", units.as_str().to_string()),
            ],
        );
        self.fetch_json(url).await
    }

    /// Air quality payloads are unit-independent, so no `units` parameter.
    pub async fn air_quality(
        &self,
        coords: Coordinates,
    ) -> Result<AirPollutionResponse, FetchError> {
        self.check_coordinates(coords)?;
        let url = self.request_url(
            &self.air_pollution_url,
            &[
                ("lat", coords.lat.to_string()),
                ("lon", coords.lon.to_string()),
            ],
        );
        self.fetch_json(url).await
    }

    pub async fn reverse_geocode(
        &self,
        coords: Coordinates,
    ) -> Result<Vec<GeocodeResult>, FetchError> {
        self.check_coordinates(coords)?;
        let url = self.request_url(
            &self.geocode_reverse_url,
            &[
                ("lat", coords.lat.to_string()),
                ("lon", coords.lon.to_string()),
                ("limit", GEOCODE_LIMIT.to_string()),
            ],
        );
        self.fetch_json(url).await
    }

    pub async fn search_location(&self, query: &str) -> Result<Vec<GeocodeResult>, FetchError> {
        let url = self.request_url(
            &self.geocode_direct_url,
            &[
                ("q", query.to_string()),
                ("limit", GEOCODE_LIMIT.to_string()),
            ],
        );
        self.fetch_json(url).await
    }

    /// Builds the request URL from a fresh parameter list on every call.
    /// Any query string already on the endpoint is discarded so defaults
    /// cannot leak between requests.
    fn request_url(&self, endpoint: &Url, params: &[(&str, String)]) -> Url {
        let mut url = endpoint.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.clear();
            pairs.append_pair("appid", &self.api_key);
            for (name, value) in params {
                pairs.append_pair(name, value);
            }
        }
        url
    }

    async fn fetch_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, FetchError> {
        let response = self.http.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let fallback = status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string();
            let message = response
                .json::<serde_json::Value>()
                .await
                .ok()
                .and_then(|body| {
                    body.get("message")
                        .and_then(|m| m.as_str())
                        .map(str::to_string)
                })
                .unwrap_or(fallback);
            return Err(FetchError::Provider {
                status: status.as_u16(),
                message,
            });
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn check_coordinates(&self, coords: Coordinates) -> Result<(), FetchError> {
        if coords.in_range() {
            Ok(())
        } else {
            Err(FetchError::InvalidCoordinates {
                lat: coords.lat,
                lon: coords.lon,
            })
        }
    }
}
