use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Pair of decimal degrees identifying a location. Two pairs are the same
/// cache identity only when numerically equal, so no rounding happens here.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn in_range(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lon)
    }
}

/// Unit system threaded explicitly through every request and cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitSystem {
    #[default]
    Metric,
    Imperial,
}

impl UnitSystem {
    pub fn as_str(self) -> &'static str {
        match self {
            UnitSystem::Metric => "metric",
            UnitSystem::Imperial => "imperial",
        }
    }

    pub fn temp_symbol(self) -> &'static str {
        match self {
            UnitSystem::Metric => "°C",
            UnitSystem::Imperial => "°F",
        }
    }

    pub fn wind_unit(self) -> &'static str {
        match self {
            UnitSystem::Metric => "m/s",
            UnitSystem::Imperial => "mph",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherCondition {
    pub id: i64,
    pub main: String,
    pub description: String,
    pub icon: String,
}

/// Temperature block shared by /weather and /forecast samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemperatureBlock {
    pub temp: f64,
    pub feels_like: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub pressure: f64,
    pub humidity: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sea_level: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grnd_level: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wind {
    pub speed: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deg: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gust: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clouds {
    pub all: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentSys {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    pub sunrise: i64,
    pub sunset: i64,
}

/// Current conditions from /weather, passed through in provider shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentWeather {
    pub coord: Coordinates,
    pub weather: Vec<WeatherCondition>,
    pub main: TemperatureBlock,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility: Option<i64>,
    pub wind: Wind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clouds: Option<Clouds>,
    pub dt: i64,
    pub sys: CurrentSys,
    pub timezone: i32,
    pub id: i64,
    pub name: String,
}

/// One 3-hour forecast point from /forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSample {
    pub dt: i64,
    pub main: TemperatureBlock,
    pub weather: Vec<WeatherCondition>,
    pub wind: Wind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pop: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dt_txt: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastCity {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    pub country: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coord: Option<Coordinates>,
    /// Shift from UTC in seconds, as supplied by the provider.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sunrise: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sunset: Option<i64>,
}

/// Forecast response from /forecast. `list` keeps the provider's
/// chronological order and is never re-sorted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSeries {
    pub list: Vec<ForecastSample>,
    pub city: ForecastCity,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AqiMain {
    pub aqi: i64,
}

/// Pollutant concentration map from /air_pollution, all values in μg/m³.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PollutantConcentrations {
    pub co: f64,
    pub no: f64,
    pub no2: f64,
    pub o3: f64,
    pub so2: f64,
    pub pm2_5: f64,
    pub pm10: f64,
    pub nh3: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AirQualityReading {
    pub dt: i64,
    pub main: AqiMain,
    pub components: PollutantConcentrations,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirPollutionResponse {
    pub list: Vec<AirQualityReading>,
}

/// Geocoding result; forward and reverse lookups return the same shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeResult {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_names: Option<HashMap<String, String>>,
    pub lat: f64,
    pub lon: f64,
    pub country: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

/// OpenWeather's own 1-5 AQI scale. Out-of-range values become `Unknown`
/// rather than an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AqiLevel {
    Good,
    Fair,
    Moderate,
    Poor,
    VeryPoor,
    Unknown,
}

impl AqiLevel {
    pub fn from_index(aqi: i64) -> Self {
        match aqi {
            1 => AqiLevel::Good,
            2 => AqiLevel::Fair,
            3 => AqiLevel::Moderate,
            4 => AqiLevel::Poor,
            5 => AqiLevel::VeryPoor,
            _ => AqiLevel::Unknown,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            AqiLevel::Good => "Good",
            AqiLevel::Fair => "Fair",
            AqiLevel::Moderate => "Moderate",
            AqiLevel::Poor => "Poor",
            AqiLevel::VeryPoor => "Very Poor",
            AqiLevel::Unknown => "Unknown",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            AqiLevel::Good => {
                "Air quality is considered satisfactory, and air pollution poses little or no risk."
            }
            AqiLevel::Fair => {
                "Air quality is acceptable. However, there may be a moderate health concern for a very small number of people who are unusually sensitive."
            }
            AqiLevel::Moderate => {
                "Air quality is moderate. Sensitive groups may experience health effects. The general public is not likely to be affected."
            }
            AqiLevel::Poor => {
                "Everyone may begin to experience health effects; members of sensitive groups may experience more serious health effects."
            }
            AqiLevel::VeryPoor => {
                "Health warnings of emergency conditions. The entire population is more likely to be affected."
            }
            AqiLevel::Unknown => "Air Quality information is currently unavailable.",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            AqiLevel::Good => "green",
            AqiLevel::Fair => "yellow",
            AqiLevel::Moderate => "orange",
            AqiLevel::Poor => "red",
            AqiLevel::VeryPoor => "purple",
            AqiLevel::Unknown => "gray",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PollutantReading {
    pub name: &'static str,
    pub description: &'static str,
    pub value: f64,
    pub unit: &'static str,
}

const POLLUTANT_UNIT: &str = "μg/m³";

/// Values at or below this are trace amounts and dropped from display.
const TRACE_THRESHOLD: f64 = 0.01;

const DISPLAY_LIMIT: usize = 4;

/// Picks the most prominent pollutants for display: trace values are
/// filtered out, the rest sorted by concentration, top four kept.
pub fn prominent_pollutants(components: &PollutantConcentrations) -> Vec<PollutantReading> {
    let named = [
        ("PM2.5", "Fine Particulate Matter", components.pm2_5),
        ("PM10", "Coarse Particulate Matter", components.pm10),
        ("CO", "Carbon Monoxide", components.co),
        ("O3", "Ozone", components.o3),
        ("NO2", "Nitrogen Dioxide", components.no2),
        ("SO2", "Sulphur Dioxide", components.so2),
        ("NH3", "Ammonia", components.nh3),
        ("NO", "Nitrogen Monoxide", components.no),
    ];

    let mut readings: Vec<PollutantReading> = named
        .into_iter()
        .filter(|(_, _, value)| *value > TRACE_THRESHOLD)
        .map(|(name, description, value)| PollutantReading {
            name,
            description,
            value,
            unit: POLLUTANT_UNIT,
        })
        .collect();

    readings.sort_by(|a, b| b.value.total_cmp(&a.value));
    readings.truncate(DISPLAY_LIMIT);
    readings
}
