use chrono::{DateTime, Days, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use super::types::{Coordinates, UnitSystem};

/// The series always covers the 7 days ending today.
pub const HISTORY_DAYS: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoricalDay {
    pub dt: i64,
    pub temp_min: f64,
    pub temp_max: f64,
}

/// Deterministic stand-in for a historical endpoint the provider does not
/// offer. The same `(coordinates, units, now-date)` always produces the
/// same 7-day series, which the cache layer relies on. Each day is stamped
/// at UTC midnight, oldest first.
///
/// Temperatures are computed in Celsius from latitude/longitude harmonics,
/// converted to Fahrenheit afterwards for imperial, and rounded to whole
/// degrees.
pub fn mock_history(
    coords: Coordinates,
    units: UnitSystem,
    now: DateTime<Utc>,
) -> Vec<HistoricalDay> {
    let base = 30.0 - coords.lat.abs() * 0.8 + (coords.lon / 10.0).sin() * 5.0;

    (0..HISTORY_DAYS)
        .map(|i| {
            let days_back = (HISTORY_DAYS - 1 - i) as u64;
            let date = now.date_naive() - Days::new(days_back);
            let dt = date.and_time(NaiveTime::MIN).and_utc().timestamp();

            let daily_variation = (dt as f64 / 86_400.0 + i as f64).sin() * 5.0;
            let fluctuation = (coords.lat + i as f64).cos() * 2.0;
            let centre = base + daily_variation + fluctuation;

            let (mut temp_min, mut temp_max) = (centre - 5.0, centre + 5.0);
            if units == UnitSystem::Imperial {
                temp_min = celsius_to_fahrenheit(temp_min);
                temp_max = celsius_to_fahrenheit(temp_max);
            }

            HistoricalDay {
                dt,
                temp_min: temp_min.round(),
                temp_max: temp_max.round(),
            }
        })
        .collect()
}

pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    celsius * 9.0 / 5.0 + 32.0
}
