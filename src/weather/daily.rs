use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use serde::Serialize;
use std::collections::HashMap;

use super::types::{ForecastSeries, WeatherCondition};

/// At most this many calendar days come out of a 5-day / 3-hour forecast.
pub const MAX_DAYS: usize = 5;

/// One calendar day folded from the 3-hour samples of a forecast series.
/// `date` is the epoch timestamp of the first sample seen for that day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyForecast {
    pub date: i64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub humidity: f64,
    pub wind: f64,
    pub weather: WeatherCondition,
}

/// Buckets a forecast's 3-hour samples into daily min/max summaries.
///
/// Samples on today's local date are skipped so the output only shows
/// future full days; "local" is the forecast city's UTC offset. Within a
/// day the first sample seeds humidity, wind, and the representative
/// condition and later samples only widen the temperature bounds
/// (first-sample-wins is deliberate, the fold never averages). An input
/// consisting solely of today's samples yields an empty vec.
pub fn daily_summaries(series: &ForecastSeries, now: DateTime<Utc>) -> Vec<DailyForecast> {
    let offset = city_offset(series);
    let today = now.with_timezone(&offset).date_naive();

    let mut days: Vec<DailyForecast> = Vec::new();
    let mut seen: HashMap<NaiveDate, usize> = HashMap::new();

    for sample in &series.list {
        let Some(ts) = DateTime::from_timestamp(sample.dt, 0) else {
            continue;
        };
        let date = ts.with_timezone(&offset).date_naive();
        if date == today {
            continue;
        }

        match seen.get(&date) {
            Some(&i) => {
                let day = &mut days[i];
                day.temp_min = day.temp_min.min(sample.main.temp_min);
                day.temp_max = day.temp_max.max(sample.main.temp_max);
            }
            None => {
                seen.insert(date, days.len());
                days.push(DailyForecast {
                    date: sample.dt,
                    temp_min: sample.main.temp_min,
                    temp_max: sample.main.temp_max,
                    humidity: sample.main.humidity,
                    wind: sample.wind.speed,
                    weather: sample.weather.first().cloned().unwrap_or_default(),
                });
            }
        }
    }

    days.truncate(MAX_DAYS);
    days
}

fn city_offset(series: &ForecastSeries) -> FixedOffset {
    series
        .city
        .timezone
        .and_then(FixedOffset::east_opt)
        .unwrap_or_else(|| Utc.fix())
}
