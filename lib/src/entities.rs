//! Structures used by the weather forecast `API`s.

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The number of decimal places coordinates are kept to.
const COORDINATE_SCALE: f64 = 10_000.0;

/// A validated latitude and longitude.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Coordinates {
    /// The latitude in degrees, between -90 and 90.
    pub latitude: f64,
    /// The longitude in degrees, between -180 and 180.
    pub longitude: f64,
}
impl Coordinates {
    /// Create coordinates rounded to 4 decimal places.
    ///
    /// # Arguments
    ///
    /// * `latitude` must be between -90 and 90 degrees.
    /// * `longitude` must be between -180 and 180 degrees.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        if !(-90.0..=90.0).contains(&latitude) {
            Err(Error::Validation(format!("latitude {latitude} must be between -90 and 90 degrees")))
        } else if !(-180.0..=180.0).contains(&longitude) {
            Err(Error::Validation(format!("longitude {longitude} must be between -180 and 180 degrees")))
        } else {
            Ok(Self { latitude: round(latitude), longitude: round(longitude) })
        }
    }
}
impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4},{:.4}", self.latitude, self.longitude)
    }
}

fn round(degrees: f64) -> f64 {
    (degrees * COORDINATE_SCALE).round() / COORDINATE_SCALE
}

/// The forecast schedule.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    /// Day and night periods.
    #[default]
    Daily,
    /// One hour periods.
    Hourly,
}
impl Granularity {
    /// The number of periods reported when nothing else says otherwise.
    pub fn default_periods(&self) -> i64 {
        match self {
            Granularity::Daily => 7,
            Granularity::Hourly => 24,
        }
    }
}
impl From<bool> for Granularity {
    /// Map an `hourly` flag to the granularity.
    fn from(hourly: bool) -> Self {
        match hourly {
            true => Granularity::Hourly,
            false => Granularity::Daily,
        }
    }
}
impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Granularity::Daily => "daily",
            Granularity::Hourly => "hourly",
        };
        write!(f, "{name}")
    }
}

/// A forecast period as the weather service returns it.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastPeriod {
    /// The position of the period in the forecast, starting at 1.
    pub number: i64,
    /// The period name such as *Tonight*. Hourly periods have an empty name.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
    /// When the period starts (`RFC3339`).
    pub start_time: String,
    /// When the period ends (`RFC3339`).
    pub end_time: String,
    pub is_daytime: bool,
    pub temperature: i64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub temperature_unit: String,
    /// Something like *rising* or *falling*, usually empty.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub temperature_trend: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub wind_speed: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub wind_direction: String,
    /// The URL of the forecast icon.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub icon: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub short_forecast: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub detailed_forecast: String,
}

/// The weather service uses `null` for text it does not have.
fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.unwrap_or_default())
}

/// A fetched forecast.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Forecast {
    /// The schedule the periods follow.
    pub granularity: Granularity,
    /// The forecast periods in the order the weather service returned them.
    pub periods: Vec<ForecastPeriod>,
}

/// A forecast period saved in the database.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ForecastRecord {
    /// The database identity, `0` until the record has been saved.
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub granularity: Granularity,
    pub period_number: i64,
    pub name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub is_daytime: bool,
    pub temperature: i64,
    pub temperature_unit: String,
    pub temperature_trend: String,
    pub wind_speed: String,
    pub wind_direction: String,
    pub icon: String,
    pub short_forecast: String,
    pub detailed_forecast: String,
    /// When the forecast batch was retrieved.
    pub forecast_date: DateTime<Utc>,
}
impl ForecastRecord {
    /// Create an unsaved record from a forecast period.
    ///
    /// # Arguments
    ///
    /// * `period` is the forecast period.
    /// * `coordinates` is where the forecast is for.
    /// * `granularity` is the forecast schedule.
    /// * `forecast_date` is when the forecast batch was retrieved.
    pub fn try_new(
        period: &ForecastPeriod,
        coordinates: &Coordinates,
        granularity: Granularity,
        forecast_date: DateTime<Utc>,
    ) -> Result<Self> {
        let start_time = parse_rfc3339(period.number, "startTime", &period.start_time)?;
        let end_time = parse_rfc3339(period.number, "endTime", &period.end_time)?;
        Ok(Self {
            id: 0,
            created_at: forecast_date,
            updated_at: forecast_date,
            latitude: coordinates.latitude,
            longitude: coordinates.longitude,
            granularity,
            period_number: period.number,
            name: period.name.clone(),
            start_time,
            end_time,
            is_daytime: period.is_daytime,
            temperature: period.temperature,
            temperature_unit: period.temperature_unit.clone(),
            temperature_trend: period.temperature_trend.clone(),
            wind_speed: period.wind_speed.clone(),
            wind_direction: period.wind_direction.clone(),
            icon: period.icon.clone(),
            short_forecast: period.short_forecast.clone(),
            detailed_forecast: period.detailed_forecast.clone(),
            forecast_date,
        })
    }
}

fn parse_rfc3339(number: i64, field: &str, timestamp: &str) -> Result<DateTime<Utc>> {
    match DateTime::parse_from_rfc3339(timestamp) {
        Ok(date_time) => Ok(date_time.with_timezone(&Utc)),
        Err(err) => Err(Error::Parse(format!("period {number} {field} '{timestamp}' ({err})"))),
    }
}

/// What a forecast save did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SaveSummary {
    /// The number of new records.
    pub added: usize,
    /// The number of existing records that were updated.
    pub updated: usize,
}
impl fmt::Display for SaveSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} new records saved, {} existing records updated", self.added, self.updated)
    }
}
