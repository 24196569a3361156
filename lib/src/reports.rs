//! The text renderings of forecasts.

use crate::entities::{ForecastPeriod, ForecastRecord};
use chrono::{DateTime, TimeZone, Utc};
use std::fmt::{Display, Write};

/// The format of period start and end times.
const PERIOD_TIME_FORMAT: &str = "%b %-d %-I:%M %p";

/// The format of the forecast date.
const SAVED_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Render forecast periods as text.
///
/// If `count` is not positive or more than the number of periods all periods are rendered.
///
/// # Arguments
///
/// * `periods` are the forecast periods in the order they will be rendered.
/// * `count` is the number of periods to render.
pub fn format(periods: &[ForecastPeriod], count: i64) -> String {
    let blocks: Vec<String> = first(periods, count)
        .iter()
        .map(|period| {
            let title = match period.name.is_empty() {
                // hourly periods don't have a name
                true => period.start_time.clone(),
                false => period.name.clone(),
            };
            let mut block = String::new();
            period_block(
                &mut block,
                &title,
                Conditions {
                    temperature: period.temperature,
                    temperature_unit: &period.temperature_unit,
                    temperature_trend: &period.temperature_trend,
                    wind_speed: &period.wind_speed,
                    wind_direction: &period.wind_direction,
                    short_forecast: &period.short_forecast,
                    detailed_forecast: &period.detailed_forecast,
                },
            );
            block
        })
        .collect();
    with_title("Weather Forecast:", blocks)
}

/// Render saved forecast records as text.
///
/// # Arguments
///
/// * `records` are the saved forecast periods.
/// * `tz` is the timezone period times are shown in.
pub fn format_history<Tz>(records: &[ForecastRecord], tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let title = match records.first() {
        Some(record) => format!(
            "Historical Weather Forecast ({}, saved: {}):",
            record.granularity,
            local(&record.forecast_date, tz).format(SAVED_FORMAT)
        ),
        None => "Historical Weather Forecast:".to_string(),
    };
    let blocks = records
        .iter()
        .map(|record| {
            let title = match record.name.is_empty() {
                true => local(&record.start_time, tz).format(PERIOD_TIME_FORMAT).to_string(),
                false => record.name.clone(),
            };
            let mut block = String::new();
            period_block(
                &mut block,
                &title,
                Conditions {
                    temperature: record.temperature,
                    temperature_unit: &record.temperature_unit,
                    temperature_trend: &record.temperature_trend,
                    wind_speed: &record.wind_speed,
                    wind_direction: &record.wind_direction,
                    short_forecast: &record.short_forecast,
                    detailed_forecast: &record.detailed_forecast,
                },
            );
            let _ = writeln!(
                block,
                "  Period: {} to {}",
                local(&record.start_time, tz).format(PERIOD_TIME_FORMAT),
                local(&record.end_time, tz).format(PERIOD_TIME_FORMAT)
            );
            block
        })
        .collect();
    with_title(&title, blocks)
}

/// Get the leading items, or all of them if `count` is not positive or more than there are.
///
/// # Arguments
///
/// * `items` is what will be sliced.
/// * `count` is the number of items wanted.
pub fn first<T>(items: &[T], count: i64) -> &[T] {
    match usize::try_from(count) {
        Ok(count) if count > 0 && count <= items.len() => &items[..count],
        _ => items,
    }
}

fn local<Tz: TimeZone>(date_time: &DateTime<Utc>, tz: &Tz) -> DateTime<Tz> {
    date_time.with_timezone(tz)
}

/// The weather text common to periods and records.
struct Conditions<'c> {
    temperature: i64,
    temperature_unit: &'c str,
    temperature_trend: &'c str,
    wind_speed: &'c str,
    wind_direction: &'c str,
    short_forecast: &'c str,
    detailed_forecast: &'c str,
}

/// Writes to a `String` don't fail so the `fmt::Result` is ignored.
fn period_block(block: &mut String, title: &str, conditions: Conditions) {
    let _ = writeln!(block, "{title}");
    let _ = write!(block, "  Temperature: {}°{}", conditions.temperature, conditions.temperature_unit);
    if !conditions.temperature_trend.is_empty() {
        let _ = write!(block, " ({})", conditions.temperature_trend);
    }
    block.push('\n');
    let _ = writeln!(block, "  Wind: {} {}", conditions.wind_speed, conditions.wind_direction);
    let _ = writeln!(block, "  Conditions: {}", conditions.short_forecast);
    if !conditions.detailed_forecast.is_empty() {
        let _ = writeln!(block, "  Details: {}", conditions.detailed_forecast);
    }
}

/// Put the title and an underline in front of the blocks and separate blocks with a blank line.
fn with_title(title: &str, blocks: Vec<String>) -> String {
    let mut text = format!("{title}\n{}\n", "=".repeat(title.chars().count()));
    for block in blocks {
        text.push('\n');
        text.push_str(&block);
    }
    text
}
