//! The database implementation of saved forecasts.
//!
//! Each forecast period is a row identified by the location, the forecast granularity, the period
//! number and the period start time.
//! Saving a forecast updates the rows that already exist and adds the ones that don't. Every row
//! written by a save has the same forecast date, which is how the latest forecast is found.

use crate::{
    entities::{Coordinates, Forecast, ForecastRecord, Granularity, SaveSummary},
    Error, Result,
};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{
    named_params,
    types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, Type, ValueRef},
    Connection, OptionalExtension, Row, TransactionBehavior,
};
use std::{path::Path, time::Instant};

pub use v1::{validate, ForecastStore};
mod v1 {
    //! The first version of the forecast database.
    use super::*;

    /// The forecast database.
    #[derive(Debug)]
    pub struct ForecastStore(
        /// The database connection.
        Connection,
    );
    impl ForecastStore {
        /// Open the forecast database, creating it if it does not exist.
        ///
        /// # Arguments
        ///
        /// * `path` is the database pathname.
        pub fn open(path: &Path) -> Result<Self> {
            log::debug!("open {}", path.display());
            let store = Self(Connection::open(path)?);
            store.init_schema()?;
            Ok(store)
        }

        /// Open a forecast database that only lives in memory.
        pub fn open_in_memory() -> Result<Self> {
            let store = Self(Connection::open_in_memory()?);
            store.init_schema()?;
            Ok(store)
        }

        /// Save a forecast using the current time as the forecast date.
        ///
        /// # Arguments
        ///
        /// * `forecast` has the periods that will be saved.
        /// * `coordinates` is where the forecast is for.
        pub fn save(&mut self, forecast: &Forecast, coordinates: &Coordinates) -> Result<SaveSummary> {
            self.save_at(forecast, coordinates, Utc::now())
        }

        /// Save a forecast.
        ///
        /// Periods already in the database are updated, keeping their creation time, and new
        /// periods are added. The forecast is saved in a single transaction so nothing is saved if
        /// any period has a bad timestamp or fails validation.
        ///
        /// # Arguments
        ///
        /// * `forecast` has the periods that will be saved.
        /// * `coordinates` is where the forecast is for.
        /// * `forecast_date` is when the forecast was retrieved.
        pub fn save_at(
            &mut self,
            forecast: &Forecast,
            coordinates: &Coordinates,
            forecast_date: DateTime<Utc>,
        ) -> Result<SaveSummary> {
            let start = Instant::now();
            self.init_schema()?;
            // the database keeps milliseconds
            let forecast_date = DateTime::from_timestamp_millis(forecast_date.timestamp_millis()).unwrap_or(forecast_date);
            let mut summary = SaveSummary::default();
            let tx = self.0.transaction_with_behavior(TransactionBehavior::Immediate)?;
            {
                // scope the statements to this block allowing them to go out of scope before the commit
                let mut select = tx.prepare(SELECT_ID_SQL)?;
                let mut insert = tx.prepare(INSERT_SQL)?;
                let mut update = tx.prepare(UPDATE_SQL)?;
                for period in &forecast.periods {
                    let record = ForecastRecord::try_new(period, coordinates, forecast.granularity, forecast_date)?;
                    validate(&record)?;
                    let start_time = db_time(&record.start_time);
                    let key = named_params! {
                        ":latitude": record.latitude,
                        ":longitude": record.longitude,
                        ":granularity": record.granularity,
                        ":period_number": record.period_number,
                        ":start_time": start_time,
                    };
                    let existing: Option<i64> = select.query_row(key, |row| row.get(0)).optional()?;
                    let saved = db_time(&record.forecast_date);
                    let end_time = db_time(&record.end_time);
                    match existing {
                        Some(id) => {
                            log::trace!("update period {} ({id})", record.period_number);
                            update.execute(named_params! {
                                ":id": id,
                                ":updated_at": saved,
                                ":name": record.name,
                                ":end_time": end_time,
                                ":is_daytime": record.is_daytime,
                                ":temperature": record.temperature,
                                ":temperature_unit": record.temperature_unit,
                                ":temperature_trend": record.temperature_trend,
                                ":wind_speed": record.wind_speed,
                                ":wind_direction": record.wind_direction,
                                ":icon": record.icon,
                                ":short_forecast": record.short_forecast,
                                ":detailed_forecast": record.detailed_forecast,
                                ":forecast_date": saved,
                            })?;
                            summary.updated += 1;
                        }
                        None => {
                            log::trace!("add period {}", record.period_number);
                            insert.execute(named_params! {
                                ":created_at": saved,
                                ":updated_at": saved,
                                ":latitude": record.latitude,
                                ":longitude": record.longitude,
                                ":granularity": record.granularity,
                                ":period_number": record.period_number,
                                ":name": record.name,
                                ":start_time": start_time,
                                ":end_time": end_time,
                                ":is_daytime": record.is_daytime,
                                ":temperature": record.temperature,
                                ":temperature_unit": record.temperature_unit,
                                ":temperature_trend": record.temperature_trend,
                                ":wind_speed": record.wind_speed,
                                ":wind_direction": record.wind_direction,
                                ":icon": record.icon,
                                ":short_forecast": record.short_forecast,
                                ":detailed_forecast": record.detailed_forecast,
                                ":forecast_date": saved,
                            })?;
                            summary.added += 1;
                        }
                    }
                }
            }
            tx.commit()?;
            crate::log_elapsed!(format!("save {coordinates} ({summary})"), &start);
            Ok(summary)
        }

        /// Get the most recently saved forecast for a location.
        ///
        /// An empty collection is returned if no forecast has been saved for the location.
        ///
        /// # Arguments
        ///
        /// * `coordinates` is the forecast location.
        /// * `limit` caps the number of periods returned when it is positive.
        /// * `granularity` selects the daily or hourly forecast.
        pub fn latest(&self, coordinates: &Coordinates, limit: i64, granularity: Granularity) -> Result<Vec<ForecastRecord>> {
            let start = Instant::now();
            let forecast_date: Option<String> = self.0.query_row(
                LATEST_DATE_SQL,
                named_params! {
                    ":latitude": coordinates.latitude,
                    ":longitude": coordinates.longitude,
                    ":granularity": granularity,
                },
                |row| row.get(0),
            )?;
            let records = match forecast_date {
                None => {
                    log::debug!("no {granularity} forecast saved for {coordinates}");
                    vec![]
                }
                Some(forecast_date) => {
                    let mut stmt = self.0.prepare(LATEST_SQL)?;
                    let rows = stmt.query_map(
                        named_params! {
                            ":latitude": coordinates.latitude,
                            ":longitude": coordinates.longitude,
                            ":granularity": granularity,
                            ":forecast_date": forecast_date,
                            // SQLite treats a negative limit as no limit
                            ":limit": if limit > 0 { limit } else { -1 },
                        },
                        to_record,
                    )?;
                    let records = rows.collect::<rusqlite::Result<Vec<ForecastRecord>>>()?;
                    records
                }
            };
            crate::log_elapsed!(format!("latest {coordinates}"), &start);
            Ok(records)
        }

        /// Create the database schema if it does not exist.
        fn init_schema(&self) -> Result<()> {
            let sql = include_str!("store/schema.sql");
            match self.0.execute_batch(sql) {
                Ok(_) => Ok(()),
                Err(err) => Err(Error::Database(format!("Error initializing schema ({err})."))),
            }
        }

        #[cfg(test)]
        pub(in crate::store) fn count(&self) -> usize {
            self.0
                .query_row("SELECT COUNT(*) FROM weather_forecasts", [], |row| row.get::<_, i64>(0))
                .map_or(0, |count| count as usize)
        }
    }

    /// Check a forecast record before it is written to the database.
    ///
    /// # Arguments
    ///
    /// * `record` is the forecast record that will be checked.
    pub fn validate(record: &ForecastRecord) -> Result<()> {
        if !(-90.0..=90.0).contains(&record.latitude) {
            Err(Error::Validation(format!("latitude {} is out of range", record.latitude)))
        } else if !(-180.0..=180.0).contains(&record.longitude) {
            Err(Error::Validation(format!("longitude {} is out of range", record.longitude)))
        } else if record.period_number < 1 {
            Err(Error::Validation(format!("period number {} must be positive", record.period_number)))
        } else if record.end_time < record.start_time {
            Err(Error::Validation(format!("period {} ends before it starts", record.period_number)))
        } else {
            Ok(())
        }
    }

    const SELECT_ID_SQL: &str = r#"
    SELECT id FROM weather_forecasts
        WHERE latitude = :latitude AND longitude = :longitude AND granularity = :granularity
            AND period_number = :period_number AND start_time = :start_time
    "#;

    const INSERT_SQL: &str = r#"
    INSERT INTO weather_forecasts (
        created_at, updated_at, latitude, longitude, granularity, period_number, name, start_time, end_time,
        is_daytime, temperature, temperature_unit, temperature_trend, wind_speed, wind_direction, icon,
        short_forecast, detailed_forecast, forecast_date
    ) VALUES (
        :created_at, :updated_at, :latitude, :longitude, :granularity, :period_number, :name, :start_time, :end_time,
        :is_daytime, :temperature, :temperature_unit, :temperature_trend, :wind_speed, :wind_direction, :icon,
        :short_forecast, :detailed_forecast, :forecast_date
    )
    "#;

    const UPDATE_SQL: &str = r#"
    UPDATE weather_forecasts SET
        updated_at = :updated_at,
        name = :name,
        end_time = :end_time,
        is_daytime = :is_daytime,
        temperature = :temperature,
        temperature_unit = :temperature_unit,
        temperature_trend = :temperature_trend,
        wind_speed = :wind_speed,
        wind_direction = :wind_direction,
        icon = :icon,
        short_forecast = :short_forecast,
        detailed_forecast = :detailed_forecast,
        forecast_date = :forecast_date
    WHERE id = :id
    "#;

    const LATEST_DATE_SQL: &str = r#"
    SELECT MAX(forecast_date) FROM weather_forecasts
        WHERE latitude = :latitude AND longitude = :longitude AND granularity = :granularity
    "#;

    const LATEST_SQL: &str = r#"
    SELECT
        id, created_at, updated_at, latitude, longitude, granularity, period_number, name, start_time, end_time,
        is_daytime, temperature, temperature_unit, temperature_trend, wind_speed, wind_direction, icon,
        short_forecast, detailed_forecast, forecast_date
    FROM weather_forecasts
        WHERE latitude = :latitude AND longitude = :longitude
            AND granularity = :granularity AND forecast_date = :forecast_date
    ORDER BY period_number ASC
    LIMIT :limit
    "#;
}

/// Convert a forecast row into a record.
fn to_record(row: &Row) -> rusqlite::Result<ForecastRecord> {
    Ok(ForecastRecord {
        id: row.get("id")?,
        created_at: row_time(row, "created_at")?,
        updated_at: row_time(row, "updated_at")?,
        latitude: row.get("latitude")?,
        longitude: row.get("longitude")?,
        granularity: row.get("granularity")?,
        period_number: row.get("period_number")?,
        name: row.get("name")?,
        start_time: row_time(row, "start_time")?,
        end_time: row_time(row, "end_time")?,
        is_daytime: row.get("is_daytime")?,
        temperature: row.get("temperature")?,
        temperature_unit: row.get("temperature_unit")?,
        temperature_trend: row.get("temperature_trend")?,
        wind_speed: row.get("wind_speed")?,
        wind_direction: row.get("wind_direction")?,
        icon: row.get("icon")?,
        short_forecast: row.get("short_forecast")?,
        detailed_forecast: row.get("detailed_forecast")?,
        forecast_date: row_time(row, "forecast_date")?,
    })
}

/// Timestamps are saved as fixed width `RFC3339` UTC text so they sort and compare as text.
fn db_time(date_time: &DateTime<Utc>) -> String {
    date_time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Get a timestamp column.
fn row_time(row: &Row, column: &str) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(column)?;
    match DateTime::parse_from_rfc3339(&text) {
        Ok(date_time) => Ok(date_time.with_timezone(&Utc)),
        Err(err) => {
            let index = row.as_ref().column_index(column)?;
            Err(rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(err)))
        }
    }
}

impl ToSql for Granularity {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.to_string()))
    }
}
impl FromSql for Granularity {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "daily" => Ok(Granularity::Daily),
            "hourly" => Ok(Granularity::Hourly),
            other => Err(FromSqlError::Other(format!("unknown granularity '{other}'").into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{entities::ForecastPeriod, testlib::TestFixture};
    use chrono::TimeZone;

    fn period(number: i64, start_time: &str, end_time: &str, temperature: i64) -> ForecastPeriod {
        ForecastPeriod {
            number,
            name: format!("Period {number}"),
            start_time: start_time.to_string(),
            end_time: end_time.to_string(),
            is_daytime: number % 2 == 1,
            temperature,
            temperature_unit: "F".to_string(),
            wind_speed: "10 mph".to_string(),
            wind_direction: "SW".to_string(),
            short_forecast: "Sunny".to_string(),
            detailed_forecast: format!("Sunny, with a high near {temperature}."),
            ..Default::default()
        }
    }

    fn daily_forecast(temperature: i64) -> Forecast {
        Forecast {
            granularity: Granularity::Daily,
            periods: vec![
                period(1, "2024-10-01T06:00:00-05:00", "2024-10-01T18:00:00-05:00", temperature),
                period(2, "2024-10-01T18:00:00-05:00", "2024-10-02T06:00:00-05:00", temperature - 20),
                period(3, "2024-10-02T06:00:00-05:00", "2024-10-02T18:00:00-05:00", temperature + 2),
            ],
        }
    }

    fn coordinates() -> Coordinates {
        Coordinates::new(39.7456, -97.0892).unwrap()
    }

    fn date(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 10, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn save_then_update() {
        let mut store = ForecastStore::open_in_memory().unwrap();
        let summary = store.save_at(&daily_forecast(80), &coordinates(), date(10)).unwrap();
        assert_eq!(summary, SaveSummary { added: 3, updated: 0 });
        let summary = store.save_at(&daily_forecast(82), &coordinates(), date(11)).unwrap();
        assert_eq!(summary, SaveSummary { added: 0, updated: 3 });
        assert_eq!(store.count(), 3);
        let records = store.latest(&coordinates(), 0, Granularity::Daily).unwrap();
        assert_eq!(records.len(), 3);
        for record in &records {
            assert_eq!(record.created_at, date(10));
            assert_eq!(record.updated_at, date(11));
            assert_eq!(record.forecast_date, date(11));
        }
        assert_eq!(records[0].temperature, 82);
        assert_eq!(records[0].start_time, Utc.with_ymd_and_hms(2024, 10, 1, 11, 0, 0).unwrap());
        assert_eq!(records[1].detailed_forecast, "Sunny, with a high near 62.");
    }

    #[test]
    fn latest_batch() {
        let mut store = ForecastStore::open_in_memory().unwrap();
        store.save_at(&daily_forecast(80), &coordinates(), date(10)).unwrap();
        // the next forecast has moved on by a period
        let forecast = Forecast {
            granularity: Granularity::Daily,
            periods: vec![
                period(2, "2024-10-02T06:00:00-05:00", "2024-10-02T18:00:00-05:00", 84),
                period(1, "2024-10-01T18:00:00-05:00", "2024-10-02T06:00:00-05:00", 58),
                period(3, "2024-10-02T18:00:00-05:00", "2024-10-03T06:00:00-05:00", 60),
            ],
        };
        let summary = store.save_at(&forecast, &coordinates(), date(12)).unwrap();
        assert_eq!(summary, SaveSummary { added: 3, updated: 0 });
        assert_eq!(store.count(), 6);
        let records = store.latest(&coordinates(), 0, Granularity::Daily).unwrap();
        let numbers: Vec<i64> = records.iter().map(|r| r.period_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        let temperatures: Vec<i64> = records.iter().map(|r| r.temperature).collect();
        assert_eq!(temperatures, vec![58, 84, 60]);
        assert!(records.iter().all(|r| r.forecast_date == date(12)));
        let records = store.latest(&coordinates(), 2, Granularity::Daily).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].period_number, 2);
        assert_eq!(store.latest(&coordinates(), -3, Granularity::Daily).unwrap().len(), 3);
    }

    #[test]
    fn nothing_saved() {
        let mut store = ForecastStore::open_in_memory().unwrap();
        assert!(store.latest(&coordinates(), 7, Granularity::Daily).unwrap().is_empty());
        store.save_at(&daily_forecast(80), &coordinates(), date(10)).unwrap();
        let elsewhere = Coordinates::new(40.0, -97.0892).unwrap();
        assert!(store.latest(&elsewhere, 7, Granularity::Daily).unwrap().is_empty());
        assert!(store.latest(&coordinates(), 7, Granularity::Hourly).unwrap().is_empty());
    }

    #[test]
    fn granularity() {
        let mut store = ForecastStore::open_in_memory().unwrap();
        store.save_at(&daily_forecast(80), &coordinates(), date(10)).unwrap();
        let hourly = Forecast {
            granularity: Granularity::Hourly,
            periods: vec![
                period(1, "2024-10-01T14:00:00-05:00", "2024-10-01T15:00:00-05:00", 79),
                period(2, "2024-10-01T15:00:00-05:00", "2024-10-01T16:00:00-05:00", 81),
            ],
        };
        store.save_at(&hourly, &coordinates(), date(11)).unwrap();
        let records = store.latest(&coordinates(), 0, Granularity::Hourly).unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.granularity == Granularity::Hourly));
        let records = store.latest(&coordinates(), 0, Granularity::Daily).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].forecast_date, date(10));
    }

    #[test]
    fn overlapping_granularity() {
        let mut store = ForecastStore::open_in_memory().unwrap();
        let daily = Forecast {
            granularity: Granularity::Daily,
            periods: vec![
                ForecastPeriod {
                    name: "This Afternoon".to_string(),
                    ..period(1, "2024-10-01T14:00:00-05:00", "2024-10-01T18:00:00-05:00", 84)
                },
                ForecastPeriod {
                    name: "Tonight".to_string(),
                    ..period(2, "2024-10-01T18:00:00-05:00", "2024-10-02T06:00:00-05:00", 60)
                },
            ],
        };
        let summary = store.save_at(&daily, &coordinates(), date(19)).unwrap();
        assert_eq!(summary, SaveSummary { added: 2, updated: 0 });
        // the first hourly period has the same number and start time as the first daily period
        let hourly = Forecast {
            granularity: Granularity::Hourly,
            periods: vec![ForecastPeriod {
                name: String::new(),
                ..period(1, "2024-10-01T14:00:00-05:00", "2024-10-01T15:00:00-05:00", 83)
            }],
        };
        let summary = store.save_at(&hourly, &coordinates(), Utc.with_ymd_and_hms(2024, 10, 1, 19, 5, 0).unwrap()).unwrap();
        assert_eq!(summary, SaveSummary { added: 1, updated: 0 });
        assert_eq!(store.count(), 3);
        let records = store.latest(&coordinates(), 0, Granularity::Daily).unwrap();
        let periods: Vec<(i64, &str)> = records.iter().map(|r| (r.period_number, r.name.as_str())).collect();
        assert_eq!(periods, vec![(1, "This Afternoon"), (2, "Tonight")]);
        assert!(records.iter().all(|r| r.forecast_date == date(19) && r.granularity == Granularity::Daily));
        let records = store.latest(&coordinates(), 0, Granularity::Hourly).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "");
        assert_eq!(records[0].temperature, 83);
        // saving the hourly forecast again only updates the hourly row
        let summary = store.save_at(&hourly, &coordinates(), date(20)).unwrap();
        assert_eq!(summary, SaveSummary { added: 0, updated: 1 });
        assert_eq!(store.latest(&coordinates(), 0, Granularity::Daily).unwrap()[0].temperature, 84);
    }

    #[test]
    fn bad_timestamp() {
        let mut store = ForecastStore::open_in_memory().unwrap();
        let mut forecast = daily_forecast(80);
        forecast.periods[2].start_time = "2024-10-02 06:00".to_string();
        match store.save_at(&forecast, &coordinates(), date(10)) {
            Err(Error::Parse(reason)) => assert!(reason.contains("period 3")),
            other => panic!("expected a parse error, got {other:?}"),
        }
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn invalid_record() {
        let mut store = ForecastStore::open_in_memory().unwrap();
        let mut forecast = daily_forecast(80);
        forecast.periods[0].end_time = "2024-10-01T05:00:00-05:00".to_string();
        assert!(matches!(store.save_at(&forecast, &coordinates(), date(10)), Err(Error::Validation(_))));
        assert_eq!(store.count(), 0);
        let record =
            ForecastRecord::try_new(&period(0, "2024-10-01T06:00:00Z", "2024-10-01T18:00:00Z", 70), &coordinates(), Granularity::Daily, date(10))
                .unwrap();
        assert!(matches!(validate(&record), Err(Error::Validation(_))));
        let record = ForecastRecord { period_number: 1, latitude: 91.0, ..record };
        assert!(matches!(validate(&record), Err(Error::Validation(_))));
        let record = ForecastRecord { latitude: 39.7456, ..record };
        assert!(validate(&record).is_ok());
    }

    #[test]
    fn database_file() {
        let fixture = TestFixture::create();
        let db_file = fixture.file("weather.db");
        {
            let mut store = ForecastStore::open(&db_file).unwrap();
            store.save_at(&daily_forecast(80), &coordinates(), date(10)).unwrap();
        }
        let store = ForecastStore::open(&db_file).unwrap();
        let records = store.latest(&coordinates(), 1, Granularity::Daily).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Period 1");
    }

    #[test]
    fn timestamps() {
        let date_time = Utc.with_ymd_and_hms(2024, 10, 1, 6, 5, 4).unwrap();
        assert_eq!(db_time(&date_time), "2024-10-01T06:05:04.000Z");
    }
}
