//! A RUST based weather forecast tracker.
//!
//! Forecasts come from the National Weather Service API (`api.weather.gov`). The service does not
//! answer forecast requests by coordinate directly. Coordinates are first resolved to a grid point
//! and the grid point metadata carries the URLs of the daily and hourly forecasts. Once fetched,
//! the forecast periods can be saved to a `SQLite` database and reported on later.
//!
//! # Architecture Overview
//!
//! The crate consists of these modules.
//!
//! * The data objects shared by the other modules (entities).
//! * The client that talks to the weather service (forecast_client).
//! * The database that saves forecast periods (store).
//! * The text renderings of forecasts (reports).
//! * The configuration file support (config).
//!
//! The client and store are independent of each other. The front-end creates both and moves the
//! forecast between them.

mod config;
mod entities;
mod forecast_client;
mod reports;
mod store;
#[cfg(test)]
mod testlib;

use std::{fmt, result};

pub mod prelude {
    //! The public parts of the weather forecast library.
    pub use crate::{
        config::{find_config_file, substitute_env, ClientConfig, Config, DatabaseConfig, ForecastConfig, HistoryConfig},
        entities::{Coordinates, Forecast, ForecastPeriod, ForecastRecord, Granularity, SaveSummary},
        forecast_client::{ForecastClient, HttpResponse, HttpTransport, Transport},
        reports::{first, format, format_history},
        store::{validate, ForecastStore},
    };
}

/// The result of calling an API in the library.
pub type Result<T> = result::Result<T, Error>;

/// The errors returned by the library.
#[derive(Debug)]
pub enum Error {
    /// Coordinates or a forecast record failed validation.
    Validation(String),
    /// The weather service could not be reached or did not return a successful status.
    Upstream {
        /// The request URL.
        url: String,
        /// The response status, `None` when the request never got a response.
        status: Option<u16>,
        /// The response body or the reason the request failed.
        body: String,
    },
    /// A response body was not the expected `JSON`.
    Decode(String),
    /// A forecast period timestamp was not `RFC3339`.
    Parse(String),
    /// The database returned an error.
    Database(String),
    /// The configuration file could not be used.
    Config(String),
}
impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Validation(reason) => write!(f, "validation: {reason}"),
            Error::Upstream { url, status: Some(status), body } => {
                write!(f, "upstream: {url} returned {status} ({body})")
            }
            Error::Upstream { url, status: None, body } => write!(f, "upstream: {url} failed ({body})"),
            Error::Decode(reason) => write!(f, "decode: {reason}"),
            Error::Parse(reason) => write!(f, "parse: {reason}"),
            Error::Database(reason) => write!(f, "sql: {reason}"),
            Error::Config(reason) => write!(f, "config: {reason}"),
        }
    }
}
impl std::error::Error for Error {}
impl From<rusqlite::Error> for Error {
    fn from(error: rusqlite::Error) -> Self {
        Error::Database(error.to_string())
    }
}

/// Log how long something took.
macro_rules! log_elapsed {
    ($what:expr, $start:expr) => {
        log::info!("{} {:?}", $what, $start.elapsed())
    };
}
pub(crate) use log_elapsed;
