//! The history command.

use super::{coordinates, json_report, resolve_periods, write_report, PeriodArgs, Result};
use clap::{ArgMatches, Command};
use std::{io::Write, path::Path};
use weather_lib::prelude::*;

/// The history command name.
pub const COMMAND_NAME: &str = "history";

/// Get the history sub-command definition.
pub fn command() -> Command {
    Command::new(COMMAND_NAME).about("Show the most recently saved forecast for a location.").args(PeriodArgs::get())
}

/// Report the most recently saved forecast.
///
/// # Arguments
///
/// * `config` is the weather configuration.
/// * `db_file` is the forecast database.
/// * `args` contains the history command arguments.
/// * `writer` is where the report is written.
pub fn execute(config: &Config, db_file: &Path, args: &ArgMatches, writer: &mut dyn Write) -> Result<()> {
    log::trace!("history execute");
    let settings = Settings::new(config, args);
    let coordinates = coordinates(settings.latitude, settings.longitude)?;
    let store = ForecastStore::open(db_file)?;
    run(&settings, &coordinates, &store, writer)
}

/// The history command settings after command arguments and configuration are merged.
#[derive(Debug, PartialEq)]
struct Settings {
    latitude: Option<f64>,
    longitude: Option<f64>,
    periods: i64,
    granularity: Granularity,
    json: bool,
    pretty: bool,
}
impl Settings {
    /// History coordinates fall back to the forecast coordinates in the configuration.
    fn new(config: &Config, args: &ArgMatches) -> Self {
        let period_args = PeriodArgs(args);
        let granularity = Granularity::from(period_args.hourly() || config.history.hourly);
        Self {
            latitude: period_args.latitude().or(config.history.latitude).or(config.forecast.latitude),
            longitude: period_args.longitude().or(config.history.longitude).or(config.forecast.longitude),
            periods: resolve_periods(&[period_args.periods(), config.history.periods], granularity),
            granularity,
            json: period_args.json(),
            pretty: period_args.pretty(),
        }
    }
}

/// Query and report the saved forecast.
///
/// # Arguments
///
/// * `settings` controls what is queried and how it is reported.
/// * `coordinates` is the forecast location.
/// * `store` is the forecast database.
/// * `writer` is where the report is written.
fn run(settings: &Settings, coordinates: &Coordinates, store: &ForecastStore, writer: &mut dyn Write) -> Result<()> {
    log::info!("Getting {} forecast history for coordinates {coordinates}", settings.granularity);
    let records = store.latest(coordinates, settings.periods, settings.granularity)?;
    let report = match (settings.json, records.is_empty()) {
        (true, _) => json_report(&records, settings.pretty)?,
        (false, true) => format!(
            "No historical {} forecast data found for coordinates {coordinates}\n\
             Use 'weather forecast --save' to save forecasts.\n",
            settings.granularity
        ),
        (false, false) => format_history(&records, &chrono::Local),
    };
    write_report(writer, &report)
}
