//! The forecast command.

use super::{coordinates, json_report, resolve_periods, write_report, PeriodArgs, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::{io::Write, path::Path};
use weather_lib::prelude::*;

/// The forecast command name.
pub const COMMAND_NAME: &str = "forecast";

/// The days argument id, an older name for the number of periods.
const DAYS: &str = "DAYS";
/// The save argument id.
const SAVE: &str = "SAVE";

/// Get the forecast sub-command definition.
pub fn command() -> Command {
    Command::new(COMMAND_NAME)
        .about("Get the weather forecast for a location.")
        .args(PeriodArgs::get())
        .arg(
            Arg::new(DAYS)
                .short('d')
                .long("days")
                .action(ArgAction::Set)
                .value_name("COUNT")
                .value_parser(clap::value_parser!(i64))
                .conflicts_with(PeriodArgs::PERIODS)
                .hide(true),
        )
        .arg(
            Arg::new(SAVE)
                .short('s')
                .long("save")
                .action(ArgAction::SetTrue)
                .help("Save the forecast to the database."),
        )
}

/// Get the weather forecast and optionally save it.
///
/// # Arguments
///
/// * `config` is the weather configuration.
/// * `db_file` is the forecast database.
/// * `args` contains the forecast command arguments.
/// * `writer` is where the report is written.
pub fn execute(config: &Config, db_file: &Path, args: &ArgMatches, writer: &mut dyn Write) -> Result<()> {
    log::trace!("forecast execute");
    let settings = Settings::new(config, args);
    let client = ForecastClient::new(&config.client)?;
    run(&settings, &client, db_file, writer)
}

/// The forecast command settings after command arguments and configuration are merged.
#[derive(Debug, PartialEq)]
struct Settings {
    latitude: Option<f64>,
    longitude: Option<f64>,
    periods: i64,
    granularity: Granularity,
    save: bool,
    json: bool,
    pretty: bool,
}
impl Settings {
    fn new(config: &Config, args: &ArgMatches) -> Self {
        let period_args = PeriodArgs(args);
        let granularity = Granularity::from(period_args.hourly() || config.forecast.hourly);
        let days = args.get_one::<i64>(DAYS).copied();
        Self {
            latitude: period_args.latitude().or(config.forecast.latitude),
            longitude: period_args.longitude().or(config.forecast.longitude),
            periods: resolve_periods(&[period_args.periods(), days, config.forecast.periods], granularity),
            granularity,
            save: args.get_flag(SAVE) || config.forecast.save,
            json: period_args.json(),
            pretty: period_args.pretty(),
        }
    }
}

/// Fetch, save, and report the forecast.
///
/// # Arguments
///
/// * `settings` controls what is fetched and how it is reported.
/// * `client` gets the forecast.
/// * `db_file` is the forecast database.
/// * `writer` is where the report is written.
fn run(settings: &Settings, client: &ForecastClient, db_file: &Path, writer: &mut dyn Write) -> Result<()> {
    let coordinates = coordinates(settings.latitude, settings.longitude)?;
    log::info!("Getting weather forecast for coordinates {coordinates}");
    let forecast = client.fetch(&coordinates, settings.granularity)?;
    log::info!("Got {} {} forecast periods", forecast.periods.len(), forecast.granularity);
    if settings.save {
        let mut store = ForecastStore::open(db_file)?;
        let summary = store.save(&forecast, &coordinates)?;
        log::info!("Database summary: {summary}");
        if !settings.json {
            write_report(writer, &format!("Database summary: {summary}\n\n"))?;
        }
    }
    let report = match settings.json {
        true => json_report(first(&forecast.periods, settings.periods), settings.pretty)?,
        false => format(&forecast.periods, settings.periods),
    };
    write_report(writer, &report)
}
