//! # The weather command line interface.
//!
//! The CLI is built with the `clap` builder API. Each command lives in its own module and
//! provides a `command` function that describes the arguments and an `execute` function that
//! runs it. Command arguments win over the configuration file which wins over the built-in
//! defaults.

use clap::{Arg, ArgAction, ArgMatches, Command};
use std::{
    io::{self, Write},
    path::PathBuf,
};
use weather_lib::prelude::*;

mod forecast;
mod history;

/// The command line interface result.
pub type Result<T> = std::result::Result<T, Error>;

/// The CLI error definition.
#[derive(Debug)]
pub struct Error(String);
impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl From<String> for Error {
    fn from(error: String) -> Self {
        Error::from(error.as_str())
    }
}
impl From<&str> for Error {
    fn from(error: &str) -> Self {
        Error(format!("cli: {error}"))
    }
}
impl From<weather_lib::Error> for Error {
    fn from(error: weather_lib::Error) -> Self {
        Error(error.to_string())
    }
}
impl From<io::Error> for Error {
    fn from(error: io::Error) -> Self {
        Error(format!("io: {error}"))
    }
}
impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error(format!("json: {error}"))
    }
}

/// The command line definition.
pub fn get() -> Command {
    let binary_name = env!("CARGO_BIN_NAME");
    let version = env!("CARGO_PKG_VERSION");
    Command::new(binary_name)
        .about("Track weather forecasts from the National Weather Service.")
        .version(version)
        .subcommand_required(true)
        .allow_external_subcommands(false)
        // show help if nothing is on the command line
        .arg_required_else_help(true)
        .args(CommandLineArgs::get())
        .subcommand(forecast::command())
        .subcommand(history::command())
}

/// This is a mainline helper that prepares the runtime environment and runs the command.
///
/// # Arguments
///
/// * `args` holds the arguments from the parsed command line.
pub fn initialize_and_run(args: ArgMatches) -> Result<()> {
    initialize(&args);
    log::trace!("initialize_and_run Enter");
    run(args)
}

/// Prepare the runtime environment.
///
/// # Arguments
///
/// * `args` holds the arguments from the parsed command line.
fn initialize(args: &ArgMatches) {
    let cmd_args = CommandLineArgs::from(args);
    let log_properties = crate::logs::LogProperties {
        level: crate::logs::LogProperties::level(cmd_args.verbosity()),
        logfile_path: cmd_args.logfile(),
        logfile_append: cmd_args.append(),
    };
    if let Err(log_error) = crate::logs::initialize(log_properties) {
        eprintln!("Error initializing logging!!! {log_error}");
    }
}

/// Run the appropriate subcommand.
///
/// # Arguments
///
/// * `args` holds the arguments from the parsed command line.
fn run(mut args: ArgMatches) -> Result<()> {
    let (name, subcommand_args) = match args.remove_subcommand() {
        Some(subcommand) => subcommand,
        None => return Err(Error::from("A command is required.")),
    };
    let command_args = CommandLineArgs::from(&args);
    let config = Config::load(command_args.config_file().as_deref())?;
    let db_file = command_args.db_file().unwrap_or_else(|| config.database.path.clone());
    let mut writer = io::stdout().lock();
    match name.as_str() {
        forecast::COMMAND_NAME => forecast::execute(&config, &db_file, &subcommand_args, &mut writer),
        history::COMMAND_NAME => history::execute(&config, &db_file, &subcommand_args, &mut writer),
        _ => Err(Error::from(format!("'{name}' is not a weather command."))),
    }
}

/// A filename parser used by the CLI.
///
/// # Arguments
///
/// * `filename` - the filename as entered on the command line.
fn parse_filename(filename: &str) -> std::result::Result<PathBuf, String> {
    if filename.is_empty() {
        Err("The filename cannot be empty.".to_string())
    } else {
        let filepath = PathBuf::from(filename);
        if filepath.is_dir() {
            Err(format!("{filename} is a directory..."))
        } else {
            // "bar.txt" and "foo/bar.txt" both have parent paths, one just happens to be empty...
            match filepath.parent() {
                Some(parent) if !parent.as_os_str().is_empty() && !parent.exists() => {
                    Err("The path to the file does not exist...".to_string())
                }
                _ => Ok(filepath),
            }
        }
    }
}

/// Write a report to the output.
///
/// # Arguments
///
/// * `writer` is where the report is written.
/// * `report` is the report content.
fn write_report(writer: &mut dyn Write, report: &str) -> Result<()> {
    writer.write_all(report.as_bytes())?;
    writer.flush()?;
    Ok(())
}

/// Make sure coordinates were provided and are valid.
///
/// # Arguments
///
/// * `latitude` is the latitude from the command line or configuration.
/// * `longitude` is the longitude from the command line or configuration.
fn coordinates(latitude: Option<f64>, longitude: Option<f64>) -> Result<Coordinates> {
    match (latitude.unwrap_or(0.0), longitude.unwrap_or(0.0)) {
        (latitude, longitude) if latitude == 0.0 && longitude == 0.0 => Err(Error::from(
            "Latitude and longitude must be provided. Use --lat and --lon or set them in the config file.",
        )),
        (latitude, longitude) => Ok(Coordinates::new(latitude, longitude)?),
    }
}

/// The common command line arguments.
struct CommandLineArgs<'a>(
    /// The command line arguments.
    &'a ArgMatches,
);
impl<'a> CommandLineArgs<'a> {
    /// The config file argument id.
    const CONFIG_FILE: &'static str = "CONFIG_FILE";
    /// The database file argument id.
    const DB_FILE: &'static str = "DB_FILE";
    /// The log file argument id.
    const LOGFILE: &'static str = "LOGFILE";
    /// The append to log file argument id.
    const APPEND: &'static str = "APPEND_LOGFILE";
    /// The logging verbosity level argument id.
    const VERBOSITY: &'static str = "LOG_VERBOSITY";
    /// Get the common command line arguments.
    fn get() -> Vec<Arg> {
        vec![
            Arg::new(Self::CONFIG_FILE)
                .short('c')
                .long("config")
                .action(ArgAction::Set)
                .value_name("FILE")
                .value_parser(parse_filename)
                .help("The configuration file pathname (DEFAULT weather.toml or ~/.weather.toml)."),
            Arg::new(Self::DB_FILE)
                .long("db")
                .action(ArgAction::Set)
                .value_name("FILE")
                .value_parser(parse_filename)
                .help("The forecast database pathname (DEFAULT weather.db)."),
            Arg::new(Self::LOGFILE)
                .short('l')
                .long("logfile")
                .action(ArgAction::Set)
                .value_name("FILE")
                .value_parser(parse_filename)
                .help("The log filename (DEFAULT stderr)."),
            Arg::new(Self::APPEND)
                .short('a')
                .long("append")
                .requires(Self::LOGFILE)
                .action(ArgAction::SetTrue)
                .help("Append to the logfile, otherwise overwrite."),
            Arg::new(Self::VERBOSITY)
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .help("Logging verbosity (once=INFO, twice=DEBUG, +twice=TRACE)"),
        ]
    }
    /// Get the configuration file argument.
    fn config_file(&self) -> Option<PathBuf> {
        self.0.get_one::<PathBuf>(Self::CONFIG_FILE).cloned()
    }
    /// Get the database file argument.
    fn db_file(&self) -> Option<PathBuf> {
        self.0.get_one::<PathBuf>(Self::DB_FILE).cloned()
    }
    /// Get the logfile name argument.
    fn logfile(&self) -> Option<PathBuf> {
        self.0.get_one::<PathBuf>(Self::LOGFILE).cloned()
    }
    /// Get the flag controlling if the logfile should be appended too.
    fn append(&self) -> bool {
        self.0.get_flag(Self::APPEND)
    }
    /// Get the logging verbosity flag.
    fn verbosity(&self) -> u8 {
        std::cmp::min(self.0.get_one::<u8>(Self::VERBOSITY).map_or(0, |a| *a), 3)
    }
}
impl<'a> From<&'a ArgMatches> for CommandLineArgs<'a> {
    fn from(args: &'a ArgMatches) -> Self {
        Self(args)
    }
}

/// The location and period arguments both commands have.
struct PeriodArgs<'a>(
    /// The subcommand arguments.
    &'a ArgMatches,
);
impl<'a> PeriodArgs<'a> {
    /// The latitude argument id.
    const LATITUDE: &'static str = "LATITUDE";
    /// The longitude argument id.
    const LONGITUDE: &'static str = "LONGITUDE";
    /// The number of periods argument id.
    const PERIODS: &'static str = "PERIODS";
    /// The hourly forecast argument id.
    const HOURLY: &'static str = "HOURLY";
    /// The JSON report argument id.
    const JSON: &'static str = "JSON";
    /// The pretty printed JSON argument id.
    const PRETTY: &'static str = "PRETTY";
    /// Get the arguments.
    fn get() -> Vec<Arg> {
        vec![
            Arg::new(Self::LATITUDE)
                .long("lat")
                .action(ArgAction::Set)
                .value_name("DEGREES")
                .allow_negative_numbers(true)
                .value_parser(clap::value_parser!(f64))
                .help("The forecast location latitude."),
            Arg::new(Self::LONGITUDE)
                .long("lon")
                .action(ArgAction::Set)
                .value_name("DEGREES")
                .allow_negative_numbers(true)
                .value_parser(clap::value_parser!(f64))
                .help("The forecast location longitude."),
            Arg::new(Self::PERIODS)
                .short('p')
                .long("periods")
                .action(ArgAction::Set)
                .value_name("COUNT")
                .allow_negative_numbers(true)
                .value_parser(clap::value_parser!(i64))
                .help("The number of forecast periods to show (DEFAULT 7 daily, 24 hourly)."),
            Arg::new(Self::HOURLY)
                .short('H')
                .long("hourly")
                .action(ArgAction::SetTrue)
                .help("Use the hourly forecast instead of day and night periods."),
            Arg::new(Self::JSON).long("json").action(ArgAction::SetTrue).help("The report will be in JSON format."),
            Arg::new(Self::PRETTY)
                .short('P')
                .long("pretty")
                .action(ArgAction::SetTrue)
                .requires(Self::JSON)
                .help("For JSON reports output will be pretty printed."),
        ]
    }
    fn latitude(&self) -> Option<f64> {
        self.0.get_one::<f64>(Self::LATITUDE).copied()
    }
    fn longitude(&self) -> Option<f64> {
        self.0.get_one::<f64>(Self::LONGITUDE).copied()
    }
    fn periods(&self) -> Option<i64> {
        self.0.get_one::<i64>(Self::PERIODS).copied()
    }
    fn hourly(&self) -> bool {
        self.0.get_flag(Self::HOURLY)
    }
    fn json(&self) -> bool {
        self.0.get_flag(Self::JSON)
    }
    fn pretty(&self) -> bool {
        self.0.get_flag(Self::PRETTY)
    }
}

/// Pick the number of periods to show.
///
/// A period count of `0` means it was not set.
///
/// # Arguments
///
/// * `periods` are the candidates in order of precedence.
/// * `granularity` supplies the default.
fn resolve_periods(periods: &[Option<i64>], granularity: Granularity) -> i64 {
    periods
        .iter()
        .flatten()
        .copied()
        .find(|periods| *periods != 0)
        .unwrap_or_else(|| granularity.default_periods())
}

/// Convert a report to `JSON`.
///
/// # Arguments
///
/// * `value` is what will be reported.
/// * `pretty` when `true` the report will be pretty printed.
fn json_report<T: serde::Serialize + ?Sized>(value: &T, pretty: bool) -> Result<String> {
    let mut report = match pretty {
        true => serde_json::to_string_pretty(value)?,
        false => serde_json::to_string(value)?,
    };
    report.push('\n');
    Ok(report)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filenames() {
        assert!(parse_filename("").is_err());
        assert_eq!(parse_filename("weather.db"), Ok(PathBuf::from("weather.db")));
        let tmpdir = std::env::temp_dir();
        assert!(parse_filename(&tmpdir.display().to_string()).is_err());
        let filename = tmpdir.join("weather.db").display().to_string();
        assert_eq!(parse_filename(&filename), Ok(PathBuf::from(&filename)));
        assert!(parse_filename("no/such/directory/weather.db").is_err());
    }

    #[test]
    fn coordinates_required() {
        assert!(coordinates(None, None).is_err());
        assert!(coordinates(Some(0.0), Some(0.0)).is_err());
        assert!(coordinates(Some(91.0), Some(-97.0)).is_err());
        let coordinates = coordinates(Some(39.7456), None).unwrap();
        assert_eq!(coordinates.latitude, 39.7456);
        assert_eq!(coordinates.longitude, 0.0);
    }

    #[test]
    fn periods() {
        assert_eq!(resolve_periods(&[Some(3), Some(5)], Granularity::Daily), 3);
        assert_eq!(resolve_periods(&[None, Some(5)], Granularity::Daily), 5);
        assert_eq!(resolve_periods(&[Some(0), None], Granularity::Daily), 7);
        assert_eq!(resolve_periods(&[None, None], Granularity::Hourly), 24);
        assert_eq!(resolve_periods(&[Some(-1), None], Granularity::Hourly), -1);
    }

    #[test]
    fn command_line() {
        let args = get()
            .try_get_matches_from(["weather", "-vv", "--db", "forecasts.db", "forecast", "--lat", "39.7456", "--lon", "-97.0892"])
            .unwrap();
        let cmd_args = CommandLineArgs::from(&args);
        assert_eq!(cmd_args.verbosity(), 2);
        assert_eq!(cmd_args.db_file(), Some(PathBuf::from("forecasts.db")));
        assert_eq!(cmd_args.config_file(), None);
        assert!(get().try_get_matches_from(["weather", "--append", "history"]).is_err());
        assert!(get().try_get_matches_from(["weather"]).is_err());
    }

    #[test]
    fn json() {
        assert_eq!(json_report(&[1, 2], false).unwrap(), "[1,2]\n");
        assert_eq!(json_report(&[1], true).unwrap(), "[\n  1\n]\n");
    }
}
