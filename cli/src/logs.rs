//! The `log4rs` setup for the weather command.
//!
//! Logging always goes to `stderr` so it does not get mixed up with forecast reports written to
//! `stdout`. A log file can be added from the command line.

use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::append::file::FileAppender;
use log4rs::config::runtime::{ConfigErrors, Logger};
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;
use log4rs::Handle;
use std::{fmt, io, path::PathBuf};

/// An error that can be returned when initializing `log4rs`.
#[derive(Debug)]
pub struct LogError(String);
impl fmt::Display for LogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl From<ConfigErrors> for LogError {
    fn from(error: ConfigErrors) -> Self {
        LogError(format!("{error}"))
    }
}
impl From<log::SetLoggerError> for LogError {
    fn from(error: log::SetLoggerError) -> Self {
        LogError(format!("{error}"))
    }
}
impl From<io::Error> for LogError {
    fn from(error: io::Error) -> Self {
        LogError(format!("{error}"))
    }
}

/// The console appender pattern.
const CONSOLE_PATTERN: &str = "{l:<5} {M} {m}{n}";

/// The file appender pattern.
const FILE_PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S%.3f)} {M} {l:<5} {m}{n}";

/// The crates whose log records go to the log file.
const FILE_LOGGERS: [&str; 2] = ["weather", "weather_lib"];

/// How logging will be set up.
#[derive(Debug)]
pub struct LogProperties {
    /// The log level.
    pub level: log::LevelFilter,
    /// The log file, if `None` logging only goes to the console.
    pub logfile_path: Option<PathBuf>,
    /// Append to the log file instead of truncating it.
    pub logfile_append: bool,
}
impl LogProperties {
    /// Map the command line verbosity count to a log level.
    pub fn level(verbosity: u8) -> log::LevelFilter {
        match verbosity {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}

/// Initializes `log4rs` with a console logger (`stderr`) and an optional file logger.
pub fn initialize(log_properties: LogProperties) -> Result<Handle, LogError> {
    let console_appender = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(CONSOLE_PATTERN)))
        .build();
    let mut config_builder =
        Config::builder().appender(Appender::builder().build("console", Box::new(console_appender)));
    let mut root_builder = Root::builder().appender("console");
    if let Some(logfile_path) = log_properties.logfile_path {
        let file_appender = FileAppender::builder()
            .append(log_properties.logfile_append)
            .encoder(Box::new(PatternEncoder::new(FILE_PATTERN)))
            .build(logfile_path)?;
        config_builder = config_builder.appender(Appender::builder().build("file", Box::new(file_appender)));
        root_builder = root_builder.appender("file");
        // the weather loggers only write to the file
        let loggers: Vec<Logger> = FILE_LOGGERS
            .iter()
            .map(|logger| Logger::builder().appender("file").additive(false).build(*logger, log_properties.level))
            .collect();
        config_builder = config_builder.loggers(loggers);
    }
    let config = config_builder.build(root_builder.build(log_properties.level))?;
    let handle = log4rs::init_config(config)?;
    Ok(handle)
}
