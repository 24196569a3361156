//! The weather configuration file.
//!
//! The configuration is a `TOML` document. Before it is parsed, environment variables are
//! substituted into the text. `${NAME}` is replaced with the value of `NAME` (or nothing if it is
//! not set) and `${NAME:-default}` is replaced with the value of `NAME` or `default` when it is
//! not set or empty.

use crate::{Error, Result};
use serde::Deserialize;
use std::{
    env, fs,
    path::{Path, PathBuf},
};

/// The configuration file name looked for in the current directory.
const CONFIG_FILENAME: &str = "weather.toml";

/// The configuration file name looked for in the home directory.
const HOME_CONFIG_FILENAME: &str = ".weather.toml";

/// The weather configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub forecast: ForecastConfig,
    pub history: HistoryConfig,
    pub database: DatabaseConfig,
    pub client: ClientConfig,
}
impl Config {
    /// Load the configuration.
    ///
    /// If the configuration file is not given the current and home directories are searched. The
    /// default configuration is returned if no configuration file is found.
    ///
    /// # Arguments
    ///
    /// * `config_file` is the configuration file pathname.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let config_file = match config_file {
            Some(path) => Some(path.to_path_buf()),
            None => find_config_file(),
        };
        match config_file {
            Some(path) => {
                log::info!("Using config file {}", path.display());
                match fs::read_to_string(&path) {
                    Ok(text) => Self::parse(&substitute_env(&text)),
                    Err(err) => Err(Error::Config(format!("Error reading {} ({err}).", path.display()))),
                }
            }
            None => {
                log::debug!("No config file found");
                Ok(Self::default())
            }
        }
    }

    /// Create the configuration from `TOML` text.
    ///
    /// # Arguments
    ///
    /// * `text` is the configuration document.
    pub fn parse(text: &str) -> Result<Self> {
        match toml::from_str(text) {
            Ok(config) => Ok(config),
            Err(err) => Err(Error::Config(err.to_string())),
        }
    }
}

/// The forecast command defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// The number of periods to show.
    pub periods: Option<i64>,
    /// Get the hourly forecast.
    pub hourly: bool,
    /// Save the forecast to the database.
    pub save: bool,
}

/// The history command defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// The number of periods to show.
    pub periods: Option<i64>,
    /// Show the hourly forecast.
    pub hourly: bool,
}

/// The forecast database settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// The `SQLite` database pathname.
    pub path: PathBuf,
}
impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: PathBuf::from("weather.db") }
    }
}

/// The weather service settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// The weather service URL.
    pub base_url: String,
    /// The weather service wants a `User-Agent` that identifies who is calling.
    pub user_agent: String,
    /// The request timeout in seconds.
    pub timeout_secs: u64,
}
impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.weather.gov".to_string(),
            user_agent: "weather-app/1.0 (you@example.com)".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Look for a configuration file in the current directory then the home directory.
pub fn find_config_file() -> Option<PathBuf> {
    let mut candidates = vec![PathBuf::from(CONFIG_FILENAME)];
    if let Some(home) = env::var_os("HOME") {
        candidates.push(PathBuf::from(home).join(HOME_CONFIG_FILENAME));
    }
    candidates.into_iter().find(|path| path.is_file())
}

/// Replace `${NAME}` and `${NAME:-default}` references with environment variables.
///
/// # Arguments
///
/// * `text` is the text that will be updated.
pub fn substitute_env(text: &str) -> String {
    substitute(text, |name| env::var(name).ok())
}

/// The environment substitution with a pluggable lookup.
fn substitute<F>(text: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut substituted = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("${") {
        substituted.push_str(&rest[..start]);
        let reference = &rest[start + 2..];
        match reference.find('}') {
            Some(end) => {
                let (name, default) = match reference[..end].split_once(":-") {
                    Some((name, default)) => (name, Some(default)),
                    None => (&reference[..end], None),
                };
                let value = lookup(name.trim()).filter(|value| default.is_none() || !value.is_empty());
                substituted.push_str(&value.unwrap_or_else(|| default.unwrap_or_default().to_string()));
                rest = &reference[end + 1..];
            }
            None => {
                // an unterminated reference is left alone
                substituted.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    substituted.push_str(rest);
    substituted
}
