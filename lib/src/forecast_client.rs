//! The source of weather forecasts for coordinates.
//!
//! Getting a forecast takes two requests. The first resolves the coordinates to the weather
//! service grid point. The grid point metadata includes the URL of the daily forecast and the
//! URL of the hourly forecast, the second request gets one of them.

use crate::{
    config::ClientConfig,
    entities::{Coordinates, Forecast, ForecastPeriod, Granularity},
    Error, Result,
};
use reqwest::{
    // the forecast is sequential so use the blocking API.
    blocking::Client,
    header::USER_AGENT,
};
use serde::{de::DeserializeOwned, Deserialize};
use std::{fmt::Debug, time::Duration, time::Instant};

/// What came back from a `GET` request.
#[derive(Clone, Debug, PartialEq)]
pub struct HttpResponse {
    /// The HTTP status code.
    pub status: u16,
    /// The response body.
    pub body: String,
}
impl HttpResponse {
    /// Returns `true` if the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The internal API used to talk to the weather service.
pub trait Transport: Debug {
    /// Execute a `GET` request.
    ///
    /// An error is only returned when a response could not be read, a response with an error
    /// status is still a response.
    ///
    /// # Arguments
    ///
    /// * `url` is the request URL.
    /// * `user_agent` is the `User-Agent` header value, the weather service requires one.
    fn get(&self, url: &str, user_agent: &str) -> Result<HttpResponse>;
}

/// The [Transport] that uses `reqwest`.
#[derive(Debug)]
pub struct HttpTransport(
    /// The HTTP client.
    Client,
);
impl HttpTransport {
    /// Create the transport.
    ///
    /// # Arguments
    ///
    /// * `timeout` is the overall time allowed for each request.
    pub fn new(timeout: Duration) -> Result<Self> {
        match Client::builder().timeout(timeout).build() {
            Ok(client) => Ok(Self(client)),
            Err(err) => Err(Error::Config(format!("Error creating the HTTP client ({err})."))),
        }
    }
}
impl Transport for HttpTransport {
    fn get(&self, url: &str, user_agent: &str) -> Result<HttpResponse> {
        log::debug!("GET {url}");
        let response = match self.0.get(url).header(USER_AGENT, user_agent).send() {
            Ok(response) => response,
            Err(err) => return Err(Error::Upstream { url: url.to_string(), status: None, body: err.to_string() }),
        };
        let status = response.status().as_u16();
        match response.text() {
            Ok(body) => Ok(HttpResponse { status, body }),
            Err(err) => Err(Error::Upstream { url: url.to_string(), status: Some(status), body: err.to_string() }),
        }
    }
}

/// The weather service forecast client.
#[derive(Debug)]
pub struct ForecastClient {
    /// The weather service URL without a trailing slash.
    base_url: String,
    /// The `User-Agent` sent with each request.
    user_agent: String,
    /// How requests are made.
    transport: Box<dyn Transport>,
}
impl ForecastClient {
    /// Create a client that uses the `reqwest` transport.
    ///
    /// # Arguments
    ///
    /// * `config` has the weather service settings.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let transport = HttpTransport::new(Duration::from_secs(config.timeout_secs))?;
        Ok(Self::with_transport(config, Box::new(transport)))
    }

    /// Create a client with some other transport.
    ///
    /// # Arguments
    ///
    /// * `config` has the weather service settings.
    /// * `transport` makes the requests.
    pub fn with_transport(config: &ClientConfig, transport: Box<dyn Transport>) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            user_agent: config.user_agent.clone(),
            transport,
        }
    }

    /// Get the forecast for a location.
    ///
    /// # Arguments
    ///
    /// * `coordinates` is where the forecast is for.
    /// * `granularity` selects the daily or hourly forecast.
    pub fn fetch(&self, coordinates: &Coordinates, granularity: Granularity) -> Result<Forecast> {
        let start = Instant::now();
        let points: PointsResponse = self.get_json(&self.points_url(coordinates))?;
        let properties = points.properties;
        log::debug!("{} is grid {} {},{}", coordinates, properties.grid_id, properties.grid_x, properties.grid_y);
        let forecast_url = match granularity {
            Granularity::Daily => properties.forecast,
            Granularity::Hourly => properties.forecast_hourly,
        };
        let forecast: ForecastResponse = self.get_json(&forecast_url)?;
        crate::log_elapsed!(format!("fetch {granularity} {coordinates}"), &start);
        Ok(Forecast { granularity, periods: forecast.properties.periods })
    }

    /// The URL that resolves coordinates to a grid point.
    fn points_url(&self, coordinates: &Coordinates) -> String {
        format!("{}/points/{:.4},{:.4}", self.base_url, coordinates.latitude, coordinates.longitude)
    }

    /// Get a `JSON` document from the weather service.
    fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self.transport.get(url, &self.user_agent)?;
        if !response.is_success() {
            return Err(Error::Upstream { url: url.to_string(), status: Some(response.status), body: response.body });
        }
        match serde_json::from_str(&response.body) {
            Ok(document) => Ok(document),
            Err(err) => Err(Error::Decode(format!("{url} ({err})"))),
        }
    }
}

/// The bean that describes the points `JSON` document.
#[derive(Debug, Deserialize)]
struct PointsResponse {
    properties: PointsProperties,
}

/// The grid point metadata.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PointsProperties {
    #[serde(default)]
    grid_id: String,
    #[serde(default)]
    grid_x: i64,
    #[serde(default)]
    grid_y: i64,
    /// The daily forecast URL.
    forecast: String,
    /// The hourly forecast URL.
    forecast_hourly: String,
}

/// The bean that describes the forecast `JSON` document.
#[derive(Debug, Deserialize)]
struct ForecastResponse {
    properties: ForecastProperties,
}

#[derive(Debug, Deserialize)]
struct ForecastProperties {
    periods: Vec<ForecastPeriod>,
}

#[cfg(test)]
pub(crate) mod testlib {
    //! A canned weather service.
    use super::*;
    use std::{cell::RefCell, collections::HashMap};

    pub(crate) const POINTS_URL: &str = "https://api.weather.gov/points/39.7456,-97.0892";
    pub(crate) const DAILY_URL: &str = "https://api.weather.gov/gridpoints/TOP/32,81/forecast";
    pub(crate) const HOURLY_URL: &str = "https://api.weather.gov/gridpoints/TOP/32,81/forecast/hourly";

    /// A [Transport] that answers from a map and remembers what was asked for.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingTransport {
        responses: HashMap<String, HttpResponse>,
        pub(crate) requests: RefCell<Vec<(String, String)>>,
    }
    impl RecordingTransport {
        pub(crate) fn respond(mut self, url: &str, status: u16, body: &str) -> Self {
            self.responses.insert(url.to_string(), HttpResponse { status, body: body.to_string() });
            self
        }
    }
    impl Transport for RecordingTransport {
        fn get(&self, url: &str, user_agent: &str) -> Result<HttpResponse> {
            self.requests.borrow_mut().push((url.to_string(), user_agent.to_string()));
            match self.responses.get(url) {
                Some(response) => Ok(response.clone()),
                None => Ok(HttpResponse { status: 404, body: "Not Found".to_string() }),
            }
        }
    }
    impl Transport for std::rc::Rc<RecordingTransport> {
        fn get(&self, url: &str, user_agent: &str) -> Result<HttpResponse> {
            self.as_ref().get(url, user_agent)
        }
    }

    pub(crate) fn points_json() -> String {
        format!(
            r#"{{"properties": {{"gridId": "TOP", "gridX": 32, "gridY": 81, "forecast": "{DAILY_URL}", "forecastHourly": "{HOURLY_URL}"}}}}"#
        )
    }

    pub(crate) fn period_json(number: i64, name: &str, start_time: &str, end_time: &str, temperature: i64) -> String {
        format!(
            r#"{{
                "number": {number},
                "name": "{name}",
                "startTime": "{start_time}",
                "endTime": "{end_time}",
                "isDaytime": true,
                "temperature": {temperature},
                "temperatureUnit": "F",
                "temperatureTrend": null,
                "windSpeed": "10 mph",
                "windDirection": "SW",
                "icon": "https://api.weather.gov/icons/land/day/few?size=medium",
                "shortForecast": "Sunny",
                "detailedForecast": "Sunny, with a high near {temperature}."
            }}"#
        )
    }

    pub(crate) fn forecast_json(periods: &[String]) -> String {
        format!(r#"{{"properties": {{"periods": [{}]}}}}"#, periods.join(","))
    }

    pub(crate) fn daily_forecast_json() -> String {
        forecast_json(&[
            period_json(1, "Today", "2024-10-01T06:00:00-05:00", "2024-10-01T18:00:00-05:00", 81),
            period_json(2, "Tonight", "2024-10-01T18:00:00-05:00", "2024-10-02T06:00:00-05:00", 55),
            period_json(3, "Wednesday", "2024-10-02T06:00:00-05:00", "2024-10-02T18:00:00-05:00", 84),
        ])
    }

    pub(crate) fn client_config() -> ClientConfig {
        ClientConfig { base_url: "https://api.weather.gov/".to_string(), ..Default::default() }
    }
}
