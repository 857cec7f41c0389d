//! Point forecast from the National Weather Service "MapClick" JSON feed.
//!
//! The feed lives at `https://forecast.weather.gov/MapClick.php` and returns a
//! single document with current station observations and about a week of
//! twelve-hour forecast periods. Only the fields listed in [`FORECAST_FIELDS`]
//! are decoded.
//!
//! Relevant shape of the response:
//!
//! - `.currentobservation.{Temp,Date,Weatherimage}`: latest station report,
//!   values as strings
//! - `.time.tempLabel[]`: `"High"`/`"Low"` per period, starting with the next one
//! - `.time.startPeriodName[]`: e.g. `"Tonight"`, `"Monday"`
//! - `.data.temperature[]`: forecast temperature per period (strings)
//! - `.data.weather[]`: short description per period
//! - `.data.hazard[]`: active hazard headlines, often empty

use std::time::Instant;

use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    error::{DownloadError, error_chain},
    filter::FieldFilter,
    model::{Coordinate, DownloadStatus, TemperatureUnit, convert_temperature},
    transport::Transport,
};

pub const FORECAST_HOST: &str = "forecast.weather.gov";
pub const HTTPS_PORT: u16 = 443;

/// Paths kept from the feed. Extend this when adding an accessor.
pub const FORECAST_FIELDS: &[&str] = &[
    "currentobservation.Temp",
    "currentobservation.Date",
    "currentobservation.Weatherimage",
    "time.startPeriodName",
    "time.tempLabel",
    "data.temperature",
    "data.hazard",
    "data.weather",
];

/// Build the MapClick request path for a coordinate.
///
/// `unit=0` selects Fahrenheit; see [`ForecastClient::temperature_unit`].
pub fn request_path(coordinate: &Coordinate) -> String {
    format!(
        "/MapClick.php?lat={}&lon={}&unit=0&lg=english&FcstType=json",
        coordinate.latitude(),
        coordinate.longitude()
    )
}

/// Downloads and holds the forecast for one fixed location.
#[derive(Debug)]
pub struct ForecastClient<T> {
    transport: T,
    coordinate: Coordinate,
    request_path: String,
    filter: FieldFilter,
    document: Value,
    status: DownloadStatus,
    last_error: Option<String>,
}

impl<T: Transport> ForecastClient<T> {
    /// Set up a client for `latitude`/`longitude` in decimal degrees.
    /// No request is made until [`download_new_data`](Self::download_new_data).
    pub fn new(transport: T, latitude: impl Into<String>, longitude: impl Into<String>) -> Self {
        Self::for_coordinate(transport, Coordinate::new(latitude, longitude))
    }

    pub fn for_coordinate(transport: T, coordinate: Coordinate) -> Self {
        let filter = FORECAST_FIELDS
            .iter()
            .fold(FieldFilter::default(), |filter, path| filter.allow(path));

        Self {
            request_path: request_path(&coordinate),
            transport,
            coordinate,
            filter,
            document: Value::Null,
            status: DownloadStatus::default(),
            last_error: None,
        }
    }

    /// Try to download new data from the server.
    ///
    /// Blocks until the response has been read and decoded. On success the
    /// held document is replaced and [`has_valid_data`](Self::has_valid_data)
    /// becomes true. On any failure the previous document is kept but marked
    /// invalid, and the error is both returned and kept for
    /// [`last_error`](Self::last_error).
    pub fn download_new_data(&mut self) -> Result<(), DownloadError> {
        self.transport.stop();

        let result = self.fetch();

        self.transport.stop();

        match result {
            Ok(document) => {
                debug!("forecast parsed");
                self.document = document;
                self.status.valid = true;
                self.status.last_success = Some(Instant::now());
                self.last_error = None;
                Ok(())
            }
            Err(e) => {
                let description = error_chain(&e);
                warn!(error = %description, "forecast download failed");
                self.status.valid = false;
                self.last_error = Some(description);
                Err(e)
            }
        }
    }

    fn fetch(&mut self) -> Result<Value, DownloadError> {
        self.transport.get(FORECAST_HOST, HTTPS_PORT, &self.request_path)?;

        let status = self.transport.status_code();
        if status == Some(200) && self.transport.available() {
            debug!(
                ?status,
                content_length = ?self.transport.content_length(),
                "downloaded weather data"
            );
        } else {
            // The body is decoded regardless of status.
            warn!(?status, "could not download weather data");
        }

        let document = match self.transport.body() {
            Some(body) => self.filter.decode_reader(body)?,
            None => self.filter.decode_reader(std::io::empty())?,
        };
        Ok(document)
    }

    /// Whether data has been downloaded and parsed by the latest attempt.
    pub fn has_valid_data(&self) -> bool {
        self.status.valid
    }

    /// Monotonic time of the last successful download.
    pub fn last_download_time(&self) -> Option<Instant> {
        self.status.last_success
    }

    pub fn status(&self) -> DownloadStatus {
        self.status
    }

    /// Description of the most recent failure, cleared by a success.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Unit of the raw values in the document. Always Fahrenheit.
    pub fn temperature_unit(&self) -> TemperatureUnit {
        TemperatureUnit::Fahrenheit
    }

    pub fn coordinate(&self) -> &Coordinate {
        &self.coordinate
    }

    pub fn request_path(&self) -> &str {
        &self.request_path
    }

    /// The decoded, filtered document.
    pub fn document(&self) -> &Value {
        &self.document
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Current observation temperature at the nearest station.
    pub fn station_temperature(&self) -> Option<f64> {
        self.document.pointer("/currentobservation/Temp").and_then(as_temperature)
    }

    pub fn station_temperature_in(&self, unit: TemperatureUnit) -> Option<f64> {
        self.station_temperature().map(|t| self.convert(t, unit))
    }

    /// Timestamp of the current observation, as the feed formats it.
    pub fn observation_time(&self) -> Option<&str> {
        self.document.pointer("/currentobservation/Date").and_then(Value::as_str)
    }

    /// Today's high temperature.
    ///
    /// `Some(NaN)` means it is currently night and there is no daytime high
    /// left to report. `None` means the document doesn't have the data.
    pub fn todays_high_temperature(&self) -> Option<f64> {
        if self.next_period_is_high() {
            self.forecast_temperature(0)
        } else {
            Some(f64::NAN)
        }
    }

    pub fn todays_high_temperature_in(&self, unit: TemperatureUnit) -> Option<f64> {
        self.todays_high_temperature().map(|t| self.convert(t, unit))
    }

    /// Tonight's low temperature.
    ///
    /// During the day the low is the second forecast period; at night it is
    /// the first.
    pub fn tonights_low_temperature(&self) -> Option<f64> {
        let index = if self.next_period_is_high() { 1 } else { 0 };
        self.forecast_temperature(index)
    }

    pub fn tonights_low_temperature_in(&self, unit: TemperatureUnit) -> Option<f64> {
        self.tonights_low_temperature().map(|t| self.convert(t, unit))
    }

    pub fn hazard_count(&self) -> usize {
        self.list("/data/hazard").map_or(0, Vec::len)
    }

    /// Hazard message at `index`, or `None` past the end.
    pub fn hazard(&self, index: usize) -> Option<&str> {
        self.list_str("/data/hazard", index)
    }

    pub fn hazards(&self) -> impl Iterator<Item = &str> {
        self.list("/data/hazard")
            .into_iter()
            .flatten()
            .filter_map(Value::as_str)
    }

    /// Name of the current period, e.g. "This Afternoon".
    pub fn current_period_name(&self) -> Option<&str> {
        self.list_str("/time/startPeriodName", 0)
    }

    /// Short description of the current period weather.
    pub fn current_period_weather(&self) -> Option<&str> {
        self.list_str("/data/weather", 0)
    }

    /// File name of the icon for the current observation, e.g. "sct.png".
    pub fn weather_image_file_name(&self) -> Option<&str> {
        self.document.pointer("/currentobservation/Weatherimage").and_then(Value::as_str)
    }

    fn convert(&self, value: f64, unit: TemperatureUnit) -> f64 {
        convert_temperature(value, self.temperature_unit(), unit)
    }

    fn next_period_is_high(&self) -> bool {
        self.list_str("/time/tempLabel", 0)
            .is_some_and(|label| label.eq_ignore_ascii_case("high"))
    }

    fn forecast_temperature(&self, index: usize) -> Option<f64> {
        self.list("/data/temperature")?.get(index).and_then(as_temperature)
    }

    fn list(&self, pointer: &str) -> Option<&Vec<Value>> {
        self.document.pointer(pointer).and_then(Value::as_array)
    }

    fn list_str(&self, pointer: &str, index: usize) -> Option<&str> {
        self.list(pointer)?.get(index).and_then(Value::as_str)
    }
}

/// The feed sends numbers as strings ("72") and missing values as "NA".
/// Non-finite values are missing too, so NaN only ever means night.
fn as_temperature(value: &Value) -> Option<f64> {
    let t = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    t.filter(|t| t.is_finite())
}
