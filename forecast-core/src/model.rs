use std::{convert::TryFrom, fmt, time::Instant};

/// A point location in decimal degrees, kept as the caller wrote it.
///
/// Don't use minutes and seconds, and don't use N/S/E/W suffixes:
/// North and West are positive, South and East are negative.
/// Nothing is validated; the strings go into the request URL verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coordinate {
    latitude: String,
    longitude: String,
}

impl Coordinate {
    pub fn new(latitude: impl Into<String>, longitude: impl Into<String>) -> Self {
        Self { latitude: latitude.into(), longitude: longitude.into() }
    }

    pub fn latitude(&self) -> &str {
        &self.latitude
    }

    pub fn longitude(&self) -> &str {
        &self.longitude
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemperatureUnit {
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemperatureUnit::Celsius => "celsius",
            TemperatureUnit::Fahrenheit => "fahrenheit",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            TemperatureUnit::Celsius => "\u{00b0}C",
            TemperatureUnit::Fahrenheit => "\u{00b0}F",
        }
    }

    pub const fn all() -> &'static [TemperatureUnit] {
        &[TemperatureUnit::Celsius, TemperatureUnit::Fahrenheit]
    }
}

impl fmt::Display for TemperatureUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for TemperatureUnit {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.trim().to_lowercase();

        match lower.as_str() {
            "c" | "celsius" => Ok(TemperatureUnit::Celsius),
            "f" | "fahrenheit" => Ok(TemperatureUnit::Fahrenheit),
            _ => Err(anyhow::anyhow!(
                "Unknown temperature unit '{value}'. Supported units: celsius (c), fahrenheit (f)."
            )),
        }
    }
}

/// Convert a temperature between units.
///
/// Equal units return `value` untouched. Otherwise the result is rounded to
/// the nearest whole degree, halves away from zero.
pub fn convert_temperature(value: f64, from: TemperatureUnit, to: TemperatureUnit) -> f64 {
    match (from, to) {
        (a, b) if a == b => value,
        (TemperatureUnit::Fahrenheit, _) => ((value - 32.0) / 1.8).round(),
        (TemperatureUnit::Celsius, _) => (value * 1.8 + 32.0).round(),
    }
}

/// Outcome of the most recent download attempts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownloadStatus {
    /// Whether the held document came from the latest attempt.
    pub valid: bool,

    /// Monotonic time of the last successful decode.
    pub last_success: Option<Instant>,
}
