use std::{thread, time::Duration};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use forecast_core::{
    Config, Coordinate, ForecastClient, ReqwestTransport, TemperatureUnit, convert_temperature,
};
use inquire::Text;

use crate::report::{format_conversion, format_report};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "forecast", version, about = "National Weather Service point forecast")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Save the location (and optionally the display unit) to the config file.
    Configure {
        /// Latitude in decimal degrees, North positive.
        #[arg(long, allow_hyphen_values = true)]
        lat: Option<String>,

        /// Longitude in decimal degrees, West positive.
        #[arg(long, allow_hyphen_values = true)]
        lon: Option<String>,

        /// Display unit: "celsius" or "fahrenheit".
        #[arg(long)]
        unit: Option<String>,
    },

    /// Download the forecast once and print it.
    Show {
        #[command(flatten)]
        location: LocationArgs,
    },

    /// Download and print the forecast repeatedly.
    Watch {
        #[command(flatten)]
        location: LocationArgs,

        /// Seconds between downloads.
        #[arg(long, default_value_t = 900)]
        interval: u64,

        /// Stop after this many downloads (at least 1).
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        count: Option<u64>,
    },

    /// Convert a temperature between units.
    Convert {
        #[arg(allow_hyphen_values = true)]
        value: f64,

        #[arg(long)]
        from: String,

        #[arg(long)]
        to: String,
    },
}

/// Per-invocation overrides of the configured location and unit.
#[derive(Debug, clap::Args)]
pub struct LocationArgs {
    /// Latitude in decimal degrees, North positive.
    #[arg(long, allow_hyphen_values = true, requires = "lon")]
    lat: Option<String>,

    /// Longitude in decimal degrees, West positive.
    #[arg(long, allow_hyphen_values = true, requires = "lat")]
    lon: Option<String>,

    /// Display unit: "celsius" or "fahrenheit".
    #[arg(long)]
    unit: Option<String>,
}

impl LocationArgs {
    fn resolve(&self, config: &Config) -> Result<(Coordinate, TemperatureUnit)> {
        let coordinate = match (&self.lat, &self.lon) {
            (Some(lat), Some(lon)) => Coordinate::new(lat.as_str(), lon.as_str()),
            _ => config.coordinate()?,
        };

        let unit = match &self.unit {
            Some(u) => TemperatureUnit::try_from(u.as_str())?,
            None => config.display_unit()?,
        };

        Ok((coordinate, unit))
    }
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Command::Configure { lat, lon, unit } => configure(lat, lon, unit),
            Command::Show { location } => {
                let config = Config::load()?;
                let (coordinate, unit) = location.resolve(&config)?;
                let mut client = new_client(&config, coordinate)?;

                client
                    .download_new_data()
                    .context("Failed to download the forecast")?;
                print!("{}", format_report(&client, unit));
                Ok(())
            }
            Command::Watch { location, interval, count } => {
                let config = Config::load()?;
                let (coordinate, unit) = location.resolve(&config)?;
                let mut client = new_client(&config, coordinate)?;

                watch(&mut client, unit, Duration::from_secs(interval), count);
                Ok(())
            }
            Command::Convert { value, from, to } => {
                let from = TemperatureUnit::try_from(from.as_str())?;
                let to = TemperatureUnit::try_from(to.as_str())?;

                let converted = convert_temperature(value, from, to);
                println!("{}", format_conversion(value, from, converted, to));
                Ok(())
            }
        }
    }
}

fn new_client(config: &Config, coordinate: Coordinate) -> Result<ForecastClient<ReqwestTransport>> {
    let transport = ReqwestTransport::with_timeout(config.request_timeout())
        .context("Failed to set up the HTTP client")?;
    Ok(ForecastClient::for_coordinate(transport, coordinate))
}

fn configure(lat: Option<String>, lon: Option<String>, unit: Option<String>) -> Result<()> {
    let mut config = Config::load()?;

    let lat = match lat {
        Some(lat) => lat,
        None => Text::new("Latitude (decimal degrees, North positive):")
            .prompt()
            .context("Failed to read latitude")?,
    };
    let lon = match lon {
        Some(lon) => lon,
        None => Text::new("Longitude (decimal degrees, West positive):")
            .prompt()
            .context("Failed to read longitude")?,
    };
    config.set_location(lat.trim(), lon.trim());

    if let Some(unit) = unit {
        config.set_display_unit(TemperatureUnit::try_from(unit.as_str())?);
    }

    let path = config.save()?;
    println!("Saved configuration to {}", path.display());
    Ok(())
}

/// Caller-side polling: one download per tick, failures are reported and the
/// next tick tries again.
fn watch(
    client: &mut ForecastClient<ReqwestTransport>,
    unit: TemperatureUnit,
    interval: Duration,
    count: Option<u64>,
) {
    let mut done = 0;
    loop {
        match client.download_new_data() {
            Ok(()) => print!("{}", format_report(client, unit)),
            Err(e) => eprintln!("Forecast download failed: {:#}", anyhow::Error::from(e)),
        }

        done += 1;
        if count.is_some_and(|n| done >= n) {
            break;
        }
        thread::sleep(interval);
    }
}
