//! Core library for the `forecast` CLI.
//!
//! This crate defines:
//! - A client for the National Weather Service point forecast feed
//! - Allow-list filtered JSON decoding, so only the fields we read are kept
//! - The transport abstraction the client downloads through
//! - Configuration handling
//!
//! It is used by `forecast-cli`, but the client only needs a [`Transport`],
//! so it can also be driven from other binaries or over other networks.

pub mod client;
pub mod config;
pub mod error;
pub mod filter;
pub mod model;
pub mod transport;

pub use client::{FORECAST_HOST, ForecastClient, HTTPS_PORT};
pub use config::{Config, LocationConfig};
pub use error::{DownloadError, TransportError, error_chain};
pub use filter::FieldFilter;
pub use model::{Coordinate, DownloadStatus, TemperatureUnit, convert_temperature};
pub use transport::{ReqwestTransport, Transport};
