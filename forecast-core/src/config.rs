use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{
    model::{Coordinate, TemperatureUnit},
    transport::DEFAULT_TIMEOUT,
};

/// Location to forecast, as decimal-degree strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationConfig {
    pub latitude: String,
    pub longitude: String,
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// unit = "celsius"
/// timeout_secs = 20
///
/// [location]
/// latitude = "40.7128"
/// longitude = "74.0060"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub location: Option<LocationConfig>,

    /// Display unit, "celsius" or "fahrenheit". Defaults to fahrenheit.
    pub unit: Option<String>,

    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
}

impl Config {
    /// The configured location.
    pub fn coordinate(&self) -> Result<Coordinate> {
        let location = self.location.as_ref().ok_or_else(|| {
            anyhow!(
                "No location configured.\n\
                 Hint: run `forecast configure --lat <LAT> --lon <LON>` first."
            )
        })?;

        Ok(Coordinate::new(location.latitude.as_str(), location.longitude.as_str()))
    }

    pub fn set_location(&mut self, latitude: impl Into<String>, longitude: impl Into<String>) {
        self.location = Some(LocationConfig {
            latitude: latitude.into(),
            longitude: longitude.into(),
        });
    }

    /// Display unit as a strongly-typed TemperatureUnit.
    pub fn display_unit(&self) -> Result<TemperatureUnit> {
        match self.unit.as_deref() {
            Some(s) => TemperatureUnit::try_from(s),
            None => Ok(TemperatureUnit::Fahrenheit),
        }
    }

    /// Store display unit as string.
    pub fn set_display_unit(&mut self, unit: TemperatureUnit) {
        self.unit = Some(unit.as_str().to_string());
    }

    pub fn request_timeout(&self) -> Duration {
        self.timeout_secs.map_or(DEFAULT_TIMEOUT, Duration::from_secs)
    }

    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return empty.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_file_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "nws-forecast", "forecast")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinate_errors_when_not_set() {
        let cfg = Config::default();
        let err = cfg.coordinate().unwrap_err();

        assert!(err.to_string().contains("No location configured"));
        assert!(err.to_string().contains("forecast configure"));
    }

    #[test]
    fn set_location_and_read_back() {
        let mut cfg = Config::default();
        cfg.set_location("35.2271", "80.8431");

        let c = cfg.coordinate().expect("location must exist");
        assert_eq!(c, Coordinate::new("35.2271", "80.8431"));
    }

    #[test]
    fn display_unit_defaults_to_fahrenheit() {
        let cfg = Config::default();
        assert_eq!(cfg.display_unit().unwrap(), TemperatureUnit::Fahrenheit);
    }

    #[test]
    fn set_display_unit_overrides_default() {
        let mut cfg = Config::default();
        cfg.set_display_unit(TemperatureUnit::Celsius);

        assert_eq!(cfg.unit.as_deref(), Some("celsius"));
        assert_eq!(cfg.display_unit().unwrap(), TemperatureUnit::Celsius);
    }

    #[test]
    fn bad_display_unit_is_reported() {
        let cfg = Config { unit: Some("rankine".into()), ..Default::default() };
        assert!(cfg.display_unit().is_err());
    }

    #[test]
    fn request_timeout_falls_back_to_default() {
        let mut cfg = Config::default();
        assert_eq!(cfg.request_timeout(), DEFAULT_TIMEOUT);

        cfg.timeout_secs = Some(5);
        assert_eq!(cfg.request_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn missing_file_loads_default() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load_from(&dir.path().join("absent.toml")).unwrap();

        assert!(cfg.location.is_none());
        assert!(cfg.unit.is_none());
    }

    #[test]
    fn save_then_load_from_nested_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        cfg.set_location("47.6062", "122.3321");
        cfg.set_display_unit(TemperatureUnit::Celsius);
        cfg.timeout_secs = Some(10);
        cfg.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.location, cfg.location);
        assert_eq!(loaded.display_unit().unwrap(), TemperatureUnit::Celsius);
        assert_eq!(loaded.timeout_secs, Some(10));
    }

    #[test]
    fn parse_error_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[location\nlatitude = ").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
