use chrono::Local;
use forecast_core::{ForecastClient, TemperatureUnit, Transport};

/// Formats the downloaded forecast into a human-readable report
pub fn format_report<T: Transport>(client: &ForecastClient<T>, unit: TemperatureUnit) -> String {
    let mut output = format!(
        "Forecast for {} (fetched {})\n",
        client.coordinate(),
        Local::now().format("%Y-%m-%d %H:%M:%S")
    );

    if !client.has_valid_data() {
        output.push_str("  No valid data");
        if let Some(e) = client.last_error() {
            output.push_str(&format!(": {e}"));
        }
        output.push('\n');
        return output;
    }

    output.push_str(&format!(
        "  Now: {} at {}\n",
        temperature(client.station_temperature_in(unit), unit),
        client.observation_time().unwrap_or("unknown time")
    ));
    output.push_str(&format!(
        "  {}: {}\n",
        client.current_period_name().unwrap_or("Current period"),
        client.current_period_weather().unwrap_or("n/a")
    ));

    match client.todays_high_temperature_in(unit) {
        Some(t) if t.is_nan() => {}
        high => output.push_str(&format!("  High today: {}\n", temperature(high, unit))),
    }
    output.push_str(&format!(
        "  Low tonight: {}\n",
        temperature(client.tonights_low_temperature_in(unit), unit)
    ));

    if client.hazard_count() > 0 {
        output.push_str("  Hazards:\n");
        for hazard in client.hazards() {
            output.push_str(&format!("    - {hazard}\n"));
        }
    }
    output
}

/// Formats a single conversion for the `convert` command
pub fn format_conversion(
    value: f64,
    from: TemperatureUnit,
    converted: f64,
    to: TemperatureUnit,
) -> String {
    format!("{value}{} = {converted}{}", from.symbol(), to.symbol())
}

fn temperature(value: Option<f64>, unit: TemperatureUnit) -> String {
    match value {
        Some(v) if !v.is_nan() => format!("{v}{}", unit.symbol()),
        _ => "n/a".to_string(),
    }
}
