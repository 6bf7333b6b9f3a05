//! Serial text lines
//!
//! The host bridge parses these lines by substring, so the wording of every
//! line is part of the interface. Data lines look like
//!
//! ```text
//! Temp: 24.5 °C | Humidity: 65.2 % | Soil Moisture: 45 % [SIMULATED]
//! ```
//!
//! Temperature and humidity always carry exactly one decimal; soil moisture
//! is a whole percentage. The `[SIMULATED]` suffix marks degraded mode.

use heapless::String;
use ufmt::uwrite;

use crate::sensors::{Climate, Source, Tenths};

pub const EOL: &str = "\r\n";

pub const BANNER: [&str; 4] = [
    "Arduino Farm Monitor Started",
    "DHT22 + Soil Moisture Sensor",
    "============================",
    "Initializing sensors...",
];
pub const PROBE_OK: &str = "DHT22 sensor detected and working";
pub const PROBE_FAILED: &str = "WARNING: DHT22 sensor not detected - using simulation mode";
pub const READY: &str = "System ready - starting data collection";
pub const SWITCHED_TO_SIMULATION: &str = "DHT22 sensor failed - switching to simulation mode";

const SIMULATED_TAG: &str = " [SIMULATED]";

// Lines the host bridge skips without looking for fields
const IGNORED_MARKERS: [&str; 10] = [
    "DHT read error",
    "WARNING:",
    "DEBUG",
    "Arduino Farm Monitor",
    "DHT22 + Soil",
    "====",
    "Initializing",
    "detected",
    "ready",
    "starting",
];

/// Longest data line is well under 100 bytes, even with extreme values
pub const LINE_CAPACITY: usize = 128;

pub type Line = String<LINE_CAPACITY>;

/// A line did not fit into [`Line`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub struct LineOverflow;

/// Formats a data line (without line ending)
/// param climate: temperature and humidity to report
/// param soil_percent: soil moisture, 0-100
/// param source: whether the climate values are real or simulated
pub fn data_line(
    climate: &Climate,
    soil_percent: u8,
    source: Source,
) -> Result<Line, LineOverflow> {
    let mut line = Line::new();
    uwrite!(
        line,
        "Temp: {} °C | Humidity: {} % | Soil Moisture: {} %",
        climate.temperature,
        climate.humidity,
        soil_percent
    )
    .map_err(|_| LineOverflow)?;
    if source == Source::Simulated {
        line.push_str(SIMULATED_TAG).map_err(|_| LineOverflow)?;
    }
    Ok(line)
}

/// Formats the notice for a failed read that will be retried
pub fn retry_line(failures: u8, threshold: u8) -> Result<Line, LineOverflow> {
    let mut line = Line::new();
    uwrite!(line, "DHT read error ({}/{}) - retrying...", failures, threshold)
        .map_err(|_| LineOverflow)?;
    Ok(line)
}

/// Formats the periodic diagnostic line
/// param soil_raw: unconverted ADC reading of the soil probe
/// param source: current DHT22 mode
pub fn diagnostic_line(soil_raw: u16, source: Source) -> Result<Line, LineOverflow> {
    let mut line = Line::new();
    uwrite!(
        line,
        "DEBUG - Soil Raw: {} | DHT Status: {}",
        soil_raw,
        source.as_str()
    )
    .map_err(|_| LineOverflow)?;
    Ok(line)
}

/// Values recovered from one data line by the host side
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Record {
    pub temperature: Option<Tenths>,
    pub humidity: Option<Tenths>,
    pub soil_moisture: Option<u8>,
    pub simulated: bool,
}

/// Parses one received line the way the host bridge does.
/// Banner, status, retry and debug lines are skipped.
/// returns None when the line carries no readable field
pub fn parse_line(line: &str) -> Option<Record> {
    let line = line.trim();
    if line.is_empty() || IGNORED_MARKERS.iter().any(|marker| line.contains(marker)) {
        return None;
    }

    let record = Record {
        temperature: field(line, "Temp:", "°C").and_then(Tenths::parse),
        humidity: field(line, "Humidity:", "%").and_then(Tenths::parse),
        soil_moisture: field(line, "Soil Moisture:", "%").and_then(|s| s.parse().ok()),
        simulated: line.contains(SIMULATED_TAG.trim_start()),
    };

    if record.temperature.is_none()
        && record.humidity.is_none()
        && record.soil_moisture.is_none()
    {
        None
    } else {
        Some(record)
    }
}

// Text between `label` and the next `unit`, trimmed
fn field<'a>(line: &'a str, label: &str, unit: &str) -> Option<&'a str> {
    let start = line.find(label)? + label.len();
    let rest = &line[start..];
    let end = rest.find(unit)?;
    Some(rest[..end].trim())
}
