use crate::sensors::SoilCalibration;

pub const READING_INTERVAL_MS: u64 = 3000; // 3s between readings, DHT22 needs >= 2s
pub const STARTUP_SETTLE_MS: u32 = 3000; // DHT22 stabilization after power-on
pub const MAX_DHT_ERRORS: u8 = 5;
pub const DIAGNOSTIC_EVERY: u32 = 10;
pub const SERIAL_BAUD: u32 = 9600;

// 12-bit ADC readings of the soil probe, measured in air-dry and soaked soil
pub const SOIL_DRY: u16 = 2800;
pub const SOIL_WET: u16 = 1200;

/// MonitorConfig holds the tunables of the sampling loop.
/// reading_interval_ms: Time between sampling ticks
/// failure_threshold: Consecutive DHT22 failures tolerated before switching to simulated values
/// diagnostic_every: Emit a diagnostic line after every Nth data line (0 disables it)
/// soil: Calibration of the soil moisture probe
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub struct MonitorConfig {
    pub reading_interval_ms: u64,
    pub failure_threshold: u8,
    pub diagnostic_every: u32,
    pub soil: SoilCalibration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        MonitorConfig {
            reading_interval_ms: READING_INTERVAL_MS,
            failure_threshold: MAX_DHT_ERRORS,
            diagnostic_every: DIAGNOSTIC_EVERY,
            soil: SoilCalibration::new(SOIL_DRY, SOIL_WET),
        }
    }
}
