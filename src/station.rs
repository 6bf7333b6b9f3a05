//! The sampling loop body
//!
//! [`Station`] owns the DHT22 session, the sampling interval and the soil
//! calibration. The firmware calls [`Station::poll`] as fast as it likes; at
//! most one tick runs per interval and every produced line goes to `out`.

use ufmt::uWrite;

use crate::config::MonitorConfig;
use crate::health::{SensorSession, Tick};
use crate::report::{self, LineOverflow};
use crate::sensors::{Climate, SoilCalibration, Source};
use crate::timer::Interval;

/// Errors from writing station output
#[derive(Debug, PartialEq, Eq)]
pub enum Error<E> {
    /// A formatted line exceeded the line buffer
    Overflow,
    /// The serial writer failed
    Write(E),
}

impl<E> From<LineOverflow> for Error<E> {
    fn from(_: LineOverflow) -> Self {
        Error::Overflow
    }
}

#[cfg(target_os = "none")]
impl<E> defmt::Format for Error<E> {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::Overflow => defmt::write!(f, "line overflow"),
            Error::Write(_) => defmt::write!(f, "write error"),
        }
    }
}

/// What a due tick did, for the caller to log
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub enum Poll {
    Retry {
        failures: u8,
        threshold: u8,
    },
    Reading {
        climate: Climate,
        source: Source,
        soil_raw: u16,
        soil_percent: u8,
        /// The DHT22 was disabled on this tick
        tripped: bool,
        /// A diagnostic line followed the data line
        diagnostic: bool,
    },
}

pub struct Station {
    session: SensorSession,
    interval: Interval,
    soil: SoilCalibration,
    diagnostic_every: u32,
    readings: u32,
}

impl Station {
    /// Runs the startup sequence: banner, one-shot DHT22 probe, mode line.
    /// A failed probe puts the station in simulated mode from the first tick.
    /// param config: loop settings
    /// param out: serial output
    /// param probe: single DHT22 read
    pub fn start<W, F, E>(
        config: &MonitorConfig,
        out: &mut W,
        probe: F,
    ) -> Result<Station, Error<W::Error>>
    where
        W: uWrite + ?Sized,
        F: FnOnce() -> Result<Climate, E>,
    {
        for line in report::BANNER {
            send(out, line)?;
        }

        let probe = probe();
        let session = SensorSession::from_probe(config.failure_threshold, &probe);
        if session.is_healthy() {
            send(out, report::PROBE_OK)?;
        } else {
            send(out, report::PROBE_FAILED)?;
        }
        send(out, report::READY)?;

        Ok(Station {
            session,
            interval: Interval::new(config.reading_interval_ms),
            soil: config.soil,
            diagnostic_every: config.diagnostic_every,
            readings: 0,
        })
    }

    pub fn session(&self) -> &SensorSession {
        &self.session
    }

    /// Number of data lines produced so far
    pub fn readings(&self) -> u32 {
        self.readings
    }

    /// Runs one tick if the sampling interval has elapsed.
    ///
    /// `read_climate` is skipped once the DHT22 is disabled and `read_soil`
    /// is skipped on retry ticks. A failed soil conversion (`None`) is
    /// reported as the dry calibration value, so it reads as 0 %.
    /// returns None when no tick was due
    pub fn poll<W, F, E, S>(
        &mut self,
        now_ms: u64,
        out: &mut W,
        read_climate: F,
        read_soil: S,
    ) -> Result<Option<Poll>, Error<W::Error>>
    where
        W: uWrite + ?Sized,
        F: FnOnce() -> Result<Climate, E>,
        S: FnOnce() -> Option<u16>,
    {
        if !self.interval.is_due(now_ms) {
            return Ok(None);
        }

        match self.session.on_tick(now_ms, read_climate) {
            Tick::Retry {
                failures,
                threshold,
            } => {
                send(out, &report::retry_line(failures, threshold)?)?;
                Ok(Some(Poll::Retry {
                    failures,
                    threshold,
                }))
            }
            Tick::Reading {
                climate,
                source,
                tripped,
            } => {
                if tripped {
                    send(out, report::SWITCHED_TO_SIMULATION)?;
                }

                let soil_raw = read_soil().unwrap_or(self.soil.dry);
                let soil_percent = self.soil.percent(soil_raw);
                send(out, &report::data_line(&climate, soil_percent, source)?)?;

                self.readings = self.readings.wrapping_add(1);
                let diagnostic =
                    self.diagnostic_every != 0 && self.readings % self.diagnostic_every == 0;
                if diagnostic {
                    send(out, &report::diagnostic_line(soil_raw, source)?)?;
                }

                Ok(Some(Poll::Reading {
                    climate,
                    source,
                    soil_raw,
                    soil_percent,
                    tripped,
                    diagnostic,
                }))
            }
        }
    }
}

fn send<W>(out: &mut W, text: &str) -> Result<(), Error<W::Error>>
where
    W: uWrite + ?Sized,
{
    out.write_str(text).map_err(Error::Write)?;
    out.write_str(report::EOL).map_err(Error::Write)
}
