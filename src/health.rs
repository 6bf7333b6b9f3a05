//! DHT22 health tracking
//!
//! A [`SensorSession`] decides on every tick whether the DHT22 is trusted.
//! Transient read errors are retried silently; once `failure_threshold`
//! consecutive reads fail the sensor is disabled for the rest of the run and
//! simulated values take its place. There is no re-probing.

use crate::sensors::{simulated_climate, Climate, Source};

/// Outcome of one sampling tick
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub enum Tick {
    /// The read failed but the threshold is not reached yet; no data this tick
    Retry { failures: u8, threshold: u8 },
    /// A data line must be produced from `climate`
    Reading {
        climate: Climate,
        source: Source,
        /// Set only on the tick that disabled the sensor
        tripped: bool,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub struct SensorSession {
    healthy: bool,
    consecutive_failures: u8,
    failure_threshold: u8,
}

impl SensorSession {
    /// Starts with a trusted sensor
    /// param failure_threshold: failures tolerated before the sensor is disabled (at least 1)
    pub fn new(failure_threshold: u8) -> Self {
        Self {
            healthy: true,
            consecutive_failures: 0,
            failure_threshold: failure_threshold.max(1),
        }
    }

    /// Starts from the result of the one-shot startup probe.
    /// A failed probe disables the sensor right away.
    pub fn from_probe<E>(failure_threshold: u8, probe: &Result<Climate, E>) -> Self {
        let mut session = Self::new(failure_threshold);
        session.healthy = probe.is_ok();
        session
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy
    }

    pub fn consecutive_failures(&self) -> u8 {
        self.consecutive_failures
    }

    pub fn failure_threshold(&self) -> u8 {
        self.failure_threshold
    }

    /// Source of the values the next reading will carry
    pub fn source(&self) -> Source {
        if self.healthy {
            Source::Real
        } else {
            Source::Simulated
        }
    }

    /// Advances the session by one tick.
    ///
    /// `read` is only called while the sensor is trusted. A failed read below
    /// the threshold yields [`Tick::Retry`]; reaching the threshold disables
    /// the sensor and falls through to simulated values for this same tick.
    pub fn on_tick<F, E>(&mut self, uptime_ms: u64, read: F) -> Tick
    where
        F: FnOnce() -> Result<Climate, E>,
    {
        let mut tripped = false;

        if self.healthy {
            match read() {
                Ok(climate) => {
                    self.consecutive_failures = 0;
                    return Tick::Reading {
                        climate,
                        source: Source::Real,
                        tripped: false,
                    };
                }
                Err(_) => {
                    self.consecutive_failures += 1;
                    if self.consecutive_failures < self.failure_threshold {
                        return Tick::Retry {
                            failures: self.consecutive_failures,
                            threshold: self.failure_threshold,
                        };
                    }

                    self.healthy = false;
                    self.consecutive_failures = 0;
                    tripped = true;
                }
            }
        }

        Tick::Reading {
            climate: simulated_climate(uptime_ms),
            source: Source::Simulated,
            tripped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::Tenths;

    const GOOD: Climate = Climate {
        temperature: Tenths(245),
        humidity: Tenths(652),
    };

    fn ok() -> Result<Climate, ()> {
        Ok(GOOD)
    }

    fn fail() -> Result<Climate, ()> {
        Err(())
    }

    #[test]
    fn good_read_is_real() {
        let mut session = SensorSession::new(5);
        assert_eq!(
            session.on_tick(3_000, ok),
            Tick::Reading {
                climate: GOOD,
                source: Source::Real,
                tripped: false,
            }
        );
        assert!(session.is_healthy());
    }

    #[test]
    fn five_failures_switch_to_simulation() {
        let mut session = SensorSession::new(5);

        for attempt in 1..5 {
            assert_eq!(
                session.on_tick(0, fail),
                Tick::Retry {
                    failures: attempt,
                    threshold: 5,
                }
            );
            assert!(session.is_healthy());
        }

        match session.on_tick(3_042, fail) {
            Tick::Reading {
                climate,
                source,
                tripped,
            } => {
                assert_eq!(source, Source::Simulated);
                assert!(tripped);
                assert_eq!(climate, simulated_climate(3_042));
            }
            tick => panic!("unexpected {:?}", tick),
        }
        assert!(!session.is_healthy());
        assert_eq!(session.consecutive_failures(), 0);
    }

    #[test]
    fn degradation_is_permanent() {
        let mut session = SensorSession::new(2);
        session.on_tick(0, fail);
        session.on_tick(0, fail);
        assert!(!session.is_healthy());

        for uptime_ms in 0..50 {
            let tick = session.on_tick(uptime_ms, || -> Result<Climate, ()> {
                panic!("sensor must not be read once disabled")
            });
            assert_eq!(
                tick,
                Tick::Reading {
                    climate: simulated_climate(uptime_ms),
                    source: Source::Simulated,
                    tripped: false,
                }
            );
        }
        assert!(!session.is_healthy());
    }

    #[test]
    fn success_resets_failures() {
        let mut session = SensorSession::new(5);
        session.on_tick(0, fail);
        session.on_tick(0, fail);
        session.on_tick(0, fail);
        assert_eq!(session.consecutive_failures(), 3);

        session.on_tick(0, ok);
        assert_eq!(session.consecutive_failures(), 0);

        // a fresh run of four failures is still tolerated
        for _ in 0..4 {
            assert!(matches!(session.on_tick(0, fail), Tick::Retry { .. }));
        }
        assert!(session.is_healthy());
    }

    #[test]
    fn failures_never_exceed_threshold() {
        // deterministic mix of good and bad reads
        let mut session = SensorSession::new(5);
        let mut state: u32 = 0x1234_5678;
        for uptime_ms in 0..2_000u64 {
            state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            let good = state & 0x300 == 0;
            session.on_tick(uptime_ms, || if good { ok() } else { fail() });
            assert!(session.consecutive_failures() <= session.failure_threshold());
        }
    }

    #[test]
    fn failed_probe_starts_degraded() {
        let mut session = SensorSession::from_probe(5, &fail());
        assert!(!session.is_healthy());
        assert_eq!(session.source(), Source::Simulated);
        assert!(matches!(
            session.on_tick(0, ok),
            Tick::Reading {
                source: Source::Simulated,
                tripped: false,
                ..
            }
        ));

        let session = SensorSession::from_probe(5, &ok());
        assert!(session.is_healthy());
        assert_eq!(session.source(), Source::Real);
    }

    #[test]
    fn zero_threshold_behaves_like_one() {
        let mut session = SensorSession::new(0);
        assert_eq!(session.failure_threshold(), 1);
        assert!(matches!(
            session.on_tick(0, fail),
            Tick::Reading { tripped: true, .. }
        ));
    }
}
