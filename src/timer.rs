/// Gates work to a fixed period measured against a free-running millisecond clock
pub struct Interval {
    period_ms: u64,
    last_ms: u64,
}

impl Interval {
    /// The first period is counted from boot (t = 0)
    pub fn new(period_ms: u64) -> Interval {
        Self {
            period_ms,
            last_ms: 0,
        }
    }

    /// Checks if a full period has elapsed since the last due tick
    /// If so, `now_ms` becomes the start of the next period
    /// param now_ms: current uptime in milliseconds
    pub fn is_due(&mut self, now_ms: u64) -> bool {
        // wrapping: a clock wrap must not stall sampling
        if now_ms.wrapping_sub(self.last_ms) >= self.period_ms {
            self.last_ms = now_ms;
            true
        } else {
            false
        }
    }
}
