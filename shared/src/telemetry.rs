use std::time::{Duration, Instant};

/// Wall-clock timer for one pipeline stage.
pub struct Telemetry {
    start: Instant,
}

impl Telemetry {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.start.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    /// Elapsed milliseconds since the last restart, then restart.
    pub fn lap_ms(&mut self) -> u64 {
        let elapsed = self.elapsed_ms();
        self.start = Instant::now();
        elapsed
    }
}

impl Default for Telemetry {
    fn default() -> Self {
        Self::new()
    }
}
