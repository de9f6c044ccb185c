//! Sensor sampler: one reading per elapsed period.
//!
//! A failed read produces no reading for that tick.  The next tick is
//! scheduled as usual; failed ticks are never retried or made up.

use log::warn;

use super::ports::{Measurement, SensorPort};
use crate::scheduler::{Millis, PeriodicTimer};

/// Opaque monotonic stamp of the tick that produced a reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Tick(Millis);

impl Tick {
    pub fn as_millis(self) -> Millis {
        self.0
    }
}

/// One sampled reading, truncated to whole units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorReading {
    pub temperature: i32,
    pub humidity: i32,
    pub timestamp: Tick,
}

impl SensorReading {
    /// Truncate a raw measurement toward zero (24.7 → 24, -0.5 → 0).
    pub fn from_measurement(m: Measurement, at: Millis) -> Self {
        Self {
            temperature: m.temperature_c as i32,
            humidity: m.humidity_pct as i32,
            timestamp: Tick(at),
        }
    }
}

/// Owns the sampling schedule.
pub struct SensorSampler {
    timer: PeriodicTimer,
    failures: u32,
    last: Option<SensorReading>,
}

impl SensorSampler {
    pub fn new(period_ms: Millis, now: Millis) -> Self {
        Self {
            timer: PeriodicTimer::new("sensor", period_ms, now),
            failures: 0,
            last: None,
        }
    }

    /// Read the sensor if a period has elapsed.
    ///
    /// Returns `None` when the tick is not due or the read failed.
    pub fn poll(&mut self, now: Millis, sensor: &mut impl SensorPort) -> Option<SensorReading> {
        if !self.timer.poll(now) {
            return None;
        }
        match sensor.measure() {
            Ok(m) => {
                let reading = SensorReading::from_measurement(m, now);
                self.last = Some(reading);
                Some(reading)
            }
            Err(e) => {
                self.failures = self.failures.wrapping_add(1);
                warn!("Sampler: read failed ({}), skipping tick", e);
                None
            }
        }
    }

    /// Failed reads since boot.
    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Most recent successful reading.
    pub fn last_reading(&self) -> Option<SensorReading> {
        self.last
    }

    pub fn timer(&self) -> &PeriodicTimer {
        &self.timer
    }
}
