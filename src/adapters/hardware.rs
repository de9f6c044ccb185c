//! Hardware adapter: bridges real peripherals to domain port traits.
//!
//! Owns the climate sensor and the lamp driver, exposing them through
//! [`SensorPort`] and [`OutputPort`] as one value so the service can take
//! both with a single mutable borrow.  On non-espidf targets the lamp
//! driver writes to the simulated GPIO register.

use crate::app::ports::{Measurement, OutputPort, SensorError, SensorPort};
use crate::drivers::lamp::LampDriver;

/// Concrete adapter that combines the board hardware behind port traits.
pub struct HardwareAdapter<S> {
    sensor: S,
    lamp: LampDriver,
}

impl<S: SensorPort> HardwareAdapter<S> {
    pub fn new(sensor: S, lamp: LampDriver) -> Self {
        Self { sensor, lamp }
    }

    pub fn lamp(&self) -> &LampDriver {
        &self.lamp
    }
}

// ── SensorPort implementation ─────────────────────────────────

impl<S: SensorPort> SensorPort for HardwareAdapter<S> {
    fn measure(&mut self) -> Result<Measurement, SensorError> {
        self.sensor.measure()
    }
}

// ── OutputPort implementation ─────────────────────────────────

impl<S: SensorPort> OutputPort for HardwareAdapter<S> {
    fn set_lamp(&mut self, on: bool) {
        self.lamp.set(on);
    }
}
