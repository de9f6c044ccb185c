//! Lamp output driver.
//!
//! Translates the logical lamp state into a pin level.  The ATD3.5-S3
//! yellow LED is wired active-low: ON drives the pin LOW.

use log::debug;

use super::hw_init::{self, HwInitError};

pub struct LampDriver {
    gpio: i32,
    active_low: bool,
    on: bool,
}

impl LampDriver {
    /// Configure the pin and drive it to the OFF level before returning.
    pub fn new(gpio: i32, active_low: bool) -> Result<Self, HwInitError> {
        hw_init::init_output(gpio, Self::level(false, active_low))?;
        Ok(Self {
            gpio,
            active_low,
            on: false,
        })
    }

    /// Pin level that realises `on` under the given polarity.
    pub fn level(on: bool, active_low: bool) -> bool {
        on != active_low
    }

    pub fn set(&mut self, on: bool) {
        let high = Self::level(on, self.active_low);
        hw_init::gpio_write(self.gpio, high);
        self.on = on;
        debug!("Lamp: GPIO {} -> {}", self.gpio, if high { "HIGH" } else { "LOW" });
    }

    pub fn is_on(&self) -> bool {
        self.on
    }

    pub fn gpio(&self) -> i32 {
        self.gpio
    }
}

#[cfg(all(test, not(target_os = "espidf")))]
mod tests {
    use super::*;

    #[test]
    fn polarity_table() {
        assert!(!LampDriver::level(true, true));
        assert!(LampDriver::level(false, true));
        assert!(LampDriver::level(true, false));
        assert!(!LampDriver::level(false, false));
    }

    #[test]
    fn active_low_starts_high_and_pulls_low_when_on() {
        let mut lamp = LampDriver::new(41, true).unwrap();
        assert!(hw_init::sim_level(41));
        assert!(!lamp.is_on());

        lamp.set(true);
        assert!(!hw_init::sim_level(41));
        assert!(lamp.is_on());

        lamp.set(false);
        assert!(hw_init::sim_level(41));
    }

    #[test]
    fn active_high_follows_state() {
        let mut lamp = LampDriver::new(42, false).unwrap();
        assert!(!hw_init::sim_level(42));
        lamp.set(true);
        assert!(hw_init::sim_level(42));
    }
}
