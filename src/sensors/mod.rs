//! Sensor drivers.
//!
//! Each driver implements [`SensorPort`](crate::app::ports::SensorPort)
//! directly, so the domain core samples it without an intermediate hub.

pub mod sht3x;

pub use sht3x::Sht3x;
