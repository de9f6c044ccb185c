//! Application core: pure domain logic, zero I/O.
//!
//! This module contains the device rules: connection supervision,
//! periodic sampling, telemetry reporting, and lamp control.  All
//! interaction with hardware and the network happens through **port
//! traits** defined in [`ports`], keeping this layer fully testable
//! without real peripherals.

pub mod commands;
pub mod events;
pub mod lamp;
pub mod ports;
pub mod reporter;
pub mod sampler;
pub mod service;
pub mod supervisor;
