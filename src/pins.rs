//! GPIO / peripheral pin assignments for the ATD3.5-S3 board.
//!
//! Single source of truth for pin numbers.  The I2C pins are also taken
//! as typed `esp-idf-hal` pins in `main()`; keep the two in step.

// ---------------------------------------------------------------------------
// Lamp (yellow LED, LED_Y)
// ---------------------------------------------------------------------------

/// Digital output driving the lamp.
pub const LAMP_GPIO: i32 = 5;
/// The lamp lights when the pin is LOW.
pub const LAMP_ACTIVE_LOW: bool = true;

// ---------------------------------------------------------------------------
// I2C bus (Grove connector): SHT3x climate sensor
// ---------------------------------------------------------------------------

pub const I2C_SDA_GPIO: i32 = 8;
pub const I2C_SCL_GPIO: i32 = 9;
/// Standard-mode bus clock.
pub const I2C_FREQ_HZ: u32 = 100_000;
