//! Sensirion SHT3x temperature / humidity sensor (I2C).
//!
//! Single-shot, high-repeatability measurements without clock stretching.
//! Each 16-bit word on the wire is followed by a CRC-8 (poly 0x31,
//! init 0xFF); frames with a bad CRC are rejected rather than reported.
//!
//! Conversion (datasheet §4.13):
//!
//! ```text
//!   T  = -45 + 175 · raw / 65535   [°C]
//!   RH = 100 · raw / 65535         [%]
//! ```
//!
//! Generic over `embedded-hal` 1.0 `I2c` and `DelayNs`, so the same driver
//! runs on the ESP-IDF I2C master and on a host-side mock bus.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use log::info;

use crate::app::ports::{Measurement, SensorError, SensorPort};

/// ADDR pin low.
pub const DEFAULT_ADDRESS: u8 = 0x44;
/// ADDR pin high.
pub const ALT_ADDRESS: u8 = 0x45;

const CMD_SOFT_RESET: [u8; 2] = [0x30, 0xA2];
const CMD_READ_STATUS: [u8; 2] = [0xF3, 0x2D];
const CMD_MEASURE_HIGH: [u8; 2] = [0x24, 0x00];

/// Max reset time is 1.5 ms.
const RESET_DELAY_MS: u32 = 2;
/// Max high-repeatability measurement time is 15.5 ms.
const MEASURE_DELAY_MS: u32 = 16;

/// CRC-8 over one data word as specified by Sensirion.
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc: u8 = 0xFF;
    for &byte in data {
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ 0x31
            } else {
                crc << 1
            };
        }
    }
    crc
}

pub fn raw_to_celsius(raw: u16) -> f32 {
    -45.0 + 175.0 * f32::from(raw) / 65535.0
}

pub fn raw_to_humidity(raw: u16) -> f32 {
    100.0 * f32::from(raw) / 65535.0
}

fn checked_word(chunk: &[u8]) -> Result<u16, SensorError> {
    if crc8(&chunk[..2]) != chunk[2] {
        return Err(SensorError::Crc);
    }
    Ok(u16::from_be_bytes([chunk[0], chunk[1]]))
}

pub struct Sht3x<I2C, D> {
    i2c: I2C,
    delay: D,
    address: u8,
}

impl<I2C: I2c, D: DelayNs> Sht3x<I2C, D> {
    pub fn new(i2c: I2C, delay: D, address: u8) -> Self {
        Self { i2c, delay, address }
    }

    /// Probe the sensor: soft reset, then read the status register.
    ///
    /// Fails while the sensor is absent or not answering.
    pub fn begin(&mut self) -> Result<u16, SensorError> {
        self.i2c
            .write(self.address, &CMD_SOFT_RESET)
            .map_err(|_| SensorError::NotResponding)?;
        self.delay.delay_ms(RESET_DELAY_MS);

        let mut buf = [0u8; 3];
        self.i2c
            .write_read(self.address, &CMD_READ_STATUS, &mut buf)
            .map_err(|_| SensorError::Bus)?;
        let status = checked_word(&buf)?;
        info!("SHT3x: found at 0x{:02X} (status=0x{:04X})", self.address, status);
        Ok(status)
    }

    /// One blocking single-shot measurement (~16 ms).
    pub fn read(&mut self) -> Result<Measurement, SensorError> {
        self.i2c
            .write(self.address, &CMD_MEASURE_HIGH)
            .map_err(|_| SensorError::Bus)?;
        self.delay.delay_ms(MEASURE_DELAY_MS);

        let mut frame = [0u8; 6];
        self.i2c
            .read(self.address, &mut frame)
            .map_err(|_| SensorError::NotResponding)?;

        let t_raw = checked_word(&frame[0..3])?;
        let rh_raw = checked_word(&frame[3..6])?;
        Ok(Measurement {
            temperature_c: raw_to_celsius(t_raw),
            humidity_pct: raw_to_humidity(rh_raw),
        })
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    /// Give the bus and delay back (e.g. to share the bus after probing).
    pub fn release(self) -> (I2C, D) {
        (self.i2c, self.delay)
    }
}

impl<I2C: I2c, D: DelayNs> SensorPort for Sht3x<I2C, D> {
    fn measure(&mut self) -> Result<Measurement, SensorError> {
        self.read()
    }
}
