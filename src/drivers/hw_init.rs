//! One-shot GPIO initialization and raw pin writes.
//!
//! Uses raw ESP-IDF sys calls.  Called once from `main()` before the
//! control loop starts.  On the host the pin levels are kept in a
//! simulated register so drivers can be exercised in tests.

#[cfg(target_os = "espidf")]
use esp_idf_sys::*;

#[cfg(target_os = "espidf")]
use log::info;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    GpioConfigFailed(i32),
    InvalidPin(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
            Self::InvalidPin(pin) => write!(f, "GPIO {} out of range", pin),
        }
    }
}

/// ESP32-S3 exposes GPIO 0..=48.
const MAX_GPIO: i32 = 48;

fn check_pin(pin: i32) -> Result<(), HwInitError> {
    if (0..=MAX_GPIO).contains(&pin) {
        Ok(())
    } else {
        Err(HwInitError::InvalidPin(pin))
    }
}

// ── GPIO Outputs ──────────────────────────────────────────────

/// Configure `pin` as a push-pull output and drive it to `initial_high`.
#[cfg(target_os = "espidf")]
pub fn init_output(pin: i32, initial_high: bool) -> Result<(), HwInitError> {
    check_pin(pin)?;
    let cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pin,
        mode: gpio_mode_t_GPIO_MODE_OUTPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    // SAFETY: called from the single-threaded init path in main().
    let ret = unsafe { gpio_config(&cfg) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::GpioConfigFailed(ret));
    }
    gpio_write(pin, initial_high);
    info!("hw_init: GPIO {} output (initial {})", pin, if initial_high { "HIGH" } else { "LOW" });
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_output(pin: i32, initial_high: bool) -> Result<(), HwInitError> {
    check_pin(pin)?;
    gpio_write(pin, initial_high);
    log::info!("hw_init(sim): GPIO {} output", pin);
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_write(pin: i32, high: bool) {
    // SAFETY: gpio_set_level writes to an already-configured output pin;
    // main-loop only.
    unsafe {
        gpio_set_level(pin, if high { 1 } else { 0 });
    }
}

// ── Host simulation ───────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
static SIM_LEVELS: core::sync::atomic::AtomicU64 = core::sync::atomic::AtomicU64::new(0);

#[cfg(not(target_os = "espidf"))]
pub fn gpio_write(pin: i32, high: bool) {
    use core::sync::atomic::Ordering;

    if check_pin(pin).is_err() {
        return;
    }
    let bit = 1u64 << pin;
    if high {
        SIM_LEVELS.fetch_or(bit, Ordering::Relaxed);
    } else {
        SIM_LEVELS.fetch_and(!bit, Ordering::Relaxed);
    }
}

/// Last level written to `pin` in the simulated register.
#[cfg(not(target_os = "espidf"))]
pub fn sim_level(pin: i32) -> bool {
    use core::sync::atomic::Ordering;

    check_pin(pin).is_ok() && SIM_LEVELS.load(Ordering::Relaxed) & (1u64 << pin) != 0
}
