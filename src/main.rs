//! climalink firmware: main entry point.
//!
//! Hexagonal architecture with a single cooperative control loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter     LogDisplaySink   EspMqttChannel           │
//! │  (Sensor+Output)     (DisplaySink)    (SecureChannel)          │
//! │  WifiLink  NvsStore  TlsCredentials  Esp32TimeAdapter  Watchdog│
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │             DeviceService (pure logic)                 │    │
//! │  │  ConnectionSupervisor · SensorSampler                  │    │
//! │  │  StateReporter · LampController                        │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

// ── Imports ───────────────────────────────────────────────────
use anyhow::Result;
use log::{error, info, warn};

use esp_idf_hal::delay::{Delay, FreeRtos};
use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::units::Hertz;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;

use climalink::adapters::cert_store::TlsCredentials;
use climalink::adapters::device_id;
use climalink::adapters::hardware::HardwareAdapter;
use climalink::adapters::log_sink::LogDisplaySink;
use climalink::adapters::mqtt::EspMqttChannel;
use climalink::adapters::nvs::NvsStore;
use climalink::adapters::time::Esp32TimeAdapter;
use climalink::adapters::wifi::{WifiCredentials, WifiLink};
use climalink::app::service::DeviceService;
use climalink::config::SystemConfig;
use climalink::drivers::lamp::LampDriver;
use climalink::drivers::watchdog::Watchdog;
use climalink::pins;
use climalink::sensors::sht3x::{self, Sht3x};
use climalink::Error;

/// Pause between sensor probes while it is absent at boot.
const SENSOR_PROBE_RETRY_MS: u32 = 1000;

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  climalink v{}                    ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs_partition = EspDefaultNvsPartition::take()?;
    let nvs = NvsStore::new(nvs_partition.clone());

    // ── 2. Config: NVS (or defaults), then build-time overrides ─
    let config = match nvs.load_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("Stored config rejected ({}), using defaults", e);
            SystemConfig::default()
        }
    }
    .with_build_overrides();
    config.validate().map_err(Error::from)?;

    // ── 3. Lamp output, off before anything else ──────────────
    let lamp = match LampDriver::new(pins::LAMP_GPIO, config.lamp_active_low) {
        Ok(lamp) => lamp,
        Err(e) => {
            // Output init failure is critical; the watchdog is not armed
            // yet, so halt here.
            error!("Lamp init failed: {}, halting", e);
            #[allow(clippy::empty_loop)]
            loop {}
        }
    };

    // ── 4. Climate sensor: wait until it answers ──────────────
    info!(
        "I2C: SDA={} SCL={} @ {} Hz",
        pins::I2C_SDA_GPIO,
        pins::I2C_SCL_GPIO,
        pins::I2C_FREQ_HZ
    );
    let i2c = I2cDriver::new(
        peripherals.i2c0,
        peripherals.pins.gpio8,
        peripherals.pins.gpio9,
        &I2cConfig::new().baudrate(Hertz(pins::I2C_FREQ_HZ)),
    )?;
    let mut sensor = Sht3x::new(i2c, Delay::new_default(), sht3x::DEFAULT_ADDRESS);
    while let Err(e) = sensor.begin() {
        warn!("SHT3x not found ({}), retrying", e);
        FreeRtos::delay_ms(SENSOR_PROBE_RETRY_MS);
    }

    let mut hw = HardwareAdapter::new(sensor, lamp);
    let mut display = LogDisplaySink::new(config.locale);
    let clock = Esp32TimeAdapter::new();

    // ── 5. Device identity + app service ──────────────────────
    let client_id = device_id::resolve_client_id(&config.client_id, &device_id::read_mac());
    info!("Client ID: {}", client_id);

    let mut service = DeviceService::new(&config, &client_id, clock.now_ms()).map_err(Error::from)?;
    service.start(&mut hw, &mut display);

    // ── 6. Network + secure channel ───────────────────────────
    let wifi_credentials = WifiCredentials::from_build_env().map_err(|e| {
        error!("Wi-Fi credentials unusable: {}", e);
        Error::Init("wifi credentials")
    })?;
    let mut wifi = WifiLink::new(peripherals.modem, sysloop, nvs_partition, wifi_credentials)?;
    wifi.join();

    let credentials = TlsCredentials::load(&nvs).map_err(|e| {
        error!("TLS credentials unusable: {}", e);
        Error::Init("tls credentials")
    })?;
    let mut channel = EspMqttChannel::new(&config, credentials);
    info!("Broker: {}", config.broker_url());

    let watchdog = Watchdog::new(config.watchdog_timeout_ms);
    info!("System ready. Entering control loop.");

    // ── 7. Control loop ───────────────────────────────────────
    loop {
        let now = clock.now_ms();
        wifi.maintain(now);
        service.run_iteration(now, &mut hw, &mut channel, &mut display);

        watchdog.feed();
        FreeRtos::delay_ms(config.loop_interval_ms);
    }
}
