//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements         | Connects to                 |
//! |----------------|--------------------|-----------------------------|
//! | `hardware`     | SensorPort         | SHT3x over I2C              |
//! |                | OutputPort         | Lamp GPIO                   |
//! | `log_sink`     | DisplaySink        | Serial log output           |
//! | `mqtt`         | SecureChannel      | esp-mqtt over TLS / loopback|
//! | `cert_store`   | n/a                | Build env / NVS `certs`     |
//! | `nvs`          | n/a                | NVS config + blob store     |
//! | `wifi`         | n/a                | ESP-IDF WiFi STA            |
//! | `time`         | n/a                | ESP32 system timer          |
//! | `device_id`    | n/a                | eFuse factory MAC           |

pub mod cert_store;
pub mod device_id;
pub mod hardware;
pub mod log_sink;
pub mod mqtt;
pub mod nvs;
pub mod time;
pub mod wifi;
