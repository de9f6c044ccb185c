//! System configuration parameters
//!
//! All tunable parameters for the climalink device.  Defaults match the
//! ATD3.5-S3 board wiring and the AWS IoT topic layout.  Endpoint and
//! client id can be overridden at build time (the firmware has no
//! filesystem); see [`SystemConfig::with_build_overrides`].

use serde::{Deserialize, Serialize};

use crate::app::lamp::LampState;
use crate::app::ports::ConfigError;

/// Reconnect pacing for the connection supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReconnectPolicy {
    /// Retry on every loop iteration while disconnected.
    Immediate,
    /// Exponential backoff: wait `initial_ms`, doubling after each failure
    /// up to `max_ms`.  Reset on a successful connect.
    Backoff { initial_ms: u64, max_ms: u64 },
}

impl ReconnectPolicy {
    pub fn initial_delay_ms(self) -> u64 {
        match self {
            Self::Immediate => 0,
            Self::Backoff { initial_ms, .. } => initial_ms,
        }
    }
}

/// Language of the on-screen lamp label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Locale {
    Thai,
    English,
}

impl Locale {
    pub fn lamp_label(self, state: LampState) -> &'static str {
        match (self, state) {
            (Self::Thai, LampState::On) => "เปิด",
            (Self::Thai, LampState::Off) => "ปิด",
            (Self::English, LampState::On) => "on",
            (Self::English, LampState::Off) => "off",
        }
    }
}

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Timing ---
    /// Sensor sampling period (milliseconds)
    pub sample_interval_ms: u32,
    /// Idle delay at the end of each loop iteration (milliseconds)
    pub loop_interval_ms: u32,
    /// Task watchdog timeout (milliseconds)
    pub watchdog_timeout_ms: u32,

    // --- Broker ---
    /// MQTT-over-TLS endpoint host
    pub broker_host: String,
    /// MQTT-over-TLS port
    pub broker_port: u16,
    /// MQTT client id; empty means "derive from factory MAC"
    pub client_id: String,
    /// MQTT keep-alive (seconds)
    pub keep_alive_secs: u16,
    /// Upper bound on one connect attempt (milliseconds)
    pub connect_timeout_ms: u32,
    /// Reconnect pacing
    pub reconnect: ReconnectPolicy,

    // --- Topics ---
    /// Outbound telemetry topic
    pub telemetry_topic: String,
    /// Inbound lamp command topic
    pub command_topic: String,

    // --- Lamp ---
    /// Lamp lights when its GPIO is driven LOW
    pub lamp_active_low: bool,

    // --- Display ---
    pub locale: Locale,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            // Timing
            sample_interval_ms: 5000,
            loop_interval_ms: 5,
            watchdog_timeout_ms: 10_000,

            // Broker
            broker_host: "example-ats.iot.ap-southeast-1.amazonaws.com".into(),
            broker_port: 8883,
            client_id: String::new(),
            keep_alive_secs: 15,
            connect_timeout_ms: 5000,
            reconnect: ReconnectPolicy::Immediate,

            // Topics
            telemetry_topic: "ATD3.5-S3/sensor".into(),
            command_topic: "ATD3.5-S3/led".into(),

            // Lamp
            lamp_active_low: crate::pins::LAMP_ACTIVE_LOW,

            // Display
            locale: Locale::Thai,
        }
    }
}

impl SystemConfig {
    /// Apply `CLIMALINK_ENDPOINT` / `CLIMALINK_CLIENT_ID` captured at build time.
    pub fn with_build_overrides(mut self) -> Self {
        if let Some(host) = option_env!("CLIMALINK_ENDPOINT") {
            self.broker_host = host.into();
        }
        if let Some(id) = option_env!("CLIMALINK_CLIENT_ID") {
            self.client_id = id.into();
        }
        self
    }

    /// `mqtts://host:port` for the client library.
    pub fn broker_url(&self) -> String {
        format!("mqtts://{}:{}", self.broker_host, self.broker_port)
    }

    /// Reject values that would wedge the loop or address the wrong topics.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_interval_ms == 0 {
            return Err(ConfigError::ValidationFailed("sample_interval_ms must be non-zero"));
        }
        if self.loop_interval_ms == 0 {
            return Err(ConfigError::ValidationFailed("loop_interval_ms must be non-zero"));
        }
        if self.watchdog_timeout_ms <= self.loop_interval_ms {
            return Err(ConfigError::ValidationFailed(
                "watchdog_timeout_ms must exceed loop_interval_ms",
            ));
        }
        if self.broker_host.is_empty() {
            return Err(ConfigError::ValidationFailed("broker_host must not be empty"));
        }
        if self.broker_port == 0 {
            return Err(ConfigError::ValidationFailed("broker_port must be non-zero"));
        }
        if self.keep_alive_secs == 0 {
            return Err(ConfigError::ValidationFailed("keep_alive_secs must be non-zero"));
        }
        if self.connect_timeout_ms == 0 {
            return Err(ConfigError::ValidationFailed("connect_timeout_ms must be non-zero"));
        }
        validate_topic(&self.telemetry_topic, "telemetry_topic must be a concrete topic")?;
        validate_topic(&self.command_topic, "command_topic must be a concrete topic")?;
        if let ReconnectPolicy::Backoff { initial_ms, max_ms } = self.reconnect {
            if initial_ms == 0 || max_ms < initial_ms {
                return Err(ConfigError::ValidationFailed(
                    "backoff needs 0 < initial_ms <= max_ms",
                ));
            }
        }
        Ok(())
    }
}

/// Non-empty, no MQTT wildcards, no NUL.
fn validate_topic(topic: &str, reason: &'static str) -> Result<(), ConfigError> {
    if topic.is_empty() || topic.contains(['#', '+', '\0']) {
        return Err(ConfigError::ValidationFailed(reason));
    }
    Ok(())
}
