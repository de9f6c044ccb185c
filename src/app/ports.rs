//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ DeviceService (domain)
//! ```
//!
//! Driven adapters (climate sensor, lamp output, display, secure channel)
//! implement these traits.  The [`DeviceService`](super::service::DeviceService)
//! consumes them via generics, so the domain core never touches hardware
//! or sockets directly.
//!
//! All port errors are typed and `Copy`; none of them is fatal inside the
//! control loop.

use core::fmt;

use super::events::DisplayEvent;

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// One raw physical measurement, before truncation to integers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    pub temperature_c: f32,
    pub humidity_pct: f32,
}

/// Read-side port: the domain calls this once per sampling tick.
pub trait SensorPort {
    /// Perform one synchronous, bounded-time measurement.
    fn measure(&mut self) -> Result<Measurement, SensorError>;
}

// ───────────────────────────────────────────────────────────────
// Output port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port for the lamp.
///
/// `on` is the logical state; the adapter owns pin polarity.
pub trait OutputPort {
    fn set_lamp(&mut self, on: bool);
}

// ───────────────────────────────────────────────────────────────
// Display sink (driven adapter: domain → GUI)
// ───────────────────────────────────────────────────────────────

/// The external GUI collaborator.
///
/// Receives state-change notifications and renders them.  `service` is the
/// bounded per-iteration GUI step (LVGL timer handler on the device); the
/// default does nothing.
pub trait DisplaySink {
    fn notify(&mut self, event: &DisplayEvent);

    fn service(&mut self) {}
}

// ───────────────────────────────────────────────────────────────
// Secure channel (driven adapter: domain ↔ broker)
// ───────────────────────────────────────────────────────────────

/// A message delivered on a subscribed topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

impl InboundMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

/// Result of one [`SecureChannel::service`] step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceOutcome {
    /// At most one inbound message per step.
    pub message: Option<InboundMessage>,
    /// Whether the session is currently usable.
    pub alive: bool,
}

impl ServiceOutcome {
    pub fn dead() -> Self {
        Self {
            message: None,
            alive: false,
        }
    }

    pub fn idle() -> Self {
        Self {
            message: None,
            alive: true,
        }
    }

    pub fn delivered(message: InboundMessage) -> Self {
        Self {
            message: Some(message),
            alive: true,
        }
    }
}

/// Authenticated, encrypted publish/subscribe session to one endpoint.
///
/// Implementations must keep every call bounded in time: `service` in
/// particular is called once per loop iteration and must never block on
/// the network.
pub trait SecureChannel {
    /// Open a fresh session (TLS handshake + broker CONNECT).
    fn connect(&mut self, client_id: &str) -> Result<(), ChannelError>;

    /// Publish at QoS 0.  Fails with [`ChannelError::NotConnected`] when the
    /// session is down.
    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), ChannelError>;

    /// Subscribe at QoS 0.
    fn subscribe(&mut self, topic: &str) -> Result<(), ChannelError>;

    /// Deliver at most one pending message and report liveness.
    fn service(&mut self) -> ServiceOutcome;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`SensorPort`] reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// I2C transaction failed (NACK, arbitration loss, bus fault).
    Bus,
    /// The measurement frame failed its CRC check.
    Crc,
    /// The sensor did not answer within its measurement window.
    NotResponding,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bus => write!(f, "I2C bus error"),
            Self::Crc => write!(f, "CRC mismatch"),
            Self::NotResponding => write!(f, "sensor not responding"),
        }
    }
}

/// Errors from [`SecureChannel`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelError {
    /// Operation requires an established session.
    NotConnected,
    /// TLS handshake or broker authentication failed.
    Handshake,
    /// The endpoint did not answer within the connect timeout.
    Timeout,
    /// The broker or client library refused the request.
    Rejected,
    /// Socket-level failure.
    Io,
}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConnected => write!(f, "not connected"),
            Self::Handshake => write!(f, "TLS/auth handshake failed"),
            Self::Timeout => write!(f, "endpoint timed out"),
            Self::Rejected => write!(f, "request rejected"),
            Self::Io => write!(f, "socket I/O error"),
        }
    }
}

/// Errors from configuration validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// A stored config could not be decoded.
    Corrupted,
    /// The backing store could not be read or written.
    IoError,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::Corrupted => write!(f, "stored config corrupted"),
            Self::IoError => write!(f, "config storage I/O error"),
        }
    }
}
