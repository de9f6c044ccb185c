//! WiFi station-mode adapter.
//!
//! The secure channel needs an IP link underneath it.  [`WifiLink`]
//! associates once at boot (blocking, retried every 500 ms until it
//! succeeds) and afterwards is kept up from the control loop by
//! [`WifiLink::maintain`], which never blocks longer than one attempt.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: real ESP-IDF WiFi driver via `esp_idf_svc::wifi`.
//! - **all other targets**: simulation stubs with scriptable failures.
//!
//! ## Reconnection policy
//!
//! After a lost association the adapter waits an exponential backoff
//! (2 s → 4 s → 8 s … capped at 60 s) between attempts.

use core::fmt;
use log::{info, warn};

use crate::scheduler::Millis;

#[cfg(target_os = "espidf")]
use esp_idf_hal::modem::Modem;
#[cfg(target_os = "espidf")]
use esp_idf_svc::{
    eventloop::EspSystemEventLoop,
    nvs::EspDefaultNvsPartition,
    wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi},
};

// ───────────────────────────────────────────────────────────────
// Errors
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityError {
    NoCredentials,
    InvalidSsid,
    InvalidPassword,
    DriverInit,
    ConnectionFailed,
}

impl fmt::Display for ConnectivityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredentials => write!(f, "no WiFi credentials configured"),
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => write!(f, "password invalid (must be 8-64 bytes for WPA2, or empty for open)"),
            Self::DriverInit => write!(f, "WiFi driver init failed"),
            Self::ConnectionFailed => write!(f, "WiFi connection failed"),
        }
    }
}

impl std::error::Error for ConnectivityError {}

// ───────────────────────────────────────────────────────────────
// Credentials
// ───────────────────────────────────────────────────────────────

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

/// Validated station credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WifiCredentials {
    ssid: heapless::String<32>,
    password: heapless::String<64>,
}

impl WifiCredentials {
    pub fn new(ssid: &str, password: &str) -> Result<Self, ConnectivityError> {
        if ssid.is_empty() || !is_printable_ascii(ssid) {
            return Err(ConnectivityError::InvalidSsid);
        }
        if !password.is_empty() && (password.len() < 8 || password.len() > 64) {
            return Err(ConnectivityError::InvalidPassword);
        }
        let mut creds = Self {
            ssid: heapless::String::new(),
            password: heapless::String::new(),
        };
        creds
            .ssid
            .push_str(ssid)
            .map_err(|_| ConnectivityError::InvalidSsid)?;
        creds
            .password
            .push_str(password)
            .map_err(|_| ConnectivityError::InvalidPassword)?;
        Ok(creds)
    }

    /// `CLIMALINK_WIFI_SSID` / `CLIMALINK_WIFI_PASSWORD` captured at build time.
    pub fn from_build_env() -> Result<Self, ConnectivityError> {
        let ssid = option_env!("CLIMALINK_WIFI_SSID").ok_or(ConnectivityError::NoCredentials)?;
        Self::new(ssid, option_env!("CLIMALINK_WIFI_PASSWORD").unwrap_or(""))
    }

    pub fn ssid(&self) -> &str {
        &self.ssid
    }

    pub fn is_open(&self) -> bool {
        self.password.is_empty()
    }
}

// ───────────────────────────────────────────────────────────────
// Link state
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiState {
    Disconnected,
    Connected,
    Reconnecting { attempt: u32 },
}

const INITIAL_BACKOFF_SECS: u32 = 2;
const MAX_BACKOFF_SECS: u32 = 60;
/// Boot-time association retry period.
const JOIN_RETRY_MS: u32 = 500;

pub struct WifiLink {
    state: WifiState,
    credentials: WifiCredentials,
    backoff_secs: u32,
    next_attempt_at: Millis,
    #[cfg(target_os = "espidf")]
    wifi: BlockingWifi<EspWifi<'static>>,
    /// Simulation: association currently up.
    #[cfg(not(target_os = "espidf"))]
    sim_up: bool,
    /// Simulation: attempts still scripted to fail.
    #[cfg(not(target_os = "espidf"))]
    sim_failing: u32,
}

impl WifiLink {
    /// Bring up the driver in station mode (not yet associated).
    #[cfg(target_os = "espidf")]
    pub fn new(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        nvs: EspDefaultNvsPartition,
        credentials: WifiCredentials,
    ) -> Result<Self, ConnectivityError> {
        let driver = EspWifi::new(modem, sysloop.clone(), Some(nvs)).map_err(|e| {
            warn!("WiFi: driver init failed ({})", e);
            ConnectivityError::DriverInit
        })?;
        let mut wifi = BlockingWifi::wrap(driver, sysloop).map_err(|_| ConnectivityError::DriverInit)?;

        let client = ClientConfiguration {
            ssid: credentials
                .ssid()
                .try_into()
                .map_err(|_| ConnectivityError::InvalidSsid)?,
            password: credentials
                .password
                .as_str()
                .try_into()
                .map_err(|_| ConnectivityError::InvalidPassword)?,
            auth_method: if credentials.is_open() {
                AuthMethod::None
            } else {
                AuthMethod::WPA2Personal
            },
            ..Default::default()
        };
        wifi.set_configuration(&Configuration::Client(client))
            .map_err(|_| ConnectivityError::DriverInit)?;
        wifi.start().map_err(|_| ConnectivityError::DriverInit)?;
        info!("WiFi: station started");

        Ok(Self {
            state: WifiState::Disconnected,
            credentials,
            backoff_secs: INITIAL_BACKOFF_SECS,
            next_attempt_at: 0,
            wifi,
        })
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new(credentials: WifiCredentials) -> Self {
        Self {
            state: WifiState::Disconnected,
            credentials,
            backoff_secs: INITIAL_BACKOFF_SECS,
            next_attempt_at: 0,
            sim_up: false,
            sim_failing: 0,
        }
    }

    pub fn state(&self) -> WifiState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == WifiState::Connected
    }

    /// Associate, retrying every 500 ms until it succeeds.
    pub fn join(&mut self) {
        info!("WiFi: joining '{}'", self.credentials.ssid());
        let mut attempts: u32 = 0;
        while let Err(e) = self.platform_connect() {
            attempts = attempts.wrapping_add(1);
            warn!("WiFi: join attempt {} failed ({})", attempts, e);
            platform_delay_ms(JOIN_RETRY_MS);
        }
        self.on_connected();
    }

    /// Re-associate after a loss.  At most one attempt per call, paced
    /// by the backoff.
    pub fn maintain(&mut self, now: Millis) {
        if self.platform_is_connected() {
            if self.state != WifiState::Connected {
                self.on_connected();
            }
            return;
        }

        let attempt = match self.state {
            WifiState::Connected => {
                warn!("WiFi: association lost");
                self.next_attempt_at = now;
                1
            }
            WifiState::Disconnected => 1,
            WifiState::Reconnecting { attempt } => attempt.wrapping_add(1),
        };
        if now < self.next_attempt_at {
            return;
        }

        match self.platform_connect() {
            Ok(()) => self.on_connected(),
            Err(e) => {
                warn!(
                    "WiFi: reconnect attempt {} failed ({}), next in {} s",
                    attempt, e, self.backoff_secs
                );
                self.state = WifiState::Reconnecting { attempt };
                self.next_attempt_at = now.saturating_add(Millis::from(self.backoff_secs) * 1_000);
                self.backoff_secs = (self.backoff_secs * 2).min(MAX_BACKOFF_SECS);
            }
        }
    }

    fn on_connected(&mut self) {
        self.state = WifiState::Connected;
        self.backoff_secs = INITIAL_BACKOFF_SECS;
        self.next_attempt_at = 0;
        info!("WiFi: connected to '{}'", self.credentials.ssid());
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_connect(&mut self) -> Result<(), ConnectivityError> {
        self.wifi
            .connect()
            .map_err(|_| ConnectivityError::ConnectionFailed)?;
        self.wifi
            .wait_netif_up()
            .map_err(|_| ConnectivityError::ConnectionFailed)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_connect(&mut self) -> Result<(), ConnectivityError> {
        if self.sim_failing > 0 {
            self.sim_failing -= 1;
            return Err(ConnectivityError::ConnectionFailed);
        }
        self.sim_up = true;
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_is_connected(&self) -> bool {
        self.wifi.is_connected().unwrap_or(false)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_is_connected(&self) -> bool {
        self.sim_up
    }

    // ── Simulation scripting ──────────────────────────────────

    #[cfg(not(target_os = "espidf"))]
    pub fn sim_fail_next(&mut self, n: u32) {
        self.sim_failing = n;
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn sim_drop(&mut self) {
        self.sim_up = false;
    }
}

#[cfg(target_os = "espidf")]
fn platform_delay_ms(ms: u32) {
    esp_idf_hal::delay::FreeRtos::delay_ms(ms);
}

#[cfg(not(target_os = "espidf"))]
fn platform_delay_ms(_ms: u32) {}
