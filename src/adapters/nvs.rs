//! NVS (Non-Volatile Storage) adapter.
//!
//! One handle on the default NVS partition shared by everything that
//! persists state: the device config (`climalink::syscfg`, JSON) and the
//! TLS identity (`certs` namespace, read by the
//! [`cert_store`](super::cert_store)).  The partition can only be taken
//! once per boot, so the Wi-Fi driver receives a clone of the same handle.
//!
//! The simulation backend keeps blobs in memory (dev/test only).

use core::fmt;
use log::{info, warn};

use crate::app::ports::ConfigError;
use crate::config::SystemConfig;

#[cfg(not(target_os = "espidf"))]
use std::collections::HashMap;

#[cfg(target_os = "espidf")]
use esp_idf_svc::nvs::{EspDefaultNvsPartition, EspNvs};

const CONFIG_NAMESPACE: &str = "climalink";
const CONFIG_KEY: &str = "syscfg";

/// Largest blob this adapter reads.
pub const MAX_BLOB_SIZE: usize = 4000;

/// Errors from raw blob access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Namespace could not be opened.
    Open,
    ReadFailed,
    WriteFailed,
    TooLarge,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "NVS namespace open failed"),
            Self::ReadFailed => write!(f, "NVS read failed"),
            Self::WriteFailed => write!(f, "NVS write failed"),
            Self::TooLarge => write!(f, "blob exceeds {} bytes", MAX_BLOB_SIZE),
        }
    }
}

pub struct NvsStore {
    #[cfg(target_os = "espidf")]
    partition: EspDefaultNvsPartition,
    #[cfg(not(target_os = "espidf"))]
    store: std::cell::RefCell<HashMap<String, Vec<u8>>>,
}

impl NvsStore {
    #[cfg(target_os = "espidf")]
    pub fn new(partition: EspDefaultNvsPartition) -> Self {
        info!("NvsStore: ESP-IDF default partition");
        Self { partition }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Self {
        info!("NvsStore: simulation backend");
        Self {
            store: std::cell::RefCell::new(HashMap::new()),
        }
    }

    // ── Raw blobs ─────────────────────────────────────────────

    /// Read a blob; `Ok(None)` when the namespace or key does not exist.
    #[cfg(target_os = "espidf")]
    pub fn get_blob(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        use esp_idf_sys::ESP_ERR_NVS_NOT_FOUND;

        let nvs = match EspNvs::new(self.partition.clone(), namespace, false) {
            Ok(nvs) => nvs,
            // A namespace that was never written does not exist yet.
            Err(e) if e.code() as i64 == ESP_ERR_NVS_NOT_FOUND as i64 => return Ok(None),
            Err(_) => return Err(StorageError::Open),
        };
        let len = match nvs.blob_len(key).map_err(|_| StorageError::ReadFailed)? {
            Some(len) => len,
            None => return Ok(None),
        };
        if len > MAX_BLOB_SIZE {
            return Err(StorageError::TooLarge);
        }
        let mut buf = vec![0u8; len];
        let data = nvs
            .get_blob(key, &mut buf)
            .map_err(|_| StorageError::ReadFailed)?;
        Ok(data.map(<[u8]>::to_vec))
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn get_blob(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.store.borrow().get(&composite_key(namespace, key)).cloned())
    }

    #[cfg(target_os = "espidf")]
    pub fn set_blob(&self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        if data.len() > MAX_BLOB_SIZE {
            return Err(StorageError::TooLarge);
        }
        let mut nvs =
            EspNvs::new(self.partition.clone(), namespace, true).map_err(|_| StorageError::Open)?;
        nvs.set_blob(key, data).map_err(|_| StorageError::WriteFailed)
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn set_blob(&self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        if data.len() > MAX_BLOB_SIZE {
            return Err(StorageError::TooLarge);
        }
        self.store
            .borrow_mut()
            .insert(composite_key(namespace, key), data.to_vec());
        Ok(())
    }

    // ── Config ────────────────────────────────────────────────

    /// Stored config, or defaults when none was ever saved.
    ///
    /// A stored config that fails to parse or validate is an error; the
    /// caller decides whether to fall back to defaults.
    pub fn load_config(&self) -> Result<SystemConfig, ConfigError> {
        let Some(bytes) = self
            .get_blob(CONFIG_NAMESPACE, CONFIG_KEY)
            .map_err(|_| ConfigError::IoError)?
        else {
            info!("NvsStore: no stored config, using defaults");
            return Ok(SystemConfig::default());
        };
        let cfg: SystemConfig = serde_json::from_slice(&bytes).map_err(|e| {
            warn!("NvsStore: stored config unreadable ({})", e);
            ConfigError::Corrupted
        })?;
        cfg.validate()?;
        info!("NvsStore: loaded config ({} bytes)", bytes.len());
        Ok(cfg)
    }

    /// Validate, then persist.
    pub fn save_config(&self, cfg: &SystemConfig) -> Result<(), ConfigError> {
        cfg.validate()?;
        let bytes = serde_json::to_vec(cfg).map_err(|_| ConfigError::Corrupted)?;
        self.set_blob(CONFIG_NAMESPACE, CONFIG_KEY, &bytes)
            .map_err(|_| ConfigError::IoError)
    }
}

#[cfg(not(target_os = "espidf"))]
impl Default for NvsStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(not(target_os = "espidf"))]
fn composite_key(namespace: &str, key: &str) -> String {
    format!("{}::{}", namespace, key)
}
