//! Certificate store: the device's X.509 identity for the broker.
//!
//! The broker authenticates the device by client certificate (mutual
//! TLS) and the device authenticates the broker against a pinned root
//! CA.  Material is taken from build-time environment variables when all
//! three are set, otherwise from the `certs` NVS namespace.
//!
//! ## Sources
//!
//! | Build env                 | NVS key       | Content                        |
//! |---------------------------|---------------|--------------------------------|
//! | `CLIMALINK_ROOT_CA`       | `ca_cert`     | PEM root CA for the endpoint   |
//! | `CLIMALINK_DEVICE_CERT`   | `client_cert` | PEM device certificate         |
//! | `CLIMALINK_DEVICE_KEY`    | `client_key`  | PEM device private key         |
//!
//! Loaded PEMs are NUL-terminated for mbedTLS and kept for the lifetime
//! of the program, since the MQTT client borrows them on every reconnect.

use log::info;

use super::nvs::NvsStore;

const CERT_NAMESPACE: &str = "certs";

/// Maximum certificate size (PEM format, includes headers).
const MAX_CERT_SIZE: usize = 4096;

/// Maximum private key size.
const MAX_KEY_SIZE: usize = 2048;

const PEM_MARKER: &str = "-----BEGIN ";

/// Errors from the certificate store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertStoreError {
    /// The named component is not provisioned.
    Missing(&'static str),
    /// The named component is not a usable PEM block.
    Malformed(&'static str),
    /// The named component exceeds its size limit.
    TooLarge(&'static str),
    NvsError,
}

impl core::fmt::Display for CertStoreError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Missing(what) => write!(f, "{} not provisioned", what),
            Self::Malformed(what) => write!(f, "{} is not a PEM block", what),
            Self::TooLarge(what) => write!(f, "{} too large", what),
            Self::NvsError => write!(f, "NVS read failed"),
        }
    }
}

impl std::error::Error for CertStoreError {}

/// NUL-terminated PEM material for the secure channel.
#[derive(Debug, Clone, Copy)]
pub struct TlsCredentials {
    pub ca_cert: &'static [u8],
    pub client_cert: &'static [u8],
    pub private_key: &'static [u8],
}

impl TlsCredentials {
    /// Validate and pin three PEM strings.
    pub fn from_pem(ca_cert: &str, client_cert: &str, private_key: &str) -> Result<Self, CertStoreError> {
        Ok(Self {
            ca_cert: pin_pem("root CA", ca_cert.as_bytes(), MAX_CERT_SIZE)?,
            client_cert: pin_pem("device certificate", client_cert.as_bytes(), MAX_CERT_SIZE)?,
            private_key: pin_pem("device key", private_key.as_bytes(), MAX_KEY_SIZE)?,
        })
    }

    /// Build-time env first, then the `certs` NVS namespace.
    pub fn load(store: &NvsStore) -> Result<Self, CertStoreError> {
        let creds = match (
            option_env!("CLIMALINK_ROOT_CA"),
            option_env!("CLIMALINK_DEVICE_CERT"),
            option_env!("CLIMALINK_DEVICE_KEY"),
        ) {
            (Some(ca), Some(cert), Some(key)) => {
                info!("CertStore: using build-time credentials");
                Self::from_pem(ca, cert, key)?
            }
            _ => Self::from_store(store)?,
        };
        info!(
            "CertStore: loaded (ca={}B, cert={}B, key={}B)",
            creds.ca_cert.len(),
            creds.client_cert.len(),
            creds.private_key.len(),
        );
        Ok(creds)
    }

    /// Read the three components provisioned into NVS.
    pub fn from_store(store: &NvsStore) -> Result<Self, CertStoreError> {
        let read = |key: &str, what: &'static str, max: usize| -> Result<&'static [u8], CertStoreError> {
            let blob = store
                .get_blob(CERT_NAMESPACE, key)
                .map_err(|_| CertStoreError::NvsError)?
                .ok_or(CertStoreError::Missing(what))?;
            pin_pem(what, &blob, max)
        };

        Ok(Self {
            ca_cert: read("ca_cert", "root CA", MAX_CERT_SIZE)?,
            client_cert: read("client_cert", "device certificate", MAX_CERT_SIZE)?,
            private_key: read("client_key", "device key", MAX_KEY_SIZE)?,
        })
    }
}

/// Check one PEM component and leak a NUL-terminated copy.
///
/// A trailing NUL already present (NVS blobs written by the provisioning
/// tool carry one) is accepted; an interior NUL is not.
fn pin_pem(what: &'static str, pem: &[u8], max: usize) -> Result<&'static [u8], CertStoreError> {
    let body = pem.strip_suffix(&[0]).unwrap_or(pem);
    if body.is_empty() {
        return Err(CertStoreError::Missing(what));
    }
    if body.len() + 1 > max {
        return Err(CertStoreError::TooLarge(what));
    }
    let text = core::str::from_utf8(body).map_err(|_| CertStoreError::Malformed(what))?;
    if body.contains(&0) || !text.trim_start().starts_with(PEM_MARKER) {
        return Err(CertStoreError::Malformed(what));
    }
    let mut owned = Vec::with_capacity(body.len() + 1);
    owned.extend_from_slice(body);
    owned.push(0);
    Ok(Box::leak(owned.into_boxed_slice()))
}

// ── Tests ────────────────────────────────────────────────────
