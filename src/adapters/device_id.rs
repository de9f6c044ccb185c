//! Device identity derived from the ESP32 factory MAC address.
//!
//! Produces a stable MQTT client id of the form `climalink-xxyyzz`
//! (last 3 bytes of the 6-byte MAC, lowercase hex).  It is deterministic
//! across reboots because the MAC is burned into eFuse.  A non-empty
//! `SystemConfig::client_id` takes precedence, since the broker policy
//! may pin the id to the thing name.

/// Client id buffer; `climalink-xxyyzz` is 16 chars.
pub type ClientIdString = heapless::String<32>;

/// Full 6-byte MAC address.
pub type MacAddress = [u8; 6];

/// Read the factory MAC address from eFuse.
#[cfg(target_os = "espidf")]
pub fn read_mac() -> MacAddress {
    let mut mac: MacAddress = [0u8; 6];
    unsafe {
        esp_idf_sys::esp_efuse_mac_get_default(mac.as_mut_ptr());
    }
    mac
}

/// Simulation: returns a deterministic fake MAC.
#[cfg(not(target_os = "espidf"))]
pub fn read_mac() -> MacAddress {
    [0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE]
}

/// Derive the client id from the last 3 MAC bytes.
pub fn client_id(mac: &MacAddress) -> ClientIdString {
    let mut id = ClientIdString::new();
    use core::fmt::Write;
    let _ = write!(id, "climalink-{:02x}{:02x}{:02x}", mac[3], mac[4], mac[5]);
    id
}

/// The configured id when set, otherwise the MAC-derived one.
pub fn resolve_client_id(configured: &str, mac: &MacAddress) -> String {
    if configured.is_empty() {
        client_id(mac).as_str().to_owned()
    } else {
        configured.to_owned()
    }
}
