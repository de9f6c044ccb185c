fn main() {
    // TLS material and endpoint overrides are baked in with option_env!.
    for var in [
        "CLIMALINK_ENDPOINT",
        "CLIMALINK_CLIENT_ID",
        "CLIMALINK_ROOT_CA",
        "CLIMALINK_DEVICE_CERT",
        "CLIMALINK_DEVICE_KEY",
        "CLIMALINK_WIFI_SSID",
        "CLIMALINK_WIFI_PASSWORD",
    ] {
        println!("cargo:rerun-if-env-changed={var}");
    }

    // Host builds (unit/integration tests) have no ESP-IDF sysenv to forward.
    if std::env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("espidf") {
        embuild::espidf::sysenv::output();
    }
}
