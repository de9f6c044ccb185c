//! Log-based display sink adapter.
//!
//! Implements [`DisplaySink`] by writing each widget update to the
//! ESP-IDF logger (UART / USB-CDC).  It stands in for the LVGL screen;
//! a panel driver would implement the same trait and render the same
//! labels.

use log::info;

use crate::app::events::DisplayEvent;
use crate::app::ports::DisplaySink;
use crate::config::Locale;

/// Adapter that logs every [`DisplayEvent`] to the serial console.
pub struct LogDisplaySink {
    locale: Locale,
    updates: u32,
}

impl LogDisplaySink {
    pub fn new(locale: Locale) -> Self {
        Self { locale, updates: 0 }
    }

    /// Widget updates rendered since boot.
    pub fn updates(&self) -> u32 {
        self.updates
    }
}

impl DisplaySink for LogDisplaySink {
    fn notify(&mut self, event: &DisplayEvent) {
        self.updates = self.updates.wrapping_add(1);
        let label = event.label(self.locale);
        match event {
            DisplayEvent::Temperature(v) => {
                info!("UI | temp arc={} label=\"{}\u{00b0}C\"", v, label);
            }
            DisplayEvent::Humidity(v) => {
                info!("UI | humi arc={} label=\"{}%\"", v, label);
            }
            DisplayEvent::Lamp(state) => {
                info!(
                    "UI | lamp panel {} label=\"{}\"",
                    if state.is_on() { "checked" } else { "unchecked" },
                    label
                );
            }
        }
    }
}
