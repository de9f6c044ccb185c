//! Outbound application events.
//!
//! [`DisplayEvent`]s go to the [`DisplaySink`](super::ports::DisplaySink);
//! [`TelemetryPayload`] is the wire body published on the telemetry topic.

use core::fmt::Write;

use serde::{Deserialize, Serialize};

use super::lamp::LampState;
use crate::config::Locale;

/// Label text rendered next to a gauge or status panel.
pub type LabelText = heapless::String<16>;

/// State-change notifications for the GUI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayEvent {
    /// Temperature gauge value in whole °C.
    Temperature(i32),
    /// Humidity gauge value in whole %RH.
    Humidity(i32),
    /// Lamp status panel: checked when on.
    Lamp(LampState),
}

impl DisplayEvent {
    /// Text for the widget label.  Gauges show the bare number.
    pub fn label(&self, locale: Locale) -> LabelText {
        let mut text = LabelText::new();
        match self {
            Self::Temperature(v) | Self::Humidity(v) => {
                // i32::MIN is 11 chars; cannot overflow 16.
                let _ = write!(text, "{}", v);
            }
            Self::Lamp(state) => {
                let _ = text.push_str(locale.lamp_label(*state));
            }
        }
        text
    }
}

/// Telemetry body: `{"temp":24,"humi":55}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryPayload {
    pub temp: i32,
    pub humi: i32,
}

impl TelemetryPayload {
    /// Compact JSON encoding.
    pub fn to_json(&self) -> Vec<u8> {
        // Two integer fields: serialisation cannot fail.
        serde_json::to_vec(self).unwrap_or_default()
    }
}
