//! State reporter: readings to display gauges and telemetry.
//!
//! Telemetry is at-most-once and latest-value-wins: a publish that fails
//! is counted and dropped, never queued.  The next reading replaces it.

use log::{debug, warn};

use super::events::{DisplayEvent, TelemetryPayload};
use super::ports::{ChannelError, DisplaySink, SecureChannel};
use super::sampler::SensorReading;

pub struct StateReporter {
    topic: String,
    published: u32,
    dropped: u32,
}

impl StateReporter {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            published: 0,
            dropped: 0,
        }
    }

    /// Update the gauges, then publish the reading.
    ///
    /// The display reflects the reading whether or not the publish
    /// succeeds; the returned error is informational only.
    pub fn report(
        &mut self,
        reading: &SensorReading,
        channel: &mut impl SecureChannel,
        display: &mut impl DisplaySink,
    ) -> Result<(), ChannelError> {
        display.notify(&DisplayEvent::Temperature(reading.temperature));
        display.notify(&DisplayEvent::Humidity(reading.humidity));
        self.format_and_publish(reading, channel)
    }

    /// Publish one reading on the telemetry topic.
    pub fn format_and_publish(
        &mut self,
        reading: &SensorReading,
        channel: &mut impl SecureChannel,
    ) -> Result<(), ChannelError> {
        let payload = TelemetryPayload {
            temp: reading.temperature,
            humi: reading.humidity,
        }
        .to_json();

        match channel.publish(&self.topic, &payload) {
            Ok(()) => {
                self.published = self.published.wrapping_add(1);
                debug!("Telemetry: {} <- {}", self.topic, String::from_utf8_lossy(&payload));
                Ok(())
            }
            Err(e) => {
                self.dropped = self.dropped.wrapping_add(1);
                match e {
                    ChannelError::NotConnected => debug!("Telemetry: dropped, link down"),
                    _ => warn!("Telemetry: publish failed ({}), dropped", e),
                }
                Err(e)
            }
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn published(&self) -> u32 {
        self.published
    }

    pub fn dropped(&self) -> u32 {
        self.dropped
    }
}
