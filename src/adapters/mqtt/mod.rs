//! MQTT-over-TLS channel adapter.
//!
//! Implements [`SecureChannel`]: the hexagonal boundary to the broker.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: [`EspMqttChannel`] wraps the ESP-IDF
//!   `esp-mqtt` client with mutual-TLS credentials from the
//!   [`cert_store`](super::cert_store).
//! - **all targets**: [`LoopbackChannel`], an in-memory broker used by
//!   host-side tests and simulation.  It never touches a socket.
//!
//! ## Delivery model
//!
//! Both implementations are QoS 0 on publish and subscribe.  The client
//! library delivers on its own task; inbound messages are queued and
//! handed out one per [`service`](SecureChannel::service) call, so the
//! control loop never blocks on the network outside `connect()`.
//!
//! ```text
//!   esp-mqtt task ──(mpsc)──▶ EspMqttChannel::service() ──▶ supervisor
//! ```

use std::collections::VecDeque;

use log::{debug, info, warn};

use crate::app::ports::{ChannelError, InboundMessage, SecureChannel, ServiceOutcome};

#[cfg(target_os = "espidf")]
mod esp_impl;

#[cfg(target_os = "espidf")]
pub use esp_impl::EspMqttChannel;

/// Depth of the inbound queue.  Newer messages are dropped beyond it.
pub const INBOUND_QUEUE_DEPTH: usize = 16;

// ───────────────────────────────────────────────────────────────
// Loopback channel (in-memory broker)
// ───────────────────────────────────────────────────────────────

/// Broker stand-in that records traffic and lets tests script faults.
///
/// Only messages on subscribed topics are delivered, and a new session
/// starts with no subscriptions and an empty inbound queue, as with a
/// clean-session broker.
#[derive(Debug, Default)]
pub struct LoopbackChannel {
    link_up: bool,
    unreachable: bool,
    failing_connects: u32,
    reject_subscribes: bool,
    connects: u32,
    last_client_id: Option<String>,
    subscriptions: Vec<String>,
    inbound: VecDeque<InboundMessage>,
    published: Vec<InboundMessage>,
    dropped_inbound: u32,
}

impl LoopbackChannel {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Scripting ─────────────────────────────────────────────

    /// Queue a message from the broker side.
    pub fn inject(&mut self, topic: &str, payload: &[u8]) {
        if self.inbound.len() == INBOUND_QUEUE_DEPTH {
            self.dropped_inbound = self.dropped_inbound.wrapping_add(1);
            warn!("Loopback: inbound queue full, message dropped");
            return;
        }
        self.inbound.push_back(InboundMessage::new(topic, payload));
    }

    /// Messages refused because the inbound queue was full.
    pub fn dropped_inbound(&self) -> u32 {
        self.dropped_inbound
    }

    /// Kill the current session as a network drop would.
    pub fn drop_link(&mut self) {
        if self.link_up {
            info!("Loopback: link dropped");
        }
        self.link_up = false;
    }

    /// Fail the next `n` connect attempts with a handshake error.
    pub fn fail_next_connects(&mut self, n: u32) {
        self.failing_connects = n;
    }

    /// While unreachable, connects time out.
    pub fn set_unreachable(&mut self, unreachable: bool) {
        self.unreachable = unreachable;
    }

    pub fn reject_subscriptions(&mut self, reject: bool) {
        self.reject_subscribes = reject;
    }

    // ── Inspection ────────────────────────────────────────────

    /// Every successful publish, oldest first.
    pub fn published(&self) -> &[InboundMessage] {
        &self.published
    }

    pub fn take_published(&mut self) -> Vec<InboundMessage> {
        core::mem::take(&mut self.published)
    }

    pub fn subscriptions(&self) -> &[String] {
        &self.subscriptions
    }

    pub fn connect_count(&self) -> u32 {
        self.connects
    }

    pub fn last_client_id(&self) -> Option<&str> {
        self.last_client_id.as_deref()
    }

    pub fn is_link_up(&self) -> bool {
        self.link_up
    }

    pub fn pending_inbound(&self) -> usize {
        self.inbound.len()
    }
}

impl SecureChannel for LoopbackChannel {
    fn connect(&mut self, client_id: &str) -> Result<(), ChannelError> {
        self.connects = self.connects.wrapping_add(1);
        self.last_client_id = Some(client_id.to_owned());
        self.link_up = false;
        self.subscriptions.clear();
        if !self.inbound.is_empty() {
            debug!("Loopback: discarding {} message(s) from the old session", self.inbound.len());
            self.inbound.clear();
        }

        if self.unreachable {
            return Err(ChannelError::Timeout);
        }
        if self.failing_connects > 0 {
            self.failing_connects -= 1;
            return Err(ChannelError::Handshake);
        }
        self.link_up = true;
        debug!("Loopback: '{}' connected", client_id);
        Ok(())
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), ChannelError> {
        if !self.link_up {
            return Err(ChannelError::NotConnected);
        }
        self.published.push(InboundMessage::new(topic, payload));
        Ok(())
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), ChannelError> {
        if !self.link_up {
            return Err(ChannelError::NotConnected);
        }
        if self.reject_subscribes {
            return Err(ChannelError::Rejected);
        }
        if !self.subscriptions.iter().any(|t| t == topic) {
            self.subscriptions.push(topic.to_owned());
        }
        Ok(())
    }

    fn service(&mut self) -> ServiceOutcome {
        if !self.link_up {
            return ServiceOutcome::dead();
        }
        while let Some(message) = self.inbound.pop_front() {
            if self.subscriptions.iter().any(|t| *t == message.topic) {
                return ServiceOutcome::delivered(message);
            }
            warn!("Loopback: no subscriber for '{}', dropped", message.topic);
        }
        ServiceOutcome::idle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connected() -> LoopbackChannel {
        let mut ch = LoopbackChannel::new();
        ch.connect("dev").unwrap();
        ch.subscribe("a/led").unwrap();
        ch
    }

    #[test]
    fn fresh_channel_is_dead() {
        let mut ch = LoopbackChannel::new();
        assert_eq!(ch.service(), ServiceOutcome::dead());
        assert_eq!(ch.publish("t", b"x"), Err(ChannelError::NotConnected));
    }

    #[test]
    fn delivers_one_message_per_service_call() {
        let mut ch = connected();
        ch.inject("a/led", b"1");
        ch.inject("a/led", b"0");
        assert_eq!(ch.service().message.unwrap().payload, b"1");
        assert_eq!(ch.service().message.unwrap().payload, b"0");
        assert_eq!(ch.service(), ServiceOutcome::idle());
    }

    #[test]
    fn unsubscribed_topics_are_not_delivered() {
        let mut ch = connected();
        ch.inject("a/other", b"1");
        assert_eq!(ch.service(), ServiceOutcome::idle());
    }

    #[test]
    fn reconnect_clears_session_subscriptions() {
        let mut ch = connected();
        ch.drop_link();
        ch.connect("dev").unwrap();
        assert!(ch.subscriptions().is_empty());
        assert_eq!(ch.connect_count(), 2);
    }

    #[test]
    fn new_session_does_not_deliver_old_session_messages() {
        let mut ch = connected();
        ch.drop_link();
        ch.inject("a/led", b"1");
        ch.connect("dev").unwrap();
        ch.subscribe("a/led").unwrap();
        assert_eq!(ch.pending_inbound(), 0);
        assert_eq!(ch.service(), ServiceOutcome::idle());
    }

    #[test]
    fn scripted_connect_failures() {
        let mut ch = LoopbackChannel::new();
        ch.fail_next_connects(1);
        assert_eq!(ch.connect("dev"), Err(ChannelError::Handshake));
        assert!(ch.connect("dev").is_ok());

        ch.set_unreachable(true);
        assert_eq!(ch.connect("dev"), Err(ChannelError::Timeout));
        assert!(!ch.is_link_up());
    }

    #[test]
    fn inbound_queue_is_bounded() {
        let mut ch = connected();
        for i in 0..=INBOUND_QUEUE_DEPTH {
            ch.inject("a/led", &[b'0' + (i % 2) as u8]);
        }
        assert_eq!(ch.pending_inbound(), INBOUND_QUEUE_DEPTH);
        assert_eq!(ch.dropped_inbound(), 1);
        assert_eq!(ch.service().message.unwrap().payload, b"0");
    }
}
