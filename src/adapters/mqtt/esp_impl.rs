//! ESP-IDF `esp-mqtt` implementation of the secure channel.
//!
//! Compiled only for `target_os = "espidf"`.  The client runs its own
//! FreeRTOS task and reports through a callback.  Link state goes into a
//! shared atomic; inbound messages go into a bounded mpsc queue that
//! `service()` drains without blocking.  The callback never waits: a
//! message that finds the queue full is dropped.
//!
//! Each `connect()` builds a fresh client so that a dead session never
//! lingers with stale subscriptions.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::mpsc::{self, Receiver, TryRecvError, TrySendError};
use std::time::{Duration, Instant};

use esp_idf_svc::mqtt::client::{EspMqttClient, EventPayload, MqttClientConfiguration, QoS};
use esp_idf_svc::tls::X509;

use log::{debug, info, warn};

use super::INBOUND_QUEUE_DEPTH;
use crate::adapters::cert_store::TlsCredentials;
use crate::app::ports::{ChannelError, InboundMessage, SecureChannel, ServiceOutcome};
use crate::config::SystemConfig;

// Link state written by the client task.
const LINK_PENDING: u8 = 0;
const LINK_UP: u8 = 1;
const LINK_DOWN: u8 = 2;
const LINK_FAILED: u8 = 3;

/// Poll step while waiting for the session to come up.
const CONNECT_POLL: Duration = Duration::from_millis(10);

pub struct EspMqttChannel {
    url: String,
    credentials: TlsCredentials,
    keep_alive: Duration,
    connect_timeout: Duration,
    client: Option<EspMqttClient<'static>>,
    link: Arc<AtomicU8>,
    messages: Option<Receiver<InboundMessage>>,
}

impl EspMqttChannel {
    pub fn new(config: &SystemConfig, credentials: TlsCredentials) -> Self {
        Self {
            url: config.broker_url(),
            credentials,
            keep_alive: Duration::from_secs(u64::from(config.keep_alive_secs)),
            connect_timeout: Duration::from_millis(u64::from(config.connect_timeout_ms)),
            client: None,
            link: Arc::new(AtomicU8::new(LINK_DOWN)),
            messages: None,
        }
    }

    fn alive(&self) -> bool {
        self.client.is_some() && self.link.load(Ordering::Acquire) == LINK_UP
    }

    fn teardown(&mut self) {
        // Dropping the client stops its task and closes the socket.
        self.client = None;
        self.messages = None;
    }

    /// Block until the new session reports up, fails, or times out.
    fn await_connected(&self, link: &AtomicU8) -> Result<(), ChannelError> {
        let deadline = Instant::now() + self.connect_timeout;
        loop {
            match link.load(Ordering::Acquire) {
                LINK_UP => return Ok(()),
                LINK_DOWN | LINK_FAILED => return Err(ChannelError::Handshake),
                _ => {}
            }
            if Instant::now() >= deadline {
                return Err(ChannelError::Timeout);
            }
            std::thread::sleep(CONNECT_POLL);
        }
    }
}

impl SecureChannel for EspMqttChannel {
    fn connect(&mut self, client_id: &str) -> Result<(), ChannelError> {
        self.teardown();

        let conf = MqttClientConfiguration {
            client_id: Some(client_id),
            keep_alive_interval: Some(self.keep_alive),
            network_timeout: self.connect_timeout,
            server_certificate: Some(X509::pem_until_nul(self.credentials.ca_cert)),
            client_certificate: Some(X509::pem_until_nul(self.credentials.client_cert)),
            private_key: Some(X509::pem_until_nul(self.credentials.private_key)),
            ..Default::default()
        };

        // Fresh state per session; a late event from an old client cannot
        // touch it.
        let link = Arc::new(AtomicU8::new(LINK_PENDING));
        let task_link = Arc::clone(&link);
        let (tx, rx) = mpsc::sync_channel(INBOUND_QUEUE_DEPTH);
        let client = EspMqttClient::new_cb(&self.url, &conf, move |event| match event.payload() {
            EventPayload::Connected(_) => task_link.store(LINK_UP, Ordering::Release),
            EventPayload::Disconnected => task_link.store(LINK_DOWN, Ordering::Release),
            EventPayload::Error(e) => {
                warn!("MQTT: client error {:?}", e);
                // Only fatal before the session is up; a live session
                // reports Disconnected on its own.
                let _ = task_link.compare_exchange(
                    LINK_PENDING,
                    LINK_FAILED,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                );
            }
            EventPayload::Received { topic, data, .. } => {
                let message = InboundMessage::new(topic.unwrap_or_default(), data);
                // Disconnected receiver means the channel was torn down.
                if let Err(TrySendError::Full(_)) = tx.try_send(message) {
                    warn!("MQTT: inbound queue full, message dropped");
                }
            }
            _ => {}
        })
        .map_err(|e| {
            warn!("MQTT: client init failed ({})", e);
            ChannelError::Io
        })?;

        self.await_connected(&link)?;
        info!("MQTT: session up at {}", self.url);
        self.client = Some(client);
        self.link = link;
        self.messages = Some(rx);
        Ok(())
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), ChannelError> {
        let client = match self.client.as_mut() {
            Some(c) if self.link.load(Ordering::Acquire) == LINK_UP => c,
            _ => return Err(ChannelError::NotConnected),
        };
        client
            .publish(topic, QoS::AtMostOnce, false, payload)
            .map(|_| ())
            .map_err(|e| {
                debug!("MQTT: publish rejected ({})", e);
                ChannelError::Rejected
            })
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), ChannelError> {
        let client = match self.client.as_mut() {
            Some(c) if self.link.load(Ordering::Acquire) == LINK_UP => c,
            _ => return Err(ChannelError::NotConnected),
        };
        client
            .subscribe(topic, QoS::AtMostOnce)
            .map(|_| ())
            .map_err(|_| ChannelError::Rejected)
    }

    fn service(&mut self) -> ServiceOutcome {
        if !self.alive() {
            return ServiceOutcome::dead();
        }
        let Some(messages) = self.messages.as_ref() else {
            return ServiceOutcome::dead();
        };
        match messages.try_recv() {
            Ok(message) => ServiceOutcome::delivered(message),
            Err(TryRecvError::Empty) => ServiceOutcome::idle(),
            Err(TryRecvError::Disconnected) => ServiceOutcome::dead(),
        }
    }
}
