//! Connection supervisor: lifecycle of the secure channel.
//!
//! ```text
//!                 connect attempt            Ok
//!  Disconnected ───────────────▶ Connecting ─────▶ Connected ──▶ subscribe all (in order)
//!       ▲                             │ Err              │
//!       └─────────────────────────────┘                  │ service().alive == false
//!       ▲                                                │
//!       └────────────────────────────────────────────────┘
//! ```
//!
//! Liveness is checked once per loop iteration through
//! [`SecureChannel::service`].  A dead session forces `Disconnected` from
//! any state, and the connect attempt follows in the same call when the
//! [`ReconnectPolicy`] allows it.  Inbound messages are only accepted while
//! `Connected`, which is entered only after every subscription has been
//! issued.  Subscriptions are attempted once per session; a failure is
//! logged and left for the next liveness check to resolve.

use log::{info, warn};

use super::ports::{ConfigError, InboundMessage, SecureChannel};
use crate::config::ReconnectPolicy;
use crate::scheduler::Millis;

/// Upper bound on the fixed subscription set.
pub const MAX_SUBSCRIPTIONS: usize = 4;

/// Session state as seen by the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Link counters since boot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkStats {
    pub connect_attempts: u32,
    pub connects: u32,
    pub drops: u32,
    pub subscribe_failures: u32,
}

pub struct ConnectionSupervisor {
    state: ConnectionState,
    client_id: String,
    subscriptions: heapless::Vec<String, MAX_SUBSCRIPTIONS>,
    policy: ReconnectPolicy,
    backoff_ms: Millis,
    next_attempt_at: Millis,
    stats: LinkStats,
}

impl ConnectionSupervisor {
    /// Build a supervisor for a fixed subscription set.
    ///
    /// Topics are subscribed in the order given, on every (re)connect.
    pub fn new(
        client_id: impl Into<String>,
        topics: &[&str],
        policy: ReconnectPolicy,
    ) -> Result<Self, ConfigError> {
        let mut subscriptions = heapless::Vec::new();
        for topic in topics {
            subscriptions
                .push((*topic).to_owned())
                .map_err(|_| ConfigError::ValidationFailed("too many subscription topics"))?;
        }
        Ok(Self {
            state: ConnectionState::Disconnected,
            client_id: client_id.into(),
            subscriptions,
            policy,
            backoff_ms: policy.initial_delay_ms(),
            next_attempt_at: 0,
            stats: LinkStats::default(),
        })
    }

    /// One supervision step: liveness check, then reconnect if needed.
    ///
    /// Returns the message delivered by this step's `service()` call only
    /// when the session was already `Connected` and still alive.
    pub fn poll(&mut self, now: Millis, channel: &mut impl SecureChannel) -> Option<InboundMessage> {
        let outcome = channel.service();

        if outcome.alive && self.state == ConnectionState::Connected {
            return outcome.message;
        }

        if !outcome.alive && self.state == ConnectionState::Connected {
            warn!("Link: session lost");
            self.stats.drops = self.stats.drops.wrapping_add(1);
        }
        self.state = ConnectionState::Disconnected;

        self.try_connect(now, channel);
        None
    }

    fn try_connect(&mut self, now: Millis, channel: &mut impl SecureChannel) {
        if now < self.next_attempt_at {
            return;
        }

        self.state = ConnectionState::Connecting;
        self.stats.connect_attempts = self.stats.connect_attempts.wrapping_add(1);
        info!("Link: connecting as '{}'", self.client_id);

        match channel.connect(&self.client_id) {
            Ok(()) => {
                self.state = ConnectionState::Connected;
                self.stats.connects = self.stats.connects.wrapping_add(1);
                self.backoff_ms = self.policy.initial_delay_ms();
                self.next_attempt_at = 0;
                info!("Link: connected");
                self.subscribe_all(channel);
            }
            Err(e) => {
                self.state = ConnectionState::Disconnected;
                warn!("Link: connect failed ({})", e);
                self.schedule_retry(now);
            }
        }
    }

    fn subscribe_all(&mut self, channel: &mut impl SecureChannel) {
        for topic in &self.subscriptions {
            if let Err(e) = channel.subscribe(topic) {
                self.stats.subscribe_failures = self.stats.subscribe_failures.wrapping_add(1);
                warn!("Link: subscribe '{}' failed ({})", topic, e);
            }
        }
    }

    fn schedule_retry(&mut self, now: Millis) {
        match self.policy {
            ReconnectPolicy::Immediate => {
                self.next_attempt_at = now;
            }
            ReconnectPolicy::Backoff { max_ms, .. } => {
                self.next_attempt_at = now.saturating_add(self.backoff_ms);
                info!("Link: next attempt in {} ms", self.backoff_ms);
                self.backoff_ms = self.backoff_ms.saturating_mul(2).min(max_ms);
            }
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    pub fn stats(&self) -> LinkStats {
        self.stats
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn subscriptions(&self) -> impl Iterator<Item = &str> {
        self.subscriptions.iter().map(String::as_str)
    }
}
