//! Device service: the hexagonal core.
//!
//! [`DeviceService`] owns the connection supervisor, sensor sampler, state
//! reporter and lamp controller.  All I/O flows through port traits
//! injected at call sites, so the whole loop runs against mock adapters
//! on the host.
//!
//! ```text
//!   SensorPort ──▶ ┌──────────────────────────────┐ ──▶ DisplaySink
//!                  │         DeviceService         │
//!   OutputPort ◀── │ Sampler · Reporter · Lamp     │ ◀─▶ SecureChannel
//!                  │ ConnectionSupervisor          │
//!                  └──────────────────────────────┘
//! ```
//!
//! One call to [`DeviceService::run_iteration`] is one pass of the
//! cooperative loop:
//!
//! 1. display service step, during which due timers fire (sampling and
//!    reporting);
//! 2. liveness check, reconnect and resubscribe when needed;
//! 3. routing of the message accepted in step 2.
//!
//! Nothing preempts an iteration, so each state mutation and its display
//! notification land together.

use log::{debug, info};

use crate::config::SystemConfig;
use crate::scheduler::Millis;

use super::lamp::{LampController, LampState};
use super::ports::{ConfigError, DisplaySink, InboundMessage, OutputPort, SecureChannel, SensorPort};
use super::reporter::StateReporter;
use super::sampler::{SensorReading, SensorSampler};
use super::supervisor::{ConnectionState, ConnectionSupervisor, LinkStats};

/// Point-in-time view of the device for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceStatus {
    pub connection: ConnectionState,
    pub lamp: LampState,
    pub last_reading: Option<SensorReading>,
    pub link: LinkStats,
    pub telemetry_published: u32,
    pub telemetry_dropped: u32,
    pub sensor_failures: u32,
    pub commands_applied: u32,
    pub commands_ignored: u32,
    pub iterations: u64,
}

/// What happened during one loop iteration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IterationReport {
    /// A sampling tick fired this iteration, whether or not the read worked.
    pub sampled: bool,
    /// Reading produced by a sampling tick this iteration.
    pub reading: Option<SensorReading>,
    /// Whether that reading was published.
    pub published: bool,
    /// Lamp state set by a command this iteration.
    pub lamp: Option<LampState>,
}

pub struct DeviceService {
    supervisor: ConnectionSupervisor,
    sampler: SensorSampler,
    reporter: StateReporter,
    lamp: LampController,
    command_topic: String,
    iterations: u64,
}

impl DeviceService {
    /// Construct the service from configuration.
    ///
    /// `client_id` is the resolved MQTT client id.  `now` anchors the
    /// sampling schedule: the first reading is due one period later.
    /// Call [`start`](Self::start) before the first iteration.
    pub fn new(config: &SystemConfig, client_id: &str, now: Millis) -> Result<Self, ConfigError> {
        config.validate()?;
        let supervisor = ConnectionSupervisor::new(
            client_id,
            &[config.command_topic.as_str()],
            config.reconnect,
        )?;

        Ok(Self {
            supervisor,
            sampler: SensorSampler::new(config.sample_interval_ms as Millis, now),
            reporter: StateReporter::new(config.telemetry_topic.as_str()),
            lamp: LampController::new(),
            command_topic: config.command_topic.clone(),
            iterations: 0,
        })
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Drive the lamp to its initial state and show it.
    pub fn start(&mut self, out: &mut impl OutputPort, display: &mut impl DisplaySink) {
        self.lamp.start(out, display);
        info!(
            "DeviceService started (client '{}', sampling every {} ms)",
            self.supervisor.client_id(),
            self.sampler.timer().period_ms()
        );
    }

    // ── Per-iteration orchestration ───────────────────────────

    /// Run one pass of the control loop.
    ///
    /// `hw` satisfies both [`SensorPort`] and [`OutputPort`], which avoids a
    /// double mutable borrow while keeping the port boundary explicit.
    pub fn run_iteration(
        &mut self,
        now: Millis,
        hw: &mut (impl SensorPort + OutputPort),
        channel: &mut impl SecureChannel,
        display: &mut impl DisplaySink,
    ) -> IterationReport {
        self.iterations += 1;
        let mut report = IterationReport::default();

        // 1. GUI step; timer callbacks fire here.
        display.service();
        let fired_before = self.sampler.timer().fired();
        if let Some(reading) = self.sampler.poll(now, hw) {
            report.reading = Some(reading);
            report.published = self.reporter.report(&reading, channel, display).is_ok();
        }
        if self.sampler.timer().fired() != fired_before {
            report.sampled = true;
            info!("{}", self.status_line());
        }

        // 2. Liveness, reconnect, resubscribe.
        if let Some(message) = self.supervisor.poll(now, channel) {
            // 3. Route.
            report.lamp = self.route(&message, hw, display);
        }

        report
    }

    fn route(
        &mut self,
        message: &InboundMessage,
        out: &mut impl OutputPort,
        display: &mut impl DisplaySink,
    ) -> Option<LampState> {
        if message.topic == self.command_topic {
            self.lamp.apply_command(&message.payload, out, display)
        } else {
            debug!("Route: no handler for '{}'", message.topic);
            None
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn connection_state(&self) -> ConnectionState {
        self.supervisor.state()
    }

    pub fn lamp_state(&self) -> LampState {
        self.lamp.state()
    }

    pub fn status(&self) -> DeviceStatus {
        DeviceStatus {
            connection: self.supervisor.state(),
            lamp: self.lamp.state(),
            last_reading: self.sampler.last_reading(),
            link: self.supervisor.stats(),
            telemetry_published: self.reporter.published(),
            telemetry_dropped: self.reporter.dropped(),
            sensor_failures: self.sampler.failures(),
            commands_applied: self.lamp.applied_count(),
            commands_ignored: self.lamp.ignored_count(),
            iterations: self.iterations,
        }
    }

    fn status_line(&self) -> String {
        let s = self.status();
        format!(
            "STATUS | link={:?} drops={} | lamp={:?} | telem ok={} dropped={} | sensor_fail={}",
            s.connection,
            s.link.drops,
            s.lamp,
            s.telemetry_published,
            s.telemetry_dropped,
            s.sensor_failures,
        )
    }
}
