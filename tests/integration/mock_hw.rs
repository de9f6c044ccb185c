//! Mock adapters for integration tests.
//!
//! Every mock appends to one shared [`Trace`], so tests can assert on the
//! interleaving of sensor reads, lamp writes, display updates and channel
//! calls within a loop iteration.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use climalink::adapters::mqtt::LoopbackChannel;
use climalink::app::events::DisplayEvent;
use climalink::app::lamp::LampState;
use climalink::app::service::{DeviceService, IterationReport};
use climalink::config::SystemConfig;
use climalink::scheduler::Millis;
use climalink::app::ports::{
    ChannelError, DisplaySink, Measurement, OutputPort, SecureChannel, SensorError, SensorPort,
    ServiceOutcome,
};

pub type Trace = Rc<RefCell<Vec<String>>>;

pub fn trace() -> Trace {
    Rc::new(RefCell::new(Vec::new()))
}

/// Drain and return everything recorded so far.
pub fn take(trace: &Trace) -> Vec<String> {
    std::mem::take(&mut *trace.borrow_mut())
}

// ── MockHardware ──────────────────────────────────────────────

/// Sensor + lamp output with scripted readings.
///
/// When the script is exhausted every read returns 22.0 °C / 50.0 %RH.
pub struct MockHardware {
    trace: Trace,
    readings: VecDeque<Result<Measurement, SensorError>>,
    pub lamp_writes: Vec<bool>,
    pub reads: u32,
}

#[allow(dead_code)]
impl MockHardware {
    pub fn new(trace: &Trace) -> Self {
        Self {
            trace: Rc::clone(trace),
            readings: VecDeque::new(),
            lamp_writes: Vec::new(),
            reads: 0,
        }
    }

    pub fn push_reading(&mut self, temperature_c: f32, humidity_pct: f32) {
        self.readings.push_back(Ok(Measurement {
            temperature_c,
            humidity_pct,
        }));
    }

    pub fn push_failure(&mut self, e: SensorError) {
        self.readings.push_back(Err(e));
    }

    pub fn lamp_on(&self) -> Option<bool> {
        self.lamp_writes.last().copied()
    }
}

impl SensorPort for MockHardware {
    fn measure(&mut self) -> Result<Measurement, SensorError> {
        self.reads += 1;
        self.trace.borrow_mut().push("measure".into());
        self.readings.pop_front().unwrap_or(Ok(Measurement {
            temperature_c: 22.0,
            humidity_pct: 50.0,
        }))
    }
}

impl OutputPort for MockHardware {
    fn set_lamp(&mut self, on: bool) {
        self.lamp_writes.push(on);
        self.trace
            .borrow_mut()
            .push(if on { "lamp:on" } else { "lamp:off" }.into());
    }
}

// ── RecordingDisplay ──────────────────────────────────────────

pub struct RecordingDisplay {
    trace: Trace,
    pub events: Vec<DisplayEvent>,
    pub services: u32,
}

#[allow(dead_code)]
impl RecordingDisplay {
    pub fn new(trace: &Trace) -> Self {
        Self {
            trace: Rc::clone(trace),
            events: Vec::new(),
            services: 0,
        }
    }

    pub fn last_lamp(&self) -> Option<LampState> {
        self.events.iter().rev().find_map(|e| match e {
            DisplayEvent::Lamp(s) => Some(*s),
            _ => None,
        })
    }

    pub fn gauges(&self) -> (Option<i32>, Option<i32>) {
        let temp = self.events.iter().rev().find_map(|e| match e {
            DisplayEvent::Temperature(v) => Some(*v),
            _ => None,
        });
        let humi = self.events.iter().rev().find_map(|e| match e {
            DisplayEvent::Humidity(v) => Some(*v),
            _ => None,
        });
        (temp, humi)
    }
}

impl DisplaySink for RecordingDisplay {
    fn notify(&mut self, event: &DisplayEvent) {
        self.events.push(*event);
        self.trace.borrow_mut().push(format!("display:{:?}", event));
    }

    fn service(&mut self) {
        self.services += 1;
    }
}

// ── TracedChannel ─────────────────────────────────────────────

/// [`LoopbackChannel`] that also records each call into the trace.
pub struct TracedChannel {
    trace: Trace,
    pub inner: LoopbackChannel,
}

impl TracedChannel {
    pub fn new(trace: &Trace) -> Self {
        Self {
            trace: Rc::clone(trace),
            inner: LoopbackChannel::new(),
        }
    }
}

impl SecureChannel for TracedChannel {
    fn connect(&mut self, client_id: &str) -> Result<(), ChannelError> {
        self.trace.borrow_mut().push(format!("connect:{client_id}"));
        self.inner.connect(client_id)
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), ChannelError> {
        self.trace.borrow_mut().push(format!("publish:{topic}"));
        self.inner.publish(topic, payload)
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), ChannelError> {
        self.trace.borrow_mut().push(format!("subscribe:{topic}"));
        self.inner.subscribe(topic)
    }

    fn service(&mut self) -> ServiceOutcome {
        let outcome = self.inner.service();
        self.trace.borrow_mut().push(format!("service:alive={}", outcome.alive));
        outcome
    }
}

// ── Rig ───────────────────────────────────────────────────────

pub const CLIENT_ID: &str = "climalink-efcafe";
pub const COMMAND_TOPIC: &str = "ATD3.5-S3/led";
pub const TELEMETRY_TOPIC: &str = "ATD3.5-S3/sensor";

/// A started service wired to mocks sharing one trace.
pub struct Rig {
    pub svc: DeviceService,
    pub hw: MockHardware,
    pub ch: TracedChannel,
    pub display: RecordingDisplay,
    pub trace: Trace,
}

#[allow(dead_code)]
impl Rig {
    pub fn new(config: SystemConfig) -> Self {
        let trace = trace();
        let mut hw = MockHardware::new(&trace);
        let mut display = RecordingDisplay::new(&trace);
        let mut svc = DeviceService::new(&config, CLIENT_ID, 0).expect("valid config");
        svc.start(&mut hw, &mut display);
        Self {
            svc,
            hw,
            ch: TracedChannel::new(&trace),
            display,
            trace,
        }
    }

    /// Started and connected at t=0, trace cleared.
    pub fn connected(config: SystemConfig) -> Self {
        let mut rig = Self::new(config);
        rig.step(0);
        rig.take();
        rig
    }

    pub fn step(&mut self, now: Millis) -> IterationReport {
        self.svc
            .run_iteration(now, &mut self.hw, &mut self.ch, &mut self.display)
    }

    pub fn take(&self) -> Vec<String> {
        take(&self.trace)
    }

    pub fn command(&mut self, payload: &[u8]) {
        self.ch.inner.inject(COMMAND_TOPIC, payload);
    }
}
