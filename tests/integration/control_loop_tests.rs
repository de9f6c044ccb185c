//! Integration tests for the DeviceService control loop.
//!
//! Drive whole loop iterations against mock adapters and assert on the
//! resulting trace of sensor reads, lamp writes, display updates and
//! channel calls.

use crate::mock_hw::{CLIENT_ID, COMMAND_TOPIC, Rig, TELEMETRY_TOPIC};

use climalink::app::events::{DisplayEvent, TelemetryPayload};
use climalink::app::lamp::LampState;
use climalink::app::ports::SensorError;
use climalink::app::supervisor::ConnectionState;
use climalink::config::{Locale, SystemConfig};

// ── Startup ───────────────────────────────────────────────────

#[test]
fn start_drives_lamp_off_and_shows_it() {
    let rig = Rig::new(SystemConfig::default());
    assert_eq!(rig.take(), vec!["lamp:off", "display:Lamp(Off)"]);
    assert_eq!(rig.svc.lamp_state(), LampState::Off);
}

#[test]
fn first_iteration_connects_and_subscribes_once() {
    let mut rig = Rig::new(SystemConfig::default());
    rig.take();

    rig.step(0);
    assert_eq!(
        rig.take(),
        vec![
            "service:alive=false".to_string(),
            format!("connect:{CLIENT_ID}"),
            format!("subscribe:{COMMAND_TOPIC}"),
        ]
    );

    rig.step(5);
    rig.step(10);
    assert_eq!(rig.take(), vec!["service:alive=true", "service:alive=true"]);
    assert_eq!(rig.ch.inner.connect_count(), 1);
    assert_eq!(rig.ch.inner.subscriptions(), [COMMAND_TOPIC]);
    assert_eq!(rig.svc.status().link.connects, 1);
}

#[test]
fn display_is_serviced_every_iteration() {
    let mut rig = Rig::connected(SystemConfig::default());
    rig.step(5);
    rig.step(10);
    assert_eq!(rig.display.services, 3);
}

// ── Commands ──────────────────────────────────────────────────

#[test]
fn command_with_trailing_bytes_switches_lamp_on() {
    let mut rig = Rig::connected(SystemConfig {
        locale: Locale::English,
        ..SystemConfig::default()
    });

    rig.command(b"1,extra");
    let report = rig.step(5);

    assert_eq!(report.lamp, Some(LampState::On));
    assert_eq!(rig.take(), vec!["service:alive=true", "lamp:on", "display:Lamp(On)"]);
    assert_eq!(rig.hw.lamp_on(), Some(true));
    assert_eq!(rig.display.last_lamp(), Some(LampState::On));
    assert_eq!(
        DisplayEvent::Lamp(LampState::On).label(Locale::English).as_str(),
        "on"
    );
}

#[test]
fn off_command_after_on() {
    let mut rig = Rig::connected(SystemConfig::default());
    rig.command(b"1");
    rig.step(5);
    rig.command(b"0");
    let report = rig.step(10);

    assert_eq!(report.lamp, Some(LampState::Off));
    assert_eq!(rig.hw.lamp_writes, vec![false, true, false]);
    assert_eq!(rig.svc.lamp_state(), LampState::Off);
}

#[test]
fn repeated_command_is_idempotent_and_renotifies() {
    let mut rig = Rig::connected(SystemConfig::default());
    rig.command(b"1");
    rig.step(5);
    rig.command(b"1");
    rig.step(10);

    assert_eq!(rig.hw.lamp_writes, vec![false, true, true]);
    let lamp_events: Vec<_> = rig
        .display
        .events
        .iter()
        .filter(|e| matches!(e, DisplayEvent::Lamp(LampState::On)))
        .collect();
    assert_eq!(lamp_events.len(), 2);
    assert_eq!(rig.svc.lamp_state(), LampState::On);
    assert_eq!(rig.svc.status().commands_applied, 2);
}

#[test]
fn non_commands_are_ignored_silently() {
    let mut rig = Rig::connected(SystemConfig::default());
    let payloads: [&[u8]; 5] = [b"", b"2", b"on", b"\x01", b" 1"];
    let mut now = 0;
    for payload in payloads {
        rig.command(payload);
        now += 5;
        assert_eq!(rig.step(now).lamp, None);
    }

    // Only the start-up write.
    assert_eq!(rig.hw.lamp_writes, vec![false]);
    assert_eq!(rig.svc.lamp_state(), LampState::Off);
    let status = rig.svc.status();
    assert_eq!(status.commands_ignored, 5);
    assert_eq!(status.commands_applied, 0);
}

#[test]
fn one_message_routed_per_iteration() {
    let mut rig = Rig::connected(SystemConfig::default());
    rig.command(b"1");
    rig.command(b"0");

    assert_eq!(rig.step(5).lamp, Some(LampState::On));
    assert_eq!(rig.step(10).lamp, Some(LampState::Off));
    assert_eq!(rig.step(15).lamp, None);
}

// ── Sampling + telemetry ──────────────────────────────────────

#[test]
fn reading_is_truncated_shown_then_published() {
    let mut rig = Rig::connected(SystemConfig::default());
    rig.hw.push_reading(24.7, 55.2);

    let report = rig.step(5000);

    let reading = report.reading.expect("tick due");
    assert_eq!((reading.temperature, reading.humidity), (24, 55));
    assert!(report.published);
    assert_eq!(
        rig.take(),
        vec![
            "measure".to_string(),
            "display:Temperature(24)".to_string(),
            "display:Humidity(55)".to_string(),
            format!("publish:{TELEMETRY_TOPIC}"),
            "service:alive=true".to_string(),
        ]
    );

    let sent = rig.ch.inner.published();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].topic, TELEMETRY_TOPIC);
    assert_eq!(sent[0].payload, br#"{"temp":24,"humi":55}"#.to_vec());
    assert_eq!(rig.display.gauges(), (Some(24), Some(55)));
}

#[test]
fn negative_temperature_truncates_toward_zero() {
    let mut rig = Rig::connected(SystemConfig::default());
    rig.hw.push_reading(-3.9, 99.99);
    rig.step(5000);

    let body: TelemetryPayload =
        serde_json::from_slice(&rig.ch.inner.published()[0].payload).unwrap();
    assert_eq!(body, TelemetryPayload { temp: -3, humi: 99 });
}

#[test]
fn no_sample_before_period_elapses() {
    let mut rig = Rig::connected(SystemConfig::default());
    rig.step(4999);
    assert_eq!(rig.hw.reads, 0);
    rig.step(5000);
    assert_eq!(rig.hw.reads, 1);
    rig.step(9999);
    assert_eq!(rig.hw.reads, 1);
}

#[test]
fn sensor_failure_skips_tick_without_delaying_next() {
    let mut rig = Rig::connected(SystemConfig::default());
    rig.hw.push_failure(SensorError::Crc);
    rig.hw.push_reading(20.1, 40.9);

    let report = rig.step(5000);
    assert_eq!(report.reading, None);
    assert!(!report.published);
    assert!(rig.ch.inner.published().is_empty());
    assert_eq!(rig.display.gauges(), (None, None));

    rig.step(9999);
    assert_eq!(rig.hw.reads, 1);

    let report = rig.step(10_000);
    assert_eq!(report.reading.map(|r| r.temperature), Some(20));
    assert_eq!(rig.ch.inner.published().len(), 1);
    assert_eq!(rig.svc.status().sensor_failures, 1);
}

#[test]
fn failed_tick_still_counts_as_sampled() {
    let mut rig = Rig::connected(SystemConfig::default());
    rig.hw.push_failure(SensorError::NotResponding);

    assert!(!rig.step(4999).sampled);
    let report = rig.step(5000);
    assert!(report.sampled);
    assert_eq!(report.reading, None);
    assert_eq!(rig.svc.status().sensor_failures, 1);

    rig.hw.push_reading(22.0, 50.0);
    let report = rig.step(10_000);
    assert!(report.sampled);
    assert!(report.reading.is_some());
}

#[test]
fn stalled_loop_does_not_burst_samples() {
    let mut rig = Rig::connected(SystemConfig::default());
    rig.step(23_000);
    rig.step(23_005);
    assert_eq!(rig.hw.reads, 1);
    rig.step(28_000);
    assert_eq!(rig.hw.reads, 2);
}

#[test]
fn telemetry_while_down_is_dropped_not_replayed() {
    let mut rig = Rig::connected(SystemConfig::default());
    rig.hw.push_reading(24.0, 50.0);
    rig.hw.push_reading(25.0, 51.0);

    rig.ch.inner.drop_link();
    rig.ch.inner.set_unreachable(true);
    let report = rig.step(5000);
    assert!(report.reading.is_some());
    assert!(!report.published);
    // Gauges still reflect the reading.
    assert_eq!(rig.display.gauges(), (Some(24), Some(50)));

    rig.ch.inner.set_unreachable(false);
    rig.step(5005);
    assert_eq!(rig.svc.connection_state(), ConnectionState::Connected);
    assert!(rig.ch.inner.published().is_empty());

    rig.step(10_005);
    let sent = rig.ch.inner.published();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].payload, br#"{"temp":25,"humi":51}"#.to_vec());

    let status = rig.svc.status();
    assert_eq!(status.telemetry_dropped, 1);
    assert_eq!(status.telemetry_published, 1);
}

#[test]
fn status_tracks_last_reading_and_iterations() {
    let mut rig = Rig::connected(SystemConfig::default());
    rig.hw.push_reading(30.2, 61.8);
    rig.step(5000);

    let status = rig.svc.status();
    let last = status.last_reading.expect("reading");
    assert_eq!((last.temperature, last.humidity), (30, 61));
    assert_eq!(last.timestamp.as_millis(), 5000);
    assert_eq!(status.iterations, 2);
}
