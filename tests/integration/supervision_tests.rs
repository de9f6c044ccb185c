//! Integration tests for connection supervision through the full loop.
//!
//! Link loss, reconnect pacing and resubscription, observed through the
//! loopback channel and the shared trace.

use crate::mock_hw::{CLIENT_ID, COMMAND_TOPIC, Rig};

use climalink::app::lamp::LampState;
use climalink::app::supervisor::ConnectionState;
use climalink::config::{ReconnectPolicy, SystemConfig};

fn position(trace: &[String], entry: &str) -> usize {
    trace
        .iter()
        .position(|t| t == entry)
        .unwrap_or_else(|| panic!("'{entry}' not in {trace:?}"))
}

#[test]
fn drop_forces_disconnect_then_reconnect_and_resubscribe() {
    let mut rig = Rig::connected(SystemConfig::default());

    rig.ch.inner.drop_link();
    rig.step(5);
    assert_eq!(
        rig.take(),
        vec![
            "service:alive=false".to_string(),
            format!("connect:{CLIENT_ID}"),
            format!("subscribe:{COMMAND_TOPIC}"),
        ]
    );
    assert_eq!(rig.svc.connection_state(), ConnectionState::Connected);
    assert_eq!(rig.svc.status().link.drops, 1);
    assert_eq!(rig.ch.inner.subscriptions(), [COMMAND_TOPIC]);
}

#[test]
fn drop_with_broker_unreachable_stays_disconnected() {
    let mut rig = Rig::connected(SystemConfig::default());
    rig.ch.inner.drop_link();
    rig.ch.inner.set_unreachable(true);

    rig.step(5);
    assert_eq!(
        rig.take(),
        vec!["service:alive=false".to_string(), format!("connect:{CLIENT_ID}")]
    );
    assert_eq!(rig.svc.connection_state(), ConnectionState::Disconnected);
    let link = rig.svc.status().link;
    assert_eq!(link.drops, 1);
    assert_eq!(link.connects, 1);
}

#[test]
fn command_sent_while_down_is_not_applied_after_reconnect() {
    let mut rig = Rig::connected(SystemConfig::default());
    rig.ch.inner.drop_link();
    rig.command(b"1");

    assert_eq!(rig.step(5).lamp, None);
    assert_eq!(rig.step(10).lamp, None);
    assert_eq!(rig.svc.lamp_state(), LampState::Off);
    assert_eq!(rig.svc.connection_state(), ConnectionState::Connected);
}

#[test]
fn command_after_reconnect_follows_resubscription() {
    let mut rig = Rig::connected(SystemConfig::default());
    rig.ch.inner.drop_link();

    // The reconnect iteration accepts nothing.
    assert_eq!(rig.step(5).lamp, None);
    rig.command(b"1");
    assert_eq!(rig.step(10).lamp, Some(LampState::On));

    let trace = rig.take();
    assert!(
        position(&trace, &format!("subscribe:{COMMAND_TOPIC}")) < position(&trace, "lamp:on"),
        "subscription must precede delivery: {trace:?}"
    );
}

#[test]
fn immediate_policy_retries_every_iteration() {
    let mut rig = Rig::new(SystemConfig::default());
    rig.ch.inner.fail_next_connects(2);

    rig.step(0);
    assert_eq!(rig.svc.connection_state(), ConnectionState::Disconnected);
    rig.step(5);
    assert_eq!(rig.svc.connection_state(), ConnectionState::Disconnected);
    rig.step(10);
    assert_eq!(rig.svc.connection_state(), ConnectionState::Connected);

    let link = rig.svc.status().link;
    assert_eq!(link.connect_attempts, 3);
    assert_eq!(link.connects, 1);
    assert_eq!(rig.ch.inner.connect_count(), 3);
}

#[test]
fn backoff_policy_paces_attempts() {
    let mut rig = Rig::new(SystemConfig {
        reconnect: ReconnectPolicy::Backoff {
            initial_ms: 1000,
            max_ms: 4000,
        },
        ..SystemConfig::default()
    });
    rig.ch.inner.set_unreachable(true);

    rig.step(0); // attempt 1, next at 1000
    rig.step(500);
    rig.step(999);
    assert_eq!(rig.ch.inner.connect_count(), 1);

    rig.step(1000); // attempt 2, next at 3000
    rig.step(2999);
    assert_eq!(rig.ch.inner.connect_count(), 2);

    rig.ch.inner.set_unreachable(false);
    rig.step(3000);
    assert_eq!(rig.ch.inner.connect_count(), 3);
    assert_eq!(rig.svc.connection_state(), ConnectionState::Connected);
}

#[test]
fn rejected_subscription_keeps_session() {
    let mut rig = Rig::new(SystemConfig::default());
    rig.ch.inner.reject_subscriptions(true);

    rig.step(0);
    assert_eq!(rig.svc.connection_state(), ConnectionState::Connected);
    assert_eq!(rig.svc.status().link.subscribe_failures, 1);

    // No mid-session retry.
    rig.take();
    rig.step(5);
    assert_eq!(rig.take(), vec!["service:alive=true"]);
}

#[test]
fn sampling_continues_while_disconnected() {
    let mut rig = Rig::new(SystemConfig::default());
    rig.ch.inner.set_unreachable(true);
    rig.hw.push_reading(21.0, 45.0);

    let report = rig.step(5000);
    assert!(report.reading.is_some());
    assert!(!report.published);
    assert_eq!(rig.display.gauges(), (Some(21), Some(45)));
    assert_eq!(rig.svc.status().telemetry_dropped, 1);
}
