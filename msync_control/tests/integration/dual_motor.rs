//! Dual-motor scenarios: averaging, partial rigs and the desync stop.

use super::support::{Harness, MOTOR1, MOTOR2, revolutions};
use msync_control::command::dispatch;
use msync_control::cycle::TickOutcome;
use proptest::prelude::*;

fn connected() -> Harness {
    let mut h = Harness::new(false);
    assert_eq!(h.cycle.tick(), TickOutcome::Incomplete);
    assert_eq!(
        h.published_on("server/motor_status"),
        vec!["Motor1 connected", "Motor2 connected"]
    );
    h
}

#[test]
fn reports_mean_rounded_to_five_decimals() {
    let mut h = connected();
    h.rig.edit(MOTOR1, |d| d.position = revolutions(1.0));
    h.rig.edit(MOTOR2, |d| d.position = revolutions(1.5));
    assert_eq!(h.cycle.tick(), TickOutcome::Reported("1.25".to_string()));

    // 1/65536 rev apart: mean 1.00000762939453125 rev.
    h.rig.edit(MOTOR1, |d| d.position = 65_536);
    h.rig.edit(MOTOR2, |d| d.position = 65_537);
    assert_eq!(h.cycle.tick(), TickOutcome::Reported("1.00001".to_string()));

    h.rig.edit(MOTOR2, |d| d.position = 65_536);
    assert_eq!(h.cycle.tick(), TickOutcome::Reported("1.0".to_string()));
    assert_eq!(
        h.published_on("server/position"),
        vec!["1.25", "1.00001", "1.0"]
    );
}

#[test]
fn missing_second_drive_blocks_reporting_but_not_the_first() {
    let mut h = Harness::new(false);
    h.rig.edit(MOTOR2, |d| d.online = false);
    h.rig.edit(MOTOR1, |d| d.position = revolutions(4.0));

    for _ in 0..5 {
        assert_eq!(h.cycle.tick(), TickOutcome::Incomplete);
    }

    let published = h.published();
    assert!(published.iter().all(|(topic, _)| topic == "server/motor_status"));
    assert_eq!(
        published.iter().filter(|(_, t)| t == "Motor2 disconnected").count(),
        5
    );
    assert!(!h.state.is_sync_faulted());
    assert!(h.state.channels()[0].lock().is_connected());
    assert_eq!(h.rig.drive(MOTOR1).opens, 1);
}

#[test]
fn divergence_stops_and_latches() {
    let mut h = connected();
    dispatch(&h.state, 200);
    h.rig.edit(MOTOR1, |d| d.position = revolutions(5.3));
    h.rig.edit(MOTOR2, |d| d.position = revolutions(3.9));

    let TickOutcome::SyncFault { difference } = h.cycle.tick() else {
        panic!("expected a sync fault");
    };
    assert!((difference - 1.4).abs() < 1e-4);

    assert_eq!(h.published(), vec![(
        "server/motor_status".to_string(),
        "Motor desync".to_string()
    )]);
    for address in [MOTOR1, MOTOR2] {
        assert_eq!(h.rig.drive(address).speeds, vec![0, 200, 0]);
    }
    assert!(h.state.is_sync_faulted());
    assert_eq!(h.state.commanded_rpm(), 0);
    assert!(h.state.channels().iter().all(|c| !c.lock().is_connected()));

    // Terminal: no reconnects, nothing published, commands ignored.
    let report = dispatch(&h.state, 150);
    assert!(!report.accepted);
    for _ in 0..3 {
        assert_eq!(h.cycle.tick(), TickOutcome::Halted);
    }
    assert!(h.published().is_empty());
    assert_eq!(h.rig.drive(MOTOR1).opens, 1);
    assert_eq!(h.rig.drive(MOTOR2).opens, 1);
    assert_eq!(h.state.commanded_rpm(), 0);
}

#[test]
fn divergence_at_threshold_is_tolerated() {
    let h = connected();
    assert!(dispatch(&h.state, 120).accepted);
    h.rig.edit(MOTOR1, |d| d.position = revolutions(3.0));
    h.rig.edit(MOTOR2, |d| d.position = revolutions(2.0));
    assert_eq!(h.cycle.tick(), TickOutcome::Reported("2.5".to_string()));
    assert!(!h.state.is_sync_faulted());
    assert_eq!(h.state.commanded_rpm(), 120);
    assert!(h.state.channels().iter().all(|c| c.lock().is_connected()));
    for address in [MOTOR1, MOTOR2] {
        assert_eq!(h.rig.drive(address).speeds, vec![0, 120]);
    }
}

#[test]
fn read_failure_on_one_channel_keeps_the_other() {
    let mut h = connected();
    h.rig.edit(MOTOR2, |d| d.read_fails = true);

    assert_eq!(h.cycle.tick(), TickOutcome::Incomplete);
    assert_eq!(h.published_on("server/motor_status"), vec!["Motor2 disconnected"]);
    assert!(h.state.channels()[0].lock().is_connected());

    h.rig.edit(MOTOR2, |d| d.read_fails = false);
    h.cycle.tick();
    assert_eq!(h.published_on("server/motor_status"), vec!["Motor2 connected"]);
    assert_eq!(h.cycle.tick(), TickOutcome::Reported("0.0".to_string()));
}

#[test]
fn disconnected_channel_reconnects_at_latest_setpoint() {
    let h = Harness::new(false);
    h.rig.edit(MOTOR2, |d| d.online = false);
    h.cycle.tick();

    let report = dispatch(&h.state, 300);
    assert!(report.accepted);
    assert_eq!(h.rig.drive(MOTOR1).speeds, vec![0, 300]);
    assert!(h.rig.drive(MOTOR2).speeds.is_empty());

    h.rig.edit(MOTOR2, |d| d.online = true);
    h.cycle.tick();
    assert_eq!(h.rig.drive(MOTOR2).speeds, vec![300]);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn in_sync_tick_keeps_setpoint_and_links(
        base in -10_000_000i64..10_000_000,
        delta in -65_536i64..=65_536,
        rpm in -3_000i32..3_000,
    ) {
        let h = connected();
        prop_assert!(dispatch(&h.state, rpm).accepted);
        h.rig.edit(MOTOR1, |d| d.position = base + delta);
        h.rig.edit(MOTOR2, |d| d.position = base);

        let outcome = h.cycle.tick();
        prop_assert!(matches!(outcome, TickOutcome::Reported(_)), "{:?}", outcome);
        prop_assert!(!h.state.is_sync_faulted());
        prop_assert_eq!(h.state.commanded_rpm(), rpm);
        prop_assert!(h.state.channels().iter().all(|c| c.lock().is_connected()));
        for address in [MOTOR1, MOTOR2] {
            let drive = h.rig.drive(address);
            prop_assert_eq!(drive.speeds.last(), Some(&rpm));
            prop_assert_eq!(drive.opens, 1);
        }
    }

    #[test]
    fn divergence_beyond_threshold_stops_for_good(
        base in -10_000_000i64..10_000_000,
        magnitude in 65_537i64..1_000_000,
        negative in any::<bool>(),
        rpm in -3_000i32..3_000,
        extra_ticks in 1usize..8,
    ) {
        let h = connected();
        dispatch(&h.state, rpm);
        let delta = if negative { -magnitude } else { magnitude };
        h.rig.edit(MOTOR1, |d| d.position = base + delta);
        h.rig.edit(MOTOR2, |d| d.position = base);

        let outcome = h.cycle.tick();
        prop_assert!(matches!(outcome, TickOutcome::SyncFault { .. }), "{:?}", outcome);
        for _ in 0..extra_ticks {
            prop_assert_eq!(h.cycle.tick(), TickOutcome::Halted);
            prop_assert!(h.state.is_sync_faulted());
        }

        prop_assert_eq!(h.state.commanded_rpm(), 0);
        prop_assert!(h.state.channels().iter().all(|c| !c.lock().is_connected()));
        for address in [MOTOR1, MOTOR2] {
            let drive = h.rig.drive(address);
            prop_assert_eq!(drive.speeds.last(), Some(&0));
            prop_assert_eq!(drive.opens, 1);
        }
    }
}
