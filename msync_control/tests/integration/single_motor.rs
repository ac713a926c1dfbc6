//! Single-motor scenarios: connect, report, reconnect.

use super::support::{Harness, MOTOR1, MOTOR2, revolutions};
use msync_control::cycle::TickOutcome;
use msync_drive::ChannelStatus;

#[test]
fn connects_then_reports_revolutions() {
    let mut h = Harness::new(true);

    assert_eq!(h.cycle.tick(), TickOutcome::Incomplete);
    assert_eq!(
        h.published(),
        vec![(
            "server/motor_status".to_string(),
            "Motor1 connected".to_string()
        )]
    );
    // Brought to the prevailing setpoint on connect.
    assert_eq!(h.rig.drive(MOTOR1).speeds, vec![0]);

    assert_eq!(h.cycle.tick(), TickOutcome::Reported("0.0".to_string()));
    h.rig.edit(MOTOR1, |d| d.position = 65_536);
    assert_eq!(h.cycle.tick(), TickOutcome::Reported("1.0".to_string()));
    assert_eq!(h.published_on("server/position"), vec!["0.0", "1.0"]);
}

#[test]
fn second_channel_is_never_touched() {
    let h = Harness::new(true);
    h.cycle.tick();
    h.cycle.tick();
    assert_eq!(h.state.channels().len(), 1);
    assert_eq!(h.rig.drive(MOTOR2).opens, 0);
}

#[test]
fn fractional_position_is_not_rounded() {
    let mut h = Harness::new(true);
    h.rig.edit(MOTOR1, |d| d.position = revolutions(2.25));
    h.cycle.tick();
    assert_eq!(h.cycle.tick(), TickOutcome::Reported("2.25".to_string()));
    h.rig.edit(MOTOR1, |d| d.position = -1);
    h.cycle.tick();
    assert_eq!(
        h.published_on("server/position").last().map(String::as_str),
        Some("-0.0000152587890625")
    );
}

#[test]
fn unavailable_drive_is_announced_on_every_attempt() {
    let mut h = Harness::new(true);
    h.rig.edit(MOTOR1, |d| d.online = false);

    for _ in 0..3 {
        assert_eq!(h.cycle.tick(), TickOutcome::Incomplete);
    }
    assert_eq!(
        h.published_on("server/motor_status"),
        vec!["Motor1 disconnected"; 3]
    );
    assert_eq!(h.rig.drive(MOTOR1).opens, 3);

    h.rig.edit(MOTOR1, |d| d.online = true);
    h.cycle.tick();
    assert_eq!(h.published_on("server/motor_status"), vec!["Motor1 connected"]);
}

#[test]
fn read_failure_drops_link_and_reconnects_next_tick() {
    let mut h = Harness::new(true);
    h.cycle.tick();
    h.published();

    h.rig.edit(MOTOR1, |d| d.read_fails = true);
    assert_eq!(h.cycle.tick(), TickOutcome::Incomplete);
    assert_eq!(h.state.channels()[0].lock().status(), ChannelStatus::Faulted);
    assert_eq!(h.published_on("server/motor_status"), vec!["Motor1 disconnected"]);

    h.rig.edit(MOTOR1, |d| {
        d.read_fails = false;
        d.position = 65_536 * 3;
    });
    h.cycle.tick();
    assert_eq!(h.rig.drive(MOTOR1).opens, 2);
    assert_eq!(h.cycle.tick(), TickOutcome::Reported("3.0".to_string()));
}

#[test]
fn write_failure_on_connect_keeps_channel() {
    let mut h = Harness::new(true);
    h.rig.edit(MOTOR1, |d| d.write_fails = true);
    h.cycle.tick();
    assert!(h.state.channels()[0].lock().is_connected());
    assert_eq!(h.published_on("server/motor_status"), vec!["Motor1 connected"]);
}

#[test]
fn bus_outage_does_not_disturb_the_cycle() {
    let h = Harness::new(true);
    h.bus.set_online(false);
    h.cycle.tick();
    assert_eq!(h.cycle.tick(), TickOutcome::Reported("0.0".to_string()));
    assert!(h.state.channels()[0].lock().is_connected());
}
