//! Command routing against live channels.

use super::support::{Harness, MOTOR1, MOTOR2};
use msync_common::bus::BusMessage;
use msync_control::command::{ChannelOutcome, dispatch, handle_message};
use msync_drive::ChannelStatus;

fn set_rpm(payload: &[u8]) -> BusMessage {
    BusMessage::new("motion/set_rpm", payload)
}

#[test]
fn write_failure_does_not_short_circuit() {
    let h = Harness::new(false);
    h.cycle.tick();
    h.rig.edit(MOTOR1, |d| d.write_fails = true);

    let report = dispatch(&h.state, 120);
    assert!(report.accepted);
    assert!(matches!(report.outcomes[0], ChannelOutcome::Failed(_)));
    assert_eq!(report.outcomes[1], ChannelOutcome::Applied);
    assert_eq!(report.failures(), 1);

    assert_eq!(h.rig.drive(MOTOR2).speeds, vec![0, 120]);
    assert_eq!(h.state.commanded_rpm(), 120);
    // A rejected write leaves the link up.
    assert_eq!(h.state.channels()[0].lock().status(), ChannelStatus::Connected);
}

#[test]
fn setpoint_is_stored_even_with_no_channel_connected() {
    let h = Harness::new(false);
    let report = dispatch(&h.state, -45);
    assert_eq!(
        report.outcomes,
        vec![ChannelOutcome::Deferred, ChannelOutcome::Deferred]
    );
    assert_eq!(h.state.commanded_rpm(), -45);

    h.cycle.tick();
    assert_eq!(h.rig.drive(MOTOR1).speeds, vec![-45]);
    assert_eq!(h.rig.drive(MOTOR2).speeds, vec![-45]);
}

#[test]
fn messages_apply_in_arrival_order() {
    let h = Harness::new(true);
    h.cycle.tick();

    let payloads: [&[u8]; 4] = [b"10", b"20.7", b"-5", b"0"];
    for payload in payloads {
        assert!(handle_message(&h.state, &set_rpm(payload)).is_some());
    }
    assert_eq!(h.rig.drive(MOTOR1).speeds, vec![0, 10, 20, -5, 0]);
}

#[test]
fn undecodable_payloads_change_nothing() {
    let h = Harness::new(true);
    h.cycle.tick();
    handle_message(&h.state, &set_rpm(b"80"));

    assert!(handle_message(&h.state, &set_rpm(&[0xc3, 0x28])).is_none());
    assert!(handle_message(&h.state, &set_rpm(b"full speed")).is_none());
    assert!(handle_message(&h.state, &set_rpm(b"inf")).is_none());
    assert!(handle_message(&h.state, &BusMessage::new("motion/home", "1")).is_none());

    assert_eq!(h.state.commanded_rpm(), 80);
    assert_eq!(h.rig.drive(MOTOR1).speeds, vec![0, 80]);
}
