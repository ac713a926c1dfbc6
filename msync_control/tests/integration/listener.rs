//! Command listener on its own thread against the in-process bus.

use super::support::{Harness, MOTOR1};
use msync_common::bus::MessageBus;
use msync_control::listener::CommandListener;
use std::thread;
use std::time::{Duration, Instant};

fn wait_until(what: &str, cond: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !cond() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn applies_commands_and_survives_bus_loss() {
    let h = Harness::new(true);
    h.cycle.tick();

    let mut listener = CommandListener::new(
        h.state.clone(),
        h.bus.clone(),
        Duration::ZERO,
        Duration::from_millis(20),
    );
    let worker = thread::spawn(move || {
        listener.run();
        listener.messages_handled()
    });

    // Harness subscription plus the listener's.
    wait_until("listener subscription", || h.bus.subscriber_count() == 2);
    h.bus.publish("motion/set_rpm", b"250").unwrap();
    wait_until("first command", || h.state.commanded_rpm() == 250);

    h.bus.set_online(false);
    h.bus.set_online(true);
    wait_until("resubscription", || h.bus.subscriber_count() == 1);
    h.bus.publish("motion/other", b"1").unwrap();
    h.bus.publish("motion/set_rpm", b"-75.5").unwrap();
    wait_until("second command", || h.state.commanded_rpm() == -75);

    h.state.request_stop();
    let handled = worker.join().unwrap();
    assert_eq!(handled, 3);
    assert_eq!(h.rig.drive(MOTOR1).speeds, vec![0, 250, -75]);
}

#[test]
fn stops_during_start_delay() {
    let h = Harness::new(true);
    let mut listener = CommandListener::new(
        h.state.clone(),
        h.bus.clone(),
        Duration::from_secs(60),
        Duration::from_secs(60),
    );
    let worker = thread::spawn(move || listener.run());

    thread::sleep(Duration::from_millis(20));
    h.state.request_stop();
    let started = Instant::now();
    worker.join().unwrap();
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(h.bus.subscriber_count(), 1);
}
