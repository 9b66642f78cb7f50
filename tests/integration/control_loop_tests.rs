//! Integration tests for `ControlLoop` driven the way `main` drives it:
//! a 10 ms tick against mock hardware and the shared mailbox.

use super::mock_hw::{MockHardware, RecordingSink};
use robobob::app::commands::{parse_command, CommandSource};
use robobob::app::events::AppEvent;
use robobob::app::mailbox::CommandMailbox;
use robobob::app::service::{ControlLoop, TickOutcome};
use robobob::config::SystemConfig;
use robobob::error::SensorError;

const TICK_MS: u64 = 10;

/// Tick from `from` to `to` (inclusive) and return `(time, angle)` for
/// every move issued.
fn run(
    ctl: &mut ControlLoop<'_>,
    hw: &mut MockHardware,
    sink: &mut RecordingSink,
    from: u64,
    to: u64,
) -> Vec<(u64, i16)> {
    let mut moved = Vec::new();
    let mut t = from;
    while t <= to {
        if let TickOutcome::Moved { angle } = ctl.tick(t, hw, sink) {
            moved.push((t, angle));
        }
        t += TICK_MS;
    }
    moved
}

#[test]
fn approach_and_retreat_moves_servo_open_then_closed() {
    let mb = CommandMailbox::new();
    let mut ctl = ControlLoop::new(SystemConfig::default(), &mb);
    let mut hw = MockHardware::with_distances(&[20, 20, 6, 6, 20]);
    let mut sink = RecordingSink::new();
    ctl.start(&mut sink);

    let moved = run(&mut ctl, &mut hw, &mut sink, 0, 3000);

    // The third sample trips the trigger; samples pause for the settle
    // second, so the fourth lands at 1400 and the fifth at 1600.
    assert_eq!(moved, vec![(400, 90), (1600, 0)]);
    assert_eq!(hw.moves, vec![90, 0]);
    assert_eq!(sink.events.first(), Some(&AppEvent::Started));
}

#[test]
fn each_crossing_issues_exactly_one_command() {
    let mb = CommandMailbox::new();
    let mut ctl = ControlLoop::new(SystemConfig::default(), &mb);
    let mut hw = MockHardware::with_distances(&[10, 5, 10, 10]);
    let mut sink = RecordingSink::new();

    let moved = run(&mut ctl, &mut hw, &mut sink, 0, 2400);

    assert_eq!(moved, vec![(200, 90), (1200, 0)]);
    assert_eq!(hw.samples, 4 + 1, "one extra far sample after the script");
}

#[test]
fn sustained_presence_does_not_retrigger() {
    let mb = CommandMailbox::new();
    let mut ctl = ControlLoop::new(SystemConfig::default(), &mb);
    let mut hw = MockHardware::with_distances(&[3; 20]);
    let mut sink = RecordingSink::new();

    run(&mut ctl, &mut hw, &mut sink, 0, 4000);

    assert_eq!(hw.moves, vec![90]);
    assert!(ctl.state().proximity_triggered);
}

#[test]
fn wireless_command_cannot_hold_servo_while_obstacle_present() {
    let mb = CommandMailbox::new();
    let mut ctl = ControlLoop::new(SystemConfig::default(), &mb);
    let mut hw = MockHardware::with_distances(&[3; 40]);
    let mut sink = RecordingSink::new();

    run(&mut ctl, &mut hw, &mut sink, 0, 1000);
    assert_eq!(hw.moves, vec![90]);

    // Applied on the next tick, then the following near sample takes the
    // servo back.
    mb.post(parse_command(b"0"), CommandSource::Wireless);
    let moved = run(&mut ctl, &mut hw, &mut sink, 1010, 6000);

    assert_eq!(moved, vec![(1010, 0), (2010, 90)]);
    assert_eq!(hw.last_move(), Some(90));
    assert_eq!(
        sink.count(|e| matches!(e, AppEvent::ProximityReasserted { .. })),
        1
    );
}

#[test]
fn trigger_threshold_is_inclusive() {
    let mb = CommandMailbox::new();
    let mut ctl = ControlLoop::new(SystemConfig::default(), &mb);
    let mut hw = MockHardware::with_distances(&[8, 7]);
    let mut sink = RecordingSink::new();

    let moved = run(&mut ctl, &mut hw, &mut sink, 0, 300);

    assert_eq!(moved, vec![(200, 90)]);
}

#[test]
fn samples_at_most_once_per_interval() {
    let mb = CommandMailbox::new();
    let mut ctl = ControlLoop::new(SystemConfig::default(), &mb);
    let mut hw = MockHardware::new();
    let mut sink = RecordingSink::new();

    run(&mut ctl, &mut hw, &mut sink, 0, 1000);

    // 0, 200, 400, 600, 800, 1000
    assert_eq!(hw.samples, 6);
    assert!(hw.moves.is_empty());
}

#[test]
fn sensor_failures_are_reported_and_retried_next_interval() {
    let mb = CommandMailbox::new();
    let mut ctl = ControlLoop::new(SystemConfig::default(), &mb);
    let mut hw = MockHardware::new();
    hw.push_failure(SensorError::EchoTimeout);
    hw.push_failure(SensorError::EchoTimeout);
    let mut sink = RecordingSink::new();

    run(&mut ctl, &mut hw, &mut sink, 0, 400);

    assert_eq!(hw.samples, 3);
    assert_eq!(
        sink.count(|e| matches!(e, AppEvent::SampleFailed(SensorError::EchoTimeout))),
        2
    );
    assert!(hw.moves.is_empty());
}

#[test]
fn wireless_command_is_applied_on_next_tick() {
    let mb = CommandMailbox::new();
    let mut ctl = ControlLoop::new(SystemConfig::default(), &mb);
    let mut hw = MockHardware::new();
    let mut sink = RecordingSink::new();

    ctl.tick(0, &mut hw, &mut sink);
    mb.post(parse_command(b"45"), CommandSource::Wireless);

    assert_eq!(
        ctl.tick(TICK_MS, &mut hw, &mut sink),
        TickOutcome::Moved { angle: 45 }
    );
    assert!(sink.events.contains(&AppEvent::MoveIssued {
        angle: 45,
        source: CommandSource::Wireless,
    }));
    assert!(!mb.peek().is_pending(), "slot reset after the move");
}

#[test]
fn burst_of_writes_applies_last_and_warns() {
    let mb = CommandMailbox::new();
    let mut ctl = ControlLoop::new(SystemConfig::default(), &mb);
    let mut hw = MockHardware::new();
    let mut sink = RecordingSink::new();

    mb.post(parse_command(b"30"), CommandSource::Wireless);
    mb.post(parse_command(b"120"), CommandSource::Wireless);

    assert_eq!(
        ctl.tick(0, &mut hw, &mut sink),
        TickOutcome::Moved { angle: 120 }
    );
    assert_eq!(hw.moves, vec![120]);
    assert!(sink.events.contains(&AppEvent::CommandsDropped { dropped: 1 }));
}

#[test]
fn proximity_overwrites_pending_wireless_command() {
    let mb = CommandMailbox::new();
    let mut ctl = ControlLoop::new(SystemConfig::default(), &mb);
    let mut hw = MockHardware::with_distances(&[4]);
    let mut sink = RecordingSink::new();

    mb.post(parse_command(b"150"), CommandSource::Wireless);

    assert_eq!(
        ctl.tick(0, &mut hw, &mut sink),
        TickOutcome::Moved { angle: 90 }
    );
    assert!(sink.events.contains(&AppEvent::CommandsDropped { dropped: 1 }));
    assert!(sink.events.contains(&AppEvent::MoveIssued {
        angle: 90,
        source: CommandSource::Proximity,
    }));
}

#[test]
fn writes_during_settle_are_discarded() {
    let mb = CommandMailbox::new();
    let mut ctl = ControlLoop::new(SystemConfig::default(), &mb);
    let mut hw = MockHardware::new();
    let mut sink = RecordingSink::new();

    mb.post(60, CommandSource::Wireless);
    ctl.tick(0, &mut hw, &mut sink);
    assert!(ctl.is_busy());

    mb.post(10, CommandSource::Wireless);
    let moved = run(&mut ctl, &mut hw, &mut sink, TICK_MS, 2000);

    assert!(moved.is_empty());
    assert_eq!(hw.moves, vec![60]);
    assert!(sink.events.contains(&AppEvent::MoveSettled { discarded: 1 }));
}

#[test]
fn custom_config_changes_threshold_and_angles() {
    let config = SystemConfig {
        trigger_distance_cm: 15,
        proximity_angle: 170,
        release_angle: 10,
        ..SystemConfig::default()
    };
    let mb = CommandMailbox::new();
    let mut ctl = ControlLoop::new(config, &mb);
    let mut hw = MockHardware::with_distances(&[15, 16]);
    let mut sink = RecordingSink::new();

    run(&mut ctl, &mut hw, &mut sink, 0, 2000);

    assert_eq!(hw.moves, vec![170, 10]);
}
