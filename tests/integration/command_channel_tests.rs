//! Integration tests for the BLE command channel (simulation path) feeding
//! the control loop through the shared mailbox.

use super::mock_hw::{MockHardware, RecordingSink};
use robobob::adapters::ble::{
    handle_command_write, BleAdapter, BleState, CommandChannelPort, READ_RESPONSE,
};
use robobob::app::commands::CommandSource;
use robobob::app::mailbox::CommandMailbox;
use robobob::app::service::{ControlLoop, TickOutcome};
use robobob::config::SystemConfig;

fn leaked_mailbox() -> &'static CommandMailbox {
    Box::leak(Box::new(CommandMailbox::new()))
}

fn started_adapter(mailbox: &'static CommandMailbox) -> BleAdapter {
    let config = SystemConfig::default();
    let mut ble = BleAdapter::new(config.device_name, config.adv_tx_power_dbm, mailbox);
    ble.start().expect("sim start never fails");
    ble
}

#[test]
fn adapter_advertises_configured_name() {
    let ble = started_adapter(leaked_mailbox());
    assert_eq!(ble.device_name(), "ROBOBOB");
    assert_eq!(ble.state(), BleState::Advertising);
    assert!(ble.is_active());
}

#[test]
fn written_angle_reaches_the_servo() {
    let mailbox = leaked_mailbox();
    let mut ble = started_adapter(mailbox);
    let mut ctl = ControlLoop::new(SystemConfig::default(), mailbox);
    let mut hw = MockHardware::new();
    let mut sink = RecordingSink::new();

    ble.on_central_connected();
    ble.on_command_write(b"135\n");

    assert_eq!(
        ctl.tick(0, &mut hw, &mut sink),
        TickOutcome::Moved { angle: 135 }
    );
    assert_eq!(hw.moves, vec![135]);
    assert_eq!(ble.received_count(), 1);
}

#[test]
fn garbage_write_closes_the_servo() {
    let mailbox = leaked_mailbox();
    let mut ble = started_adapter(mailbox);
    let mut ctl = ControlLoop::new(SystemConfig::default(), mailbox);
    let mut hw = MockHardware::new();
    let mut sink = RecordingSink::new();

    ble.on_command_write(b"open sesame");
    ctl.tick(0, &mut hw, &mut sink);

    assert_eq!(hw.moves, vec![0]);
}

#[test]
fn out_of_range_write_is_forwarded_unclamped() {
    let mailbox = leaked_mailbox();
    let mut ble = started_adapter(mailbox);

    assert_eq!(ble.on_command_write(b"-30"), -30);
    assert_eq!(mailbox.peek().value, -30);
    assert_eq!(ble.on_command_write(b"99999"), i16::MAX);
}

#[test]
fn reads_return_placeholder_and_leave_slot_alone() {
    let mailbox = leaked_mailbox();
    let mut ble = started_adapter(mailbox);

    ble.on_command_write(b"20");
    assert_eq!(ble.on_command_read(), READ_RESPONSE);
    assert_eq!(mailbox.peek().value, 20);
    assert!(mailbox.peek().is_pending());
}

#[test]
fn reconnect_after_disconnect() {
    let mut ble = started_adapter(leaked_mailbox());
    ble.on_central_connected();
    ble.on_central_disconnected();
    assert_eq!(ble.state(), BleState::Advertising);
    ble.on_central_connected();
    assert_eq!(ble.state(), BleState::Connected);
}

#[test]
fn concurrent_writer_and_loop_lose_nothing_silently() {
    static MAILBOX: CommandMailbox = CommandMailbox::new();

    let writer = std::thread::spawn(|| {
        for i in 0..500 {
            handle_command_write(&MAILBOX, format!("{}", i % 180).as_bytes());
        }
    });

    let mut ctl = ControlLoop::new(SystemConfig::default(), &MAILBOX);
    let mut hw = MockHardware::new();
    let mut sink = RecordingSink::new();
    let mut t = 0;
    while !writer.is_finished() {
        ctl.tick(t, &mut hw, &mut sink);
        t += 10;
    }
    writer.join().unwrap();
    ctl.tick(t + 2000, &mut hw, &mut sink);

    // Every post is either applied, reported as dropped, discarded while
    // settling, or still pending.
    let applied = hw.moves.len() as u32;
    let accounted: u32 = sink
        .events
        .iter()
        .map(|e| match e {
            robobob::app::events::AppEvent::CommandsDropped { dropped } => *dropped,
            robobob::app::events::AppEvent::MoveSettled { discarded } => *discarded,
            _ => 0,
        })
        .sum();
    let pending = MAILBOX.peek().pending_count;
    assert_eq!(applied + accounted + pending, 500);
    assert!(hw.moves.iter().all(|a| (0..180).contains(a)));
    assert!(sink.events.iter().all(|e| !matches!(
        e,
        robobob::app::events::AppEvent::MoveIssued {
            source: CommandSource::Proximity,
            ..
        }
    )));
}
