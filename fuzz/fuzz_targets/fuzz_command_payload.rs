//! Fuzz target: BLE command characteristic writes
//!
//! Drives arbitrary payloads through the write handler and asserts that
//! parsing never panics, every write posts exactly once, and the posted
//! value is what `parse_command` returns.
//!
//! cargo fuzz run fuzz_command_payload

#![no_main]

use libfuzzer_sys::fuzz_target;
use robobob::adapters::ble::handle_command_write;
use robobob::app::commands::{parse_command, CommandSource};
use robobob::app::mailbox::CommandMailbox;

fuzz_target!(|data: &[u8]| {
    let mailbox = CommandMailbox::new();

    let posted = handle_command_write(&mailbox, data);
    assert_eq!(posted, parse_command(data));

    let cmd = mailbox.take().expect("a write always posts");
    assert_eq!(cmd.value, posted);
    assert_eq!(cmd.pending_count, 1);
    assert_eq!(cmd.source, CommandSource::Wireless);
    assert!(mailbox.take().is_none());
});
