//! Application core: pure domain logic, zero I/O.
//!
//! This module contains the control rules for the ROBOBOB controller:
//! command parsing, the single-slot command mailbox, and the control loop
//! that arbitrates between BLE commands and proximity triggers.  All
//! interaction with hardware happens through **port traits** defined in
//! [`ports`], keeping this layer fully testable without real peripherals.

pub mod commands;
pub mod events;
pub mod mailbox;
pub mod ports;
pub mod service;
