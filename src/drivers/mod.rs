//! Actuator drivers and system supervision.

pub mod servo;
pub mod watchdog;
