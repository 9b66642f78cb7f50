//! Sensor drivers.
//!
//! The only sensor on the board is the HC-SR04 ultrasonic ranger in
//! [`distance`].

pub mod distance;
