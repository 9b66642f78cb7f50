//! Unified error types for the ROBOBOB firmware.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! control loop's "log and continue" handling uniform.  All variants are
//! `Copy` so they can be passed through the loop and event sink without
//! allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The distance sensor could not produce a reading.
    Sensor(SensorError),
    /// A servo command failed.
    Actuator(ActuatorError),
    /// The BLE command channel failed.
    Comms(CommsError),
    /// Configuration is invalid.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Actuator(e) => write!(f, "actuator: {e}"),
            Self::Comms(e) => write!(f, "comms: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// No echo pulse arrived before the timeout (nothing in range, or a
    /// disconnected sensor).
    EchoTimeout,
    /// Reading the echo GPIO failed.
    GpioReadFailed,
    /// Driving the trigger GPIO failed.
    GpioWriteFailed,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EchoTimeout => write!(f, "echo timeout"),
            Self::GpioReadFailed => write!(f, "GPIO read failed"),
            Self::GpioWriteFailed => write!(f, "GPIO write failed"),
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Actuator errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorError {
    /// PWM duty-cycle write failed.
    PwmWriteFailed,
}

impl fmt::Display for ActuatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PwmWriteFailed => write!(f, "PWM write failed"),
        }
    }
}

impl From<ActuatorError> for Error {
    fn from(e: ActuatorError) -> Self {
        Self::Actuator(e)
    }
}

// ---------------------------------------------------------------------------
// Communications errors
// ---------------------------------------------------------------------------

/// BLE bring-up failures.  The `i32` is the raw `esp_err_t`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommsError {
    ControllerInitFailed(i32),
    BluedroidInitFailed(i32),
    GattRegisterFailed(i32),
    AdvertisingFailed(i32),
}

impl fmt::Display for CommsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ControllerInitFailed(rc) => write!(f, "BT controller init failed (rc={rc})"),
            Self::BluedroidInitFailed(rc) => write!(f, "Bluedroid init failed (rc={rc})"),
            Self::GattRegisterFailed(rc) => write!(f, "GATT registration failed (rc={rc})"),
            Self::AdvertisingFailed(rc) => write!(f, "advertising failed (rc={rc})"),
        }
    }
}

impl From<CommsError> for Error {
    fn from(e: CommsError) -> Self {
        Self::Comms(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
