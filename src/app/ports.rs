//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ ControlLoop (domain)
//! ```
//!
//! Driven adapters (distance sensor, servo, event sinks, clock) implement
//! these traits.  The [`ControlLoop`](super::service::ControlLoop) consumes
//! them via generics, so the domain core never touches hardware directly.

use crate::error::{ActuatorError, SensorError};

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// A single distance measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DistanceReading {
    /// Distance to the nearest reflecting surface (centimetres).
    pub distance_cm: u32,
    /// Monotonic time of the measurement (milliseconds since boot).
    pub timestamp_ms: u64,
}

/// Read-side port: the domain calls this to obtain a distance sample.
pub trait SensorPort {
    /// Trigger one measurement and block until it completes or times out.
    fn measure_distance(&mut self) -> Result<DistanceReading, SensorError>;
}

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port: the domain calls this to command the servo.
pub trait ActuatorPort {
    /// Command the servo to `angle` degrees.  Fire-and-forget: there is no
    /// position feedback, and range handling is left to the driver.
    fn move_to(&mut self, angle: i16) -> Result<(), ActuatorError>;
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic microsecond clock used for echo pulse timing and timestamps.
pub trait MonotonicClock {
    fn now_us(&self) -> u64;

    fn now_ms(&self) -> u64 {
        self.now_us() / 1000
    }
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go (serial log, tests).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}
