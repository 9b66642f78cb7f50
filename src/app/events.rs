//! Outbound application events.
//!
//! The [`ControlLoop`](super::service::ControlLoop) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them; the firmware logs them to the serial
//! console, tests record them.

use super::commands::CommandSource;
use super::ports::DistanceReading;
use crate::error::{ActuatorError, SensorError};

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// The control loop has started.
    Started,

    /// A fresh distance sample was taken.
    DistanceSampled(DistanceReading),

    /// A distance sample failed; the previous reading is kept.
    SampleFailed(SensorError),

    /// An obstacle came within the trigger distance.
    ProximityEntered { distance_cm: u32 },

    /// The obstacle is still in range but another command displaced the
    /// proximity angle; it was posted again.
    ProximityReasserted { distance_cm: u32 },

    /// The obstacle moved back beyond the trigger distance.
    ProximityCleared { distance_cm: u32 },

    /// More than one command arrived before the loop serviced the mailbox;
    /// `dropped` earlier values were overwritten.
    CommandsDropped { dropped: u32 },

    /// The servo was commanded to a new angle.
    MoveIssued { angle: i16, source: CommandSource },

    /// The servo rejected a command.
    MoveFailed(ActuatorError),

    /// The post-move settle time elapsed; `discarded` commands that arrived
    /// during the move were thrown away.
    MoveSettled { discarded: u32 },
}
