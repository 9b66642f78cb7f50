//! Control loop, the hexagonal core.
//!
//! [`ControlLoop`] owns the [`ControlState`] and a reference to the shared
//! [`CommandMailbox`].  One call to [`ControlLoop::tick`] is one iteration
//! of the firmware's polling loop.  All I/O flows through port traits
//! injected at the call site, making the loop testable with mock adapters.
//!
//! ```text
//!  SensorPort ──▶ ┌────────────────────────┐ ──▶ EventSink
//!                 │      ControlLoop       │
//! ActuatorPort ◀──│ sample · arbitrate ·   │◀── CommandMailbox
//!                 │ actuate · settle       │
//!                 └────────────────────────┘
//! ```
//!
//! The post-move settle time is an explicit [`Phase::Busy`] state instead
//! of a blocking sleep: while busy the loop neither samples, arbitrates nor
//! actuates, and anything posted to the mailbox during the move is
//! discarded once it completes.

use log::info;

use crate::config::SystemConfig;

use super::commands::CommandSource;
use super::events::AppEvent;
use super::mailbox::CommandMailbox;
use super::ports::{ActuatorPort, DistanceReading, EventSink, SensorPort};

// ───────────────────────────────────────────────────────────────
// State
// ───────────────────────────────────────────────────────────────

/// Where the loop is in its move cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Accepting samples and commands.
    Ready,
    /// A move was issued; nothing happens until `until_ms`.
    Busy { until_ms: u64 },
}

/// Everything the loop remembers between iterations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlState {
    /// Latest successful distance sample (`None` until the first one).
    pub last_reading: Option<DistanceReading>,
    /// Loop time of the last sample attempt, successful or not.
    pub last_sample_ms: Option<u64>,
    /// Hysteresis latch: set when the proximity command is posted, cleared
    /// when the release command is posted.
    pub proximity_triggered: bool,
    /// Ready or settling after a move.
    pub phase: Phase,
    /// Angle of the last move the servo accepted.
    pub commanded_angle: Option<i16>,
}

impl ControlState {
    pub fn new() -> Self {
        Self {
            last_reading: None,
            last_sample_ms: None,
            proximity_triggered: false,
            phase: Phase::Ready,
            commanded_angle: None,
        }
    }
}

impl Default for ControlState {
    fn default() -> Self {
        Self::new()
    }
}

/// What a single [`ControlLoop::tick`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Ready, but nothing to actuate.
    Idle,
    /// The servo was commanded to `angle`; the loop is now busy.
    Moved { angle: i16 },
    /// Still settling after a previous move.
    Busy,
}

// ───────────────────────────────────────────────────────────────
// ControlLoop
// ───────────────────────────────────────────────────────────────

pub struct ControlLoop<'m> {
    config: SystemConfig,
    mailbox: &'m CommandMailbox,
    state: ControlState,
}

impl<'m> ControlLoop<'m> {
    pub fn new(config: SystemConfig, mailbox: &'m CommandMailbox) -> Self {
        Self {
            config,
            mailbox,
            state: ControlState::new(),
        }
    }

    pub fn start(&mut self, sink: &mut impl EventSink) {
        sink.emit(&AppEvent::Started);
        info!(
            "ControlLoop started (trigger <= {} cm, sample every {} ms, settle {} ms)",
            self.config.trigger_distance_cm, self.config.sample_interval_ms, self.config.settle_ms
        );
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one loop iteration: settle → sample → arbitrate → actuate.
    ///
    /// `hw` satisfies **both** [`SensorPort`] and [`ActuatorPort`]; this
    /// avoids a double mutable borrow while keeping the port boundary
    /// explicit.
    pub fn tick(
        &mut self,
        now_ms: u64,
        hw: &mut (impl SensorPort + ActuatorPort),
        sink: &mut impl EventSink,
    ) -> TickOutcome {
        // 0. Settle
        if let Phase::Busy { until_ms } = self.state.phase {
            if now_ms < until_ms {
                return TickOutcome::Busy;
            }
            self.state.phase = Phase::Ready;
            let discarded = self.mailbox.clear();
            sink.emit(&AppEvent::MoveSettled { discarded });
        }

        // 1. Sample (rate-limited)
        let fresh = if self.sample_due(now_ms) {
            self.sample(now_ms, hw, sink)
        } else {
            None
        };

        // 2. Arbitrate on fresh data only
        if let Some(reading) = fresh {
            self.arbitrate(reading, sink);
        }

        // 3. Actuate
        self.service_mailbox(now_ms, hw, sink)
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> &ControlState {
        &self.state
    }

    pub fn is_busy(&self) -> bool {
        matches!(self.state.phase, Phase::Busy { .. })
    }

    // ── Internal ──────────────────────────────────────────────

    fn sample_due(&self, now_ms: u64) -> bool {
        self.state.last_sample_ms.is_none_or(|last| {
            now_ms.saturating_sub(last) >= u64::from(self.config.sample_interval_ms)
        })
    }

    fn sample(
        &mut self,
        now_ms: u64,
        hw: &mut impl SensorPort,
        sink: &mut impl EventSink,
    ) -> Option<DistanceReading> {
        self.state.last_sample_ms = Some(now_ms);

        match hw.measure_distance() {
            Ok(reading) => {
                self.state.last_reading = Some(reading);
                sink.emit(&AppEvent::DistanceSampled(reading));
                Some(reading)
            }
            Err(e) => {
                sink.emit(&AppEvent::SampleFailed(e));
                None
            }
        }
    }

    fn arbitrate(&mut self, reading: DistanceReading, sink: &mut impl EventSink) {
        let near = reading.distance_cm <= self.config.trigger_distance_cm;

        if near && self.state.proximity_triggered {
            // Proximity owns the servo while the obstacle stays in range.
            let displaced = self.mailbox.peek().is_pending()
                || self.state.commanded_angle != Some(self.config.proximity_angle);
            if displaced {
                self.mailbox
                    .post(self.config.proximity_angle, CommandSource::Proximity);
                sink.emit(&AppEvent::ProximityReasserted {
                    distance_cm: reading.distance_cm,
                });
            }
        } else if near {
            self.state.proximity_triggered = true;
            self.mailbox
                .post(self.config.proximity_angle, CommandSource::Proximity);
            sink.emit(&AppEvent::ProximityEntered {
                distance_cm: reading.distance_cm,
            });
        } else if !near && self.state.proximity_triggered {
            self.state.proximity_triggered = false;
            self.mailbox
                .post(self.config.release_angle, CommandSource::Proximity);
            sink.emit(&AppEvent::ProximityCleared {
                distance_cm: reading.distance_cm,
            });
        }
    }

    fn service_mailbox(
        &mut self,
        now_ms: u64,
        hw: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
    ) -> TickOutcome {
        let Some(cmd) = self.mailbox.take() else {
            return TickOutcome::Idle;
        };

        if cmd.pending_count > 1 {
            sink.emit(&AppEvent::CommandsDropped {
                dropped: cmd.dropped(),
            });
        }

        match hw.move_to(cmd.value) {
            Ok(()) => {
                self.state.commanded_angle = Some(cmd.value);
                self.state.phase = Phase::Busy {
                    until_ms: now_ms + u64::from(self.config.settle_ms),
                };
                sink.emit(&AppEvent::MoveIssued {
                    angle: cmd.value,
                    source: cmd.source,
                });
                TickOutcome::Moved { angle: cmd.value }
            }
            Err(e) => {
                sink.emit(&AppEvent::MoveFailed(e));
                TickOutcome::Idle
            }
        }
    }
}
