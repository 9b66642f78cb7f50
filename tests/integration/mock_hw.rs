//! Mock hardware adapter for integration tests.
//!
//! Plays back a scripted list of distance readings and records every
//! servo command so tests can assert on the full move history without
//! touching real GPIO/PWM registers.

use robobob::app::events::AppEvent;
use robobob::app::ports::{ActuatorPort, DistanceReading, EventSink, SensorPort};
use robobob::error::{ActuatorError, SensorError};
use std::collections::VecDeque;

/// Distance reported once the script runs out: far away, nothing near.
pub const FAR_CM: u32 = 400;

// ── MockHardware ──────────────────────────────────────────────

pub struct MockHardware {
    readings: VecDeque<Result<u32, SensorError>>,
    pub moves: Vec<i16>,
    pub samples: u32,
}

impl MockHardware {
    pub fn new() -> Self {
        Self {
            readings: VecDeque::new(),
            moves: Vec::new(),
            samples: 0,
        }
    }

    pub fn with_distances(distances: &[u32]) -> Self {
        let mut hw = Self::new();
        hw.readings.extend(distances.iter().map(|&d| Ok(d)));
        hw
    }

    pub fn push_failure(&mut self, err: SensorError) {
        self.readings.push_back(Err(err));
    }

    pub fn last_move(&self) -> Option<i16> {
        self.moves.last().copied()
    }
}

impl Default for MockHardware {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorPort for MockHardware {
    fn measure_distance(&mut self) -> Result<DistanceReading, SensorError> {
        self.samples += 1;
        let distance_cm = self.readings.pop_front().unwrap_or(Ok(FAR_CM))?;
        Ok(DistanceReading {
            distance_cm,
            timestamp_ms: 0,
        })
    }
}

impl ActuatorPort for MockHardware {
    fn move_to(&mut self, angle: i16) -> Result<(), ActuatorError> {
        self.moves.push(angle);
        Ok(())
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}
