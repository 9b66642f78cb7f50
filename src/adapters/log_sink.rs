//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (UART console at 115200 baud in production).  Lines
//! are for humans; nothing parses them.

use log::{debug, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started => {
                info!("START | control loop running");
            }
            AppEvent::DistanceSampled(r) => {
                info!("DIST  | {} cm (t={} ms)", r.distance_cm, r.timestamp_ms);
            }
            AppEvent::SampleFailed(e) => {
                warn!("DIST  | sample failed ({}), keeping previous reading", e);
            }
            AppEvent::ProximityEntered { distance_cm } => {
                info!("PROX  | obstacle at {} cm", distance_cm);
            }
            AppEvent::ProximityReasserted { distance_cm } => {
                info!("PROX  | obstacle still at {} cm, overriding command", distance_cm);
            }
            AppEvent::ProximityCleared { distance_cm } => {
                info!("PROX  | clear at {} cm", distance_cm);
            }
            AppEvent::CommandsDropped { dropped } => {
                warn!(
                    "DROP  | commands being dropped, coming too quickly ({} overwritten)",
                    dropped
                );
            }
            AppEvent::MoveIssued { angle, source } => {
                info!("MOVE  | servo -> {} ({:?})", angle, source);
            }
            AppEvent::MoveFailed(e) => {
                warn!("MOVE  | failed: {}", e);
            }
            AppEvent::MoveSettled { discarded: 0 } => {
                debug!("BUSY  | settled");
            }
            AppEvent::MoveSettled { discarded } => {
                warn!(
                    "BUSY  | settled, {} command(s) received during the move discarded",
                    discarded
                );
            }
        }
    }
}
