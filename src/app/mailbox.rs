//! Single-slot command mailbox.
//!
//! Two producers (the Bluedroid write callback and the loop's proximity
//! logic) and one consumer (the control loop) share one slot.  A post
//! overwrites the stored value and bumps the pending count; the consumer
//! takes the slot and resets it.  Only the last value survives.
//!
//! ```text
//! ┌──────────────┐  post(value)   ┌──────────────┐  take()  ┌──────────────┐
//! │ BLE callback │──────────────▶│              │─────────▶│              │
//! └──────────────┘                │   Mailbox    │          │ Control Loop │
//! ┌──────────────┐  post(value)   │ (1 slot, CS) │          │  (consumer)  │
//! │  Proximity   │──────────────▶│              │          │              │
//! └──────────────┘                └──────────────┘          └──────────────┘
//! ```
//!
//! The slot lives behind an `embassy-sync` critical-section mutex so the
//! value and the count always change together, even when the BLE task
//! preempts the control loop.

use core::cell::Cell;

use embassy_sync::blocking_mutex::CriticalSectionMutex;

use super::commands::CommandSource;

/// Contents of the mailbox slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PendingCommand {
    /// Most recently posted servo angle.
    pub value: i16,
    /// Posts since the slot was last taken.  More than one means earlier
    /// values were overwritten.
    pub pending_count: u32,
    /// Producer of `value`.
    pub source: CommandSource,
}

impl PendingCommand {
    /// Whether any post is waiting.
    pub fn is_pending(&self) -> bool {
        self.pending_count > 0
    }

    /// Whether more than one post was merged into this slot.
    pub fn dropped(&self) -> u32 {
        self.pending_count.saturating_sub(1)
    }
}

/// Thread-safe single-slot, overwrite-on-full command mailbox.
pub struct CommandMailbox {
    slot: CriticalSectionMutex<Cell<PendingCommand>>,
}

impl Default for CommandMailbox {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandMailbox {
    pub const fn new() -> Self {
        Self {
            slot: CriticalSectionMutex::new(Cell::new(PendingCommand {
                value: 0,
                pending_count: 0,
                source: CommandSource::Wireless,
            })),
        }
    }

    /// Overwrite the slot with `value` and return the new pending count.
    pub fn post(&self, value: i16, source: CommandSource) -> u32 {
        self.slot.lock(|cell| {
            let mut slot = cell.get();
            slot.value = value;
            slot.source = source;
            slot.pending_count = slot.pending_count.saturating_add(1);
            cell.set(slot);
            slot.pending_count
        })
    }

    /// Take the pending command, resetting the slot to `0` / no pending.
    /// Returns `None` when nothing has been posted since the last take.
    pub fn take(&self) -> Option<PendingCommand> {
        self.slot.lock(|cell| {
            let slot = cell.take();
            slot.is_pending().then_some(slot)
        })
    }

    /// Discard whatever is pending and return how many posts were lost.
    pub fn clear(&self) -> u32 {
        self.slot.lock(|cell| cell.take().pending_count)
    }

    /// Current slot contents without consuming them.
    pub fn peek(&self) -> PendingCommand {
        self.slot.lock(Cell::get)
    }
}
