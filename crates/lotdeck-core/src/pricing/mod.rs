//! Advanced (per-day, per-time-block) pricing for a parking lot.
//!
//! Each day of the week owns a [`DaySchedule`]: exactly three ordered slots
//! of [`DayScheduleBlock`]. Slot 0 governs the day; slots 1 and 2 only carry
//! meaning while every slot above them is a time-bounded `SetTime` block.
//! Only `AllDay` and `SetTime` blocks are ever persisted; `Default`,
//! `NewBlock` and `NoTime` are derived and rebuilt from the lot's
//! [`GlobalPricing`] on load.
//!
//! ```
//! use lotdeck_core::pricing::{BlockMode, DaySchedule, GlobalPricing, Slot};
//!
//! let global = GlobalPricing::new(3.0, 20.0);
//! let day = DaySchedule::parse(&[], &global);
//! assert_eq!(day.modes(), [BlockMode::Default, BlockMode::NewBlock, BlockMode::NewBlock]);
//!
//! let day = day.apply_mode_change(Slot::First, BlockMode::SetTime, &global).unwrap();
//! assert_eq!(day.modes(), [BlockMode::SetTime, BlockMode::Default, BlockMode::NewBlock]);
//! ```

mod block;
mod persisted;
mod schedule;
mod weekly;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use block::{BlockMode, DayScheduleBlock, Slot, SLOT_COUNT};
pub use persisted::{infer_legacy_mode, DayPersistedBlock, PersistedBlock, PersistedMode};
pub use schedule::{DaySchedule, EffectivePricing};
pub use weekly::WeeklySchedule;

/// The lot-wide defaults that `Default` blocks and blank overrides fall back to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GlobalPricing {
    /// Hourly rate.
    pub hourly_rate: f64,
    /// Daily price cap.
    pub daily_maximum_price: f64,
}

impl GlobalPricing {
    pub fn new(hourly_rate: f64, daily_maximum_price: f64) -> Self {
        Self {
            hourly_rate,
            daily_maximum_price,
        }
    }
}

/// Rejected schedule edits.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PricingError {
    /// The mode is not offered for this slot.
    #[error("mode {mode} cannot be selected for slot {slot}")]
    ModeNotSelectable { slot: Slot, mode: BlockMode },

    /// The slot has no covering context (a block above it is not SetTime)
    /// or is the derived full-coverage filler.
    #[error("slot {0} is not editable in the current schedule")]
    SlotInactive(Slot),

    /// The day breaks the slot layout: a mode a slot can never hold, or an
    /// active block below one that is not `SetTime`.
    #[error("mode {mode} is not allowed in slot {slot} of this day")]
    InvalidLayout { slot: Slot, mode: BlockMode },
}

/// Result type for pricing edits.
pub type Result<T> = std::result::Result<T, PricingError>;
