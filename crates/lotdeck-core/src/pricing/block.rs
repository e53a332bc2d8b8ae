//! A single pricing block and its slot position.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::GlobalPricing;
use crate::clock::{deserialize_lenient_time, TimeOfDay, MINUTES_PER_DAY};
use crate::input::deserialize_lenient_decimal;

/// Number of slots in every day schedule.
pub const SLOT_COUNT: usize = 3;

/// How a block bills the time it governs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BlockMode {
    /// Bills at the lot's global rate/cap.
    Default,
    /// One rule for the whole day.
    AllDay,
    /// A bounded time range with its own rate/cap.
    SetTime,
    /// Unused placeholder slot.
    NewBlock,
    /// Non-editable filler shown when slots 0 and 1 tile the whole day.
    NoTime,
}

impl BlockMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockMode::Default => "default",
            BlockMode::AllDay => "allDay",
            BlockMode::SetTime => "setTime",
            BlockMode::NewBlock => "newBlock",
            BlockMode::NoTime => "noTime",
        }
    }

    /// Whether an operator may pick this mode for `slot`.
    ///
    /// `NewBlock` and `NoTime` are derived states and never selectable.
    pub fn is_selectable_at(&self, slot: Slot) -> bool {
        match slot {
            Slot::First => matches!(
                self,
                BlockMode::Default | BlockMode::AllDay | BlockMode::SetTime
            ),
            Slot::Second | Slot::Third => matches!(self, BlockMode::Default | BlockMode::SetTime),
        }
    }

    /// Whether blocks in this mode are written to storage.
    pub fn is_persisted(&self) -> bool {
        matches!(self, BlockMode::AllDay | BlockMode::SetTime)
    }
}

impl fmt::Display for BlockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Position of a block within its day, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Slot {
    First,
    Second,
    Third,
}

impl Slot {
    pub const ALL: [Slot; SLOT_COUNT] = [Slot::First, Slot::Second, Slot::Third];

    pub fn index(&self) -> usize {
        match self {
            Slot::First => 0,
            Slot::Second => 1,
            Slot::Third => 2,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

impl TryFrom<u8> for Slot {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Slot::from_index(value as usize).ok_or_else(|| format!("slot index {value} out of range"))
    }
}

impl From<Slot> for u8 {
    fn from(slot: Slot) -> Self {
        slot.index() as u8
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index())
    }
}

/// One pricing rule within a day.
///
/// Times are only meaningful for `SetTime`. Blank rate or cap overrides
/// fall back to the lot's global values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayScheduleBlock {
    pub mode: BlockMode,
    #[serde(default, deserialize_with = "deserialize_lenient_time")]
    pub start_time: Option<TimeOfDay>,
    #[serde(default, deserialize_with = "deserialize_lenient_time")]
    pub end_time: Option<TimeOfDay>,
    #[serde(default, deserialize_with = "deserialize_lenient_decimal")]
    pub rate: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_lenient_decimal")]
    pub max_amount: Option<f64>,
}

impl DayScheduleBlock {
    fn bare(mode: BlockMode) -> Self {
        Self {
            mode,
            start_time: None,
            end_time: None,
            rate: None,
            max_amount: None,
        }
    }

    /// A `Default` block billing at the global rate/cap.
    pub fn remainder(global: &GlobalPricing) -> Self {
        Self {
            rate: Some(global.hourly_rate),
            max_amount: Some(global.daily_maximum_price),
            ..Self::bare(BlockMode::Default)
        }
    }

    /// An unused `NewBlock` slot.
    pub fn placeholder() -> Self {
        Self::bare(BlockMode::NewBlock)
    }

    /// The `NoTime` full-coverage filler.
    pub fn fully_covered() -> Self {
        Self::bare(BlockMode::NoTime)
    }

    pub fn all_day(rate: Option<f64>, max_amount: Option<f64>) -> Self {
        Self {
            rate,
            max_amount,
            ..Self::bare(BlockMode::AllDay)
        }
    }

    pub fn set_time(
        start_time: TimeOfDay,
        end_time: TimeOfDay,
        rate: Option<f64>,
        max_amount: Option<f64>,
    ) -> Self {
        Self {
            mode: BlockMode::SetTime,
            start_time: Some(start_time),
            end_time: Some(end_time),
            rate,
            max_amount,
        }
    }

    /// Start time, blank treated as 00:00.
    pub fn effective_start(&self) -> TimeOfDay {
        self.start_time.unwrap_or(TimeOfDay::MIDNIGHT)
    }

    /// End time, blank treated as 23:59.
    pub fn effective_end(&self) -> TimeOfDay {
        self.end_time.unwrap_or(TimeOfDay::END_OF_DAY)
    }

    /// Minutes this block governs.
    ///
    /// `SetTime` ranges wrap past midnight; an end of 00:00 after a
    /// 12:00 start is 720 minutes. Non-time modes other than `AllDay`
    /// govern nothing on their own.
    pub fn duration_minutes(&self) -> u16 {
        match self.mode {
            BlockMode::AllDay => MINUTES_PER_DAY,
            BlockMode::SetTime => self.effective_start().minutes_until(self.effective_end()),
            _ => 0,
        }
    }

    /// Whether `time` falls inside this block's half-open `[start, end)` range.
    pub fn contains(&self, time: TimeOfDay) -> bool {
        match self.mode {
            BlockMode::AllDay => true,
            BlockMode::SetTime => self.effective_start().minutes_until(time) < self.duration_minutes(),
            _ => false,
        }
    }

    /// Whether this block and `other` govern at least one common minute.
    pub fn overlaps(&self, other: &DayScheduleBlock) -> bool {
        if self.duration_minutes() == 0 || other.duration_minutes() == 0 {
            return false;
        }
        // Two non-empty arcs on the clock face meet iff one starts inside the other.
        self.contains(other.effective_start()) || other.contains(self.effective_start())
    }
}
