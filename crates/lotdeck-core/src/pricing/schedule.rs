//! The fixed three-slot schedule for one day and its transition rules.

use serde::{Deserialize, Serialize};

use super::block::{BlockMode, DayScheduleBlock, Slot, SLOT_COUNT};
use super::persisted::{PersistedBlock, PersistedMode};
use super::{GlobalPricing, PricingError, Result};
use crate::clock::{TimeOfDay, MINUTES_PER_DAY};

/// One day's pricing: exactly three ordered slots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DaySchedule {
    blocks: [DayScheduleBlock; SLOT_COUNT],
}

/// The rate and cap in force at a given moment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EffectivePricing {
    pub hourly_rate: f64,
    pub daily_maximum_price: f64,
    /// The slot that supplied the price, `None` for the lot's global defaults.
    pub slot: Option<Slot>,
}

impl Default for DaySchedule {
    /// `[Default, NewBlock, NewBlock]` without any rate attached.
    fn default() -> Self {
        let mut blocks = Self::placeholders();
        blocks[0].mode = BlockMode::Default;
        Self { blocks }
    }
}

impl DaySchedule {
    fn placeholders() -> [DayScheduleBlock; SLOT_COUNT] {
        [
            DayScheduleBlock::placeholder(),
            DayScheduleBlock::placeholder(),
            DayScheduleBlock::placeholder(),
        ]
    }

    /// Creates a schedule from three blocks as-is.
    pub fn from_blocks(blocks: [DayScheduleBlock; SLOT_COUNT]) -> Self {
        Self { blocks }
    }

    /// A day with no overrides: `[Default, NewBlock, NewBlock]`.
    pub fn empty(global: &GlobalPricing) -> Self {
        Self::parse(&[], global)
    }

    /// Rebuilds a day from its stored blocks.
    ///
    /// Stored blocks fill slots in order. `AllDay` is only accepted in slot 0
    /// and closes the day; one that appears after a `SetTime` block is
    /// dropped, as are unusable records. When one or two `SetTime` blocks were
    /// placed, a `Default` remainder follows them so uncovered time still
    /// bills at the global rate. Missing rates fall back to `global`.
    pub fn parse(persisted: &[PersistedBlock], global: &GlobalPricing) -> Self {
        let mut blocks = Self::placeholders();
        let mut placed = 0;
        let mut closed = false;

        for record in persisted {
            if placed == SLOT_COUNT {
                break;
            }
            let Some(mode) = record.resolved_mode() else {
                continue;
            };
            let rate = record.hourly_rate.or(Some(global.hourly_rate));
            let max_amount = record
                .daily_maximum_price
                .or(Some(global.daily_maximum_price));

            match mode {
                PersistedMode::AllDay if placed == 0 => {
                    blocks[0] = DayScheduleBlock::all_day(rate, max_amount);
                    closed = true;
                    break;
                }
                PersistedMode::AllDay => continue,
                PersistedMode::SetTime => {
                    blocks[placed] = DayScheduleBlock::set_time(
                        record.start_time.unwrap_or(TimeOfDay::MIDNIGHT),
                        record.end_time.unwrap_or(TimeOfDay::END_OF_DAY),
                        rate,
                        max_amount,
                    );
                    placed += 1;
                }
            }
        }

        if !closed && placed < SLOT_COUNT {
            blocks[placed] = DayScheduleBlock::remainder(global);
        }

        Self { blocks }
    }

    pub fn blocks(&self) -> &[DayScheduleBlock; SLOT_COUNT] {
        &self.blocks
    }

    pub fn block(&self, slot: Slot) -> &DayScheduleBlock {
        &self.blocks[slot.index()]
    }

    /// Mutable access for editing times and price overrides in place.
    pub fn block_mut(&mut self, slot: Slot) -> &mut DayScheduleBlock {
        &mut self.blocks[slot.index()]
    }

    pub fn modes(&self) -> [BlockMode; SLOT_COUNT] {
        [
            self.blocks[0].mode,
            self.blocks[1].mode,
            self.blocks[2].mode,
        ]
    }

    /// Checks the slot layout of a day received from a client.
    ///
    /// Slot 0 holds `Default`, `AllDay` or `SetTime`. A lower slot is active
    /// (`Default` or `SetTime`, or `NoTime` in slot 2) exactly when every
    /// slot above it is `SetTime`, and `NewBlock` otherwise.
    pub fn validate(&self) -> Result<()> {
        for slot in Slot::ALL {
            let mode = self.block(slot).mode;
            let governed = self.blocks[..slot.index()]
                .iter()
                .all(|b| b.mode == BlockMode::SetTime);

            let allowed = if governed {
                mode.is_selectable_at(slot) || (slot == Slot::Third && mode == BlockMode::NoTime)
            } else {
                mode == BlockMode::NewBlock
            };

            if !allowed {
                return Err(PricingError::InvalidLayout { slot, mode });
            }
        }
        Ok(())
    }

    /// Whether an operator may currently change the mode of `slot`.
    ///
    /// A slot is editable only while every slot above it is `SetTime`. The
    /// `NoTime` filler is never editable.
    pub fn is_editable(&self, slot: Slot) -> bool {
        let governed = self.blocks[..slot.index()]
            .iter()
            .all(|b| b.mode == BlockMode::SetTime);
        governed && self.block(slot).mode != BlockMode::NoTime
    }

    /// Applies an operator's mode choice and cascades it to the slots below.
    ///
    /// Slot 0 to `SetTime` resets slot 1 to `Default` and slot 2 to
    /// `NewBlock`; slot 0 to `AllDay` or `Default` resets both to `NewBlock`.
    /// Slot 1 to `SetTime` resets slot 2 to `Default`; slot 1 to `Default`
    /// resets slot 2 to `NewBlock`. Choosing the mode a slot already has
    /// changes nothing.
    pub fn apply_mode_change(
        &self,
        slot: Slot,
        mode: BlockMode,
        global: &GlobalPricing,
    ) -> Result<DaySchedule> {
        if !mode.is_selectable_at(slot) {
            return Err(PricingError::ModeNotSelectable { slot, mode });
        }
        if !self.is_editable(slot) {
            return Err(PricingError::SlotInactive(slot));
        }

        let mut next = self.clone();
        if self.block(slot).mode == mode {
            return Ok(next);
        }

        let target = next.block_mut(slot);
        match mode {
            BlockMode::Default => *target = DayScheduleBlock::remainder(global),
            _ => target.mode = mode,
        }

        match (slot, mode) {
            (Slot::First, BlockMode::SetTime) => {
                next.blocks[1] = DayScheduleBlock::remainder(global);
                next.blocks[2] = DayScheduleBlock::placeholder();
            }
            (Slot::First, _) => {
                next.blocks[1] = DayScheduleBlock::placeholder();
                next.blocks[2] = DayScheduleBlock::placeholder();
            }
            (Slot::Second, BlockMode::SetTime) => {
                next.blocks[2] = DayScheduleBlock::remainder(global);
            }
            (Slot::Second, _) => {
                next.blocks[2] = DayScheduleBlock::placeholder();
            }
            (Slot::Third, _) => {}
        }

        Ok(next)
    }

    /// Whether slots 0 and 1 are both `SetTime` and together last exactly
    /// one day.
    pub fn is_fully_covered(&self) -> bool {
        let [first, second, _] = &self.blocks;
        first.mode == BlockMode::SetTime
            && second.mode == BlockMode::SetTime
            && first.duration_minutes() + second.duration_minutes() == MINUTES_PER_DAY
    }

    /// Derives the slot 2 filler from slots 0 and 1.
    ///
    /// Full coverage turns slot 2 into `NoTime`. Otherwise a `NoTime` slot 2
    /// falls back to a `Default` remainder; any other slot 2 is left alone.
    /// Idempotent.
    pub fn adjust_coverage(&self, global: &GlobalPricing) -> DaySchedule {
        let mut next = self.clone();
        if self.is_fully_covered() {
            next.blocks[2] = DayScheduleBlock::fully_covered();
        } else if self.blocks[2].mode == BlockMode::NoTime {
            next.blocks[2] = DayScheduleBlock::remainder(global);
        }
        next
    }

    /// The stored form: only `AllDay` and `SetTime` blocks, in slot order.
    pub fn build_persistable_blocks(&self, global: &GlobalPricing) -> Vec<PersistedBlock> {
        self.blocks
            .iter()
            .filter_map(|block| PersistedBlock::from_block(block, global))
            .collect()
    }

    /// The first pair of stored blocks that govern a common minute.
    pub fn overlapping_slots(&self) -> Option<(Slot, Slot)> {
        for (i, a) in self.blocks.iter().enumerate() {
            if !a.mode.is_persisted() {
                continue;
            }
            for (j, b) in self.blocks.iter().enumerate().skip(i + 1) {
                if b.mode.is_persisted() && a.overlaps(b) {
                    return Slot::from_index(i).zip(Slot::from_index(j));
                }
            }
        }
        None
    }

    /// The rate and cap in force at `time`.
    ///
    /// Slots are checked in order; the first `AllDay` block or `SetTime`
    /// range containing `time` wins. Uncovered time bills at `global`.
    pub fn effective_pricing(&self, time: TimeOfDay, global: &GlobalPricing) -> EffectivePricing {
        Slot::ALL
            .into_iter()
            .map(|slot| (slot, self.block(slot)))
            .find(|(_, block)| block.mode.is_persisted() && block.contains(time))
            .map(|(slot, block)| EffectivePricing {
                hourly_rate: block.rate.unwrap_or(global.hourly_rate),
                daily_maximum_price: block.max_amount.unwrap_or(global.daily_maximum_price),
                slot: Some(slot),
            })
            .unwrap_or(EffectivePricing {
                hourly_rate: global.hourly_rate,
                daily_maximum_price: global.daily_maximum_price,
                slot: None,
            })
    }
}
