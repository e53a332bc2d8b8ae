//! A lot's seven day schedules.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::persisted::DayPersistedBlock;
use super::schedule::{DaySchedule, EffectivePricing};
use super::{GlobalPricing, PricingError, Slot};
use crate::clock::{DayOfWeek, TimeOfDay};

/// Day schedules keyed by day of week. Always holds all seven days.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<DayOfWeek, DaySchedule>",
    into = "BTreeMap<DayOfWeek, DaySchedule>"
)]
pub struct WeeklySchedule {
    days: BTreeMap<DayOfWeek, DaySchedule>,
}

impl From<BTreeMap<DayOfWeek, DaySchedule>> for WeeklySchedule {
    /// Days missing from the map get an unpriced `[Default, NewBlock, NewBlock]`.
    fn from(mut days: BTreeMap<DayOfWeek, DaySchedule>) -> Self {
        for day in DayOfWeek::ALL {
            days.entry(day).or_default();
        }
        Self { days }
    }
}

impl From<WeeklySchedule> for BTreeMap<DayOfWeek, DaySchedule> {
    fn from(schedule: WeeklySchedule) -> Self {
        schedule.days
    }
}

impl WeeklySchedule {
    /// Every day at the global defaults.
    pub fn empty(global: &GlobalPricing) -> Self {
        Self {
            days: DayOfWeek::ALL
                .into_iter()
                .map(|day| (day, DaySchedule::empty(global)))
                .collect(),
        }
    }

    /// Rebuilds the week from day-tagged stored blocks.
    ///
    /// Records keep their relative order within a day.
    pub fn from_persisted(records: &[DayPersistedBlock], global: &GlobalPricing) -> Self {
        let days = DayOfWeek::ALL
            .into_iter()
            .map(|day| {
                let blocks: Vec<_> = records
                    .iter()
                    .filter(|r| r.day_of_week == day)
                    .map(|r| r.block.clone())
                    .collect();
                (day, DaySchedule::parse(&blocks, global))
            })
            .collect();
        Self { days }
    }

    /// Coverage-adjusts every day and emits its stored blocks, Monday first.
    pub fn to_persisted(&self, global: &GlobalPricing) -> Vec<DayPersistedBlock> {
        self.days
            .iter()
            .flat_map(|(day, schedule)| {
                schedule
                    .adjust_coverage(global)
                    .build_persistable_blocks(global)
                    .into_iter()
                    .map(|block| DayPersistedBlock {
                        day_of_week: *day,
                        block,
                    })
            })
            .collect()
    }

    /// Runs coverage adjustment on every day.
    pub fn adjust_coverage(&self, global: &GlobalPricing) -> Self {
        Self {
            days: self
                .days
                .iter()
                .map(|(day, schedule)| (*day, schedule.adjust_coverage(global)))
                .collect(),
        }
    }

    pub fn day(&self, day: DayOfWeek) -> &DaySchedule {
        // All seven keys are inserted on construction.
        &self.days[&day]
    }

    pub fn set_day(&mut self, day: DayOfWeek, schedule: DaySchedule) {
        self.days.insert(day, schedule);
    }

    pub fn iter(&self) -> impl Iterator<Item = (DayOfWeek, &DaySchedule)> {
        self.days.iter().map(|(day, schedule)| (*day, schedule))
    }

    /// The first day whose stored blocks overlap, with the offending slots.
    pub fn first_overlap(&self) -> Option<(DayOfWeek, Slot, Slot)> {
        self.iter().find_map(|(day, schedule)| {
            schedule
                .overlapping_slots()
                .map(|(a, b)| (day, a, b))
        })
    }

    /// The first day whose slot layout is malformed.
    pub fn first_invalid(&self) -> Option<(DayOfWeek, PricingError)> {
        self.iter()
            .find_map(|(day, schedule)| schedule.validate().err().map(|e| (day, e)))
    }

    pub fn effective_pricing(
        &self,
        day: DayOfWeek,
        time: TimeOfDay,
        global: &GlobalPricing,
    ) -> EffectivePricing {
        self.day(day).effective_pricing(time, global)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::{BlockMode, PersistedBlock, PersistedMode};

    fn t(hour: u8, minute: u8) -> TimeOfDay {
        TimeOfDay::new(hour, minute).unwrap()
    }

    fn global() -> GlobalPricing {
        GlobalPricing::new(2.0, 15.0)
    }

    fn record(day: DayOfWeek, start: TimeOfDay, end: TimeOfDay) -> DayPersistedBlock {
        DayPersistedBlock {
            day_of_week: day,
            block: PersistedBlock {
                block_mode: Some(PersistedMode::SetTime),
                start_time: Some(start),
                end_time: Some(end),
                ..Default::default()
            },
        }
    }

    #[test]
    fn empty_week_has_seven_default_days() {
        let week = WeeklySchedule::empty(&global());
        assert_eq!(week.iter().count(), 7);
        for (_, day) in week.iter() {
            assert_eq!(
                day.modes(),
                [BlockMode::Default, BlockMode::NewBlock, BlockMode::NewBlock]
            );
        }
        assert!(week.to_persisted(&global()).is_empty());
    }

    #[test]
    fn groups_records_by_day() {
        let records = vec![
            record(DayOfWeek::Tuesday, t(8, 0), t(12, 0)),
            record(DayOfWeek::Monday, t(0, 0), t(12, 0)),
            record(DayOfWeek::Tuesday, t(12, 0), t(18, 0)),
            record(DayOfWeek::Monday, t(12, 0), t(0, 0)),
        ];
        let week = WeeklySchedule::from_persisted(&records, &global());

        assert_eq!(
            week.day(DayOfWeek::Tuesday).modes(),
            [BlockMode::SetTime, BlockMode::SetTime, BlockMode::Default]
        );
        assert_eq!(
            week.day(DayOfWeek::Tuesday).block(Slot::First).start_time,
            Some(t(8, 0))
        );
        assert_eq!(
            week.day(DayOfWeek::Sunday).modes(),
            [BlockMode::Default, BlockMode::NewBlock, BlockMode::NewBlock]
        );

        let adjusted = week.adjust_coverage(&global());
        assert_eq!(
            adjusted.day(DayOfWeek::Monday).modes(),
            [BlockMode::SetTime, BlockMode::SetTime, BlockMode::NoTime]
        );
    }

    #[test]
    fn persisted_output_is_monday_first() {
        let records = vec![
            record(DayOfWeek::Sunday, t(8, 0), t(12, 0)),
            record(DayOfWeek::Monday, t(8, 0), t(12, 0)),
        ];
        let week = WeeklySchedule::from_persisted(&records, &global());
        let stored = week.to_persisted(&global());
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].day_of_week, DayOfWeek::Monday);
        assert_eq!(stored[1].day_of_week, DayOfWeek::Sunday);
        assert_eq!(WeeklySchedule::from_persisted(&stored, &global()), week);
    }

    #[test]
    fn deserializing_fills_missing_days() {
        let json = serde_json::json!({
            "FRIDAY": [
                {"mode": "allDay", "rate": 9},
                {"mode": "newBlock"},
                {"mode": "newBlock"}
            ]
        });
        let week: WeeklySchedule = serde_json::from_value(json).unwrap();
        assert_eq!(week.iter().count(), 7);
        assert_eq!(week.day(DayOfWeek::Friday).modes()[0], BlockMode::AllDay);
        assert_eq!(week.day(DayOfWeek::Monday), &DaySchedule::default());

        let serialized = serde_json::to_value(&week).unwrap();
        assert!(serialized["MONDAY"].is_array());
        assert_eq!(serialized["FRIDAY"][0]["rate"], 9.0);
    }

    #[test]
    fn finds_first_overlapping_day() {
        let records = vec![
            record(DayOfWeek::Wednesday, t(8, 0), t(12, 0)),
            record(DayOfWeek::Wednesday, t(10, 0), t(14, 0)),
        ];
        let week = WeeklySchedule::from_persisted(&records, &global());
        assert_eq!(
            week.first_overlap(),
            Some((DayOfWeek::Wednesday, Slot::First, Slot::Second))
        );
        assert_eq!(WeeklySchedule::empty(&global()).first_overlap(), None);
    }

    #[test]
    fn finds_first_malformed_day() {
        let g = global();
        let mut week = WeeklySchedule::from_persisted(&[], &g);
        assert_eq!(week.first_invalid(), None);

        let mut blocks = DaySchedule::empty(&g).blocks().clone();
        blocks[1].mode = BlockMode::SetTime;
        week.set_day(DayOfWeek::Thursday, DaySchedule::from_blocks(blocks));

        assert_eq!(
            week.first_invalid(),
            Some((
                DayOfWeek::Thursday,
                PricingError::InvalidLayout {
                    slot: Slot::Second,
                    mode: BlockMode::SetTime
                }
            ))
        );
    }

    #[test]
    fn effective_pricing_by_day() {
        let records = vec![DayPersistedBlock {
            day_of_week: DayOfWeek::Saturday,
            block: PersistedBlock {
                block_mode: Some(PersistedMode::AllDay),
                hourly_rate: Some(1.0),
                ..Default::default()
            },
        }];
        let week = WeeklySchedule::from_persisted(&records, &global());

        let saturday = week.effective_pricing(DayOfWeek::Saturday, t(10, 0), &global());
        assert_eq!(saturday.hourly_rate, 1.0);
        assert_eq!(saturday.daily_maximum_price, 15.0);

        let friday = week.effective_pricing(DayOfWeek::Friday, t(10, 0), &global());
        assert_eq!(friday.hourly_rate, 2.0);
        assert_eq!(friday.slot, None);
    }
}
