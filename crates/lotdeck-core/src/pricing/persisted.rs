//! The stored shape of a day's pricing blocks.
//!
//! Current records carry an explicit `blockMode`. Older records only have an
//! `isDefault` flag and a time range; [`infer_legacy_mode`] reinterprets
//! those and is kept apart from the tagged path.

use serde::{Deserialize, Deserializer, Serialize};

use super::block::{BlockMode, DayScheduleBlock};
use super::GlobalPricing;
use crate::clock::{deserialize_lenient_time, DayOfWeek, TimeOfDay};
use crate::input::deserialize_lenient_decimal;

/// Modes that are written to storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PersistedMode {
    AllDay,
    SetTime,
}

impl PersistedMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PersistedMode::AllDay => "allDay",
            PersistedMode::SetTime => "setTime",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "allDay" => Some(PersistedMode::AllDay),
            "setTime" => Some(PersistedMode::SetTime),
            _ => None,
        }
    }
}

impl From<PersistedMode> for BlockMode {
    fn from(mode: PersistedMode) -> Self {
        match mode {
            PersistedMode::AllDay => BlockMode::AllDay,
            PersistedMode::SetTime => BlockMode::SetTime,
        }
    }
}

/// One stored block for one day.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedBlock {
    #[serde(
        default,
        deserialize_with = "deserialize_lenient_mode",
        skip_serializing_if = "Option::is_none"
    )]
    pub block_mode: Option<PersistedMode>,
    /// Legacy flag, only present on records written before `blockMode`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_default: Option<bool>,
    #[serde(default, deserialize_with = "deserialize_lenient_time")]
    pub start_time: Option<TimeOfDay>,
    #[serde(default, deserialize_with = "deserialize_lenient_time")]
    pub end_time: Option<TimeOfDay>,
    #[serde(default, deserialize_with = "deserialize_lenient_decimal")]
    pub hourly_rate: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_lenient_decimal")]
    pub daily_maximum_price: Option<f64>,
}

impl PersistedBlock {
    /// The mode this record stands for: the explicit tag when present,
    /// otherwise the legacy inference. `None` means the record is unusable.
    pub fn resolved_mode(&self) -> Option<PersistedMode> {
        self.block_mode.or_else(|| infer_legacy_mode(self))
    }

    /// Builds the stored form of an in-memory block.
    ///
    /// Returns `None` for modes that are never stored.
    pub fn from_block(block: &DayScheduleBlock, global: &GlobalPricing) -> Option<Self> {
        let (mode, start, end) = match block.mode {
            BlockMode::AllDay => (
                PersistedMode::AllDay,
                TimeOfDay::MIDNIGHT,
                TimeOfDay::END_OF_DAY,
            ),
            BlockMode::SetTime => (
                PersistedMode::SetTime,
                block.effective_start(),
                block.effective_end(),
            ),
            BlockMode::Default | BlockMode::NewBlock | BlockMode::NoTime => return None,
        };

        Some(Self {
            block_mode: Some(mode),
            is_default: None,
            start_time: Some(start),
            end_time: Some(end),
            hourly_rate: Some(block.rate.unwrap_or(global.hourly_rate)),
            daily_maximum_price: Some(block.max_amount.unwrap_or(global.daily_maximum_price)),
        })
    }
}

/// Reinterprets a record without `blockMode`.
///
/// `isDefault` over the full day (or with no times at all) was the old way
/// of writing an all-day block. Any other record with a time is a set-time
/// block. A record with neither is unusable.
pub fn infer_legacy_mode(block: &PersistedBlock) -> Option<PersistedMode> {
    let spans_full_day = block.start_time.map_or(true, |t| t == TimeOfDay::MIDNIGHT)
        && block.end_time.map_or(true, |t| t == TimeOfDay::END_OF_DAY);

    if block.is_default == Some(true) && spans_full_day {
        Some(PersistedMode::AllDay)
    } else if block.start_time.is_some() || block.end_time.is_some() {
        Some(PersistedMode::SetTime)
    } else {
        None
    }
}

fn deserialize_lenient_mode<'de, D>(deserializer: D) -> Result<Option<PersistedMode>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => PersistedMode::parse(&s),
        _ => None,
    })
}

/// A stored block tagged with its day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayPersistedBlock {
    pub day_of_week: DayOfWeek,
    #[serde(flatten)]
    pub block: PersistedBlock,
}
