//! lotdeck core - pricing rules, time primitives, and operator authentication.
//!
//! This crate has no I/O. Storage and the HTTP API build on the types here.

pub mod auth;
pub mod clock;
pub mod input;
pub mod pricing;

pub use clock::{DayOfWeek, TimeOfDay};
pub use pricing::{
    BlockMode, DaySchedule, DayScheduleBlock, GlobalPricing, PersistedBlock, Slot,
    WeeklySchedule,
};
