//! lotdeck - operator dashboard backend for parking lots.
//!
//! The binary wires the storage and HTTP crates together. The account and
//! import commands live here so they can be exercised without a terminal.

pub mod commands;
