//! Utility functions for wire decoding and display formatting.
//!
//! The backend is loosely typed: ids, amounts and day counts arrive either as
//! JSON numbers or strings. The `wire` helpers normalise them once at the
//! boundary so the lifecycle logic only ever sees well-shaped values.

pub mod formatting;
pub mod wire;

pub use formatting::{format_brl, format_deadline_days, truncate_id};
pub use wire::{leading_day_count, parse_amount};
