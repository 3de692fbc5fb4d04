//! Schedule windows: the enabled flag, daily bounds, run spacing and
//! parameter values that gate when a hook may run.
//!
//! Everything here is pure; nothing in this module talks to the service.

pub mod frequency;
pub mod window;

pub use frequency::{Frequency, FrequencyParseError, FREQUENCY_PRESETS, MAX_FREQUENCY};
pub use window::{ScheduleViolation, ScheduleWindow};
