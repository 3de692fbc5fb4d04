pub mod format;
pub mod logging;

pub use format::{format_countdown, format_history_duration};
