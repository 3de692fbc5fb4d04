use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::format_history_duration;

/// One completed focus session as reported by `GET /history`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FocusRecord {
    pub timestamp: DateTime<Utc>,
    /// Seconds.
    pub duration: u64,
}

impl FocusRecord {
    pub fn duration_label(&self) -> String {
        format_history_duration(self.duration)
    }
}
