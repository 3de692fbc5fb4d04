use serde::{Deserialize, Serialize};

/// Local mirror of the service's focus state.
///
/// The service owns the truth; this copy is replaced wholesale on every push
/// and only `remaining_seconds` is ever extrapolated locally.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub focusing: bool,
    pub remaining_seconds: u64,
    pub since_last_change_seconds: u64,
    pub sessions_today: u64,
}
