use serde::{Deserialize, Serialize};

use crate::models::SessionState;

/// What the status panel shows. Derived from the remaining time, never
/// from the pushed `focusing` flag, so the two can't disagree after local
/// decrements.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SessionPhase {
    #[default]
    Unknown,
    Idle,
    Focusing,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub phase: SessionPhase,
}

impl SessionSnapshot {
    fn of(state: SessionState) -> Self {
        let phase = if state.remaining_seconds > 0 {
            SessionPhase::Focusing
        } else {
            SessionPhase::Idle
        };
        Self { state, phase }
    }
}

/// Reconciles pushed session state with the local one-second countdown.
///
/// Pushes always win: an authoritative update discards whatever the ticks
/// did since the previous one.
#[derive(Debug, Clone, Default)]
pub struct SessionMirror {
    latest: Option<SessionState>,
    ticks_since_update: u64,
}

impl SessionMirror {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_authoritative_update(&mut self, payload: SessionState) -> SessionSnapshot {
        self.latest = Some(payload);
        self.ticks_since_update = 0;
        SessionSnapshot::of(payload)
    }

    /// Counts one second off the remaining time, floored at zero. A tick
    /// before the first update changes nothing.
    pub fn on_tick(&mut self) -> Option<SessionSnapshot> {
        let state = self.latest.as_mut()?;
        state.remaining_seconds = state.remaining_seconds.saturating_sub(1);
        self.ticks_since_update = self.ticks_since_update.saturating_add(1);
        Some(SessionSnapshot::of(*state))
    }

    /// `None` until the first authoritative update.
    pub fn current(&self) -> Option<SessionSnapshot> {
        self.latest.map(SessionSnapshot::of)
    }

    pub fn phase(&self) -> SessionPhase {
        self.current()
            .map(|snapshot| snapshot.phase)
            .unwrap_or(SessionPhase::Unknown)
    }

    /// Local decrements applied since the last push.
    pub fn ticks_since_update(&self) -> u64 {
        self.ticks_since_update
    }
}
