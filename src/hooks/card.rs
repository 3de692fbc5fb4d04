use std::fmt;

use crate::{models::HookDefinition, schedule::ScheduleWindow};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookAction {
    Save,
    Trigger,
    Context,
}

impl HookAction {
    /// Label shown on the control while the action is in flight.
    pub fn progress_label(&self) -> &'static str {
        match self {
            HookAction::Save => "Saving...",
            HookAction::Trigger => "Running...",
            HookAction::Context => "Loading...",
        }
    }
}

impl fmt::Display for HookAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HookAction::Save => "save",
            HookAction::Trigger => "trigger",
            HookAction::Context => "context fetch",
        };
        f.write_str(name)
    }
}

/// Inline status line of a hook card.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ActionStatus {
    #[default]
    Idle,
    Pending(HookAction),
    Succeeded(String),
    Failed(String),
}

impl ActionStatus {
    pub fn label(&self) -> Option<String> {
        match self {
            ActionStatus::Idle => None,
            ActionStatus::Pending(action) => Some(action.progress_label().to_string()),
            ActionStatus::Succeeded(message) => Some(message.clone()),
            ActionStatus::Failed(message) => Some(format!("Error: {message}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ContextPreview {
    #[default]
    Hidden,
    Loading,
    Shown(String),
}

/// Editable view of one hook, derived from its definition on every load.
///
/// Edits mark the card dirty; a dirty card keeps its draft across reloads
/// until it is saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookCard {
    pub hook_id: String,
    pub draft: ScheduleWindow,
    pub dirty: bool,
    pub status: ActionStatus,
    pub context: ContextPreview,
}

impl HookCard {
    pub fn from_definition(hook: &HookDefinition) -> Self {
        let draft = match hook.schedule.window() {
            Some(window) => window.clone().normalize(&hook.parameter_schema),
            None => ScheduleWindow::with_defaults(&hook.parameter_schema),
        };
        Self {
            hook_id: hook.id.clone(),
            draft,
            dirty: false,
            status: ActionStatus::Idle,
            context: ContextPreview::Hidden,
        }
    }

    /// Recomputes the card from a freshly loaded definition, keeping the
    /// draft only when it holds unsaved edits.
    pub fn refreshed(&self, hook: &HookDefinition) -> Self {
        let mut next = Self::from_definition(hook);
        if self.dirty {
            next.draft = self.draft.clone();
            next.dirty = true;
        }
        next.status = self.status.clone();
        next.context = self.context.clone();
        next
    }

    pub fn edit(&mut self, change: impl FnOnce(&mut ScheduleWindow)) {
        change(&mut self.draft);
        self.dirty = true;
    }

    /// Value shown for a parameter: the draft's value, or the default when
    /// the draft leaves it empty.
    pub fn param_value<'a>(&'a self, hook: &'a HookDefinition, key: &str) -> Option<&'a str> {
        let spec = hook.param(key)?;
        match self.draft.parameters.get(key) {
            Some(value) if !value.is_empty() => Some(value.as_str()),
            _ => Some(spec.default_value.as_str()),
        }
    }
}
