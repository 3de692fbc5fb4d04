mod history;
mod hook;
mod load_state;
mod session;

pub use history::FocusRecord;
pub use hook::{HookDefinition, HookResult, HookSchedule, ParamKind, ParamSpec};
pub use load_state::LoadState;
pub use session::SessionState;
