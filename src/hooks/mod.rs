pub mod card;
pub mod registry;

pub use card::{ActionStatus, ContextPreview, HookAction, HookCard};
pub use registry::{HookActionError, HookRegistry};
