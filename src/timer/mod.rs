pub mod controller;
pub mod state;
pub mod ticker;

pub use controller::{SessionEvent, SessionHandle};
pub use state::{SessionMirror, SessionPhase, SessionSnapshot};
pub use ticker::{ClockTicker, Tick};
