mod client;
mod error;
pub mod push;

pub use client::ApiClient;
pub use error::ApiError;
pub use push::{ClientMessage, FocusInfo, ServerMessage};
