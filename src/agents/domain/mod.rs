//! Domain types for the analysis agent
//!
//! Core abstractions that define the conversation model.

mod history;
mod message;
mod response;
mod session;
mod tool_call;

pub use history::*;
pub use message::*;
pub use response::*;
pub use session::*;
pub use tool_call::*;
