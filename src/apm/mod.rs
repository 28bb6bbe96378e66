//! Command Monitoring
//!
//! Every round trip made by the executor triggers the start and completion
//! hooks registered on the client's `Listener`, and is logged through the `log`
//! facade at debug level (failures at warn level).
mod event;
mod listener;

pub use self::event::{CommandResult, CommandStarted};
pub use self::listener::{CompletionHook, Listener, StartHook};
