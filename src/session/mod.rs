//! Terminal session management.
//!
//! A session is a long-lived shell bound to one working directory. The
//! [`TerminalRegistry`] hands out sessions by directory, creating them on
//! demand, and each [`TerminalSession`] runs a background pump that turns
//! the shell's output into lines.

mod context;
mod id;
mod integration;
mod registry;
mod state;
mod terminal;

pub use context::{SessionContext, DEFAULT_HISTORY_LINES};
pub use id::SessionId;
pub use integration::{ShellKind, ShellLine};
pub use registry::{RegistryConfig, TerminalRegistry};
pub use state::SessionState;
pub use terminal::{SessionInfo, TerminalSession};
