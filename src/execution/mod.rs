//! Command execution.
//!
//! - [`ProcessHandle`]: one command running in a terminal session, seen as
//!   a stream of [`ProcessEvent`]s
//! - [`CommandOrchestrator`]: confirmation, session selection, and the
//!   completion-vs-timeout race for one [`ExecutionRequest`]
//!
//! # Example
//!
//! ```no_run
//! use shell_bridge::execution::ExecutionRequest;
//!
//! let request = ExecutionRequest::new("cargo build")
//!     .modify_something(false)
//!     .timeout_ms(60_000);
//! assert!(request.validate().is_ok());
//! ```

mod orchestrator;
mod process;
mod request;
mod result;

pub use orchestrator::{CommandOrchestrator, DEFAULT_OUTPUT_LINES, GRACE_PERIOD};
pub use process::{ProcessEvent, ProcessHandle};
pub use request::{ExecutionRequest, ValidationError, DEFAULT_TIMEOUT_MS, MAX_COMMAND_LENGTH};
pub use result::{ExecutionOutcome, ExecutionStatus, ToolContent, ToolResponse};
