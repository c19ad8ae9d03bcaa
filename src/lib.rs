//! # shell-bridge
//!
//! Local shell-execution bridge for AI agents.
//!
//! Commands from an automation client run in long-lived terminal sessions,
//! one per working directory, after a human approves them. Output is
//! captured from shell-integration markers so the caller gets the command's
//! own lines and its exit code.
//!
//! ## Features
//!
//! - **Terminal reuse**: one shell per directory, keeping `cd`, env vars and history
//! - **Approval gate**: commands wait for a human decision unless trusted
//! - **Timeouts and background runs**: long commands keep running and can be polled
//! - **HTTP API**: tool endpoints plus live output over WebSocket
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use shell_bridge::confirm::{AutoApprove, ConfirmationGate};
//! use shell_bridge::execution::{CommandOrchestrator, ExecutionRequest};
//! use shell_bridge::host::{StaticSettings, TracingSink};
//! use shell_bridge::session::{RegistryConfig, TerminalRegistry};
//!
//! #[tokio::main]
//! async fn main() -> shell_bridge::Result<()> {
//!     shell_bridge::logging::try_init().ok();
//!
//!     let sink = Arc::new(TracingSink);
//!     let registry = Arc::new(TerminalRegistry::new(RegistryConfig::default(), sink.clone()));
//!     let orchestrator = CommandOrchestrator::new(
//!         registry,
//!         ConfirmationGate::new(Arc::new(AutoApprove)),
//!         Arc::new(StaticSettings::with_root("/tmp")),
//!         sink,
//!     );
//!
//!     let response = orchestrator
//!         .execute_tool(&ExecutionRequest::new("echo hi"))
//!         .await?;
//!     println!("{}", response.joined_text());
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod confirm;
pub mod error;
pub mod execution;
pub mod host;
pub mod logging;
pub mod output;
pub mod pty;
pub mod security;
pub mod session;

// Re-export commonly used types
pub use error::{Result, ShellBridgeError};
pub use execution::{CommandOrchestrator, ExecutionRequest, ToolResponse};
pub use session::{SessionId, TerminalRegistry, TerminalSession};
