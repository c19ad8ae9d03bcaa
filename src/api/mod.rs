//! HTTP API for shell-bridge.
//!
//! ## Endpoints
//!
//! ### Health & Info
//! - `GET /health` - Health check (never requires a key)
//! - `GET /api/v1` - API information
//!
//! ### Tools
//! - `GET /api/v1/tools` - Tool descriptors
//! - `POST /api/v1/tools/execute_command` - Run a command
//! - `POST /api/v1/tools/get_terminal_output` - Read a terminal's recent output
//!
//! ### Terminals
//! - `GET /api/v1/terminals` - List terminal sessions
//! - `GET /api/v1/terminals/{id}` - One terminal's status
//! - `WS /api/v1/terminals/{id}/ws` - Stream a terminal's output
//!
//! ### Approvals
//! - `GET /api/v1/approvals` - Commands waiting for approval
//! - `POST /api/v1/approvals/{id}` - Answer with `{"action": ...}` or `{"feedback": ...}`
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use shell_bridge::api::{serve, AppState, ServerConfig};
//! use shell_bridge::security::ApiKeyStore;
//!
//! #[tokio::main]
//! async fn main() -> shell_bridge::Result<()> {
//!     let config = ServerConfig::new("127.0.0.1", 3000);
//!     serve(config, AppState::default(), Arc::new(ApiKeyStore::disabled())).await
//! }
//! ```

pub mod handlers;
pub mod router;
pub mod types;
pub mod websocket;

pub use handlers::AppState;
pub use router::{create_router, create_router_with_state, serve, ServerConfig};
pub use types::{
    ApprovalAnswerRequest, ErrorResponse, ListApprovalsResponse, ListTerminalsResponse,
    TerminalOutputRequest, ToolDescriptor, WsMessage,
};
