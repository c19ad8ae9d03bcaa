//! API request and response types.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::confirm::{Answer, PendingApproval};
use crate::error::ShellBridgeError;
use crate::session::SessionInfo;

/// Body of `get_terminal_output`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminalOutputRequest {
    pub terminal_id: String,
    /// Number of trailing lines (default 200).
    #[serde(default)]
    pub lines: Option<usize>,
}

/// List terminals response.
#[derive(Debug, Clone, Serialize)]
pub struct ListTerminalsResponse {
    pub count: usize,
    /// Id of the terminal last shown to the user.
    pub active: Option<String>,
    pub terminals: Vec<SessionInfo>,
}

/// A tool the automation client can call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

impl ToolDescriptor {
    /// Every tool served under `/api/v1/tools`.
    pub fn all() -> Vec<Self> {
        vec![
            Self {
                name: "execute_command",
                description: "Run a shell command in a terminal bound to the working directory. \
                              Commands that may modify something need the user's approval.",
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "command": { "type": "string", "description": "Command to run" },
                        "customCwd": { "type": "string", "description": "Working directory (absolute, or relative to the root)" },
                        "modifySomething": { "type": "boolean", "default": true, "description": "Whether the command may modify files or state" },
                        "background": { "type": "boolean", "default": false, "description": "Return immediately without waiting" },
                        "timeout": { "type": "number", "default": 300000, "description": "Milliseconds to wait before reporting the command as still running" }
                    },
                    "required": ["command"]
                }),
            },
            Self {
                name: "get_terminal_output",
                description: "Read the latest output of a terminal, including commands that are still running.",
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "terminalId": { "type": "string", "description": "Terminal identifier, e.g. term-00000001" },
                        "lines": { "type": "number", "default": 200, "description": "Number of trailing lines" }
                    },
                    "required": ["terminalId"]
                }),
            },
        ]
    }
}

/// List approvals response.
#[derive(Debug, Clone, Serialize)]
pub struct ListApprovalsResponse {
    pub count: usize,
    pub approvals: Vec<PendingApproval>,
}

/// Body answering an approval: either an action label or feedback text.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApprovalAnswerRequest {
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub feedback: Option<String>,
}

impl ApprovalAnswerRequest {
    pub fn into_answer(self) -> Result<Answer, ShellBridgeError> {
        match (self.action, self.feedback) {
            (Some(action), None) => Ok(Answer::Action(action)),
            (None, Some(feedback)) => Ok(Answer::Feedback(feedback)),
            _ => Err(ShellBridgeError::InvalidRequest(
                "exactly one of 'action' or 'feedback' is required".to_string(),
            )),
        }
    }
}

/// Generic API error response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "TERMINAL_NOT_FOUND").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn terminal_not_found(id: &str) -> Self {
        Self::new("TERMINAL_NOT_FOUND", format!("Terminal '{}' not found", id))
    }

    pub fn approval_not_found(id: &str) -> Self {
        Self::new("APPROVAL_NOT_FOUND", format!("Approval '{}' not found", id))
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("BAD_REQUEST", message)
    }
}

/// Messages sent over a terminal's WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsMessage {
    /// One output line.
    Line { data: String },
    /// The subscriber fell behind and `skipped` lines were dropped.
    Lagged { skipped: u64 },
    /// The shell exited; no more lines will follow.
    Closed,
    Error { code: String, message: String },
    /// Ping/pong for connection health.
    Ping,
    Pong,
}
