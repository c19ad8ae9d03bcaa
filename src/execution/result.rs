//! Execution outcomes and the tool response shape.

use serde::{Deserialize, Serialize};

use crate::session::SessionId;

/// Where an execution ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// The human declined to run the command.
    Rejected,
    /// Started in the background; nobody waited.
    BackgroundReturned,
    /// The shell reported completion within the timeout.
    Completed,
    /// Still running when the timeout elapsed.
    TimedOut,
    /// The shell exited without reporting completion.
    ShellExited,
}

/// Result of one orchestrated execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutcome {
    /// Reserved; always `false`, denial is reported through `text`.
    pub rejected: bool,
    pub status: ExecutionStatus,
    /// Human-readable account of what happened, including any output.
    pub text: String,
    /// Session the command ran in (`None` if it never ran).
    pub session_id: Option<SessionId>,
    /// Exit code, when the shell reported one.
    pub exit_code: Option<i32>,
}

impl ExecutionOutcome {
    pub(crate) fn new(status: ExecutionStatus, text: String) -> Self {
        Self {
            rejected: false,
            status,
            text,
            session_id: None,
            exit_code: None,
        }
    }

    pub(crate) fn in_session(mut self, id: SessionId) -> Self {
        self.session_id = Some(id);
        self
    }

    pub(crate) fn with_exit_code(mut self, exit_code: Option<i32>) -> Self {
        self.exit_code = exit_code;
        self
    }

    pub fn is_completed(&self) -> bool {
        self.status == ExecutionStatus::Completed
    }

    /// Convert to the client-facing response. Never an error.
    pub fn into_response(self) -> ToolResponse {
        ToolResponse::text(self.text)
    }
}

/// One block of response content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolContent {
    Text { text: String },
}

impl ToolContent {
    pub fn as_text(&self) -> &str {
        match self {
            ToolContent::Text { text } => text,
        }
    }
}

/// Response returned to the automation client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResponse {
    pub is_error: bool,
    pub content: Vec<ToolContent>,
}

impl ToolResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            is_error: false,
            content: vec![ToolContent::Text { text: text.into() }],
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            is_error: true,
            content: vec![ToolContent::Text { text: text.into() }],
        }
    }

    /// All text content joined by newlines.
    pub fn joined_text(&self) -> String {
        self.content
            .iter()
            .map(ToolContent::as_text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}
