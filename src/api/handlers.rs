//! REST API handlers.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::error;

use super::types::{
    ApprovalAnswerRequest, ErrorResponse, ListApprovalsResponse, ListTerminalsResponse,
    TerminalOutputRequest, ToolDescriptor,
};
use crate::config::Config;
use crate::confirm::{ApprovalQueue, AutoApprove, ConfirmationGate, Confirmer};
use crate::error::ShellBridgeError;
use crate::execution::{CommandOrchestrator, ExecutionRequest, ToolResponse};
use crate::host::{OutputSink, Settings, TracingSink};
use crate::session::{SessionId, SessionInfo, TerminalRegistry};
use crate::Result;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<CommandOrchestrator>,
    pub registry: Arc<TerminalRegistry>,
    pub approvals: Arc<ApprovalQueue>,
}

impl AppState {
    /// Wire everything up from configuration.
    ///
    /// With `auto_approve` set every command runs without asking; otherwise
    /// prompts wait in the approval queue.
    pub fn from_config(config: &Config) -> Self {
        let sink: Arc<dyn OutputSink> = Arc::new(TracingSink);
        let settings: Arc<dyn Settings> = Arc::new(config.clone());
        let approvals = Arc::new(ApprovalQueue::new().with_notifier(Arc::clone(&sink)));
        let confirmer: Arc<dyn Confirmer> = if config.execution.auto_approve {
            Arc::new(AutoApprove)
        } else {
            approvals.clone()
        };
        let registry = Arc::new(TerminalRegistry::new(
            config.registry_config(),
            Arc::clone(&sink),
        ));
        Self::with_parts(registry, ConfirmationGate::new(confirmer), settings, sink, approvals)
    }

    pub fn with_parts(
        registry: Arc<TerminalRegistry>,
        gate: ConfirmationGate,
        settings: Arc<dyn Settings>,
        sink: Arc<dyn OutputSink>,
        approvals: Arc<ApprovalQueue>,
    ) -> Self {
        let orchestrator = Arc::new(CommandOrchestrator::new(
            Arc::clone(&registry),
            gate,
            settings,
            sink,
        ));
        Self {
            orchestrator,
            registry,
            approvals,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(e: ShellBridgeError) -> ApiError {
    match e {
        ShellBridgeError::SessionNotFound(id) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::terminal_not_found(&id)),
        ),
        ShellBridgeError::ApprovalNotFound(id) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::approval_not_found(&id)),
        ),
        ShellBridgeError::InvalidRequest(msg) => {
            (StatusCode::BAD_REQUEST, Json(ErrorResponse::bad_request(msg)))
        }
        other => {
            error!("request failed: {}", other);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::internal_error(other.to_string())),
            )
        }
    }
}

/// Health check endpoint.
pub async fn health() -> &'static str {
    "OK"
}

/// API information endpoint.
pub async fn api_info() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": "shell-bridge",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}

/// Tool descriptors.
pub async fn list_tools() -> Json<Vec<ToolDescriptor>> {
    Json(ToolDescriptor::all())
}

/// `execute_command` tool.
///
/// Malformed bodies come back as error tool responses rather than bare
/// rejections, so the client always gets the same shape.
pub async fn execute_command(
    State(state): State<AppState>,
    body: std::result::Result<Json<ExecutionRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ToolResponse::error(rejection.body_text())),
            )
                .into_response()
        }
    };

    match state.orchestrator.execute_tool(&request).await {
        Ok(response) => Json(response).into_response(),
        Err(e) => api_error(e).into_response(),
    }
}

/// `get_terminal_output` tool.
pub async fn get_terminal_output(
    State(state): State<AppState>,
    Json(req): Json<TerminalOutputRequest>,
) -> std::result::Result<Json<ToolResponse>, ApiError> {
    state
        .orchestrator
        .terminal_output(&req.terminal_id, req.lines)
        .map(Json)
        .map_err(api_error)
}

/// List live terminals, dropping those whose shell has exited.
pub async fn list_terminals(
    State(state): State<AppState>,
) -> std::result::Result<Json<ListTerminalsResponse>, ApiError> {
    state.registry.prune_closed().map_err(api_error)?;
    let terminals = state.registry.list().map_err(api_error)?;
    Ok(Json(ListTerminalsResponse {
        count: terminals.len(),
        active: state.registry.active().map(|s| s.id().to_string()),
        terminals,
    }))
}

/// Get one terminal's status.
pub async fn get_terminal(
    State(state): State<AppState>,
    Path(terminal_id): Path<String>,
) -> std::result::Result<Json<SessionInfo>, ApiError> {
    terminal_info(&state, &terminal_id).map(Json).map_err(api_error)
}

fn terminal_info(state: &AppState, terminal_id: &str) -> Result<SessionInfo> {
    let id: SessionId = terminal_id.parse()?;
    state.registry.get(id)?.info()
}

/// Approval prompts waiting for an answer.
pub async fn list_approvals(
    State(state): State<AppState>,
) -> std::result::Result<Json<ListApprovalsResponse>, ApiError> {
    let approvals = state.approvals.list().map_err(api_error)?;
    Ok(Json(ListApprovalsResponse {
        count: approvals.len(),
        approvals,
    }))
}

/// Answer an approval prompt.
pub async fn answer_approval(
    State(state): State<AppState>,
    Path(approval_id): Path<u64>,
    Json(req): Json<ApprovalAnswerRequest>,
) -> std::result::Result<StatusCode, ApiError> {
    let answer = req.into_answer().map_err(api_error)?;
    state
        .approvals
        .respond(approval_id, answer)
        .map_err(api_error)?;
    Ok(StatusCode::NO_CONTENT)
}
