//! The command execution orchestrator.
//!
//! One call to [`CommandOrchestrator::execute`] walks
//!
//! ```text
//! Idle -> ConfirmationPending? -> Running -> BackgroundReturned
//!                 |                       -> Completed
//!                 v                       -> TimedOut
//!              Rejected
//! ```
//!
//! The command is never cancelled: when the caller stops waiting (timeout
//! or background mode) the shell keeps running it and its output keeps
//! landing in the session log, where `get_terminal_output` can read it.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::process::{ProcessEvent, ProcessHandle};
use super::request::ExecutionRequest;
use super::result::{ExecutionOutcome, ExecutionStatus, ToolResponse};
use crate::confirm::{should_confirm, ConfirmationGate, Decision};
use crate::error::ShellBridgeError;
use crate::host::{OutputSink, Settings, CONFIRM_NON_DESTRUCTIVE};
use crate::session::{SessionId, TerminalRegistry, TerminalSession};
use crate::Result;

/// How long to keep collecting output after the wait ends.
pub const GRACE_PERIOD: Duration = Duration::from_millis(50);

/// Default number of lines returned by `get_terminal_output`.
pub const DEFAULT_OUTPUT_LINES: usize = 200;

const NO_INTEGRATION_ADVICE: &str = "Shell integration is not available for this terminal. \
     Command completion cannot be detected, so commands will be reported as still running \
     until the timeout elapses. Use a POSIX shell (sh, bash, zsh) for full support.";

/// Runs commands on behalf of the automation client.
pub struct CommandOrchestrator {
    registry: Arc<TerminalRegistry>,
    gate: ConfirmationGate,
    settings: Arc<dyn Settings>,
    sink: Arc<dyn OutputSink>,
}

impl CommandOrchestrator {
    pub fn new(
        registry: Arc<TerminalRegistry>,
        gate: ConfirmationGate,
        settings: Arc<dyn Settings>,
        sink: Arc<dyn OutputSink>,
    ) -> Self {
        Self {
            registry,
            gate,
            settings,
            sink,
        }
    }

    pub fn registry(&self) -> &Arc<TerminalRegistry> {
        &self.registry
    }

    /// Tool entry point: validate, execute, and shape the response.
    ///
    /// Bad requests and a missing workspace root come back as error
    /// responses. Denials and timeouts are ordinary text responses. Failure
    /// to start a shell or write to it is returned as `Err`.
    pub async fn execute_tool(&self, request: &ExecutionRequest) -> Result<ToolResponse> {
        if let Err(e) = request.validate() {
            return Ok(ToolResponse::error(e.to_string()));
        }
        match self.execute(request).await {
            Ok((_, outcome)) => Ok(outcome.into_response()),
            Err(ShellBridgeError::NoWorkspaceRoot) => Ok(ToolResponse::error(
                "No workspace root is configured. Set a root directory or pass customCwd.",
            )),
            Err(e) => Err(e),
        }
    }

    /// Run one request.
    ///
    /// Returns `(rejected, outcome)`; `rejected` is always `false`, a
    /// denial is reported through the outcome's text.
    pub async fn execute(&self, request: &ExecutionRequest) -> Result<(bool, ExecutionOutcome)> {
        let cwd = self.resolve_cwd(request)?;

        let confirm_all = self.settings.get_bool(CONFIRM_NON_DESTRUCTIVE, false);
        if should_confirm(request.modify_something, confirm_all) {
            debug!(command = %request.command, "confirmation pending");
            let decision = self.gate.confirm(&request.command).await?;
            if !decision.is_approved() {
                info!(command = %request.command, "command rejected");
                return Ok((false, Self::denied(decision)));
            }
        }

        let session = self.registry.acquire_or_create(&cwd)?;
        self.registry.show(session.id())?;
        let mut handle = ProcessHandle::run(&session, &request.command).await?;
        let id = session.id();
        info!(
            terminal = %id,
            command = %request.command,
            background = request.background,
            "command started"
        );

        if request.background {
            if !session.has_shell_integration() {
                self.advise_no_integration(&session);
            }
            let text = format!(
                "Command started in background in terminal {id}. {}",
                Self::poll_hint(id)
            );
            let outcome =
                ExecutionOutcome::new(ExecutionStatus::BackgroundReturned, text).in_session(id);
            return Ok((false, outcome));
        }

        let mut run = RunState::default();
        let deadline = tokio::time::sleep(request.timeout_duration());
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                event = handle.next_event() => match event {
                    Some(event) => self.absorb(&session, &mut run, event),
                    None => {
                        run.finished = true;
                        break;
                    }
                },
                _ = &mut deadline => {
                    debug!(terminal = %id, "timeout elapsed, command keeps running");
                    break;
                }
            }
        }

        if !run.finished {
            let _ = tokio::time::timeout(GRACE_PERIOD, async {
                while let Some(event) = handle.next_event().await {
                    self.absorb(&session, &mut run, event);
                }
            })
            .await;
        }

        // A stream that ends while the shell lives means the command was
        // superseded without its own completion signal.
        if run.finished && !run.completed && session.is_alive() {
            run.completed = true;
        }

        let output = run.output.trim();
        let outcome = if run.completed {
            let mut text = format!("Command executed in terminal {id}.");
            if let Some(code) = run.exit_code.filter(|c| *c != 0) {
                text.push_str(&format!(" Exit code: {code}."));
            }
            if !output.is_empty() {
                text.push_str("\nOutput:\n");
                text.push_str(output);
            }
            ExecutionOutcome::new(ExecutionStatus::Completed, text).with_exit_code(run.exit_code)
        } else if run.finished {
            let mut text =
                format!("The shell in terminal {id} exited before the command reported completion.");
            if !output.is_empty() {
                text.push_str("\nOutput:\n");
                text.push_str(output);
            }
            ExecutionOutcome::new(ExecutionStatus::ShellExited, text)
        } else {
            Self::still_running(id, request, output)
        };

        debug!(terminal = %id, status = ?outcome.status, "execution finished");
        Ok((false, outcome.in_session(id)))
    }

    /// Tail of a terminal's output log, as a tool response.
    ///
    /// Output from commands that were backgrounded or timed out keeps
    /// arriving here after `execute` has returned.
    pub fn terminal_output(&self, terminal_id: &str, lines: Option<usize>) -> Result<ToolResponse> {
        let id: SessionId = terminal_id.parse()?;
        let session = self.registry.get(id)?;
        let info = session.info()?;
        let tail = session.tail(lines.unwrap_or(DEFAULT_OUTPUT_LINES))?;

        let mut text = format!("Terminal {id} ({})", info.state.as_str());
        if let Some(code) = info.last_exit_code {
            text.push_str(&format!(", last exit code {code}"));
        }
        if tail.is_empty() {
            text.push_str(".\nNo output.");
        } else {
            text.push_str(":\n");
            text.push_str(tail.join("\n").trim_end());
        }
        Ok(ToolResponse::text(text))
    }

    fn resolve_cwd(&self, request: &ExecutionRequest) -> Result<PathBuf> {
        let root = self.settings.workspace_root();
        request
            .effective_cwd(root.as_deref())
            .ok_or(ShellBridgeError::NoWorkspaceRoot)
    }

    fn absorb(&self, session: &TerminalSession, run: &mut RunState, event: ProcessEvent) {
        match event {
            ProcessEvent::Line(line) => {
                run.output.push_str(&line);
                run.output.push('\n');
            }
            ProcessEvent::Completed { exit_code } => {
                run.completed = true;
                run.exit_code = exit_code;
            }
            ProcessEvent::NoShellIntegration => self.advise_no_integration(session),
        }
    }

    fn advise_no_integration(&self, session: &TerminalSession) {
        if session.claim_integration_warning() {
            warn!(terminal = %session.id(), shell = session.shell(), "no shell integration");
            self.sink.warn(NO_INTEGRATION_ADVICE);
        }
    }

    fn denied(decision: Decision) -> ExecutionOutcome {
        let text = match decision {
            Decision::Feedback(feedback) => format!(
                "Command execution was denied by the user with feedback:\n{feedback}"
            ),
            _ => "Command execution was denied by the user.".to_string(),
        };
        ExecutionOutcome::new(ExecutionStatus::Rejected, text)
    }

    /// Only a caller-chosen timeout is quoted back.
    fn still_running(
        id: SessionId,
        request: &ExecutionRequest,
        output: &str,
    ) -> ExecutionOutcome {
        let mut text = format!("Command is still running in terminal {id}");
        if request.has_custom_timeout() {
            text.push_str(&format!(" after {}ms", request.timeout));
        }
        text.push('.');
        if !output.is_empty() {
            text.push_str("\nOutput so far:\n");
            text.push_str(output);
        }
        text.push('\n');
        text.push_str(&Self::poll_hint(id));
        ExecutionOutcome::new(ExecutionStatus::TimedOut, text)
    }

    fn poll_hint(id: SessionId) -> String {
        format!("Use get_terminal_output with terminalId \"{id}\" to check its output.")
    }
}

#[derive(Default)]
struct RunState {
    output: String,
    completed: bool,
    exit_code: Option<i32>,
    /// The event stream closed; nothing more can arrive.
    finished: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::confirm::{Answer, ApprovalQueue, AutoApprove, Confirmer, DENY_LABEL};
    use crate::execution::DEFAULT_TIMEOUT_MS;
    use crate::host::{MemorySink, StaticSettings};
    use crate::pty::ShellBackend;
    use crate::session::RegistryConfig;

    fn orchestrator(root: Option<PathBuf>) -> CommandOrchestrator {
        let sink: Arc<dyn OutputSink> = Arc::new(MemorySink::new());
        let registry = Arc::new(TerminalRegistry::new(
            RegistryConfig::default(),
            Arc::clone(&sink),
        ));
        let settings = StaticSettings {
            root,
            confirm_non_destructive: false,
        };
        CommandOrchestrator::new(
            registry,
            ConfirmationGate::new(Arc::new(AutoApprove)),
            Arc::new(settings),
            sink,
        )
    }

    #[tokio::test]
    async fn test_no_root_is_error_response() {
        let response = orchestrator(None)
            .execute_tool(&ExecutionRequest::new("echo hi"))
            .await
            .unwrap();
        assert!(response.is_error);
        assert!(response.joined_text().contains("workspace root"));
    }

    #[tokio::test]
    async fn test_invalid_request_is_error_response() {
        let response = orchestrator(Some(std::env::temp_dir()))
            .execute_tool(&ExecutionRequest::new("  "))
            .await
            .unwrap();
        assert!(response.is_error);
    }

    #[tokio::test]
    async fn test_denied_text() {
        let outcome = CommandOrchestrator::denied(Decision::Deny);
        assert_eq!(outcome.status, ExecutionStatus::Rejected);
        assert!(!outcome.rejected);
        assert_eq!(outcome.text, "Command execution was denied by the user.");

        let outcome = CommandOrchestrator::denied(Decision::Feedback("too risky".into()));
        assert!(outcome.text.ends_with("too risky"));
    }

    /// Orchestrator over a pipe-backed `shell`, returning its sink.
    #[cfg(unix)]
    fn pipe_orchestrator(
        shell: &str,
        root: &std::path::Path,
        confirmer: Arc<dyn Confirmer>,
        confirm_non_destructive: bool,
    ) -> (CommandOrchestrator, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        let registry = Arc::new(TerminalRegistry::new(
            RegistryConfig {
                shell: Some(shell.into()),
                backend: ShellBackend::Pipe,
                ..RegistryConfig::default()
            },
            sink.clone() as Arc<dyn OutputSink>,
        ));
        let settings = StaticSettings {
            root: Some(root.to_path_buf()),
            confirm_non_destructive,
        };
        let orchestrator = CommandOrchestrator::new(
            registry,
            ConfirmationGate::new(confirmer),
            Arc::new(settings),
            sink.clone(),
        );
        (orchestrator, sink)
    }

    #[test]
    fn test_default_timeout_not_quoted() {
        let id = SessionId::from_raw(1);
        let request = ExecutionRequest::new("sleep 500");
        let outcome = CommandOrchestrator::still_running(id, &request, "");
        assert_eq!(outcome.status, ExecutionStatus::TimedOut);
        let expected = format!("Command is still running in terminal {id}.");
        assert!(outcome.text.starts_with(&expected));
        assert!(!outcome.text.contains("after"));
        assert!(!outcome.text.contains(&DEFAULT_TIMEOUT_MS.to_string()));
        assert!(!outcome.text.contains("Output so far"));

        let request = request.timeout_ms(1500);
        let outcome = CommandOrchestrator::still_running(id, &request, "partial");
        assert!(outcome.text.contains(" after 1500ms."));
        assert!(outcome.text.contains("Output so far:\npartial\n"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_read_only_command_skips_queue() {
        let dir = tempfile::tempdir().unwrap();
        let queue = Arc::new(ApprovalQueue::new());
        let (orchestrator, _) = pipe_orchestrator("/bin/sh", dir.path(), queue.clone(), false);

        let request = ExecutionRequest::new("echo ok")
            .modify_something(false)
            .timeout_ms(5000);
        let (rejected, outcome) =
            tokio::time::timeout(Duration::from_secs(10), orchestrator.execute(&request))
                .await
                .unwrap()
                .unwrap();

        assert!(!rejected);
        assert_eq!(outcome.status, ExecutionStatus::Completed);
        assert!(outcome.text.ends_with("Output:\nok"));
        assert!(queue.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_confirm_all_prompts_read_only_command() {
        let dir = tempfile::tempdir().unwrap();
        let queue = Arc::new(ApprovalQueue::new());
        let (orchestrator, _) = pipe_orchestrator("/bin/sh", dir.path(), queue.clone(), true);
        let orchestrator = Arc::new(orchestrator);

        let task = {
            let orchestrator = Arc::clone(&orchestrator);
            tokio::spawn(async move {
                let request = ExecutionRequest::new("ls").modify_something(false);
                orchestrator.execute(&request).await
            })
        };

        let mut pending = Vec::new();
        for _ in 0..100 {
            pending = queue.list().unwrap();
            if !pending.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].prompt.body, "ls");
        queue
            .respond(pending[0].id, Answer::Action(DENY_LABEL.to_string()))
            .unwrap();

        let (_, outcome) = task.await.unwrap().unwrap();
        assert_eq!(outcome.status, ExecutionStatus::Rejected);
        assert_eq!(outcome.text, "Command execution was denied by the user.");
        assert_eq!(orchestrator.registry().count(), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_shell_exit_reported() {
        let dir = tempfile::tempdir().unwrap();
        let (orchestrator, _) =
            pipe_orchestrator("/bin/sh", dir.path(), Arc::new(AutoApprove), false);

        let request = ExecutionRequest::new("echo bye; exit 0").timeout_ms(5000);
        let (_, outcome) = orchestrator.execute(&request).await.unwrap();

        assert_eq!(outcome.status, ExecutionStatus::ShellExited);
        assert!(outcome.text.contains("exited before the command reported completion"));
        assert!(outcome.text.ends_with("Output:\nbye"));
        assert_eq!(outcome.exit_code, None);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_missing_integration_advised_once() {
        let dir = tempfile::tempdir().unwrap();
        let bin = tempfile::tempdir().unwrap();
        let shell = bin.path().join("rawsh");
        std::os::unix::fs::symlink("/bin/sh", &shell).unwrap();
        let (orchestrator, sink) = pipe_orchestrator(
            shell.to_str().unwrap(),
            dir.path(),
            Arc::new(AutoApprove),
            false,
        );

        for command in ["echo one", "echo two"] {
            let request = ExecutionRequest::new(command).timeout_ms(200);
            orchestrator.execute(&request).await.unwrap();
        }

        let warnings: Vec<String> = sink
            .entries()
            .into_iter()
            .filter(|e| e.starts_with("warning:"))
            .collect();
        assert_eq!(warnings, vec![format!("warning: {NO_INTEGRATION_ADVICE}")]);
    }

    #[tokio::test]
    async fn test_unknown_terminal_output() {
        let result = orchestrator(None).terminal_output("term-ffffffff", None);
        assert!(matches!(result, Err(ShellBridgeError::SessionNotFound(_))));
    }
}
