//! Handle for one command running inside a terminal session.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::session::{SessionId, TerminalSession};
use crate::Result;

/// An event observed while a command runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessEvent {
    /// One line of output, ANSI codes stripped, no trailing newline.
    Line(String),
    /// The shell reported the command finished.
    Completed { exit_code: Option<i32> },
    /// The shell cannot report completion; the command may still be running.
    NoShellIntegration,
}

/// A command in flight.
///
/// Events arrive in the order the shell produced them. The stream ends
/// after `Completed`, or when the shell exits. Dropping the handle does not
/// stop the command: its output keeps going to the session log.
#[derive(Debug)]
pub struct ProcessHandle {
    session_id: SessionId,
    seq: u64,
    events: mpsc::UnboundedReceiver<ProcessEvent>,
}

impl ProcessHandle {
    /// Start `command` in `session`.
    ///
    /// Fails fast if the session's shell has exited.
    pub async fn run(session: &Arc<TerminalSession>, command: &str) -> Result<Self> {
        let (tx, events) = mpsc::unbounded_channel();
        let seq = session.submit(command, tx).await?;
        Ok(Self {
            session_id: session.id(),
            seq,
            events,
        })
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Sequence number of the command within its session.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Next event, or `None` once execution has finished.
    pub async fn next_event(&mut self) -> Option<ProcessEvent> {
        let event = self.events.recv().await;
        if matches!(event, Some(ProcessEvent::Completed { .. })) {
            self.events.close();
        }
        event
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::pty::{ShellBackend, ShellSpec};

    async fn sh_session() -> Arc<TerminalSession> {
        let dir = std::env::temp_dir();
        let io = ShellBackend::Pipe
            .spawn(&ShellSpec::new("/bin/sh", dir.clone()))
            .unwrap();
        TerminalSession::start(dir, "/bin/sh", io, 100).unwrap()
    }

    async fn collect(handle: &mut ProcessHandle) -> Vec<ProcessEvent> {
        let mut events = Vec::new();
        tokio::time::timeout(Duration::from_secs(10), async {
            while let Some(event) = handle.next_event().await {
                events.push(event);
            }
        })
        .await
        .unwrap();
        events
    }

    #[tokio::test]
    async fn test_lines_then_completed() {
        let session = sh_session().await;
        let mut handle = ProcessHandle::run(&session, "echo one; echo two").await.unwrap();

        assert_eq!(handle.session_id(), session.id());
        assert_eq!(
            collect(&mut handle).await,
            vec![
                ProcessEvent::Line("one".into()),
                ProcessEvent::Line("two".into()),
                ProcessEvent::Completed { exit_code: Some(0) },
            ]
        );
        session.terminate();
    }

    #[tokio::test]
    async fn test_exit_code_reported() {
        let session = sh_session().await;
        let mut handle = ProcessHandle::run(&session, "false").await.unwrap();
        assert_eq!(
            collect(&mut handle).await,
            vec![ProcessEvent::Completed { exit_code: Some(1) }]
        );
        session.terminate();
    }

    #[tokio::test]
    async fn test_stdin_reader_leaves_next_command_intact() {
        let session = sh_session().await;
        let mut reader = ProcessHandle::run(&session, "read x; echo got:$x").await.unwrap();
        let mut next = ProcessHandle::run(&session, "echo next").await.unwrap();

        assert_eq!(
            collect(&mut reader).await,
            vec![
                ProcessEvent::Line("got:".into()),
                ProcessEvent::Completed { exit_code: Some(0) },
            ]
        );
        assert_eq!(
            collect(&mut next).await,
            vec![
                ProcessEvent::Line("next".into()),
                ProcessEvent::Completed { exit_code: Some(0) },
            ]
        );
        assert_eq!(session.tail(10).unwrap(), vec!["got:", "next"]);
        session.terminate();
    }

    #[tokio::test]
    async fn test_stderr_captured() {
        let session = sh_session().await;
        let mut handle = ProcessHandle::run(&session, "echo oops >&2").await.unwrap();
        let events = collect(&mut handle).await;
        assert!(events.contains(&ProcessEvent::Line("oops".into())));
        session.terminate();
    }

    #[tokio::test]
    async fn test_sequential_commands_routed_separately() {
        let session = sh_session().await;
        let mut first = ProcessHandle::run(&session, "echo first").await.unwrap();
        let mut second = ProcessHandle::run(&session, "echo second").await.unwrap();
        assert!(second.seq() > first.seq());

        let first_events = collect(&mut first).await;
        let second_events = collect(&mut second).await;
        assert_eq!(first_events[0], ProcessEvent::Line("first".into()));
        assert_eq!(second_events[0], ProcessEvent::Line("second".into()));
        assert_eq!(first_events.len(), 2);
        assert_eq!(second_events.len(), 2);
        session.terminate();
    }

    #[tokio::test]
    async fn test_run_on_closed_session_fails() {
        let session = sh_session().await;
        ProcessHandle::run(&session, "exit 0").await.unwrap();
        tokio::time::timeout(Duration::from_secs(5), async {
            while session.is_alive() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        assert!(ProcessHandle::run(&session, "echo hi").await.is_err());
    }
}
