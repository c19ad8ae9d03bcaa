//! A live terminal session and its output pump.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use serde::Serialize;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, trace, warn};

use super::integration::{ShellKind, ShellLine};
use super::{SessionContext, SessionId, SessionState};
use crate::error::ShellBridgeError;
use crate::execution::ProcessEvent;
use crate::output::LineDecoder;
use crate::pty::ShellIo;
use crate::Result;

/// Capacity of the live line broadcast used by streaming subscribers.
const BROADCAST_CAPACITY: usize = 1024;

/// A command submitted to the shell whose events are still being routed.
struct Tracked {
    seq: u64,
    events: mpsc::UnboundedSender<ProcessEvent>,
}

impl Tracked {
    fn send(&self, event: ProcessEvent) {
        // The handle may already have been dropped (background or timed-out
        // requests); the line still lands in the session log.
        let _ = self.events.send(event);
    }
}

struct Inner {
    state: SessionState,
    context: SessionContext,
    /// Submitted but not yet started (integration) or not yet finished (raw).
    queue: VecDeque<Tracked>,
    /// The command between its START and END markers.
    current: Option<Tracked>,
    ready: bool,
    last_activity: Instant,
}

/// Point-in-time view of a session, for listings and status queries.
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub id: String,
    pub cwd: PathBuf,
    pub shell: String,
    pub pid: u32,
    pub alive: bool,
    pub shell_integration: bool,
    pub state: SessionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_exit_code: Option<i32>,
    pub execution_count: u64,
    pub output_lines: u64,
    pub idle_seconds: f64,
}

/// A reusable shell bound to one working directory.
///
/// Output is read continuously by a background pump, whether or not any
/// request is waiting on it. Every line is appended to the session log,
/// broadcast to live subscribers, and forwarded to the command that
/// produced it.
pub struct TerminalSession {
    id: SessionId,
    cwd: PathBuf,
    program: String,
    kind: ShellKind,
    pid: u32,
    /// Commands read `/dev/null` instead of the shell's piped input.
    detach_stdin: bool,
    alive: AtomicBool,
    integration_warned: AtomicBool,
    next_seq: AtomicU64,
    input: mpsc::Sender<Vec<u8>>,
    inner: Mutex<Inner>,
    lines: Mutex<Option<broadcast::Sender<String>>>,
    guard: Mutex<Option<Box<dyn std::any::Any + Send>>>,
}

impl TerminalSession {
    /// Take ownership of a spawned shell, prime it, and start the pump.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        cwd: impl Into<PathBuf>,
        program: impl Into<String>,
        io: ShellIo,
        history_lines: usize,
    ) -> Result<Arc<Self>> {
        let program = program.into();
        let kind = ShellKind::detect(&program);
        let ShellIo {
            input,
            output,
            pid,
            tty,
            guard,
        } = io;

        let priming = kind.priming_script();
        if !priming.is_empty() {
            input
                .try_send(priming.into_bytes())
                .map_err(|_| ShellBridgeError::ChannelClosed)?;
        }

        let (lines_tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        let session = Arc::new(Self {
            id: SessionId::new(),
            cwd: cwd.into(),
            program,
            kind,
            pid,
            detach_stdin: !tty,
            alive: AtomicBool::new(true),
            integration_warned: AtomicBool::new(false),
            next_seq: AtomicU64::new(1),
            input,
            inner: Mutex::new(Inner {
                state: SessionState::Starting,
                context: SessionContext::new(history_lines),
                queue: VecDeque::new(),
                current: None,
                ready: !kind.has_integration(),
                last_activity: Instant::now(),
            }),
            lines: Mutex::new(Some(lines_tx)),
            guard: Mutex::new(Some(guard)),
        });

        if !kind.has_integration() {
            session.with_inner(|inner| inner.state.transition_to(SessionState::Idle))?;
        }

        tokio::spawn(Arc::clone(&session).pump(output));
        info!(
            id = %session.id,
            cwd = %session.cwd.display(),
            shell = %session.program,
            integration = kind.has_integration(),
            "terminal session started"
        );
        Ok(session)
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    pub fn shell(&self) -> &str {
        &self.program
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Whether the shell is still running.
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Whether structured completion signals are available.
    pub fn has_shell_integration(&self) -> bool {
        self.kind.has_integration()
    }

    pub fn state(&self) -> SessionState {
        self.with_inner(|inner| {
            self.release_abandoned(inner);
            inner.state
        })
        .unwrap_or(SessionState::Closed)
    }

    /// Returns `true` exactly once per session, the first time it is called.
    ///
    /// Used to show the missing-integration advisory only once.
    pub fn claim_integration_warning(&self) -> bool {
        !self.integration_warned.swap(true, Ordering::AcqRel)
    }

    /// Write `command` to the shell and route its events to `events`.
    ///
    /// Fails fast if the shell has exited. Returns the command's sequence
    /// number.
    pub async fn submit(
        &self,
        command: &str,
        events: mpsc::UnboundedSender<ProcessEvent>,
    ) -> Result<u64> {
        if !self.is_alive() {
            return Err(ShellBridgeError::SessionClosed(self.id.to_string()));
        }

        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let payload = self.kind.wrap_command(seq, command, self.detach_stdin);

        if !self.kind.has_integration() {
            let _ = events.send(ProcessEvent::NoShellIntegration);
        }

        self.with_inner(|inner| {
            inner.context.record_start(command);
            if !self.kind.has_integration() {
                // Without markers a new command is the only sign the previous
                // one is over; dropping its sender resolves its handle.
                inner.queue.clear();
            }
            inner.queue.push_back(Tracked { seq, events });
            inner.state.transition_to(SessionState::Busy);
            inner.last_activity = Instant::now();
        })?;

        debug!(id = %self.id, seq, "submitting command");
        if self.input.send(payload.into_bytes()).await.is_err() {
            self.with_inner(|inner| inner.queue.retain(|t| t.seq != seq))?;
            return Err(ShellBridgeError::SessionClosed(self.id.to_string()));
        }
        Ok(seq)
    }

    /// The most recent `n` output lines.
    pub fn tail(&self, n: usize) -> Result<Vec<String>> {
        self.with_inner(|inner| inner.context.tail(n))
    }

    /// Subscribe to output lines as they arrive.
    ///
    /// Returns `None` once the shell has exited.
    pub fn subscribe(&self) -> Option<broadcast::Receiver<String>> {
        self.lines
            .lock()
            .ok()
            .and_then(|tx| tx.as_ref().map(|tx| tx.subscribe()))
    }

    /// Snapshot for listings.
    pub fn info(&self) -> Result<SessionInfo> {
        let alive = self.is_alive();
        self.with_inner(|inner| {
            self.release_abandoned(inner);
            SessionInfo {
                id: self.id.to_string(),
                cwd: self.cwd.clone(),
                shell: self.program.clone(),
                pid: self.pid,
                alive,
                shell_integration: self.kind.has_integration(),
                state: inner.state,
                last_command: inner.context.last_command().map(str::to_string),
                last_exit_code: inner.context.last_exit_code(),
                execution_count: inner.context.execution_count(),
                output_lines: inner.context.total_lines(),
                idle_seconds: inner.last_activity.elapsed().as_secs_f64(),
            }
        })
    }

    /// Kill the shell. The pump notices EOF and closes the session.
    pub fn terminate(&self) {
        if let Ok(mut guard) = self.guard.lock() {
            if guard.take().is_some() {
                debug!(id = %self.id, "terminal session terminated");
            }
        }
    }

    /// Forget raw-mode commands nobody is waiting on any more.
    ///
    /// Shells without markers never report completion, so a command counts
    /// as running only while its handle is alive.
    fn release_abandoned(&self, inner: &mut Inner) {
        if self.kind.has_integration() {
            return;
        }
        inner.queue.retain(|t| !t.events.is_closed());
        if inner.queue.is_empty() && inner.state == SessionState::Busy {
            inner.state.transition_to(SessionState::Idle);
        }
    }

    fn with_inner<T>(&self, f: impl FnOnce(&mut Inner) -> T) -> Result<T> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| ShellBridgeError::LockPoisoned)?;
        Ok(f(&mut inner))
    }

    async fn pump(self: Arc<Self>, mut output: mpsc::Receiver<Vec<u8>>) {
        let mut decoder = LineDecoder::new();

        while let Some(chunk) = output.recv().await {
            for line in decoder.feed(&chunk) {
                self.handle_line(line);
            }
        }
        if let Some(rest) = decoder.finish() {
            self.handle_line(rest);
        }

        self.close();
    }

    fn handle_line(&self, line: String) {
        let parsed = if self.kind.has_integration() {
            ShellLine::parse(line)
        } else {
            ShellLine::Text(line)
        };

        let mut inner = match self.inner.lock() {
            Ok(inner) => inner,
            Err(_) => return,
        };
        inner.last_activity = Instant::now();

        match parsed {
            ShellLine::Ready => {
                trace!(id = %self.id, "shell primed");
                inner.ready = true;
                let next = if inner.queue.is_empty() {
                    SessionState::Idle
                } else {
                    SessionState::Busy
                };
                inner.state.transition_to(next);
            }
            _ if !inner.ready => {
                trace!(id = %self.id, "discarding pre-ready output");
            }
            ShellLine::Start(seq) => {
                if let Some(stale) = inner.current.take() {
                    debug!(id = %self.id, seq = stale.seq, "command ended without end marker");
                }
                match inner.queue.iter().position(|t| t.seq == seq) {
                    Some(pos) => inner.current = inner.queue.remove(pos),
                    None => warn!(id = %self.id, seq, "start marker for unknown command"),
                }
            }
            ShellLine::End {
                seq,
                exit_code,
                prefix,
            } => {
                if !prefix.is_empty() {
                    self.emit_text(&mut inner, prefix);
                }
                inner.context.record_exit(exit_code);
                match inner.current.take() {
                    Some(tracked) if tracked.seq == seq => {
                        tracked.send(ProcessEvent::Completed { exit_code });
                    }
                    other => {
                        warn!(id = %self.id, seq, "end marker for a command that is not running");
                        inner.current = other;
                    }
                }
                if inner.current.is_none() && inner.queue.is_empty() {
                    inner.state.transition_to(SessionState::Idle);
                }
            }
            ShellLine::Text(text) => self.emit_text(&mut inner, text),
        }
    }

    fn emit_text(&self, inner: &mut Inner, text: String) {
        self.release_abandoned(inner);
        let target = if self.kind.has_integration() {
            inner.current.as_ref()
        } else {
            inner.queue.back()
        };
        if let Some(tracked) = target {
            tracked.send(ProcessEvent::Line(text.clone()));
        }
        if let Ok(lines) = self.lines.lock() {
            if let Some(tx) = lines.as_ref() {
                let _ = tx.send(text.clone());
            }
        }
        inner.context.push_line(text);
    }

    fn close(&self) {
        self.alive.store(false, Ordering::Release);
        if let Ok(mut inner) = self.inner.lock() {
            inner.state.transition_to(SessionState::Closed);
            // Dropping the senders resolves every outstanding handle.
            inner.current = None;
            inner.queue.clear();
        }
        if let Ok(mut lines) = self.lines.lock() {
            lines.take();
        }
        info!(id = %self.id, cwd = %self.cwd.display(), "terminal session closed");
    }
}

impl std::fmt::Debug for TerminalSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerminalSession")
            .field("id", &self.id)
            .field("cwd", &self.cwd)
            .field("shell", &self.program)
            .field("alive", &self.is_alive())
            .finish()
    }
}
