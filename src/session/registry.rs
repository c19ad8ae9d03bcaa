//! Pool of reusable terminal sessions keyed by working directory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use tracing::{debug, info};

use super::{SessionId, SessionInfo, TerminalSession, DEFAULT_HISTORY_LINES};
use crate::error::ShellBridgeError;
use crate::host::OutputSink;
use crate::pty::{default_shell, PtySize, ShellBackend, ShellSpec};
use crate::Result;

/// How the registry spawns new shells.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Shell program. `None` uses the platform default.
    pub shell: Option<String>,
    pub backend: ShellBackend,
    /// Output lines kept per session.
    pub history_lines: usize,
    pub size: PtySize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            shell: None,
            backend: ShellBackend::default(),
            history_lines: DEFAULT_HISTORY_LINES,
            size: PtySize::default(),
        }
    }
}

impl RegistryConfig {
    fn program(&self) -> String {
        self.shell.clone().unwrap_or_else(default_shell)
    }
}

/// Thread-safe registry of terminal sessions.
///
/// At most one live session exists per working directory. Sessions whose
/// shell has exited are replaced on the next acquire for their directory
/// and can be dropped with [`TerminalRegistry::prune_closed`].
pub struct TerminalRegistry {
    sessions: RwLock<HashMap<PathBuf, Arc<TerminalSession>>>,
    active: RwLock<Option<SessionId>>,
    config: RegistryConfig,
    sink: Arc<dyn OutputSink>,
}

impl TerminalRegistry {
    pub fn new(config: RegistryConfig, sink: Arc<dyn OutputSink>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            active: RwLock::new(None),
            config,
            sink,
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Return the live session for `cwd`, spawning a shell there if needed.
    ///
    /// Must be called from within a tokio runtime.
    pub fn acquire_or_create(&self, cwd: &Path) -> Result<Arc<TerminalSession>> {
        let key = cwd.canonicalize()?;

        {
            let sessions = self
                .sessions
                .read()
                .map_err(|_| ShellBridgeError::LockPoisoned)?;
            if let Some(session) = sessions.get(&key).filter(|s| s.is_alive()) {
                return Ok(Arc::clone(session));
            }
        }

        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| ShellBridgeError::LockPoisoned)?;

        // Another request may have spawned it while we waited for the lock.
        if let Some(session) = sessions.get(&key).filter(|s| s.is_alive()) {
            return Ok(Arc::clone(session));
        }

        let program = self.config.program();
        let mut spec = ShellSpec::new(program.clone(), key.clone());
        spec.size = self.config.size;

        let io = self.config.backend.spawn(&spec)?;
        let session = TerminalSession::start(key.clone(), program, io, self.config.history_lines)?;

        if let Some(old) = sessions.insert(key, Arc::clone(&session)) {
            debug!(old = %old.id(), new = %session.id(), "replaced closed terminal session");
        }

        self.sink.append(&format!(
            "Created terminal {} in {}",
            session.id(),
            session.cwd().display()
        ));
        Ok(session)
    }

    /// Look up a session by identifier.
    pub fn get(&self, id: SessionId) -> Result<Arc<TerminalSession>> {
        let sessions = self
            .sessions
            .read()
            .map_err(|_| ShellBridgeError::LockPoisoned)?;
        sessions
            .values()
            .find(|s| s.id() == id)
            .cloned()
            .ok_or_else(|| ShellBridgeError::SessionNotFound(id.to_string()))
    }

    /// Snapshot of every session, oldest first.
    pub fn list(&self) -> Result<Vec<SessionInfo>> {
        let mut sessions: Vec<Arc<TerminalSession>> = {
            let sessions = self
                .sessions
                .read()
                .map_err(|_| ShellBridgeError::LockPoisoned)?;
            sessions.values().cloned().collect()
        };
        sessions.sort_by_key(|s| s.id());
        sessions.iter().map(|s| s.info()).collect()
    }

    /// Make `id` the visibly active terminal.
    pub fn show(&self, id: SessionId) -> Result<()> {
        let session = self.get(id)?;
        let mut active = self
            .active
            .write()
            .map_err(|_| ShellBridgeError::LockPoisoned)?;
        if *active != Some(id) {
            *active = Some(id);
            self.sink.append(&format!(
                "Terminal {} ({}) is now active",
                id,
                session.cwd().display()
            ));
        }
        Ok(())
    }

    /// The visibly active terminal, if it still exists.
    pub fn active(&self) -> Option<Arc<TerminalSession>> {
        let id = (*self.active.read().ok()?)?;
        self.get(id).ok()
    }

    /// Drop sessions whose shell has exited.
    ///
    /// Returns the number of sessions removed.
    pub fn prune_closed(&self) -> Result<usize> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| ShellBridgeError::LockPoisoned)?;
        let before = sessions.len();
        sessions.retain(|_, s| s.is_alive());
        let removed = before - sessions.len();
        if removed > 0 {
            debug!(removed, "pruned closed terminal sessions");
        }
        Ok(removed)
    }

    /// Number of sessions, live or not.
    pub fn count(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or(0)
    }

    /// Kill every shell and forget all sessions.
    pub fn shutdown(&self) {
        if let Ok(mut sessions) = self.sessions.write() {
            for session in sessions.values() {
                session.terminate();
            }
            info!(count = sessions.len(), "terminal sessions shut down");
            sessions.clear();
        }
    }
}

impl Drop for TerminalRegistry {
    fn drop(&mut self) {
        self.shutdown();
    }
}
