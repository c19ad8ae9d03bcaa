//! Shell process backends.
//!
//! A terminal session talks to its shell through a pair of byte channels:
//! one for input written to the shell and one for everything the shell
//! prints. Two backends produce that pair:
//!
//! - [`ShellBackend::Pty`]: a real pseudo-terminal via portable-pty
//!   (Unix PTY or Windows ConPTY), what the user would see in a terminal.
//! - [`ShellBackend::Pipe`]: plain stdin/stdout/stderr pipes via
//!   `tokio::process`, useful where no PTY is available.

mod async_adapter;
mod native;
mod pipe;

pub use async_adapter::{AsyncPtyReader, AsyncPtyWriter};
pub use native::{default_shell, NativePty};
pub use pipe::spawn_piped;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Capacity of the input and output byte channels.
pub(crate) const CHANNEL_CAPACITY: usize = 256;

/// Size of a PTY in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PtySize {
    /// Number of rows (height).
    pub rows: u16,
    /// Number of columns (width).
    pub cols: u16,
}

impl PtySize {
    pub fn new(rows: u16, cols: u16) -> Self {
        Self { rows, cols }
    }
}

impl Default for PtySize {
    fn default() -> Self {
        // Wide enough that most command output is not wrapped mid-line.
        Self { rows: 50, cols: 250 }
    }
}

/// How a shell process is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShellBackend {
    #[default]
    Pty,
    Pipe,
}

/// What to spawn and where.
#[derive(Debug, Clone)]
pub struct ShellSpec {
    /// Shell program (path or name on `PATH`).
    pub program: String,
    /// Extra arguments.
    pub args: Vec<String>,
    /// Working directory.
    pub cwd: PathBuf,
    /// PTY dimensions (ignored by the pipe backend).
    pub size: PtySize,
}

impl ShellSpec {
    pub fn new(program: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.into(),
            size: PtySize::default(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }
}

/// A running shell, seen as byte channels.
///
/// Dropping the `guard` kills the shell.
pub struct ShellIo {
    /// Bytes to write to the shell's input.
    pub input: mpsc::Sender<Vec<u8>>,
    /// Bytes the shell printed. Closes when the shell exits.
    pub output: mpsc::Receiver<Vec<u8>>,
    /// Process ID of the shell (0 if unknown).
    pub pid: u32,
    /// Whether the shell's input is a terminal rather than a pipe.
    pub tty: bool,
    /// Keeps the underlying process handles alive.
    pub guard: Box<dyn std::any::Any + Send>,
}

impl ShellBackend {
    /// Spawn a shell and wire its I/O onto channels.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(self, spec: &ShellSpec) -> crate::Result<ShellIo> {
        match self {
            ShellBackend::Pty => NativePty::new().spawn_attached(spec),
            ShellBackend::Pipe => spawn_piped(spec),
        }
    }
}
