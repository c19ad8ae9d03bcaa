//! Per-session execution context and output history.

use std::collections::VecDeque;

/// Default number of output lines retained per session.
pub const DEFAULT_HISTORY_LINES: usize = 2000;

/// Execution context for a terminal session.
///
/// Tracks the last command run, its exit code, and a bounded log of every
/// output line the shell produced. The log outlives individual requests, so
/// output from commands that were backgrounded or timed out can still be
/// read later by session ID.
#[derive(Debug, Clone)]
pub struct SessionContext {
    last_command: Option<String>,
    last_exit_code: Option<i32>,
    execution_count: u64,
    output: VecDeque<String>,
    capacity: usize,
    /// Total lines ever appended, including evicted ones.
    total_lines: u64,
}

impl SessionContext {
    /// Create a context that keeps at most `capacity` output lines.
    pub fn new(capacity: usize) -> Self {
        Self {
            last_command: None,
            last_exit_code: None,
            execution_count: 0,
            output: VecDeque::new(),
            capacity: capacity.max(1),
            total_lines: 0,
        }
    }

    /// Get the last command started.
    pub fn last_command(&self) -> Option<&str> {
        self.last_command.as_deref()
    }

    /// Get the exit code of the last completed command.
    pub fn last_exit_code(&self) -> Option<i32> {
        self.last_exit_code
    }

    /// Number of commands started in this session.
    pub fn execution_count(&self) -> u64 {
        self.execution_count
    }

    /// Record that a command was written to the shell.
    pub fn record_start(&mut self, command: impl Into<String>) {
        self.last_command = Some(command.into());
        self.last_exit_code = None;
        self.execution_count += 1;
    }

    /// Record a command's exit code.
    pub fn record_exit(&mut self, exit_code: Option<i32>) {
        self.last_exit_code = exit_code;
    }

    /// Append one output line, evicting the oldest past capacity.
    pub fn push_line(&mut self, line: impl Into<String>) {
        if self.output.len() == self.capacity {
            self.output.pop_front();
        }
        self.output.push_back(line.into());
        self.total_lines += 1;
    }

    /// The most recent `n` lines, oldest first.
    pub fn tail(&self, n: usize) -> Vec<String> {
        let skip = self.output.len().saturating_sub(n);
        self.output.iter().skip(skip).cloned().collect()
    }

    /// Number of lines currently retained.
    pub fn retained_lines(&self) -> usize {
        self.output.len()
    }

    /// Total lines ever produced, including evicted ones.
    pub fn total_lines(&self) -> u64 {
        self.total_lines
    }

    /// Check if the last command succeeded.
    pub fn last_succeeded(&self) -> bool {
        self.last_exit_code == Some(0)
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LINES)
    }
}
