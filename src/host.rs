//! Collaborator interfaces consumed from the embedding host.
//!
//! The orchestrator never reads configuration or writes user-facing
//! notices directly; it goes through these traits so the server, tests,
//! and other embedders can supply their own.

use std::path::PathBuf;
use std::sync::Mutex;

/// Settings key that forces confirmation for non-destructive commands too.
pub const CONFIRM_NON_DESTRUCTIVE: &str = "confirmNonDestructiveCommands";

/// Read-only settings provider.
pub trait Settings: Send + Sync {
    /// Read a boolean setting, returning `default` if unset.
    fn get_bool(&self, key: &str, default: bool) -> bool;

    /// Root working directory for commands without an override.
    fn workspace_root(&self) -> Option<PathBuf>;
}

/// Fire-and-forget sink for user-visible notices.
pub trait OutputSink: Send + Sync {
    /// Append one informational line.
    fn append(&self, text: &str);

    /// Surface a warning the user should notice.
    fn warn(&self, text: &str) {
        self.append(text);
    }
}

/// Output sink that forwards to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl OutputSink for TracingSink {
    fn append(&self, text: &str) {
        tracing::info!(target: "shell_bridge::output", "{}", text);
    }

    fn warn(&self, text: &str) {
        tracing::warn!(target: "shell_bridge::output", "{}", text);
    }
}

/// Output sink that records everything it receives.
///
/// Handy for embedders that render notices themselves, and for tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all appended lines, warnings prefixed with `warning: `.
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl OutputSink for MemorySink {
    fn append(&self, text: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(text.to_string());
        }
    }

    fn warn(&self, text: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(format!("warning: {}", text));
        }
    }
}

/// Fixed in-memory settings.
#[derive(Debug, Clone, Default)]
pub struct StaticSettings {
    pub root: Option<PathBuf>,
    pub confirm_non_destructive: bool,
}

impl StaticSettings {
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
            confirm_non_destructive: false,
        }
    }
}

impl Settings for StaticSettings {
    fn get_bool(&self, key: &str, default: bool) -> bool {
        match key {
            CONFIRM_NON_DESTRUCTIVE => self.confirm_non_destructive,
            _ => default,
        }
    }

    fn workspace_root(&self) -> Option<PathBuf> {
        self.root.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_settings_lookup() {
        let mut settings = StaticSettings::with_root("/work");
        assert!(!settings.get_bool(CONFIRM_NON_DESTRUCTIVE, true));
        assert!(settings.get_bool("unknownKey", true));

        settings.confirm_non_destructive = true;
        assert!(settings.get_bool(CONFIRM_NON_DESTRUCTIVE, false));
        assert_eq!(settings.workspace_root(), Some(PathBuf::from("/work")));
    }

    #[test]
    fn test_memory_sink_records() {
        let sink = MemorySink::new();
        sink.append("hello");
        sink.warn("careful");
        assert_eq!(sink.entries(), vec!["hello", "warning: careful"]);
    }
}
