//! Execution requests and their boundary validation.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default time to wait for a command before reporting it as still running.
pub const DEFAULT_TIMEOUT_MS: u64 = 300_000;

/// Longest command accepted, in bytes.
pub const MAX_COMMAND_LENGTH: usize = 64 * 1024;

const MAX_PATH_LENGTH: usize = 4096;

fn default_true() -> bool {
    true
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_MS
}

/// One command invocation, as sent by the automation client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRequest {
    /// Command text, run as typed into the shell.
    pub command: String,
    /// Working directory override. Relative paths resolve against the root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_cwd: Option<String>,
    /// Whether the command may modify something (requires confirmation).
    #[serde(default = "default_true")]
    pub modify_something: bool,
    /// Return immediately instead of waiting for the command.
    #[serde(default)]
    pub background: bool,
    /// Milliseconds to wait before reporting the command as still running.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl ExecutionRequest {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            custom_cwd: None,
            modify_something: true,
            background: false,
            timeout: DEFAULT_TIMEOUT_MS,
        }
    }

    pub fn cwd(mut self, cwd: impl Into<String>) -> Self {
        self.custom_cwd = Some(cwd.into());
        self
    }

    pub fn modify_something(mut self, modify: bool) -> Self {
        self.modify_something = modify;
        self
    }

    pub fn background(mut self, background: bool) -> Self {
        self.background = background;
        self
    }

    pub fn timeout_ms(mut self, timeout: u64) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout_duration(&self) -> Duration {
        Duration::from_millis(self.timeout)
    }

    /// Whether the timeout is something other than the default.
    pub fn has_custom_timeout(&self) -> bool {
        self.timeout != DEFAULT_TIMEOUT_MS
    }

    /// Directory the command runs in: the override if present, else `root`.
    ///
    /// Absolute overrides are used as-is; relative ones are joined onto
    /// `root`. Returns `None` when neither yields a directory.
    pub fn effective_cwd(&self, root: Option<&Path>) -> Option<PathBuf> {
        match self.custom_cwd.as_deref().map(str::trim) {
            Some(cwd) if !cwd.is_empty() => {
                let cwd = Path::new(cwd);
                if cwd.is_absolute() {
                    Some(cwd.to_path_buf())
                } else {
                    root.map(|root| root.join(cwd))
                }
            }
            _ => root.map(Path::to_path_buf),
        }
    }

    /// Check the request before anything runs.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.command.trim().is_empty() {
            return Err(ValidationError::EmptyCommand);
        }
        if self.command.len() > MAX_COMMAND_LENGTH {
            return Err(ValidationError::CommandTooLong {
                length: self.command.len(),
                max: MAX_COMMAND_LENGTH,
            });
        }
        if self.command.contains('\0') {
            return Err(ValidationError::InvalidCharacter('\0'));
        }
        if self.timeout == 0 {
            return Err(ValidationError::ZeroTimeout);
        }
        if let Some(cwd) = &self.custom_cwd {
            if cwd.contains('\0') {
                return Err(ValidationError::InvalidCharacter('\0'));
            }
            if cwd.len() > MAX_PATH_LENGTH {
                return Err(ValidationError::PathTooLong {
                    length: cwd.len(),
                    max: MAX_PATH_LENGTH,
                });
            }
        }
        Ok(())
    }
}

/// Reasons a request is refused at the boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    EmptyCommand,
    CommandTooLong { length: usize, max: usize },
    InvalidCharacter(char),
    ZeroTimeout,
    PathTooLong { length: usize, max: usize },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyCommand => write!(f, "Command cannot be empty"),
            Self::CommandTooLong { length, max } => {
                write!(f, "Command too long: {} bytes (max: {})", length, max)
            }
            Self::InvalidCharacter(c) => {
                write!(f, "Request contains invalid character: {:?}", c)
            }
            Self::ZeroTimeout => write!(f, "Timeout must be greater than zero"),
            Self::PathTooLong { length, max } => {
                write!(f, "Path too long: {} chars (max: {})", length, max)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_json() {
        let req: ExecutionRequest = serde_json::from_str(r#"{"command":"ls"}"#).unwrap();
        assert_eq!(req.command, "ls");
        assert!(req.custom_cwd.is_none());
        assert!(req.modify_something);
        assert!(!req.background);
        assert_eq!(req.timeout, DEFAULT_TIMEOUT_MS);
        assert!(!req.has_custom_timeout());
    }

    #[test]
    fn test_camel_case_fields() {
        let req: ExecutionRequest = serde_json::from_str(
            r#"{"command":"make","customCwd":"sub","modifySomething":false,"background":true,"timeout":5000}"#,
        )
        .unwrap();
        assert_eq!(req.custom_cwd.as_deref(), Some("sub"));
        assert!(!req.modify_something);
        assert!(req.background);
        assert_eq!(req.timeout_duration(), Duration::from_secs(5));
        assert!(req.has_custom_timeout());
    }

    #[test]
    fn test_missing_command_rejected() {
        assert!(serde_json::from_str::<ExecutionRequest>(r#"{"background":true}"#).is_err());
    }

    #[test]
    fn test_builder() {
        let req = ExecutionRequest::new("echo hi")
            .cwd("/tmp")
            .modify_something(false)
            .background(true)
            .timeout_ms(10);
        assert_eq!(req.custom_cwd.as_deref(), Some("/tmp"));
        assert!(!req.modify_something);
        assert!(req.background);
        assert_eq!(req.timeout, 10);
    }

    #[test]
    fn test_effective_cwd() {
        let root = Path::new("/work");

        let req = ExecutionRequest::new("ls");
        assert_eq!(req.effective_cwd(Some(root)), Some(PathBuf::from("/work")));
        assert_eq!(req.effective_cwd(None), None);

        let req = ExecutionRequest::new("ls").cwd("/elsewhere");
        assert_eq!(req.effective_cwd(None), Some(PathBuf::from("/elsewhere")));

        let req = ExecutionRequest::new("ls").cwd("sub/dir");
        assert_eq!(
            req.effective_cwd(Some(root)),
            Some(PathBuf::from("/work/sub/dir"))
        );
        assert_eq!(req.effective_cwd(None), None);

        let req = ExecutionRequest::new("ls").cwd("  ");
        assert_eq!(req.effective_cwd(Some(root)), Some(PathBuf::from("/work")));
    }

    #[test]
    fn test_validate() {
        assert!(ExecutionRequest::new("echo hi").validate().is_ok());
        assert_eq!(
            ExecutionRequest::new("   ").validate(),
            Err(ValidationError::EmptyCommand)
        );
        assert_eq!(
            ExecutionRequest::new("a\0b").validate(),
            Err(ValidationError::InvalidCharacter('\0'))
        );
        assert_eq!(
            ExecutionRequest::new("ls").timeout_ms(0).validate(),
            Err(ValidationError::ZeroTimeout)
        );
        assert!(matches!(
            ExecutionRequest::new("x".repeat(MAX_COMMAND_LENGTH + 1)).validate(),
            Err(ValidationError::CommandTooLong { .. })
        ));
        assert!(matches!(
            ExecutionRequest::new("ls").cwd("d".repeat(5000)).validate(),
            Err(ValidationError::PathTooLong { .. })
        ));
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            ValidationError::EmptyCommand.to_string(),
            "Command cannot be empty"
        );
        assert!(ValidationError::ZeroTimeout.to_string().contains("zero"));
    }
}
