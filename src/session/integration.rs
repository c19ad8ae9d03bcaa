//! Shell integration: marker lines that let us observe command boundaries.
//!
//! POSIX-family shells are primed once (echo off, empty prompts, stderr
//! merged into stdout) and then every command is wrapped as
//!
//! ```text
//! printf '__SHB_START_%s__\n' 7
//! { <command>
//! } </dev/null; printf '__SHB_END_%s_%s__\n' 7 "$?"
//! ```
//!
//! The brace group makes the shell parse the command and the END marker
//! as one unit before running anything, so a command that reads stdin can
//! never swallow the marker. The `</dev/null` redirect is only added when
//! the shell reads from a pipe, where a running command could otherwise
//! eat the input of later commands.
//!
//! The printed markers never reach command output. Because the shell
//! source uses `%s` placeholders, an echoed copy of the wrapper can never
//! be mistaken for a marker.

use std::path::Path;

use serde::Serialize;

const MARKER_OPEN: &str = "__SHB_";
const MARKER_CLOSE: &str = "__";

/// Shell family, as far as integration is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShellKind {
    /// sh, bash, zsh, dash, ksh and friends.
    Posix,
    Fish,
    PowerShell,
    Cmd,
    Unknown,
}

impl ShellKind {
    /// Classify a shell by its program name or path.
    pub fn detect(program: &str) -> Self {
        let name = Path::new(program)
            .file_stem()
            .map(|s| s.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();

        match name.as_str() {
            "sh" | "bash" | "zsh" | "dash" | "ksh" | "mksh" | "ash" | "busybox" => ShellKind::Posix,
            "fish" => ShellKind::Fish,
            "pwsh" | "powershell" => ShellKind::PowerShell,
            "cmd" => ShellKind::Cmd,
            _ => ShellKind::Unknown,
        }
    }

    /// Whether command completion can be observed through markers.
    pub fn has_integration(&self) -> bool {
        matches!(self, ShellKind::Posix)
    }

    fn line_ending(&self) -> &'static str {
        match self {
            ShellKind::PowerShell | ShellKind::Cmd => "\r\n",
            _ => "\n",
        }
    }

    /// Input that prepares a fresh shell. Empty for shells without integration.
    pub fn priming_script(&self) -> String {
        if !self.has_integration() {
            return String::new();
        }
        format!(
            "stty -echo 2>/dev/null; exec 2>&1; PS1=''; PS2=''; PS4=''; RPS1=''; \
             PROMPT_COMMAND=''; unsetopt PROMPT_SP 2>/dev/null; \
             printf '{open}%s{close}\\n' READY\n",
            open = MARKER_OPEN,
            close = MARKER_CLOSE,
        )
    }

    /// Input that runs `command`, wrapped in markers when supported.
    ///
    /// With `detach_stdin` the command reads from `/dev/null` instead of the
    /// shell's own input.
    pub fn wrap_command(&self, seq: u64, command: &str, detach_stdin: bool) -> String {
        let command = command.trim_end_matches(['\n', '\r']);
        if !self.has_integration() {
            return format!("{}{}", command, self.line_ending());
        }
        let redirect = if detach_stdin { " </dev/null" } else { "" };
        format!(
            "printf '{open}START_%s{close}\\n' {seq}\n{{ {command}\n}}{redirect}; printf '{open}END_%s_%s{close}\\n' {seq} \"$?\"\n",
            open = MARKER_OPEN,
            close = MARKER_CLOSE,
        )
    }
}

/// A decoded output line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellLine {
    /// Ordinary output.
    Text(String),
    /// Priming finished; everything before this was setup noise.
    Ready,
    /// Command `seq` is about to run.
    Start(u64),
    /// Command `seq` finished. `prefix` is output printed on the same line
    /// before the marker (a final line with no trailing newline).
    End {
        seq: u64,
        exit_code: Option<i32>,
        prefix: String,
    },
}

impl ShellLine {
    /// Classify one clean output line.
    pub fn parse(line: String) -> Self {
        let Some(pos) = line.rfind(MARKER_OPEN) else {
            return ShellLine::Text(line);
        };
        let body = match line[pos + MARKER_OPEN.len()..].strip_suffix(MARKER_CLOSE) {
            Some(body) => body,
            None => return ShellLine::Text(line),
        };

        if body == "READY" && pos == 0 {
            return ShellLine::Ready;
        }
        if let Some(seq) = body.strip_prefix("START_") {
            if pos == 0 {
                if let Ok(seq) = seq.parse() {
                    return ShellLine::Start(seq);
                }
            }
        }
        if let Some(rest) = body.strip_prefix("END_") {
            if let Some((seq, code)) = rest.split_once('_') {
                if let Ok(seq) = seq.parse() {
                    return ShellLine::End {
                        seq,
                        exit_code: code.parse().ok(),
                        prefix: line[..pos].to_string(),
                    };
                }
            }
        }
        ShellLine::Text(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_posix_shells() {
        for program in ["/bin/sh", "/usr/bin/bash", "zsh", "/bin/dash", "BASH.EXE"] {
            assert_eq!(ShellKind::detect(program), ShellKind::Posix, "{}", program);
        }
    }

    #[test]
    fn test_detect_other_shells() {
        assert_eq!(ShellKind::detect("/usr/bin/fish"), ShellKind::Fish);
        assert_eq!(ShellKind::detect("powershell.exe"), ShellKind::PowerShell);
        assert_eq!(ShellKind::detect("pwsh"), ShellKind::PowerShell);
        assert_eq!(ShellKind::detect("cmd.exe"), ShellKind::Cmd);
        assert_eq!(ShellKind::detect("nu"), ShellKind::Unknown);
        assert!(!ShellKind::Fish.has_integration());
    }

    #[test]
    fn test_wrap_command_posix() {
        let wrapped = ShellKind::Posix.wrap_command(7, "echo hi\n", false);
        assert_eq!(
            wrapped,
            "printf '__SHB_START_%s__\\n' 7\n{ echo hi\n}; printf '__SHB_END_%s_%s__\\n' 7 \"$?\"\n"
        );
    }

    #[test]
    fn test_wrap_command_detached_stdin() {
        let wrapped = ShellKind::Posix.wrap_command(2, "read x", true);
        assert_eq!(
            wrapped,
            "printf '__SHB_START_%s__\\n' 2\n{ read x\n} </dev/null; printf '__SHB_END_%s_%s__\\n' 2 \"$?\"\n"
        );
    }

    #[test]
    fn test_end_marker_shares_line_with_group_close() {
        // The END printf must follow the closing brace on the same input
        // line, so the shell has read it before the command starts.
        let wrapped = ShellKind::Posix.wrap_command(3, "cat # trailing comment", false);
        let last = wrapped.lines().last().unwrap();
        assert!(last.starts_with("}; printf '__SHB_END_"));
        assert_eq!(wrapped.lines().filter(|l| l.contains("END_")).count(), 1);
    }

    #[test]
    fn test_wrap_command_raw() {
        assert_eq!(ShellKind::Cmd.wrap_command(1, "dir", true), "dir\r\n");
        assert_eq!(ShellKind::Fish.wrap_command(1, "ls", false), "ls\n");
        assert!(ShellKind::Fish.priming_script().is_empty());
    }

    #[test]
    fn test_echoed_wrapper_is_text() {
        let echoed = "printf '__SHB_END_%s_%s__\\n' 7 \"$?\"".to_string();
        assert!(matches!(ShellLine::parse(echoed), ShellLine::Text(_)));

        let priming = ShellKind::Posix.priming_script();
        for line in priming.lines() {
            assert!(matches!(ShellLine::parse(line.to_string()), ShellLine::Text(_)));
        }
    }

    #[test]
    fn test_parse_markers() {
        assert_eq!(ShellLine::parse("__SHB_READY__".into()), ShellLine::Ready);
        assert_eq!(ShellLine::parse("__SHB_START_12__".into()), ShellLine::Start(12));
        assert_eq!(
            ShellLine::parse("__SHB_END_12_0__".into()),
            ShellLine::End {
                seq: 12,
                exit_code: Some(0),
                prefix: String::new()
            }
        );
    }

    #[test]
    fn test_parse_end_with_prefix() {
        assert_eq!(
            ShellLine::parse("no newline__SHB_END_3_127__".into()),
            ShellLine::End {
                seq: 3,
                exit_code: Some(127),
                prefix: "no newline".into()
            }
        );
    }

    #[test]
    fn test_parse_plain_text() {
        assert_eq!(
            ShellLine::parse("hello".into()),
            ShellLine::Text("hello".into())
        );
        assert!(matches!(
            ShellLine::parse("__SHB_START_x__".into()),
            ShellLine::Text(_)
        ));
    }
}
