//! CLI integration tests.
//!
//! These tests verify the CLI argument parsing and configuration loading.

use std::ffi::OsString;
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

use shell_bridge::cli::{parse_args_from, Args};
use shell_bridge::config::Config;
use shell_bridge::host::{Settings, CONFIRM_NON_DESTRUCTIVE};
use shell_bridge::pty::ShellBackend;

fn args(args: &[&str]) -> Vec<OsString> {
    std::iter::once("shell-bridge")
        .chain(args.iter().copied())
        .map(OsString::from)
        .collect()
}

fn config_file(json: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(json.as_bytes()).unwrap();
    file
}

// ============================================================================
// CLI Argument Tests
// ============================================================================

#[test]
fn test_cli_defaults() {
    let result = parse_args_from(args(&[])).unwrap();

    assert!(result.host.is_none());
    assert!(result.port.is_none());
    assert!(!result.no_auth);
    assert!(!result.no_pty);
    assert!(!result.yes);
    assert!(result.config.is_none());
    assert!(result.api_key.is_none());
    assert!(result.root.is_none());
}

#[test]
fn test_cli_full_options() {
    let result = parse_args_from(args(&[
        "-H",
        "0.0.0.0",
        "-p",
        "8080",
        "-k",
        "my-api-key",
        "-l",
        "debug",
        "--root",
        "/srv/work",
        "--shell",
        "bash",
        "--no-pty",
        "--confirm-all",
    ]))
    .unwrap();

    assert_eq!(result.host.unwrap().to_string(), "0.0.0.0");
    assert_eq!(result.port, Some(8080));
    assert_eq!(result.api_key, Some("my-api-key".to_string()));
    assert_eq!(result.log_level, Some("debug".to_string()));
    assert_eq!(result.root, Some(PathBuf::from("/srv/work")));
    assert_eq!(result.shell.as_deref(), Some("bash"));
    assert!(result.no_pty);
    assert!(result.confirm_all);
    assert!(!result.no_auth);
}

#[test]
fn test_cli_config_file() {
    let result = parse_args_from(args(&["-c", "/etc/shell-bridge.json"])).unwrap();
    assert_eq!(
        result.config.unwrap().to_str().unwrap(),
        "/etc/shell-bridge.json"
    );
}

#[test]
fn test_cli_invalid_port() {
    assert!(parse_args_from(args(&["-p", "not-a-number"])).is_err());
    assert!(parse_args_from(args(&["-p", "70000"])).is_err());
}

#[test]
fn test_cli_invalid_host() {
    assert!(parse_args_from(args(&["-H", "not-an-ip"])).is_err());
}

#[test]
fn test_cli_missing_value() {
    assert!(parse_args_from(args(&["--root"])).is_err());
}

#[test]
fn test_cli_unknown_flag() {
    assert!(parse_args_from(args(&["--rate-limit"])).is_err());
}

// ============================================================================
// Configuration Loading Tests
// ============================================================================

#[test]
fn test_config_from_json_file() {
    let file = config_file(
        r#"{
        "server": { "host": "192.168.1.100", "port": 9000 },
        "security": { "auth": { "enabled": true, "api_keys": ["key1", "key2"] } },
        "execution": {
            "root": "/srv/project",
            "auto_approve": true,
            "output_history_lines": 500
        },
        "logging": { "level": "debug" }
    }"#,
    );

    let config = Config::from_file(file.path()).unwrap();

    assert_eq!(config.server.host, "192.168.1.100");
    assert_eq!(config.server.port, 9000);
    assert!(config.security.auth.enabled);
    assert_eq!(config.security.auth.api_keys.len(), 2);
    assert!(config.execution.auto_approve);
    assert_eq!(config.registry_config().history_lines, 500);
    assert_eq!(config.logging.level, "debug");
}

#[test]
fn test_config_missing_file() {
    let args = Args {
        config: Some(PathBuf::from("/nonexistent/shell-bridge.json")),
        ..Args::default()
    };
    assert!(Config::load(&args).is_err());
}

#[test]
fn test_config_priority_cli_over_file() {
    let file = config_file(
        r#"{
        "server": { "host": "10.0.0.1", "port": 5000 },
        "execution": { "root": "/from/file", "use_pty": true }
    }"#,
    );

    let args = Args {
        host: Some("192.168.1.1".parse().unwrap()),
        port: Some(8080),
        root: Some(PathBuf::from("/from/cli")),
        no_pty: true,
        config: Some(file.path().to_path_buf()),
        ..Args::default()
    };

    let config = Config::load(&args).unwrap();

    assert_eq!(config.server.host, "192.168.1.1");
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.workspace_root(), Some(PathBuf::from("/from/cli")));
    assert_eq!(config.registry_config().backend, ShellBackend::Pipe);
}

#[test]
fn test_config_file_values_survive_empty_args() {
    let file = config_file(r#"{ "server": { "port": 5000 } }"#);

    let args = Args {
        config: Some(file.path().to_path_buf()),
        ..Args::default()
    };

    let config = Config::load(&args).unwrap();
    assert_eq!(config.server.port, 5000);
}

#[test]
fn test_config_api_key_enables_auth() {
    let args = Args {
        api_key: Some("secret-key".to_string()),
        ..Args::default()
    };

    let config = Config::load(&args).unwrap();

    assert!(config.security.auth.enabled);
    assert!(config.api_key_store().is_valid("secret-key"));
}

#[test]
fn test_config_no_auth_disables() {
    let file = config_file(r#"{ "security": { "auth": { "enabled": true, "api_keys": ["key1"] } } }"#);

    let args = Args {
        config: Some(file.path().to_path_buf()),
        no_auth: true,
        ..Args::default()
    };

    let config = Config::load(&args).unwrap();

    assert!(!config.security.auth.enabled);
    assert!(!config.api_key_store().is_enabled());
}

#[test]
fn test_config_confirmation_flags() {
    let args = Args {
        confirm_all: true,
        yes: true,
        ..Args::default()
    };

    let config = Config::load(&args).unwrap();
    assert!(config.get_bool(CONFIRM_NON_DESTRUCTIVE, false));
    assert!(config.execution.auto_approve);
}

#[test]
fn test_config_to_server_config() {
    let args = Args {
        host: Some("0.0.0.0".parse().unwrap()),
        port: Some(8080),
        ..Args::default()
    };

    let server_config = Config::load(&args).unwrap().to_server_config().unwrap();

    assert_eq!(server_config.host, "0.0.0.0");
    assert_eq!(server_config.port, 8080);
    assert_eq!(server_config.bind_address(), "0.0.0.0:8080");
}

// ============================================================================
// Configuration Serialization Tests
// ============================================================================

#[test]
fn test_config_roundtrip() {
    let mut original = Config::default();
    original.execution.shell = Some("zsh".into());
    let json = serde_json::to_string(&original).unwrap();
    let loaded: Config = serde_json::from_str(&json).unwrap();

    assert_eq!(original.server.host, loaded.server.host);
    assert_eq!(original.server.port, loaded.server.port);
    assert_eq!(loaded.execution.shell.as_deref(), Some("zsh"));
}

#[test]
fn test_config_partial_deserialization() {
    let config: Config = serde_json::from_str(r#"{"execution": {"auto_approve": true}}"#).unwrap();

    assert!(config.execution.auto_approve);
    assert!(config.execution.use_pty);
    assert_eq!(config.server.host, "127.0.0.1");
}
