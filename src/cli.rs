//! Command-line interface for shell-bridge.
//!
//! Uses lexopt for minimal binary size overhead.

use std::ffi::OsString;
use std::net::IpAddr;
use std::path::PathBuf;

/// Command-line arguments.
///
/// Options left unset fall through to the environment, the config file,
/// and finally the defaults.
#[derive(Debug, Clone, Default)]
pub struct Args {
    pub host: Option<IpAddr>,
    pub port: Option<u16>,
    /// Path to configuration file.
    pub config: Option<PathBuf>,
    /// API key for authentication (added to the configured keys).
    pub api_key: Option<String>,
    /// Disable authentication.
    pub no_auth: bool,
    /// Workspace root for commands without a working directory.
    pub root: Option<PathBuf>,
    /// Shell program for new terminals.
    pub shell: Option<String>,
    /// Attach shells over plain pipes instead of a PTY.
    pub no_pty: bool,
    /// Ask for confirmation even for non-destructive commands.
    pub confirm_all: bool,
    /// Approve every command without asking.
    pub yes: bool,
    /// Log level (error, warn, info, debug, trace) or a full filter.
    pub log_level: Option<String>,
    pub version: bool,
    pub help: bool,
}

/// Parse command-line arguments.
pub fn parse_args() -> Result<Args, ArgsError> {
    parse_args_from(std::env::args_os())
}

/// Parse arguments from an iterator (for testing).
pub fn parse_args_from<I>(args: I) -> Result<Args, ArgsError>
where
    I: IntoIterator<Item = OsString>,
{
    use lexopt::prelude::*;

    let mut result = Args::default();
    let mut parser = lexopt::Parser::from_iter(args);

    while let Some(arg) = parser.next()? {
        match arg {
            Short('h') | Long("help") => {
                result.help = true;
            }
            Short('V') | Long("version") => {
                result.version = true;
            }
            Short('H') | Long("host") => {
                let value: String = parser.value()?.parse()?;
                result.host = Some(
                    value
                        .parse()
                        .map_err(|_| ArgsError::InvalidValue("host", value))?,
                );
            }
            Short('p') | Long("port") => {
                let value: String = parser.value()?.parse()?;
                result.port = Some(
                    value
                        .parse()
                        .map_err(|_| ArgsError::InvalidValue("port", value))?,
                );
            }
            Short('c') | Long("config") => {
                result.config = Some(parser.value()?.parse()?);
            }
            Short('k') | Long("api-key") => {
                result.api_key = Some(parser.value()?.parse()?);
            }
            Long("no-auth") => {
                result.no_auth = true;
            }
            Short('r') | Long("root") => {
                result.root = Some(parser.value()?.parse()?);
            }
            Long("shell") => {
                result.shell = Some(parser.value()?.parse()?);
            }
            Long("no-pty") => {
                result.no_pty = true;
            }
            Long("confirm-all") => {
                result.confirm_all = true;
            }
            Short('y') | Long("yes") => {
                result.yes = true;
            }
            Short('l') | Long("log-level") => {
                result.log_level = Some(parser.value()?.parse()?);
            }
            Value(val) => {
                return Err(ArgsError::UnexpectedArgument(val.to_string_lossy().into()));
            }
            _ => return Err(arg.unexpected().into()),
        }
    }

    Ok(result)
}

/// Print help message.
pub fn print_help() {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        r#"shell-bridge {version}
Run shell commands for an automation client in reusable terminals, with human approval

USAGE:
    shell-bridge [OPTIONS]

OPTIONS:
    -H, --host <ADDR>       Host address to bind [default: 127.0.0.1]
    -p, --port <PORT>       Port to listen on [default: 3000]
    -c, --config <FILE>     Path to configuration file (JSON)
    -k, --api-key <KEY>     API key for authentication
        --no-auth           Disable authentication
    -r, --root <DIR>        Workspace root for commands [default: current directory]
        --shell <PROGRAM>   Shell for new terminals [default: $SHELL or /bin/sh]
        --no-pty            Attach shells over pipes instead of a pseudo-terminal
        --confirm-all       Ask for approval even for non-destructive commands
    -y, --yes               Approve every command without asking
    -l, --log-level <LVL>   Log level (error, warn, info, debug, trace)
    -h, --help              Print help
    -V, --version           Print version

ENVIRONMENT VARIABLES:
    SHELL_BRIDGE_HOST       Host address (overrides config)
    SHELL_BRIDGE_PORT       Port number (overrides config)
    SHELL_BRIDGE_API_KEY    API key (overrides config)
    SHELL_BRIDGE_ROOT       Workspace root (overrides config)
    SHELL_BRIDGE_SHELL      Shell program (overrides config)
    SHELL_BRIDGE_LOG_LEVEL  Log level (overrides config)
    RUST_LOG                Alternative log level setting

EXAMPLES:
    # Serve the current directory on localhost:3000
    shell-bridge

    # Serve a project with an API key
    shell-bridge -r ~/src/project -k my-secret-key

    # Start with config file
    shell-bridge -c /etc/shell-bridge/config.json

    # Trusted automation: no approval prompts
    shell-bridge --yes
"#
    );
}

/// Print version.
pub fn print_version() {
    println!("shell-bridge {}", env!("CARGO_PKG_VERSION"));
}

/// Argument parsing errors.
#[derive(Debug)]
pub enum ArgsError {
    /// Lexopt parsing error.
    Lexopt(lexopt::Error),
    /// Invalid argument value.
    InvalidValue(&'static str, String),
    /// Unexpected positional argument.
    UnexpectedArgument(String),
}

impl std::fmt::Display for ArgsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lexopt(e) => write!(f, "{}", e),
            Self::InvalidValue(name, value) => {
                write!(f, "invalid value for --{}: '{}'", name, value)
            }
            Self::UnexpectedArgument(arg) => {
                write!(f, "unexpected argument: '{}'", arg)
            }
        }
    }
}

impl std::error::Error for ArgsError {}

impl From<lexopt::Error> for ArgsError {
    fn from(e: lexopt::Error) -> Self {
        Self::Lexopt(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(args: &[&str]) -> Vec<OsString> {
        std::iter::once("shell-bridge")
            .chain(args.iter().copied())
            .map(OsString::from)
            .collect()
    }

    #[test]
    fn test_default_args() {
        let result = parse_args_from(args(&[])).unwrap();
        assert!(result.host.is_none());
        assert!(result.port.is_none());
        assert!(!result.no_auth);
        assert!(!result.yes);
    }

    #[test]
    fn test_host_port() {
        let result = parse_args_from(args(&["-H", "0.0.0.0", "-p", "8080"])).unwrap();
        assert_eq!(result.host.unwrap().to_string(), "0.0.0.0");
        assert_eq!(result.port, Some(8080));
    }

    #[test]
    fn test_long_options() {
        let result =
            parse_args_from(args(&["--host", "192.168.1.1", "--port", "9000"])).unwrap();
        assert_eq!(result.host.unwrap().to_string(), "192.168.1.1");
        assert_eq!(result.port, Some(9000));
    }

    #[test]
    fn test_api_key_and_config() {
        let result = parse_args_from(args(&["-k", "my-secret", "-c", "/etc/config.json"])).unwrap();
        assert_eq!(result.api_key, Some("my-secret".to_string()));
        assert_eq!(result.config, Some(PathBuf::from("/etc/config.json")));
    }

    #[test]
    fn test_execution_options() {
        let result = parse_args_from(args(&[
            "-r",
            "/work",
            "--shell",
            "/bin/bash",
            "--no-pty",
            "--confirm-all",
        ]))
        .unwrap();
        assert_eq!(result.root, Some(PathBuf::from("/work")));
        assert_eq!(result.shell.as_deref(), Some("/bin/bash"));
        assert!(result.no_pty);
        assert!(result.confirm_all);
    }

    #[test]
    fn test_yes_flag() {
        assert!(parse_args_from(args(&["-y"])).unwrap().yes);
        assert!(parse_args_from(args(&["--yes"])).unwrap().yes);
    }

    #[test]
    fn test_help_and_version_flags() {
        assert!(parse_args_from(args(&["-h"])).unwrap().help);
        assert!(parse_args_from(args(&["--help"])).unwrap().help);
        assert!(parse_args_from(args(&["-V"])).unwrap().version);
        assert!(parse_args_from(args(&["--version"])).unwrap().version);
    }

    #[test]
    fn test_log_level() {
        let result = parse_args_from(args(&["-l", "debug"])).unwrap();
        assert_eq!(result.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_invalid_values() {
        assert!(parse_args_from(args(&["-p", "invalid"])).is_err());
        assert!(parse_args_from(args(&["-H", "not-an-ip"])).is_err());
    }

    #[test]
    fn test_unexpected_positional() {
        let err = parse_args_from(args(&["serve"])).unwrap_err();
        assert!(err.to_string().contains("serve"));
    }
}
