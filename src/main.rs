//! shell-bridge binary entry point.

use std::process::ExitCode;
use std::sync::Arc;

use shell_bridge::api::{serve, AppState};
use shell_bridge::cli::{parse_args, print_help, print_version};
use shell_bridge::config::Config;
use shell_bridge::host::Settings;
use shell_bridge::logging;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    let args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("error: {}", e);
            eprintln!("Run with --help for usage.");
            return ExitCode::from(2);
        }
    };

    if args.help {
        print_help();
        return ExitCode::SUCCESS;
    }
    if args.version {
        print_version();
        return ExitCode::SUCCESS;
    }

    let mut config = match Config::load(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    logging::init_with_filter(Some(config.log_filter()));

    info!("shell-bridge v{}", env!("CARGO_PKG_VERSION"));

    let server_config = match config.to_server_config() {
        Ok(server_config) => server_config,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Some(key) = config.ensure_api_key() {
        info!("Generated API key: {}", key);
    }

    let auth = Arc::new(config.api_key_store());
    if auth.is_enabled() {
        info!("API key authentication enabled ({} keys)", auth.count());
    } else if !server_config.host.starts_with("127.") && server_config.host != "::1" {
        warn!(
            "Authentication is disabled while listening on {}",
            server_config.host
        );
    }

    match config.workspace_root() {
        Some(root) => info!("Workspace root: {}", root.display()),
        None => warn!("No workspace root; commands must pass customCwd"),
    }
    if config.execution.auto_approve {
        warn!("Auto-approve is on; commands run without confirmation");
    }

    let state = AppState::from_config(&config);
    if let Err(e) = serve(server_config, state, auth).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("shell-bridge stopped");
    ExitCode::SUCCESS
}
