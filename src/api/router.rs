//! API router configuration.

use std::sync::Arc;

use axum::{
    middleware,
    routing::{any, get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    answer_approval, api_info, execute_command, get_terminal, get_terminal_output, health,
    list_approvals, list_terminals, list_tools, AppState,
};
use super::websocket::ws_handler;
use crate::error::ShellBridgeError;
use crate::security::{auth_middleware, ApiKeyStore};

/// Create the API router with default state and no authentication.
pub fn create_router() -> Router {
    create_router_with_state(AppState::default(), Arc::new(ApiKeyStore::disabled()))
}

/// Create the API router with custom state and key store.
pub fn create_router_with_state(state: AppState, auth: Arc<ApiKeyStore>) -> Router {
    let tool_routes = Router::new()
        .route("/", get(list_tools))
        .route("/execute_command", post(execute_command))
        .route("/get_terminal_output", post(get_terminal_output));

    let terminal_routes = Router::new()
        .route("/", get(list_terminals))
        .route("/{id}", get(get_terminal))
        .route("/{id}/ws", any(ws_handler));

    let approval_routes = Router::new()
        .route("/", get(list_approvals))
        .route("/{id}", post(answer_approval));

    let api_v1 = Router::new()
        .route("/", get(api_info))
        .nest("/tools", tool_routes)
        .nest("/terminals", terminal_routes)
        .nest("/approvals", approval_routes);

    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api_v1)
        .layer(middleware::from_fn_with_state(auth, auth_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

/// Start the API server and run until Ctrl+C.
///
/// Terminal sessions are shut down before returning.
pub async fn serve(
    config: ServerConfig,
    state: AppState,
    auth: Arc<ApiKeyStore>,
) -> crate::Result<()> {
    let addr = config.bind_address();
    let registry = Arc::clone(&state.registry);
    let router = create_router_with_state(state, auth);

    tracing::info!("Starting shell-bridge API server on {}", addr);

    let listener = TcpListener::bind(&addr).await?;

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ShellBridgeError::Io(std::io::Error::other(e.to_string())))?;

    registry.shutdown();
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!("Shutdown signal received");
    }
}
