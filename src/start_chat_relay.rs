//! Startup helpers for the chat relay server.

use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use crate::config::RelayConfig;
use crate::server::{self, AppState};

/// Run the server (used by the `chat-relay` binary).
///
/// # Returns
/// `ExitCode::SUCCESS` on graceful shutdown, `1` on failure.
#[must_use]
pub fn run() -> ExitCode {
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    match dotenv {
        Ok(path) => tracing::info!("Loaded environment from {}", path.display()),
        Err(e) => tracing::debug!("No .env file loaded: {e}"),
    }

    tracing::info!("Starting chat relay v{}", env!("CARGO_PKG_VERSION"));

    let config = match RelayConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Configuration error: {e}");
            return ExitCode::from(1);
        }
    };
    tracing::info!(
        "Completion endpoint: {} (model {})",
        config.completion.base_url,
        config.completion.model
    );

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to create runtime: {e}");
            return ExitCode::from(1);
        }
    };

    let result = rt.block_on(async {
        match initialize(&config).await {
            Ok(state) => {
                server::run_server_with_shutdown(state, bind_addr(&config), shutdown_signal())
                    .await
            }
            Err(e) => Err(e),
        }
    });

    if let Err(e) = result {
        tracing::error!("Server error: {e}");
        return ExitCode::from(1);
    }

    ExitCode::SUCCESS
}

/// Initialize application state without starting the server.
///
/// # Errors
/// Returns an error if state creation fails.
pub async fn initialize(
    config: &RelayConfig,
) -> Result<Arc<AppState>, Box<dyn std::error::Error + Send + Sync>> {
    tracing::info!("Conversation history: {}", config.history_path.display());

    AppState::new(config)
        .await
        .map_err(|e| format!("Failed to create state: {e}").into())
}

/// Address the server binds to.
#[must_use]
pub const fn bind_addr(config: &RelayConfig) -> SocketAddr {
    SocketAddr::new(config.host, config.port)
}

/// Resolves on Ctrl+C.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Role;
    use std::net::IpAddr;

    #[tokio::test]
    async fn test_initialize_opens_configured_history() {
        let dir = tempfile::tempdir().unwrap();
        let history_path = dir.path().join("history.json");
        std::fs::write(
            &history_path,
            r#"{"u1": [{"role": "user", "content": "hello", "timestamp": "2024-05-01T10:15:30"}]}"#,
        )
        .unwrap();

        let path_str = history_path.to_string_lossy().into_owned();
        let config = RelayConfig::from_lookup(|name| match name {
            "API_BASE_URL" => Some("http://127.0.0.1:9/v1".to_string()),
            "API_KEY" => Some("sk-test".to_string()),
            "MODEL_NAME" => Some("test/model".to_string()),
            "CHAT_RELAY_HISTORY_PATH" => Some(path_str.clone()),
            _ => None,
        })
        .unwrap();

        let state = initialize(&config).await.unwrap();
        let history = state.store.history("u1").await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(state.completion.config().model, "test/model");
    }

    #[test]
    fn test_bind_addr_uses_host_and_port() {
        let config = RelayConfig::from_lookup(|name| match name {
            "API_BASE_URL" => Some("http://127.0.0.1:9/v1".to_string()),
            "API_KEY" => Some("sk-test".to_string()),
            "MODEL_NAME" => Some("test/model".to_string()),
            "CHAT_RELAY_PORT" => Some("8123".to_string()),
            _ => None,
        })
        .unwrap();

        let addr = bind_addr(&config);
        assert_eq!(addr.ip(), IpAddr::from([127, 0, 0, 1]));
        assert_eq!(addr.port(), 8123);
    }
}
