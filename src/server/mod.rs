//! HTTP server for the chat relay API.
//!
//! Provides REST endpoints for:
//! - Sending a message and receiving the assistant's reply
//! - Starting a conversation with an unprompted assistant greeting
//! - Reading and clearing a user's history

pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::AppState;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Start the HTTP server with graceful shutdown support.
///
/// The server will stop accepting new connections when `shutdown_signal` completes.
///
/// # Errors
/// Returns an error if the server fails to start.
pub async fn run_server_with_shutdown<F>(
    state: Arc<AppState>,
    addr: SocketAddr,
    shutdown_signal: F,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
where
    F: Future<Output = ()> + Send + 'static,
{
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app: Router = create_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(cors),
    );

    tracing::info!("Chat relay listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompletionConfig;
    use crate::conversation::JsonFileConversationStore;
    use crate::llm::CompletionClient;
    use crate::test_support::UNREACHABLE_BASE_URL;

    async fn state_in(dir: &tempfile::TempDir) -> Arc<AppState> {
        let config = CompletionConfig::new(UNREACHABLE_BASE_URL, "sk-test", "test/model").unwrap();
        let store = JsonFileConversationStore::open(dir.path().join("history.json")).await;
        AppState::from_parts(Arc::new(store), CompletionClient::new(config).unwrap())
    }

    #[tokio::test]
    async fn test_server_stops_on_shutdown_signal() {
        let dir = tempfile::tempdir().unwrap();
        let (stop, stopped) = tokio::sync::oneshot::channel::<()>();
        let addr = SocketAddr::from(([127, 0, 0, 1], 0));

        let state = state_in(&dir).await;
        let shutdown = async move {
            let _ = stopped.await;
        };

        let server = tokio::spawn(run_server_with_shutdown(state, addr, shutdown));
        stop.send(()).unwrap();

        let outcome = tokio::time::timeout(std::time::Duration::from_secs(5), server)
            .await
            .unwrap()
            .unwrap();
        assert!(outcome.is_ok());
    }

    #[tokio::test]
    async fn test_port_in_use_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let taken = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = taken.local_addr().unwrap();

        let outcome = run_server_with_shutdown(state_in(&dir).await, addr, async {}).await;
        assert!(outcome.is_err());
    }
}
