//! Application state shared across all request handlers.

use std::sync::Arc;

use crate::config::RelayConfig;
use crate::conversation::{ConversationStore, JsonFileConversationStore};
use crate::llm::CompletionClient;

/// Shared application state.
pub struct AppState {
    /// Transcript storage.
    pub store: Arc<dyn ConversationStore>,
    /// Completion endpoint client.
    pub completion: CompletionClient,
}

impl AppState {
    /// Open the transcript file and build the completion client.
    ///
    /// # Errors
    /// Returns an error if the completion client cannot be created.
    pub async fn new(
        config: &RelayConfig,
    ) -> Result<Arc<Self>, Box<dyn std::error::Error + Send + Sync>> {
        let completion = CompletionClient::new(config.completion.clone())
            .map_err(|e| format!("Failed to create completion client: {e}"))?;

        let store = JsonFileConversationStore::open(&config.history_path).await;

        Ok(Self::from_parts(Arc::new(store), completion))
    }

    /// Assemble state from already-built parts.
    #[must_use]
    pub fn from_parts(store: Arc<dyn ConversationStore>, completion: CompletionClient) -> Arc<Self> {
        Arc::new(Self { store, completion })
    }
}
