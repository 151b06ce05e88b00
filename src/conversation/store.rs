//! Conversation store backed by a single JSON document.

use std::collections::BTreeMap;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use tokio::fs;
use tokio::sync::Mutex;

use crate::conversation::error::StoreResult;
use crate::conversation::turn::{Role, Turn};

/// Boxed future type for store operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Whether a mutation reached the backing file.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Durability {
    /// The whole mapping was written.
    Persisted,
    /// Nothing changed, nothing was written.
    Unchanged,
    /// The write failed; only the in-memory state holds the change.
    MemoryOnly,
}

impl Durability {
    /// True unless the write failed.
    #[must_use]
    pub const fn is_durable(self) -> bool {
        !matches!(self, Self::MemoryOnly)
    }
}

/// Result of appending a turn.
#[derive(Clone, Debug)]
pub struct AppendReceipt {
    /// The turn as stored.
    pub turn: Turn,
    /// Outcome of the write.
    pub durability: Durability,
}

/// Per-user conversation storage.
///
/// Operations never fail: persistence problems are logged and surfaced
/// through [`Durability`].
pub trait ConversationStore: Send + Sync {
    /// Append a turn stamped with the current time, creating the conversation if needed.
    fn add_message(&self, user_id: &str, role: Role, content: &str)
    -> StoreFuture<'_, AppendReceipt>;

    /// Return the user's turns in chronological order, or an empty list.
    fn history(&self, user_id: &str) -> StoreFuture<'_, Vec<Turn>>;

    /// Remove the user's conversation entirely.
    fn clear_conversation(&self, user_id: &str) -> StoreFuture<'_, Durability>;
}

type Conversations = BTreeMap<String, Vec<Turn>>;

/// JSON file implementation of [`ConversationStore`].
///
/// Every mutation rewrites the whole document through a temporary file and a
/// rename, while holding the store lock.
pub struct JsonFileConversationStore {
    path: PathBuf,
    conversations: Mutex<Conversations>,
}

impl JsonFileConversationStore {
    /// Open the store, loading any existing document.
    ///
    /// A missing file starts an empty store. An unreadable or corrupt file is
    /// logged and also starts an empty store; its content is overwritten on
    /// the next mutation.
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let conversations = match load_conversations(&path).await {
            Ok(conversations) => {
                tracing::info!(
                    path = %path.display(),
                    users = conversations.len(),
                    "loaded conversation history"
                );
                conversations
            }
            Err(err) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to load conversation history, starting empty"
                );
                Conversations::new()
            }
        };

        Self {
            path,
            conversations: Mutex::new(conversations),
        }
    }

    /// Location of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, conversations: &Conversations) -> Durability {
        match save_conversations(&self.path, conversations).await {
            Ok(()) => Durability::Persisted,
            Err(err) => {
                tracing::error!(
                    path = %self.path.display(),
                    error = %err,
                    "failed to save conversation history"
                );
                Durability::MemoryOnly
            }
        }
    }
}

impl ConversationStore for JsonFileConversationStore {
    fn add_message(
        &self,
        user_id: &str,
        role: Role,
        content: &str,
    ) -> StoreFuture<'_, AppendReceipt> {
        let user_id = user_id.to_string();
        let content = content.to_string();
        Box::pin(async move {
            let mut conversations = self.conversations.lock().await;
            let turn = Turn::now(role, content);
            conversations
                .entry(user_id.clone())
                .or_default()
                .push(turn.clone());
            let durability = self.persist(&conversations).await;
            tracing::debug!(user_id = %user_id, role = %role, ?durability, "appended turn");
            AppendReceipt { turn, durability }
        })
    }

    fn history(&self, user_id: &str) -> StoreFuture<'_, Vec<Turn>> {
        let user_id = user_id.to_string();
        Box::pin(async move {
            self.conversations
                .lock()
                .await
                .get(&user_id)
                .cloned()
                .unwrap_or_default()
        })
    }

    fn clear_conversation(&self, user_id: &str) -> StoreFuture<'_, Durability> {
        let user_id = user_id.to_string();
        Box::pin(async move {
            let mut conversations = self.conversations.lock().await;
            if conversations.remove(&user_id).is_none() {
                return Durability::Unchanged;
            }
            let durability = self.persist(&conversations).await;
            tracing::info!(user_id = %user_id, ?durability, "cleared conversation");
            durability
        })
    }
}

async fn load_conversations(path: &Path) -> StoreResult<Conversations> {
    let content = match fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Conversations::new()),
        Err(err) => return Err(err.into()),
    };
    Ok(serde_json::from_str(&content)?)
}

async fn save_conversations(path: &Path, conversations: &Conversations) -> StoreResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    let tmp_path = tmp_path_for(path);
    let content = serde_json::to_string_pretty(conversations)?;
    fs::write(&tmp_path, content).await?;
    fs::rename(&tmp_path, path).await?;
    Ok(())
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
