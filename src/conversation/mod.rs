//! Per-user conversation transcripts.
//!
//! - [`Turn`]: one timestamped message.
//! - [`ConversationStore`]: append-only, per-user log of turns.
//! - [`JsonFileConversationStore`]: whole-document JSON persistence with atomic replace.

pub mod error;
pub mod store;
pub mod turn;

pub use error::{StoreError, StoreResult};
pub use store::{AppendReceipt, ConversationStore, Durability, JsonFileConversationStore};
pub use turn::{Role, Turn};
