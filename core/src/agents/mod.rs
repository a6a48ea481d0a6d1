pub mod config;
pub mod conversation;
pub mod markup;
pub mod providers;

pub use config::{ProviderKind, ProviderSettings};
pub use conversation::{Conversation, ConversationTurn, Role};
pub use providers::{ChatProvider, ProviderError};
