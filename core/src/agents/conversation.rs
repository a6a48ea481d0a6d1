use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Canonical message list handed to every provider: an optional leading
/// system turn, then the caller's history, then the new user message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    turns: Vec<ConversationTurn>,
}

impl Conversation {
    /// System turns inside `history` are dropped; the configured prompt is
    /// the only system turn a conversation carries.
    pub fn assemble(
        system_prompt: Option<&str>,
        history: &[ConversationTurn],
        message: &str,
    ) -> Self {
        let mut turns = Vec::with_capacity(history.len() + 2);
        if let Some(prompt) = system_prompt.map(str::trim).filter(|p| !p.is_empty()) {
            turns.push(ConversationTurn::new(Role::System, prompt));
        }
        let before = turns.len();
        turns.extend(
            history
                .iter()
                .filter(|turn| turn.role != Role::System)
                .cloned(),
        );
        let dropped = history.len() - (turns.len() - before);
        if dropped > 0 {
            log::debug!("dropped {dropped} system turn(s) supplied in conversation history");
        }
        turns.push(ConversationTurn::new(Role::User, message));
        Self { turns }
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn system_prompt(&self) -> Option<&str> {
        self.turns
            .first()
            .filter(|turn| turn.role == Role::System)
            .map(|turn| turn.content.as_str())
    }

    /// Every turn except the system turn, in order.
    pub fn dialogue(&self) -> impl Iterator<Item = &ConversationTurn> {
        self.turns.iter().filter(|turn| turn.role != Role::System)
    }
}
