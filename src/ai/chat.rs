//! Per-patient chat history, in memory only.
//!
//! Transcripts live for the life of the process and are never written to
//! the store; clearing a session discards them.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

/// Append-only message histories keyed by patient id.
#[derive(Default)]
pub struct ChatSessions {
    sessions: DashMap<String, Vec<ChatMessage>>,
}

impl ChatSessions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, patient_id: &str, role: ChatRole, content: impl Into<String>) {
        self.sessions
            .entry(patient_id.to_string())
            .or_default()
            .push(ChatMessage {
                role,
                content: content.into(),
            });
    }

    pub fn history(&self, patient_id: &str) -> Vec<ChatMessage> {
        self.sessions
            .get(patient_id)
            .map(|messages| messages.clone())
            .unwrap_or_default()
    }

    pub fn clear(&self, patient_id: &str) {
        self.sessions.remove(patient_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_is_append_only_and_per_patient() {
        let sessions = ChatSessions::new();
        sessions.push("p1", ChatRole::User, "first question");
        sessions.push("p1", ChatRole::Assistant, "first answer");
        sessions.push("p2", ChatRole::User, "other patient");

        let history = sessions.history("p1");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, ChatRole::User);
        assert_eq!(history[1].content, "first answer");
        assert_eq!(sessions.history("p2").len(), 1);
    }

    #[test]
    fn test_clear_discards_one_session() {
        let sessions = ChatSessions::new();
        sessions.push("p1", ChatRole::User, "hello");
        sessions.push("p2", ChatRole::User, "hello");

        sessions.clear("p1");
        assert!(sessions.history("p1").is_empty());
        assert_eq!(sessions.history("p2").len(), 1);
    }
}
