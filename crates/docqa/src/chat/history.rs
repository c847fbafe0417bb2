//! Per-user chat history

use chrono::Duration;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;

use crate::types::{ChatTurn, ConversationSummary};

type Conversations = HashMap<String, Vec<ChatTurn>>;

/// In-memory chat history, partitioned by user then conversation.
///
/// Every operation takes the user, so nothing crosses user boundaries.
/// Missing users and conversations read as empty.
#[derive(Clone, Default)]
pub struct ChatHistoryStore {
    users: Arc<DashMap<String, Conversations>>,
}

impl ChatHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one turn
    pub fn append(&self, user: &str, conversation_id: &str, turn: ChatTurn) {
        let mut conversations = self.users.entry(user.to_string()).or_default();
        let turns = conversations.entry(conversation_id.to_string()).or_default();
        push_ordered(turns, turn);
    }

    /// Append a question and its answer as one step, so readers never see half an exchange
    pub fn append_exchange(&self, user: &str, conversation_id: &str, question: ChatTurn, answer: ChatTurn) {
        let mut conversations = self.users.entry(user.to_string()).or_default();
        let turns = conversations.entry(conversation_id.to_string()).or_default();
        push_ordered(turns, question);
        push_ordered(turns, answer);
    }

    /// Turns of one conversation, oldest first
    pub fn list(&self, user: &str, conversation_id: &str) -> Vec<ChatTurn> {
        self.users
            .get(user)
            .and_then(|c| c.get(conversation_id).cloned())
            .unwrap_or_default()
    }

    /// One entry per conversation, most recently active first
    pub fn summarize(&self, user: &str) -> Vec<ConversationSummary> {
        let Some(conversations) = self.users.get(user) else {
            return Vec::new();
        };

        let mut summaries: Vec<ConversationSummary> = conversations
            .iter()
            .filter_map(|(id, turns)| {
                let last = turns.last()?;
                Some(ConversationSummary {
                    session_id: id.clone(),
                    last_message: last.content.clone(),
                    last_timestamp: last.timestamp,
                    message_count: turns.len(),
                })
            })
            .collect();
        drop(conversations);

        summaries.sort_by(|a, b| {
            b.last_timestamp
                .cmp(&a.last_timestamp)
                .then_with(|| a.session_id.cmp(&b.session_id))
        });
        summaries
    }

    /// Delete one conversation
    pub fn clear(&self, user: &str, conversation_id: &str) -> bool {
        self.users
            .get_mut(user)
            .map(|mut c| c.remove(conversation_id).is_some())
            .unwrap_or(false)
    }

    /// Delete every conversation of one user
    pub fn clear_all(&self, user: &str) -> usize {
        self.users
            .remove(user)
            .map(|(_, c)| c.len())
            .unwrap_or(0)
    }
}

/// Keep timestamps strictly increasing within a conversation
fn push_ordered(turns: &mut Vec<ChatTurn>, mut turn: ChatTurn) {
    if let Some(last) = turns.last() {
        if turn.timestamp <= last.timestamp {
            turn.timestamp = last.timestamp + Duration::microseconds(1);
        }
    }
    turns.push(turn);
}
