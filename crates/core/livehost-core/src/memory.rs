//! Rolling conversation memory and the recent-reply cache

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Speaker role in a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Viewer message
    User,
    /// Generated reply
    Assistant,
}

impl Role {
    /// Role as the wire string completion APIs expect
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One turn of conversation context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// Who spoke
    pub role: Role,
    /// What was said
    pub content: String,
}

/// Rolling window of recent conversation turns, oldest discarded first.
/// Lives for one session; cleared on demand.
pub struct ConversationHistory {
    turns: VecDeque<ConversationTurn>,
    max_turns: usize,
}

impl ConversationHistory {
    /// Create a history bounded to `max_turns` turns
    pub fn new(max_turns: usize) -> Self {
        Self {
            turns: VecDeque::new(),
            max_turns,
        }
    }

    /// Record one exchange (viewer message + generated reply)
    pub fn push_exchange(&mut self, user_content: String, assistant_content: String) {
        self.push(Role::User, user_content);
        self.push(Role::Assistant, assistant_content);
    }

    fn push(&mut self, role: Role, content: String) {
        self.turns.push_back(ConversationTurn { role, content });
        while self.turns.len() > self.max_turns {
            self.turns.pop_front();
        }
    }

    /// Turns currently in the window, oldest first
    pub fn turns(&self) -> impl Iterator<Item = &ConversationTurn> {
        self.turns.iter()
    }

    /// Number of turns in the window
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Whether the window is empty
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Drop all context
    pub fn clear(&mut self) {
        self.turns.clear();
    }
}

impl Default for ConversationHistory {
    fn default() -> Self {
        Self::new(20)
    }
}

/// Bounded cache of the last few generated replies. Only used to bias the
/// prompt away from repetition; not a correctness constraint.
pub struct RecentReplies {
    replies: VecDeque<String>,
    max_replies: usize,
}

impl RecentReplies {
    /// Create a cache bounded to `max_replies` entries
    pub fn new(max_replies: usize) -> Self {
        Self {
            replies: VecDeque::new(),
            max_replies,
        }
    }

    /// Record a generated reply, evicting the oldest past the bound
    pub fn push(&mut self, reply: String) {
        self.replies.push_back(reply);
        while self.replies.len() > self.max_replies {
            self.replies.pop_front();
        }
    }

    /// The most recent `n` replies, oldest of those first
    pub fn last_n(&self, n: usize) -> Vec<&str> {
        let skip = self.replies.len().saturating_sub(n);
        self.replies.iter().skip(skip).map(|s| s.as_str()).collect()
    }

    /// Whether any replies are cached
    pub fn is_empty(&self) -> bool {
        self.replies.is_empty()
    }

    /// Drop all cached replies
    pub fn clear(&mut self) {
        self.replies.clear();
    }
}

impl Default for RecentReplies {
    fn default() -> Self {
        Self::new(10)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_evicts_oldest_first() {
        let mut history = ConversationHistory::new(4);
        for i in 0..4 {
            history.push_exchange(format!("q{}", i), format!("a{}", i));
        }
        assert_eq!(history.len(), 4);
        let first = history.turns().next().unwrap();
        assert_eq!(first.content, "q2");
        assert_eq!(first.role, Role::User);
    }

    #[test]
    fn test_history_clear() {
        let mut history = ConversationHistory::default();
        history.push_exchange("q".into(), "a".into());
        history.clear();
        assert!(history.is_empty());
    }

    #[test]
    fn test_recent_replies_bounded() {
        let mut cache = RecentReplies::new(3);
        for i in 0..5 {
            cache.push(format!("reply {}", i));
        }
        assert_eq!(cache.last_n(10), vec!["reply 2", "reply 3", "reply 4"]);
    }

    #[test]
    fn test_last_n_takes_newest() {
        let mut cache = RecentReplies::default();
        for i in 0..5 {
            cache.push(format!("reply {}", i));
        }
        assert_eq!(cache.last_n(2), vec!["reply 3", "reply 4"]);
    }
}
