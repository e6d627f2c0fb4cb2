//! Bounded, ordered retention of the most recent chat messages.

use std::collections::VecDeque;

use chrono::Utc;
use parking_lot::Mutex;

use crate::models::ChatMessage;

/// Number of messages retained.
pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

struct Inner {
    next_id: u64,
    messages: VecDeque<ChatMessage>,
}

/// In-memory message history shared by sessions and the reply listener.
///
/// The id counter and the deque sit behind one lock so that id assignment and
/// insertion happen atomically: ids in the deque are always strictly
/// increasing.
pub struct MessageHistory {
    capacity: usize,
    inner: Mutex<Inner>,
}

impl MessageHistory {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            inner: Mutex::new(Inner {
                next_id: 1,
                messages: VecDeque::with_capacity(capacity),
            }),
        }
    }

    /// Store a new message and return a copy of it.
    /// Evicts the oldest entry once the history exceeds capacity.
    pub fn append(&self, author: &str, body: &str) -> ChatMessage {
        let mut inner = self.inner.lock();
        let message = ChatMessage {
            id: inner.next_id,
            user: author.to_string(),
            content: body.to_string(),
            timestamp: Utc::now(),
        };
        inner.next_id += 1;
        inner.messages.push_back(message.clone());
        while inner.messages.len() > self.capacity {
            inner.messages.pop_front();
        }
        message
    }

    /// Copy of the retained messages, oldest first.
    pub fn snapshot(&self) -> Vec<ChatMessage> {
        self.inner.lock().messages.iter().cloned().collect()
    }

    /// Case-insensitive substring search over message bodies.
    ///
    /// A blank term matches nothing.
    pub fn search(&self, term: &str) -> Vec<ChatMessage> {
        let needle = term.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        self.inner
            .lock()
            .messages
            .iter()
            .filter(|m| m.content.to_lowercase().contains(&needle))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MessageHistory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn append_assigns_ids_starting_at_one() {
        let history = MessageHistory::new();
        let first = history.append("alice", "hello");
        let second = history.append("bob", "hi");
        assert_eq!(first.id, 1);
        assert_eq!(first.user, "alice");
        assert_eq!(first.content, "hello");
        assert_eq!(second.id, 2);
    }

    #[test]
    fn keeps_only_the_most_recent_fifty() {
        let history = MessageHistory::new();
        for i in 1..=120 {
            history.append("alice", &format!("message {i}"));
        }

        let snapshot = history.snapshot();
        assert_eq!(snapshot.len(), DEFAULT_HISTORY_CAPACITY);
        assert_eq!(snapshot.first().unwrap().id, 71);
        assert_eq!(snapshot.last().unwrap().id, 120);
        assert_eq!(snapshot.first().unwrap().content, "message 71");
        assert!(snapshot.windows(2).all(|w| w[0].id < w[1].id));
    }

    #[test]
    fn ids_are_not_reused_after_eviction() {
        let history = MessageHistory::with_capacity(2);
        history.append("a", "1");
        history.append("a", "2");
        history.append("a", "3");
        let next = history.append("a", "4");
        assert_eq!(next.id, 4);
        let ids: Vec<u64> = history.snapshot().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![3, 4]);
    }

    #[test]
    fn snapshot_is_a_detached_copy() {
        let history = MessageHistory::new();
        history.append("alice", "original");

        let mut snapshot = history.snapshot();
        snapshot[0].content = "tampered".to_string();
        snapshot.clear();

        let fresh = history.snapshot();
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].content, "original");
    }

    #[test]
    fn search_is_case_insensitive() {
        let history = MessageHistory::new();
        history.append("alice", "Buy AAPL now");
        history.append("bob", "nothing here");
        history.append("bot", "aapl quote is $151.25 per share");

        let hits = history.search("  Aapl ");
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].user, "alice");
        assert_eq!(hits[1].user, "bot");
    }

    #[test]
    fn blank_search_returns_nothing() {
        let history = MessageHistory::new();
        history.append("alice", "hello");
        assert!(history.search("   ").is_empty());
    }

    #[test]
    fn concurrent_appends_get_unique_ids() {
        let history = Arc::new(MessageHistory::with_capacity(1000));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let history = history.clone();
                std::thread::spawn(move || {
                    for i in 0..100 {
                        history.append(&format!("user{t}"), &i.to_string());
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let snapshot = history.snapshot();
        assert_eq!(snapshot.len(), 800);
        assert!(snapshot.windows(2).all(|w| w[0].id + 1 == w[1].id));
    }
}
