use parking_lot::Mutex;
use std::collections::HashMap;
use uuid::Uuid;
use ycode_core::{Message, Role};

/// Rounds completed in this session.
pub const TOTAL_ROUNDS: &str = "total_rounds";
/// Rounds since the model last called `TodoWriter`.
pub const ROUNDS_WITHOUT_TODO: &str = "rounds_without_todo";
/// Value of `total_rounds` when memory was last read or written.
pub const LAST_MEMORY_ACTIVITY_ROUND: &str = "last_memory_activity_round";

/// Per-process state shared by the turn loop and the tools: integer counters
/// and a queue of reminders waiting for the next outbound message.
pub struct SessionContext {
    id: Uuid,
    counters: Mutex<HashMap<String, i64>>,
    pending: Mutex<Vec<Message>>,
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionContext {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            counters: Mutex::new(HashMap::new()),
            pending: Mutex::new(Vec::new()),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Counter value, 0 when never set.
    pub fn get_int(&self, key: &str) -> i64 {
        self.counters.lock().get(key).copied().unwrap_or(0)
    }

    pub fn set_int(&self, key: &str, value: i64) {
        self.counters.lock().insert(key.to_string(), value);
    }

    /// Add one and return the new value.
    pub fn increment(&self, key: &str) -> i64 {
        let mut counters = self.counters.lock();
        let value = counters.entry(key.to_string()).or_insert(0);
        *value += 1;
        *value
    }

    /// Queue a user-role reminder unless the same text is already waiting.
    pub fn ensure_queued(&self, text: &str) -> bool {
        let mut pending = self.pending.lock();
        if pending.iter().any(|m| m.same_text(Role::User, text)) {
            return false;
        }
        pending.push(Message::text(self.id, Role::User, text));
        true
    }

    /// Take every queued reminder, leaving the queue empty.
    pub fn drain(&self) -> Vec<Message> {
        std::mem::take(&mut *self.pending.lock())
    }

    pub fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_counter_is_zero() {
        let session = SessionContext::new();
        assert_eq!(session.get_int(TOTAL_ROUNDS), 0);
        session.set_int(TOTAL_ROUNDS, 4);
        assert_eq!(session.increment(TOTAL_ROUNDS), 5);
        assert_eq!(session.increment("fresh"), 1);
    }

    #[test]
    fn ensure_queued_is_idempotent() {
        let session = SessionContext::new();
        assert!(session.ensure_queued("update your todos"));
        assert!(!session.ensure_queued("update your todos"));
        assert!(session.ensure_queued("save a memory"));
        assert_eq!(session.pending_len(), 2);

        let drained = session.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].text_content(), "update your todos");
        assert_eq!(drained[0].role, Role::User);
        assert_eq!(session.pending_len(), 0);

        assert!(session.ensure_queued("update your todos"));
    }
}
