//! Bounded memory of already-processed messages.
//!
//! Suppresses duplicates across reconnects and multi-client replays.
//! Messages are keyed by post id when the server provides one, otherwise by
//! a `(user, channel, text)` tuple.

use std::collections::{HashSet, VecDeque};

use crate::protocol::NewMessage;

/// Default capacity; matches how far back replays realistically reach.
pub const DEFAULT_CAPACITY: usize = 1000;

/// Insertion-ordered set that forgets its oldest entries past `capacity`.
pub struct SeenRing {
    keys: HashSet<String>,
    order: VecDeque<String>,
    capacity: usize,
}

impl SeenRing {
    pub fn new(capacity: usize) -> Self {
        Self {
            keys: HashSet::new(),
            order: VecDeque::new(),
            capacity,
        }
    }

    /// Record `key`. Returns `false` when it was already present.
    pub fn insert(&mut self, key: String) -> bool {
        if self.keys.contains(&key) {
            return false;
        }
        self.keys.insert(key.clone());
        self.order.push_back(key);
        if self.order.len() > self.capacity
            && let Some(oldest) = self.order.pop_front()
        {
            self.keys.remove(&oldest);
        }
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl Default for SeenRing {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Dedupe key for a message: the id when present, a content tuple otherwise.
#[must_use]
pub fn message_key(msg: &NewMessage) -> String {
    match &msg.id {
        Some(id) => format!("id:{id}"),
        None => format!(
            "hash:{}:{}:{}",
            msg.user,
            msg.channel.as_deref().unwrap_or(""),
            msg.text
        ),
    }
}
