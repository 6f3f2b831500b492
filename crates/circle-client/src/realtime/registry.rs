//! Channel registry: which callback listens on which topic.
//!
//! One topic per subscription. The registry also remembers each topic's
//! change filters so the socket task can rejoin every live channel after a
//! reconnect.

use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use super::protocol::{ChangeEvent, PostgresChangeFilter};

/// Callback invoked for every change on a subscription's topic.
pub type ChangeCallback = Arc<dyn Fn(ChangeEvent) + Send + Sync>;

struct Listener {
    id: Uuid,
    filters: Vec<PostgresChangeFilter>,
    callback: ChangeCallback,
}

#[derive(Default)]
pub(crate) struct Registry {
    listeners: HashMap<String, Listener>,
}

impl Registry {
    pub(crate) fn insert(
        &mut self,
        topic: String,
        id: Uuid,
        filters: Vec<PostgresChangeFilter>,
        callback: ChangeCallback,
    ) {
        self.listeners.insert(
            topic,
            Listener {
                id,
                filters,
                callback,
            },
        );
    }

    /// Remove the listener registered under `topic` if it belongs to `id`.
    pub(crate) fn remove(&mut self, topic: &str, id: Uuid) -> bool {
        match self.listeners.get(topic) {
            Some(listener) if listener.id == id => {
                self.listeners.remove(topic);
                true
            }
            _ => false,
        }
    }

    /// Whether `topic` is still registered to `id`.
    pub(crate) fn contains(&self, topic: &str, id: Uuid) -> bool {
        self.listeners.get(topic).is_some_and(|l| l.id == id)
    }

    /// Remove whatever listens on `topic`.
    pub(crate) fn remove_topic(&mut self, topic: &str) -> bool {
        self.listeners.remove(topic).is_some()
    }

    /// Drop every listener. Returns how many there were.
    pub(crate) fn clear(&mut self) -> usize {
        let count = self.listeners.len();
        self.listeners.clear();
        count
    }

    /// Callback for `topic`, cloned so it can run without the registry lock.
    pub(crate) fn callback(&self, topic: &str) -> Option<ChangeCallback> {
        self.listeners.get(topic).map(|l| Arc::clone(&l.callback))
    }

    /// Every live topic with its filters.
    pub(crate) fn topics(&self) -> Vec<(String, Vec<PostgresChangeFilter>)> {
        self.listeners
            .iter()
            .map(|(topic, l)| (topic.clone(), l.filters.clone()))
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.listeners.len()
    }
}
