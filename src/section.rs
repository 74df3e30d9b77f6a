//! Section struct definition
//!
//! A named topic grouping polls by name.

use std::collections::BTreeMap;

use crate::poll::Poll;

/// Section ("topic")
///
/// Owns its polls keyed by name. Authorization and uniqueness checks are
/// done by the caller in the same server step as the mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Section name, unique across the store
    pub name: String,
    polls: BTreeMap<String, Poll>,
}

impl Section {
    /// Create an empty section
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            polls: BTreeMap::new(),
        }
    }

    /// Insert a poll, replacing any poll with the same name
    pub fn add_poll(&mut self, poll: Poll) {
        self.polls.insert(poll.name.clone(), poll);
    }

    pub fn poll(&self, name: &str) -> Option<&Poll> {
        self.polls.get(name)
    }

    pub fn poll_mut(&mut self, name: &str) -> Option<&mut Poll> {
        self.polls.get_mut(name)
    }

    pub fn contains_poll(&self, name: &str) -> bool {
        self.polls.contains_key(name)
    }

    /// Remove a poll, returning it if it existed
    pub fn delete_poll(&mut self, name: &str) -> Option<Poll> {
        self.polls.remove(name)
    }

    /// Polls in name order
    pub fn polls(&self) -> impl Iterator<Item = &Poll> {
        self.polls.values()
    }

    pub fn poll_count(&self) -> usize {
        self.polls.len()
    }
}
