//! Store struct definition
//!
//! Process-wide registry of sections and of active user names. The store is
//! plain data: it is owned by the server actor, which serializes every
//! access, so none of these methods lock anything.

use std::collections::{BTreeMap, HashSet};

use crate::section::Section;
use crate::snapshot::StoreSnapshot;

/// Sections plus active users
#[derive(Debug, Default)]
pub struct Store {
    /// All sections: name -> Section
    sections: BTreeMap<String, Section>,
    /// Names held by logged-in connections
    active_users: HashSet<String>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a user name
    ///
    /// Returns false if the exact name is already held.
    pub fn register_user(&mut self, name: &str) -> bool {
        self.active_users.insert(name.to_string())
    }

    /// Release a user name
    ///
    /// Returns false if the name was not held.
    pub fn unregister_user(&mut self, name: &str) -> bool {
        self.active_users.remove(name)
    }

    pub fn is_user_active(&self, name: &str) -> bool {
        self.active_users.contains(name)
    }

    pub fn active_user_count(&self) -> usize {
        self.active_users.len()
    }

    /// Create an empty section
    ///
    /// Returns false if a section with this name already exists.
    pub fn create_section(&mut self, name: &str) -> bool {
        if self.sections.contains_key(name) {
            return false;
        }
        self.sections
            .insert(name.to_string(), Section::new(name.to_string()));
        true
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.get(name)
    }

    pub fn section_mut(&mut self, name: &str) -> Option<&mut Section> {
        self.sections.get_mut(name)
    }

    /// (name, poll count) for every section, in name order
    pub fn list_sections(&self) -> Vec<(String, usize)> {
        self.sections
            .values()
            .map(|s| (s.name.clone(), s.poll_count()))
            .collect()
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    /// Copy of all sections for persistence
    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot::from_sections(self.sections.values())
    }

    /// Replace every section at once
    ///
    /// Active users are kept: they belong to live connections, not to
    /// the persisted data.
    pub fn restore(&mut self, sections: BTreeMap<String, Section>) {
        self.sections = sections;
    }
}
