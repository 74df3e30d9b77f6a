//! Session struct definition
//!
//! Per-connection protocol state: who is logged in and which step of a
//! dialog the connection is in. Owned by the connection task, never shared.

use std::mem;

use crate::types::ConnectionId;

/// Protocol phase
///
/// Each dialog step carries exactly the data collected so far, so leaving
/// a dialog drops all of its scratch state at once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for a top-level command
    #[default]
    Menu,
    /// `create vote` accepted, waiting for the poll name
    AwaitingPollName { section: String },
    AwaitingPollDescription { section: String, poll: String },
    AwaitingOptionCount {
        section: String,
        poll: String,
        description: String,
    },
    /// Collecting distinct option labels until `count` is reached
    AwaitingOptions {
        section: String,
        poll: String,
        description: String,
        count: usize,
        collected: Vec<String>,
    },
    /// `vote` accepted, waiting for a 1-based option number
    AwaitingBallot {
        section: String,
        poll: String,
        options: Vec<String>,
    },
}

/// Connected session
#[derive(Debug)]
pub struct Session {
    /// Connection this session belongs to (log correlation)
    pub id: ConnectionId,
    /// Login name (None before login)
    pub username: Option<String>,
    /// Current protocol phase
    pub phase: Phase,
}

impl Session {
    /// Create a session in the menu phase, not logged in
    pub fn new(id: ConnectionId) -> Self {
        Self {
            id,
            username: None,
            phase: Phase::Menu,
        }
    }

    /// Get the display name for this session
    ///
    /// Returns the username if set, otherwise "anonymous".
    pub fn display_name(&self) -> &str {
        self.username.as_deref().unwrap_or("anonymous")
    }

    pub fn is_logged_in(&self) -> bool {
        self.username.is_some()
    }

    pub fn in_menu(&self) -> bool {
        self.phase == Phase::Menu
    }

    /// Move the phase out, leaving the session in the menu
    ///
    /// Handlers that stay in a dialog step put the phase back.
    pub fn take_phase(&mut self) -> Phase {
        mem::take(&mut self.phase)
    }
}
