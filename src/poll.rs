//! Poll struct definition
//!
//! A named question with a fixed, ordered set of options and the names of
//! the users who voted for each of them.

use std::fmt::Write;

use thiserror::Error;

/// Reasons a ballot is refused by a poll
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BallotError {
    #[error("unknown option")]
    UnknownOption,
    #[error("already voted")]
    AlreadyVoted,
}

/// One answer option and its voters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOption {
    pub label: String,
    pub voters: Vec<String>,
}

/// Poll ("vote") inside a section
///
/// Options are fixed at creation and keep the order they were entered in.
/// A user name appears in at most one option's voter list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Poll {
    /// Poll name, unique within its section
    pub name: String,
    /// Free-text description
    pub description: String,
    /// Login name of the user who created the poll
    pub creator: String,
    options: Vec<PollOption>,
}

impl Poll {
    /// Create a poll with no votes yet
    ///
    /// `labels` must be non-empty and distinct; the dialog that collects
    /// them enforces both.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        creator: impl Into<String>,
        labels: Vec<String>,
    ) -> Self {
        debug_assert!(!labels.is_empty());
        let options = labels
            .into_iter()
            .map(|label| PollOption {
                label,
                voters: Vec::new(),
            })
            .collect();
        Self::with_options(name, description, creator, options)
    }

    /// Create a poll with pre-existing voters (snapshot restore)
    pub fn with_options(
        name: impl Into<String>,
        description: impl Into<String>,
        creator: impl Into<String>,
        options: Vec<PollOption>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            creator: creator.into(),
            options,
        }
    }

    /// All options in display order
    pub fn options(&self) -> &[PollOption] {
        &self.options
    }

    /// Option labels in display order
    pub fn option_labels(&self) -> Vec<String> {
        self.options.iter().map(|o| o.label.clone()).collect()
    }

    /// Voter names for one option
    pub fn voters(&self, label: &str) -> Option<&[String]> {
        self.options
            .iter()
            .find(|o| o.label == label)
            .map(|o| o.voters.as_slice())
    }

    /// Label of the option the user voted for, if any
    ///
    /// Scans every voter list, so the cost grows with the number of votes.
    pub fn choice_of(&self, voter: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|o| o.voters.iter().any(|v| v == voter))
            .map(|o| o.label.as_str())
    }

    /// Check if the user already voted in this poll
    pub fn has_voted(&self, voter: &str) -> bool {
        self.choice_of(voter).is_some()
    }

    /// Record one ballot
    ///
    /// Refuses a second ballot from the same voter, whatever option it names.
    /// On error no voter list is changed.
    pub fn cast_vote(&mut self, label: &str, voter: &str) -> Result<(), BallotError> {
        if self.has_voted(voter) {
            return Err(BallotError::AlreadyVoted);
        }
        let option = self
            .options
            .iter_mut()
            .find(|o| o.label == label)
            .ok_or(BallotError::UnknownOption)?;
        option.voters.push(voter.to_string());
        Ok(())
    }

    /// Check if the given user created this poll
    pub fn is_creator(&self, username: &str) -> bool {
        self.creator == username
    }

    /// Number of ballots cast so far
    pub fn total_votes(&self) -> usize {
        self.options.iter().map(|o| o.voters.len()).sum()
    }

    /// Read-only rendering used by `view`
    ///
    /// Shows vote counts per option, never voter names.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Vote: {}", self.name);
        let _ = writeln!(out, "Description: {}", self.description);
        let _ = writeln!(out, "Created by: {}", self.creator);
        let _ = write!(out, "Options:");
        for option in &self.options {
            let _ = write!(out, "\n- {}: {} vote(s)", option.label, option.voters.len());
        }
        out
    }
}
