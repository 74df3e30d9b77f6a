//! PollServer Actor implementation
//!
//! The central actor that owns the [`Store`]: sections, polls, voters and
//! active user names. Connection tasks talk to it through a [`ServerHandle`].
//!
//! Every command is handled to completion before the next one is received,
//! so each command is one atomic step. Commands that check something
//! (existence, uniqueness, ownership, an earlier ballot) perform the matching
//! mutation in the same step.

use std::collections::BTreeMap;
use std::fmt::Write;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::command::usage;
use crate::error::{AppError, SendError};
use crate::poll::{BallotError, Poll};
use crate::section::Section;
use crate::snapshot::StoreSnapshot;
use crate::store::Store;

/// Channel buffer size for server commands
pub const CHANNEL_BUFFER_SIZE: usize = 256;

type Reply<T> = oneshot::Sender<T>;

/// Commands sent from connection tasks to the PollServer actor
#[derive(Debug)]
pub enum ServerCommand {
    /// Claim a user name
    Login {
        username: String,
        reply: Reply<bool>,
    },
    /// Release a user name (logout or disconnect)
    Logout { username: String },
    /// Create an empty section
    CreateSection {
        name: String,
        creator: String,
        reply: Reply<bool>,
    },
    /// Check that a section exists before starting the poll dialog
    BeginPoll {
        section: String,
        reply: Reply<Result<(), AppError>>,
    },
    /// Check that a poll name is still free in a section
    CheckPollName {
        section: String,
        poll: String,
        reply: Reply<Result<(), AppError>>,
    },
    /// Insert a finished poll if its name is still free
    CreatePoll {
        section: String,
        poll: Poll,
        reply: Reply<Result<(), AppError>>,
    },
    /// Render a read-only listing
    View {
        section: Option<String>,
        poll: Option<String>,
        reply: Reply<Result<String, AppError>>,
    },
    /// Fetch the ballot sheet for a poll the user has not voted in
    OpenBallot {
        section: String,
        poll: String,
        voter: String,
        reply: Reply<Result<BallotSheet, AppError>>,
    },
    /// Record one ballot
    CastVote {
        section: String,
        poll: String,
        option: String,
        voter: String,
        reply: Reply<Result<(), AppError>>,
    },
    /// Remove a poll on behalf of its creator
    DeletePoll {
        section: String,
        poll: String,
        requester: String,
        reply: Reply<Result<(), AppError>>,
    },
    /// Copy of the whole section map
    Snapshot { reply: Reply<StoreSnapshot> },
    /// Replace the whole section map
    Restore {
        sections: BTreeMap<String, Section>,
        reply: Reply<()>,
    },
}

/// What a voter sees before picking an option
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BallotSheet {
    pub poll: String,
    pub description: String,
    /// Option labels in display order; the user answers with a 1-based index
    pub options: Vec<String>,
}

/// The main PollServer actor
///
/// Owns the store and processes commands from connection tasks.
pub struct PollServer {
    store: Store,
    /// Command receiver channel
    receiver: mpsc::Receiver<ServerCommand>,
}

impl PollServer {
    /// Create a new PollServer with the given command receiver
    pub fn new(receiver: mpsc::Receiver<ServerCommand>) -> Self {
        Self::with_store(Store::new(), receiver)
    }

    /// Create a PollServer around an existing store
    pub fn with_store(store: Store, receiver: mpsc::Receiver<ServerCommand>) -> Self {
        Self { store, receiver }
    }

    /// Start an actor on the current runtime and return its handle
    pub fn spawn() -> ServerHandle {
        let (cmd_tx, cmd_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        tokio::spawn(PollServer::new(cmd_rx).run());
        ServerHandle::new(cmd_tx)
    }

    /// Run the PollServer event loop
    ///
    /// Continuously receives and processes commands until all senders are dropped.
    pub async fn run(mut self) {
        info!("PollServer started");

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd);
        }

        info!("PollServer shutting down");
    }

    /// Process a single command
    ///
    /// A dropped reply receiver means the connection went away; the step
    /// has already been applied, so there is nothing to undo.
    fn handle_command(&mut self, cmd: ServerCommand) {
        match cmd {
            ServerCommand::Login { username, reply } => {
                let _ = reply.send(self.handle_login(&username));
            }
            ServerCommand::Logout { username } => {
                self.handle_logout(&username);
            }
            ServerCommand::CreateSection {
                name,
                creator,
                reply,
            } => {
                let _ = reply.send(self.handle_create_section(&name, &creator));
            }
            ServerCommand::BeginPoll { section, reply } => {
                let _ = reply.send(self.find_section(&section).map(|_| ()));
            }
            ServerCommand::CheckPollName {
                section,
                poll,
                reply,
            } => {
                let _ = reply.send(self.handle_check_poll_name(&section, &poll));
            }
            ServerCommand::CreatePoll {
                section,
                poll,
                reply,
            } => {
                let _ = reply.send(self.handle_create_poll(&section, poll));
            }
            ServerCommand::View {
                section,
                poll,
                reply,
            } => {
                let _ = reply.send(self.handle_view(section.as_deref(), poll.as_deref()));
            }
            ServerCommand::OpenBallot {
                section,
                poll,
                voter,
                reply,
            } => {
                let _ = reply.send(self.handle_open_ballot(&section, &poll, &voter));
            }
            ServerCommand::CastVote {
                section,
                poll,
                option,
                voter,
                reply,
            } => {
                let _ = reply.send(self.handle_cast_vote(&section, &poll, &option, &voter));
            }
            ServerCommand::DeletePoll {
                section,
                poll,
                requester,
                reply,
            } => {
                let _ = reply.send(self.handle_delete_poll(&section, &poll, &requester));
            }
            ServerCommand::Snapshot { reply } => {
                let _ = reply.send(self.store.snapshot());
            }
            ServerCommand::Restore { sections, reply } => {
                self.handle_restore(sections);
                let _ = reply.send(());
            }
        }
    }

    /// Handle user login
    fn handle_login(&mut self, username: &str) -> bool {
        if self.store.is_user_active(username) {
            debug!("Login as '{}' refused, name is in use", username);
            return false;
        }

        self.store.register_user(username);
        info!("User '{}' logged in", username);
        debug!("Active users: {}", self.store.active_user_count());
        true
    }

    /// Handle user logout or disconnection
    fn handle_logout(&mut self, username: &str) {
        if self.store.unregister_user(username) {
            info!("User '{}' logged out", username);
            debug!("Active users: {}", self.store.active_user_count());
        }
    }

    /// Handle section creation
    fn handle_create_section(&mut self, name: &str, creator: &str) -> bool {
        let created = self.store.create_section(name);
        if created {
            info!("User '{}' created topic '{}'", creator, name);
            debug!("Total topics: {}", self.store.section_count());
        }
        created
    }

    fn handle_check_poll_name(&self, section: &str, poll: &str) -> Result<(), AppError> {
        if self.find_section(section)?.contains_poll(poll) {
            return Err(AppError::PollExists {
                section: section.to_string(),
                poll: poll.to_string(),
            });
        }
        Ok(())
    }

    /// Handle poll creation
    ///
    /// Re-checks the name: another user may have taken it while this
    /// user's dialog was in progress.
    fn handle_create_poll(&mut self, section_name: &str, poll: Poll) -> Result<(), AppError> {
        let section = self.find_section_mut(section_name)?;
        if section.contains_poll(&poll.name) {
            return Err(AppError::PollExists {
                section: section_name.to_string(),
                poll: poll.name,
            });
        }

        info!(
            "User '{}' created vote '{}' in topic '{}' with {} options",
            poll.creator,
            poll.name,
            section_name,
            poll.options().len()
        );
        section.add_poll(poll);
        Ok(())
    }

    /// Handle read-only listing
    ///
    /// No filter lists sections, a section filter lists its polls and both
    /// filters describe one poll.
    fn handle_view(&self, section: Option<&str>, poll: Option<&str>) -> Result<String, AppError> {
        match (section, poll) {
            (None, None) => {
                let sections = self.store.list_sections();
                if sections.is_empty() {
                    return Ok("No topics yet".to_string());
                }
                let mut out = String::from("Topics:");
                for (name, count) in sections {
                    let _ = write!(out, "\n- {} (votes: {})", name, count);
                }
                Ok(out)
            }
            (Some(section_name), None) => {
                let section = self.find_section(section_name)?;
                if section.poll_count() == 0 {
                    return Ok(format!("Topic {} has no votes", section_name));
                }
                let mut out = format!("Votes in topic {}:", section_name);
                for poll in section.polls() {
                    let _ = write!(out, "\n- {}", poll.name);
                }
                Ok(out)
            }
            (Some(section_name), Some(poll_name)) => {
                Ok(self.find_poll(section_name, poll_name)?.describe())
            }
            (None, Some(_)) => Err(AppError::Usage(usage::VIEW)),
        }
    }

    /// Handle ballot opening
    fn handle_open_ballot(
        &self,
        section: &str,
        poll_name: &str,
        voter: &str,
    ) -> Result<BallotSheet, AppError> {
        let poll = self.find_poll(section, poll_name)?;
        if poll.has_voted(voter) {
            return Err(AppError::AlreadyVoted(poll_name.to_string()));
        }
        Ok(BallotSheet {
            poll: poll.name.clone(),
            description: poll.description.clone(),
            options: poll.option_labels(),
        })
    }

    /// Handle ballot casting
    fn handle_cast_vote(
        &mut self,
        section: &str,
        poll_name: &str,
        option: &str,
        voter: &str,
    ) -> Result<(), AppError> {
        let poll = self.find_poll_mut(section, poll_name)?;
        poll.cast_vote(option, voter).map_err(|e| match e {
            BallotError::AlreadyVoted => AppError::AlreadyVoted(poll_name.to_string()),
            BallotError::UnknownOption => AppError::UnknownOption(option.to_string()),
        })?;

        info!(
            "User '{}' voted in '{}' of topic '{}'",
            voter, poll_name, section
        );
        debug!(
            "Option '{}' now has {} vote(s)",
            option,
            poll.voters(option).map_or(0, |voters| voters.len())
        );
        Ok(())
    }

    /// Handle poll deletion
    fn handle_delete_poll(
        &mut self,
        section_name: &str,
        poll_name: &str,
        requester: &str,
    ) -> Result<(), AppError> {
        if !self.find_poll(section_name, poll_name)?.is_creator(requester) {
            return Err(AppError::NotCreator(poll_name.to_string()));
        }

        let removed = self.find_section_mut(section_name)?.delete_poll(poll_name);
        info!(
            "User '{}' deleted vote '{}' from topic '{}' ({} ballots discarded)",
            requester,
            poll_name,
            section_name,
            removed.map_or(0, |poll| poll.total_votes())
        );
        Ok(())
    }

    /// Handle snapshot restore
    fn handle_restore(&mut self, sections: BTreeMap<String, Section>) {
        let old_count = self.store.section_count();
        self.store.restore(sections);
        info!(
            "Store restored: {} topics replaced by {}",
            old_count,
            self.store.section_count()
        );
    }

    /// Helper: Look up a section or report it missing
    fn find_section(&self, name: &str) -> Result<&Section, AppError> {
        self.store
            .section(name)
            .ok_or_else(|| AppError::SectionNotFound(name.to_string()))
    }

    fn find_section_mut(&mut self, name: &str) -> Result<&mut Section, AppError> {
        self.store
            .section_mut(name)
            .ok_or_else(|| AppError::SectionNotFound(name.to_string()))
    }

    /// Helper: Look up a poll or report the section or poll missing
    fn find_poll(&self, section: &str, poll: &str) -> Result<&Poll, AppError> {
        self.find_section(section)?
            .poll(poll)
            .ok_or_else(|| AppError::PollNotFound {
                section: section.to_string(),
                poll: poll.to_string(),
            })
    }

    fn find_poll_mut(&mut self, section: &str, poll: &str) -> Result<&mut Poll, AppError> {
        self.find_section_mut(section)?
            .poll_mut(poll)
            .ok_or_else(|| AppError::PollNotFound {
                section: section.to_string(),
                poll: poll.to_string(),
            })
    }
}

/// Cloneable handle used by connection tasks to reach the PollServer
#[derive(Debug, Clone)]
pub struct ServerHandle {
    sender: mpsc::Sender<ServerCommand>,
}

impl ServerHandle {
    pub fn new(sender: mpsc::Sender<ServerCommand>) -> Self {
        Self { sender }
    }

    /// Send a command and wait for its reply
    ///
    /// Returns an error if the actor is gone.
    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> ServerCommand,
    ) -> Result<T, SendError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(build(reply_tx))
            .await
            .map_err(|_| SendError::ChannelClosed)?;
        reply_rx.await.map_err(|_| SendError::ChannelClosed)
    }

    pub async fn login(&self, username: &str) -> Result<bool, SendError> {
        let username = username.to_string();
        self.request(|reply| ServerCommand::Login { username, reply })
            .await
    }

    /// Release a user name without waiting for the actor
    pub async fn logout(&self, username: &str) -> Result<(), SendError> {
        self.sender
            .send(ServerCommand::Logout {
                username: username.to_string(),
            })
            .await
            .map_err(|_| SendError::ChannelClosed)
    }

    pub async fn create_section(&self, name: &str, creator: &str) -> Result<bool, SendError> {
        let (name, creator) = (name.to_string(), creator.to_string());
        self.request(|reply| ServerCommand::CreateSection {
            name,
            creator,
            reply,
        })
        .await
    }

    pub async fn begin_poll(&self, section: &str) -> Result<(), AppError> {
        let section = section.to_string();
        self.request(|reply| ServerCommand::BeginPoll { section, reply })
            .await?
    }

    pub async fn check_poll_name(&self, section: &str, poll: &str) -> Result<(), AppError> {
        let (section, poll) = (section.to_string(), poll.to_string());
        self.request(|reply| ServerCommand::CheckPollName {
            section,
            poll,
            reply,
        })
        .await?
    }

    pub async fn create_poll(&self, section: &str, poll: Poll) -> Result<(), AppError> {
        let section = section.to_string();
        self.request(|reply| ServerCommand::CreatePoll {
            section,
            poll,
            reply,
        })
        .await?
    }

    pub async fn view(
        &self,
        section: Option<String>,
        poll: Option<String>,
    ) -> Result<String, AppError> {
        self.request(|reply| ServerCommand::View {
            section,
            poll,
            reply,
        })
        .await?
    }

    pub async fn open_ballot(
        &self,
        section: &str,
        poll: &str,
        voter: &str,
    ) -> Result<BallotSheet, AppError> {
        let (section, poll, voter) = (section.to_string(), poll.to_string(), voter.to_string());
        self.request(|reply| ServerCommand::OpenBallot {
            section,
            poll,
            voter,
            reply,
        })
        .await?
    }

    pub async fn cast_vote(
        &self,
        section: &str,
        poll: &str,
        option: &str,
        voter: &str,
    ) -> Result<(), AppError> {
        let (section, poll) = (section.to_string(), poll.to_string());
        let (option, voter) = (option.to_string(), voter.to_string());
        self.request(|reply| ServerCommand::CastVote {
            section,
            poll,
            option,
            voter,
            reply,
        })
        .await?
    }

    pub async fn delete_poll(
        &self,
        section: &str,
        poll: &str,
        requester: &str,
    ) -> Result<(), AppError> {
        let (section, poll, requester) =
            (section.to_string(), poll.to_string(), requester.to_string());
        self.request(|reply| ServerCommand::DeletePoll {
            section,
            poll,
            requester,
            reply,
        })
        .await?
    }

    pub async fn snapshot(&self) -> Result<StoreSnapshot, SendError> {
        self.request(|reply| ServerCommand::Snapshot { reply }).await
    }

    pub async fn restore(&self, sections: BTreeMap<String, Section>) -> Result<(), SendError> {
        self.request(|reply| ServerCommand::Restore { sections, reply })
            .await
    }
}
