//! Command dispatcher
//!
//! Runs the per-connection protocol state machine: takes one input line and
//! the connection's [`Session`], runs the handler for the session's phase,
//! talks to the [`PollServer`](crate::server::PollServer) and produces the
//! reply text.
//!
//! User mistakes never escape as errors: they are rendered into the reply.
//! Only internal failures (server actor gone) are logged at error level and
//! answered with a generic line.

use std::fmt::Write;

use tracing::{debug, error, info, warn};

use crate::command::{Command, HELP_TEXT};
use crate::error::AppError;
use crate::poll::Poll;
use crate::server::{BallotSheet, ServerHandle};
use crate::session::{Phase, Session};
use crate::snapshot::SnapshotStorage;

/// Reply line for internal failures
pub const INTERNAL_ERROR: &str = "Internal error, please try again later";

/// Response to one input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Response text, possibly several lines, without a trailing newline
    pub text: String,
    /// Close the connection after sending
    pub close: bool,
}

impl Reply {
    pub fn line(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            close: false,
        }
    }

    pub fn closing(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            close: true,
        }
    }
}

/// Protocol state machine shared by all connections
///
/// Cheap to clone: it only holds the server handle and the snapshot location.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    server: ServerHandle,
    storage: SnapshotStorage,
}

impl Dispatcher {
    pub fn new(server: ServerHandle, storage: SnapshotStorage) -> Self {
        Self { server, storage }
    }

    /// Handle one input line
    pub async fn handle(&self, session: &mut Session, line: &str) -> Reply {
        debug!("Connection {} -> {:?}", session.id, line);

        match self.dispatch(session, line).await {
            Ok(reply) => reply,
            Err(e) if e.is_internal() => {
                error!("Connection {}: internal error: {}", session.id, e);
                session.phase = Phase::Menu;
                Reply::line(INTERNAL_ERROR)
            }
            Err(e) => {
                match &e {
                    AppError::UsernameTaken(_) | AppError::NotCreator(_) => {
                        warn!("Rejected {} ({}): {}", session.display_name(), session.id, e);
                    }
                    _ => debug!("Rejected {} ({}): {}", session.display_name(), session.id, e),
                }
                Reply::line(e.to_string())
            }
        }
    }

    /// Release the session's user name when its connection ends
    pub async fn disconnect(&self, session: &mut Session) {
        if !session.in_menu() {
            debug!("Connection {} dropped an unfinished dialog", session.id);
        }
        if let Some(username) = session.username.take() {
            if let Err(e) = self.server.logout(&username).await {
                error!("Failed to release user '{}': {}", username, e);
            }
        }
        session.phase = Phase::Menu;
    }

    /// Route the line to the handler for the current phase
    ///
    /// The phase is moved out first; handlers that stay in the same
    /// step put it back, everything else ends up in the menu.
    async fn dispatch(&self, session: &mut Session, line: &str) -> Result<Reply, AppError> {
        match session.take_phase() {
            Phase::Menu => self.handle_menu(session, line).await,
            Phase::AwaitingPollName { section } => {
                self.handle_poll_name(session, section, line).await
            }
            Phase::AwaitingPollDescription { section, poll } => {
                session.phase = Phase::AwaitingOptionCount {
                    section,
                    poll,
                    description: line.trim().to_string(),
                };
                Ok(Reply::line("Enter the number of options:"))
            }
            Phase::AwaitingOptionCount {
                section,
                poll,
                description,
            } => Ok(handle_option_count(session, section, poll, description, line)),
            Phase::AwaitingOptions {
                section,
                poll,
                description,
                count,
                collected,
            } => {
                self.handle_option(session, section, poll, description, count, collected, line)
                    .await
            }
            Phase::AwaitingBallot {
                section,
                poll,
                options,
            } => self.handle_ballot(session, section, poll, options, line).await,
        }
    }

    async fn handle_menu(&self, session: &mut Session, line: &str) -> Result<Reply, AppError> {
        let command = Command::parse(line)?;
        if command.requires_login() && !session.is_logged_in() {
            return Err(AppError::LoginRequired);
        }

        match command {
            Command::Login { username } => self.handle_login(session, username).await,
            Command::CreateTopic { name } => {
                let creator = username(session)?;
                if !self.server.create_section(&name, &creator).await? {
                    return Err(AppError::SectionExists(name));
                }
                Ok(Reply::line(format!("Topic {} created", name)))
            }
            Command::CreateVote { section } => {
                self.server.begin_poll(&section).await?;
                let reply = format!("Creating a vote in topic {}. Enter the vote name:", section);
                session.phase = Phase::AwaitingPollName { section };
                Ok(Reply::line(reply))
            }
            Command::View { section, poll } => {
                Ok(Reply::line(self.server.view(section, poll).await?))
            }
            Command::Vote { section, poll } => {
                let voter = username(session)?;
                let sheet = self.server.open_ballot(&section, &poll, &voter).await?;
                let reply = render_ballot(&sheet);
                session.phase = Phase::AwaitingBallot {
                    section,
                    poll,
                    options: sheet.options,
                };
                Ok(Reply::line(reply))
            }
            Command::Delete { section, poll } => {
                let requester = username(session)?;
                self.server.delete_poll(&section, &poll, &requester).await?;
                Ok(Reply::line(format!("Vote {} deleted from topic {}", poll, section)))
            }
            Command::Save { file } => self.handle_save(&file).await,
            Command::Load { file } => self.handle_load(&file).await,
            Command::Help => Ok(Reply::line(HELP_TEXT)),
            Command::Exit => {
                info!("Connection {} ({}) exiting", session.id, session.display_name());
                self.disconnect(session).await;
                Ok(Reply::closing("Goodbye!"))
            }
        }
    }

    async fn handle_login(&self, session: &mut Session, username: String) -> Result<Reply, AppError> {
        if let Some(current) = &session.username {
            return Err(AppError::AlreadyLoggedIn(current.clone()));
        }
        if !self.server.login(&username).await? {
            return Err(AppError::UsernameTaken(username));
        }

        info!("Connection {} logged in as '{}'", session.id, username);
        let reply = format!("Logged in as {}", username);
        session.username = Some(username);
        Ok(Reply::line(reply))
    }

    /// Snapshot under the actor, write on this task
    async fn handle_save(&self, raw_name: &str) -> Result<Reply, AppError> {
        let file = SnapshotStorage::file_name(raw_name)?;
        let snapshot = self.server.snapshot().await?;

        match self.storage.save(&file, &snapshot).await {
            Ok(_) => Ok(Reply::line(format!("Data saved to {}", file))),
            Err(e) => {
                warn!("Failed to save {}: {}", file, e);
                Ok(Reply::line(format!("Could not save data to {}: {}", file, e)))
            }
        }
    }

    /// Read and validate on this task, swap in under the actor
    ///
    /// Nothing is applied unless the whole file decodes and validates.
    async fn handle_load(&self, raw_name: &str) -> Result<Reply, AppError> {
        let file = SnapshotStorage::file_name(raw_name)?;
        let sections = self
            .storage
            .load(&file)
            .await
            .and_then(|snapshot| snapshot.into_sections());

        match sections {
            Ok(sections) => {
                let count = sections.len();
                self.server.restore(sections).await?;
                Ok(Reply::line(format!("Data loaded from {} ({} topics)", file, count)))
            }
            Err(e @ AppError::SnapshotNotFound(_)) => Err(e),
            Err(e) => {
                warn!("Failed to load {}: {}", file, e);
                Ok(Reply::line(format!("Could not load data from {}: {}", file, e)))
            }
        }
    }

    async fn handle_poll_name(
        &self,
        session: &mut Session,
        section: String,
        line: &str,
    ) -> Result<Reply, AppError> {
        let name = line.trim();
        let rejection = if name.is_empty() {
            Some(AppError::EmptyName("Vote name"))
        } else if name.contains(char::is_whitespace) {
            Some(AppError::NameHasSpaces("Vote name"))
        } else {
            match self.server.check_poll_name(&section, name).await {
                Ok(()) => None,
                Err(e @ AppError::PollExists { .. }) => Some(e),
                Err(e) => return Err(e),
            }
        };

        if let Some(e) = rejection {
            session.phase = Phase::AwaitingPollName { section };
            return Ok(Reply::line(format!("{}. Enter another vote name:", e)));
        }

        session.phase = Phase::AwaitingPollDescription {
            section,
            poll: name.to_string(),
        };
        Ok(Reply::line("Enter the vote description:"))
    }

    #[allow(clippy::too_many_arguments)]
    async fn handle_option(
        &self,
        session: &mut Session,
        section: String,
        poll: String,
        description: String,
        count: usize,
        mut collected: Vec<String>,
        line: &str,
    ) -> Result<Reply, AppError> {
        let label = line.trim();
        let rejection = if label.is_empty() {
            Some("Option must not be empty".to_string())
        } else if collected.iter().any(|c| c == label) {
            Some(format!("Option {} was already entered", label))
        } else {
            collected.push(label.to_string());
            None
        };

        if rejection.is_some() || collected.len() < count {
            let next = collected.len() + 1;
            let prompt = format!("Enter option {} of {}:", next, count);
            session.phase = Phase::AwaitingOptions {
                section,
                poll,
                description,
                count,
                collected,
            };
            return Ok(Reply::line(match rejection {
                Some(reason) => format!("{}. {}", reason, prompt),
                None => prompt,
            }));
        }

        let creator = username(session)?;
        let reply = format!("Vote \"{}\" created in topic \"{}\"", poll, section);
        self.server
            .create_poll(&section, Poll::new(poll, description, creator, collected))
            .await?;
        Ok(Reply::line(reply))
    }

    async fn handle_ballot(
        &self,
        session: &mut Session,
        section: String,
        poll: String,
        options: Vec<String>,
        line: &str,
    ) -> Result<Reply, AppError> {
        let choice = line
            .trim()
            .parse::<usize>()
            .ok()
            .filter(|n| (1..=options.len()).contains(n));

        let Some(choice) = choice else {
            let reply = format!("Enter a number from 1 to {}:", options.len());
            session.phase = Phase::AwaitingBallot {
                section,
                poll,
                options,
            };
            return Ok(Reply::line(reply));
        };

        let voter = username(session)?;
        let option = &options[choice - 1];
        self.server.cast_vote(&section, &poll, option, &voter).await?;
        Ok(Reply::line(format!("Your vote for \"{}\" has been counted", option)))
    }
}

/// Option count step: a positive integer moves on, anything else re-prompts
fn handle_option_count(
    session: &mut Session,
    section: String,
    poll: String,
    description: String,
    line: &str,
) -> Reply {
    match line.trim().parse::<usize>() {
        Ok(count) if count > 0 => {
            session.phase = Phase::AwaitingOptions {
                section,
                poll,
                description,
                count,
                collected: Vec::new(),
            };
            Reply::line(format!("Enter option 1 of {}:", count))
        }
        _ => {
            session.phase = Phase::AwaitingOptionCount {
                section,
                poll,
                description,
            };
            Reply::line("The number of options must be a positive integer. Enter the number of options:")
        }
    }
}

/// Login name of the session, required by every mutating command
fn username(session: &Session) -> Result<String, AppError> {
    session.username.clone().ok_or(AppError::LoginRequired)
}

fn render_ballot(sheet: &BallotSheet) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Vote: {}", sheet.poll);
    let _ = writeln!(out, "Description: {}", sheet.description);
    let _ = writeln!(out, "Options:");
    for (i, option) in sheet.options.iter().enumerate() {
        let _ = writeln!(out, "{}. {}", i + 1, option);
    }
    out.push_str("Enter the option number:");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::PollServer;
    use crate::types::ConnectionId;
    use tempfile::TempDir;
    use tokio::sync::mpsc;

    struct Harness {
        dispatcher: Dispatcher,
        server: ServerHandle,
        data_dir: TempDir,
    }

    impl Harness {
        fn new() -> Self {
            let data_dir = TempDir::new().unwrap();
            let server = PollServer::spawn();
            let dispatcher =
                Dispatcher::new(server.clone(), SnapshotStorage::new(data_dir.path()));
            Self {
                dispatcher,
                server,
                data_dir,
            }
        }

        async fn send(&self, session: &mut Session, line: &str) -> String {
            self.dispatcher.handle(session, line).await.text
        }

        async fn session(&self, username: &str) -> Session {
            let mut session = Session::new(ConnectionId::new());
            let reply = self.send(&mut session, &format!("login -u={}", username)).await;
            assert_eq!(reply, format!("Logged in as {}", username));
            session
        }

        /// Runs the whole creation dialog for a two-option poll
        async fn create_finals(&self, session: &mut Session) {
            for line in ["create vote -t=Sports", "Finals?", "desc", "2", "A"] {
                self.send(session, line).await;
            }
            assert_eq!(
                self.send(session, "B").await,
                "Vote \"Finals?\" created in topic \"Sports\""
            );
        }

        async fn voters(&self, option: &str) -> Vec<String> {
            let snapshot = self.server.snapshot().await.unwrap();
            let poll = &snapshot.sections[0].polls[0];
            poll.options
                .iter()
                .find(|(label, _)| label == option)
                .map(|(_, voters)| voters.clone())
                .unwrap()
        }
    }

    #[tokio::test]
    async fn test_create_poll_dialog() {
        let h = Harness::new();
        let mut alice = h.session("alice").await;

        assert_eq!(h.send(&mut alice, "create topic -n=Sports").await, "Topic Sports created");
        assert_eq!(
            h.send(&mut alice, "create vote -t=Sports").await,
            "Creating a vote in topic Sports. Enter the vote name:"
        );
        assert_eq!(h.send(&mut alice, "Finals?").await, "Enter the vote description:");
        assert_eq!(h.send(&mut alice, "desc").await, "Enter the number of options:");
        assert_eq!(h.send(&mut alice, "2").await, "Enter option 1 of 2:");
        assert_eq!(h.send(&mut alice, "A").await, "Enter option 2 of 2:");
        assert_eq!(
            h.send(&mut alice, "B").await,
            "Vote \"Finals?\" created in topic \"Sports\""
        );
        assert!(alice.in_menu());

        let snapshot = h.server.snapshot().await.unwrap();
        let poll = &snapshot.sections[0].polls[0];
        assert_eq!(poll.name, "Finals?");
        assert_eq!(poll.description, "desc");
        assert_eq!(poll.creator, "alice");
        assert_eq!(
            poll.options,
            vec![("A".to_string(), vec![]), ("B".to_string(), vec![])]
        );
    }

    #[tokio::test]
    async fn test_vote_scenario_rejects_second_ballot() {
        let h = Harness::new();
        let mut alice = h.session("alice").await;
        let mut bob = h.session("bob").await;
        h.send(&mut alice, "create topic -n=Sports").await;
        h.create_finals(&mut alice).await;

        let sheet = h.send(&mut alice, "vote -t=Sports -v=Finals?").await;
        assert!(sheet.contains("1. A\n2. B\n"));
        assert!(sheet.ends_with("Enter the option number:"));
        assert_eq!(
            h.send(&mut alice, "1").await,
            "Your vote for \"A\" has been counted"
        );

        h.send(&mut bob, "vote -t=Sports -v=Finals?").await;
        h.send(&mut bob, "2").await;

        assert_eq!(
            h.send(&mut alice, "vote -t=Sports -v=Finals?").await,
            "You have already voted in Finals?"
        );
        assert!(alice.in_menu());
        assert_eq!(h.voters("A").await, vec!["alice"]);
        assert_eq!(h.voters("B").await, vec!["bob"]);
    }

    #[tokio::test]
    async fn test_ballot_raced_by_same_user_is_rejected() {
        let h = Harness::new();
        let mut alice = h.session("alice").await;
        h.send(&mut alice, "create topic -n=Sports").await;
        h.create_finals(&mut alice).await;

        // Ballot sheet opened, then the same name votes through the server
        h.send(&mut alice, "vote -t=Sports -v=Finals?").await;
        h.server
            .cast_vote("Sports", "Finals?", "B", "alice")
            .await
            .unwrap();

        assert_eq!(h.send(&mut alice, "1").await, "You have already voted in Finals?");
        assert!(alice.in_menu());
        assert!(h.voters("A").await.is_empty());
    }

    #[tokio::test]
    async fn test_delete_requires_creator() {
        let h = Harness::new();
        let mut alice = h.session("alice").await;
        let mut bob = h.session("bob").await;
        h.send(&mut alice, "create topic -n=Sports").await;
        h.create_finals(&mut alice).await;

        assert_eq!(
            h.send(&mut bob, "delete -t=Sports -v=Finals?").await,
            "You can only delete votes you created (Finals? was created by someone else)"
        );
        assert_eq!(
            h.send(&mut alice, "delete -t=Sports -v=Finals?").await,
            "Vote Finals? deleted from topic Sports"
        );
        assert_eq!(
            h.send(&mut alice, "view -t=Sports").await,
            "Topic Sports has no votes"
        );
    }

    #[tokio::test]
    async fn test_login_rules() {
        let h = Harness::new();
        let mut anonymous = Session::new(ConnectionId::new());

        assert_eq!(
            h.send(&mut anonymous, "create topic -n=Sports").await,
            "Please log in first (login -u=<name>)"
        );
        assert_eq!(
            h.send(&mut anonymous, "view").await,
            "Please log in first (login -u=<name>)"
        );

        let mut alice = h.session("alice").await;
        assert_eq!(
            h.send(&mut alice, "login -u=carol").await,
            "Already logged in as alice"
        );
        assert_eq!(
            h.send(&mut anonymous, "login -u=alice").await,
            "User alice is already logged in"
        );
        assert!(!anonymous.is_logged_in());
    }

    #[tokio::test]
    async fn test_menu_errors_keep_phase() {
        let h = Harness::new();
        let mut alice = h.session("alice").await;

        assert_eq!(
            h.send(&mut alice, "jump").await,
            "Unknown command: 'jump'. Type help for the list of commands"
        );
        assert_eq!(
            h.send(&mut alice, "vote -t=Sports").await,
            "Usage: vote -t=<topic> -v=<vote>"
        );
        assert_eq!(
            h.send(&mut alice, "create vote -t=Nowhere").await,
            "Topic Nowhere not found"
        );
        h.send(&mut alice, "create topic -n=Sports").await;
        assert_eq!(
            h.send(&mut alice, "create topic -n=Sports").await,
            "Topic Sports already exists"
        );
        assert!(alice.in_menu());
        assert!(h.send(&mut alice, "help").await.starts_with("Commands:"));
    }

    #[tokio::test]
    async fn test_dialog_reprompts() {
        let h = Harness::new();
        let mut alice = h.session("alice").await;
        h.send(&mut alice, "create topic -n=Sports").await;
        h.create_finals(&mut alice).await;

        h.send(&mut alice, "create vote -t=Sports").await;
        assert_eq!(
            h.send(&mut alice, "Finals?").await,
            "Vote Finals? already exists in topic Sports. Enter another vote name:"
        );
        assert_eq!(
            h.send(&mut alice, "   ").await,
            "Vote name must not be empty. Enter another vote name:"
        );
        assert_eq!(
            h.send(&mut alice, "two words").await,
            "Vote name must be a single word. Enter another vote name:"
        );
        h.send(&mut alice, "Semis?").await;
        h.send(&mut alice, "").await;

        let reprompt =
            "The number of options must be a positive integer. Enter the number of options:";
        assert_eq!(h.send(&mut alice, "two").await, reprompt);
        assert_eq!(h.send(&mut alice, "0").await, reprompt);
        assert_eq!(h.send(&mut alice, "-3").await, reprompt);
        assert_eq!(h.send(&mut alice, "2").await, "Enter option 1 of 2:");

        h.send(&mut alice, "X").await;
        assert_eq!(
            h.send(&mut alice, "X").await,
            "Option X was already entered. Enter option 2 of 2:"
        );
        assert_eq!(
            h.send(&mut alice, "").await,
            "Option must not be empty. Enter option 2 of 2:"
        );
        assert_eq!(
            h.send(&mut alice, "Y").await,
            "Vote \"Semis?\" created in topic \"Sports\""
        );

        h.send(&mut alice, "vote -t=Sports -v=Semis?").await;
        assert_eq!(h.send(&mut alice, "3").await, "Enter a number from 1 to 2:");
        assert_eq!(h.send(&mut alice, "one").await, "Enter a number from 1 to 2:");
        assert!(!alice.in_menu());
        assert_eq!(
            h.send(&mut alice, "2").await,
            "Your vote for \"Y\" has been counted"
        );
    }

    #[tokio::test]
    async fn test_dialog_text_is_trimmed() {
        let h = Harness::new();
        let mut alice = h.session("alice").await;
        h.send(&mut alice, "create topic -n=Sports").await;

        for line in ["create vote -t=Sports", "Finals?", "  who wins?  ", "2"] {
            h.send(&mut alice, line).await;
        }
        h.send(&mut alice, " A ").await;
        assert_eq!(
            h.send(&mut alice, "A\t").await,
            "Option A was already entered. Enter option 2 of 2:"
        );
        h.send(&mut alice, "B").await;

        let snapshot = h.server.snapshot().await.unwrap();
        let poll = &snapshot.sections[0].polls[0];
        assert_eq!(poll.description, "who wins?");
        let labels: Vec<_> = poll.options.iter().map(|(label, _)| label.as_str()).collect();
        assert_eq!(labels, ["A", "B"]);
    }

    #[tokio::test]
    async fn test_poll_name_race_resolved_at_creation() {
        let h = Harness::new();
        let mut alice = h.session("alice").await;
        let mut bob = h.session("bob").await;
        h.send(&mut alice, "create topic -n=Sports").await;

        // Both pass the name check before either finishes
        for session in [&mut alice, &mut bob] {
            h.send(session, "create vote -t=Sports").await;
            h.send(session, "Finals?").await;
            h.send(session, "desc").await;
            h.send(session, "1").await;
        }

        assert_eq!(
            h.send(&mut alice, "A").await,
            "Vote \"Finals?\" created in topic \"Sports\""
        );
        assert_eq!(
            h.send(&mut bob, "A").await,
            "Vote Finals? already exists in topic Sports"
        );
        assert!(bob.in_menu());

        let snapshot = h.server.snapshot().await.unwrap();
        assert_eq!(snapshot.sections[0].polls[0].creator, "alice");
    }

    #[tokio::test]
    async fn test_exit_releases_name() {
        let h = Harness::new();
        let mut alice = h.session("alice").await;

        let reply = h.dispatcher.handle(&mut alice, "exit").await;
        assert_eq!(reply, Reply::closing("Goodbye!"));
        assert!(!alice.is_logged_in());

        h.session("alice").await;
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let h = Harness::new();
        let mut alice = h.session("alice").await;
        h.send(&mut alice, "create topic -n=Sports").await;
        h.create_finals(&mut alice).await;
        h.send(&mut alice, "vote -t=Sports -v=Finals?").await;
        h.send(&mut alice, "2").await;
        let before = h.server.snapshot().await.unwrap();

        assert_eq!(h.send(&mut alice, "save backup").await, "Data saved to backup.json");

        h.send(&mut alice, "delete -t=Sports -v=Finals?").await;
        h.send(&mut alice, "create topic -n=Music").await;

        assert_eq!(
            h.send(&mut alice, "load backup").await,
            "Data loaded from backup.json (1 topics)"
        );
        assert_eq!(h.server.snapshot().await.unwrap(), before);
        // The login survives a load
        assert!(!h.server.login("alice").await.unwrap());
    }

    #[tokio::test]
    async fn test_failed_load_keeps_store() {
        let h = Harness::new();
        let mut alice = h.session("alice").await;
        h.send(&mut alice, "create topic -n=Sports").await;
        let before = h.server.snapshot().await.unwrap();

        assert_eq!(
            h.send(&mut alice, "load missing").await,
            "File missing.json not found"
        );
        assert_eq!(
            h.send(&mut alice, "load ../secret").await,
            "Invalid file name: ../secret"
        );

        std::fs::write(h.data_dir.path().join("broken.json"), b"[1, 2").unwrap();
        let reply = h.send(&mut alice, "load broken").await;
        assert!(reply.starts_with("Could not load data from broken.json:"), "{}", reply);

        assert_eq!(h.server.snapshot().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_internal_error_is_generic() {
        let (cmd_tx, cmd_rx) = mpsc::channel(1);
        drop(cmd_rx);
        let dispatcher = Dispatcher::new(ServerHandle::new(cmd_tx), SnapshotStorage::new("unused"));
        let mut session = Session::new(ConnectionId::new());

        let reply = dispatcher.handle(&mut session, "login -u=alice").await;
        assert_eq!(reply, Reply::line(INTERNAL_ERROR));
        assert!(!session.is_logged_in());
    }
}
