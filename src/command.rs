//! Menu command definitions
//!
//! Parses one text line received in the menu phase into a [`Command`].
//! Words are separated by whitespace; arguments are `-X=value` flags that
//! may appear in any order after the command word.

use crate::error::AppError;

/// Usage lines, shown when a command's arguments are malformed
pub mod usage {
    pub const LOGIN: &str = "login -u=<name>";
    pub const CREATE: &str = "create topic -n=<name> | create vote -t=<topic>";
    pub const CREATE_TOPIC: &str = "create topic -n=<name>";
    pub const CREATE_VOTE: &str = "create vote -t=<topic>";
    pub const VIEW: &str = "view [-t=<topic>] [-v=<vote>]";
    pub const VOTE: &str = "vote -t=<topic> -v=<vote>";
    pub const DELETE: &str = "delete -t=<topic> -v=<vote>";
    pub const SAVE: &str = "save <filename>";
    pub const LOAD: &str = "load <filename>";
}

/// Reply to `help`
pub const HELP_TEXT: &str = "Commands:
  login -u=<name>                log in with a unique name
  create topic -n=<name>         create a topic
  create vote -t=<topic>         create a vote in a topic (asks for details)
  view                           list topics
  view -t=<topic>                list votes in a topic
  view -t=<topic> -v=<vote>      show a vote and its results
  vote -t=<topic> -v=<vote>      cast your ballot
  delete -t=<topic> -v=<vote>    delete a vote you created
  save <filename>                save all topics to a file
  load <filename>                replace all topics from a file
  help                           show this help
  exit                           log out and disconnect";

/// Client → Server menu command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Claim a user name for this connection
    Login { username: String },
    /// Create a section
    CreateTopic { name: String },
    /// Start the poll creation dialog in a section
    CreateVote { section: String },
    /// Read-only listing at one of three levels
    View {
        section: Option<String>,
        poll: Option<String>,
    },
    /// Start the ballot dialog for a poll
    Vote { section: String, poll: String },
    /// Delete a poll the user created
    Delete { section: String, poll: String },
    /// Write a snapshot file
    Save { file: String },
    /// Replace the store from a snapshot file
    Load { file: String },
    Help,
    /// Log out and close the connection
    Exit,
}

impl Command {
    /// Parse one menu line
    ///
    /// The command word and the `create` target are case-insensitive;
    /// flag values are taken verbatim.
    pub fn parse(line: &str) -> Result<Self, AppError> {
        let mut words = line.split_whitespace();
        let Some(word) = words.next() else {
            return Err(AppError::UnknownCommand(String::new()));
        };
        let args: Vec<&str> = words.collect();

        match word.to_lowercase().as_str() {
            "login" => {
                let username = required(&args, "-u=", usage::LOGIN, "User name")?;
                Ok(Command::Login { username })
            }
            "create" => match args.first().map(|a| a.to_lowercase()).as_deref() {
                Some("topic") => {
                    let name = required(&args[1..], "-n=", usage::CREATE_TOPIC, "Topic name")?;
                    Ok(Command::CreateTopic { name })
                }
                Some("vote") => {
                    let section =
                        required(&args[1..], "-t=", usage::CREATE_VOTE, "Topic name")?;
                    Ok(Command::CreateVote { section })
                }
                _ => Err(AppError::Usage(usage::CREATE)),
            },
            "view" => Ok(Command::View {
                section: flag(&args, "-t=").map(str::to_string),
                poll: flag(&args, "-v=").map(str::to_string),
            }),
            "vote" => {
                let section = required(&args, "-t=", usage::VOTE, "Topic name")?;
                let poll = required(&args, "-v=", usage::VOTE, "Vote name")?;
                Ok(Command::Vote { section, poll })
            }
            "delete" => {
                let section = required(&args, "-t=", usage::DELETE, "Topic name")?;
                let poll = required(&args, "-v=", usage::DELETE, "Vote name")?;
                Ok(Command::Delete { section, poll })
            }
            "save" => {
                let file = args.first().ok_or(AppError::Usage(usage::SAVE))?;
                Ok(Command::Save {
                    file: file.to_string(),
                })
            }
            "load" => {
                let file = args.first().ok_or(AppError::Usage(usage::LOAD))?;
                Ok(Command::Load {
                    file: file.to_string(),
                })
            }
            "help" => Ok(Command::Help),
            "exit" => Ok(Command::Exit),
            _ => Err(AppError::UnknownCommand(word.to_string())),
        }
    }

    /// Whether the command needs a logged-in session
    pub fn requires_login(&self) -> bool {
        matches!(
            self,
            Command::CreateTopic { .. }
                | Command::CreateVote { .. }
                | Command::View { .. }
                | Command::Vote { .. }
                | Command::Delete { .. }
        )
    }
}

/// Value of the last `prefix` flag, if any
fn flag<'a>(args: &[&'a str], prefix: &str) -> Option<&'a str> {
    args.iter().rev().find_map(|arg| arg.strip_prefix(prefix))
}

/// Value of a mandatory, non-empty flag
fn required(
    args: &[&str],
    prefix: &str,
    usage: &'static str,
    what: &'static str,
) -> Result<String, AppError> {
    match flag(args, prefix) {
        None => Err(AppError::Usage(usage)),
        Some("") => Err(AppError::EmptyName(what)),
        Some(value) => Ok(value.to_string()),
    }
}
