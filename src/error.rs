//! Error types for the poll server
//!
//! Defines application-level errors and actor channel errors.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;
use tokio_util::codec::LinesCodecError;

/// Application-level errors
///
/// Covers user errors (reported to the client as one response line),
/// resource errors (snapshot I/O) and internal errors (logged, reported
/// generically). The `Display` text of a user error is the reply text.
#[derive(Debug, Error)]
pub enum AppError {
    /// Line framing error on the connection (fatal for the connection)
    #[error("Line protocol error: {0}")]
    Codec(#[from] LinesCodecError),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Request could not reach the server actor (internal)
    #[error("Channel send error")]
    ChannelSend,

    /// Command word not recognized
    #[error("Unknown command: '{0}'. Type help for the list of commands")]
    UnknownCommand(String),

    /// Command recognized but its arguments are malformed
    #[error("Usage: {0}")]
    Usage(&'static str),

    /// A required name argument was present but empty
    #[error("{0} must not be empty")]
    EmptyName(&'static str),

    /// Names are addressed through `-X=value` flags, so they cannot hold spaces
    #[error("{0} must be a single word")]
    NameHasSpaces(&'static str),

    /// Action requires a logged-in session
    #[error("Please log in first (login -u=<name>)")]
    LoginRequired,

    /// Session already holds an identity
    #[error("Already logged in as {0}")]
    AlreadyLoggedIn(String),

    /// Name held by another active connection
    #[error("User {0} is already logged in")]
    UsernameTaken(String),

    #[error("Topic {0} already exists")]
    SectionExists(String),

    #[error("Topic {0} not found")]
    SectionNotFound(String),

    #[error("Vote {poll} already exists in topic {section}")]
    PollExists { section: String, poll: String },

    #[error("Vote {poll} not found in topic {section}")]
    PollNotFound { section: String, poll: String },

    /// Delete attempted by someone other than the poll creator
    #[error("You can only delete votes you created ({0} was created by someone else)")]
    NotCreator(String),

    #[error("You have already voted in {0}")]
    AlreadyVoted(String),

    #[error("Option {0} does not exist")]
    UnknownOption(String),

    /// Snapshot file name is not a bare file name
    #[error("Invalid file name: {0}")]
    InvalidFileName(String),

    #[error("File {0} not found")]
    SnapshotNotFound(String),

    /// Snapshot decoded but violates store invariants
    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),
}

impl AppError {
    /// Whether this error is an internal failure rather than a user or
    /// resource error. Internal errors are logged and reported generically.
    pub fn is_internal(&self) -> bool {
        matches!(self, AppError::ChannelSend | AppError::Codec(_))
    }
}

impl From<SendError> for AppError {
    fn from(_: SendError) -> Self {
        AppError::ChannelSend
    }
}

/// Actor channel errors
///
/// Occurs when the server actor is gone: either the request could not be
/// delivered or the reply channel was dropped.
#[derive(Debug, Error)]
pub enum SendError {
    /// The receiving end of the channel has been closed
    #[error("Channel closed")]
    ChannelClosed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_errors_render_reply_text() {
        let err = AppError::PollNotFound {
            section: "Sports".to_string(),
            poll: "Finals?".to_string(),
        };
        assert_eq!(err.to_string(), "Vote Finals? not found in topic Sports");
        assert_eq!(
            AppError::Usage("login -u=<name>").to_string(),
            "Usage: login -u=<name>"
        );
        assert!(!err.is_internal());
    }

    #[test]
    fn test_send_error_is_internal() {
        let err: AppError = SendError::ChannelClosed.into();
        assert!(err.is_internal());
    }
}
