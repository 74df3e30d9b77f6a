//! Multi-client Poll Server Library
//!
//! A text-line command server built on tokio where users log in with a
//! unique name, create topics, create votes with fixed options inside a
//! topic, cast one ballot per vote and delete the votes they created.
//!
//! # Features
//! - Newline-delimited text protocol over TCP
//! - Unique login names per live connection
//! - Multi-step dialogs for vote creation and balloting
//! - One ballot per user per vote
//! - Creator-only deletion
//! - Manual JSON snapshots (`save` / `load`)
//!
//! # Architecture
//! Uses the Actor pattern with `mpsc` channels:
//! - `PollServer` is the central actor owning the `Store`
//! - Each connection runs on its own task with its own `Session`
//! - The `Dispatcher` turns lines into `ServerHandle` requests; each request
//!   is one atomic step of the actor, so no locks are needed
//!
//! # Example
//! ```ignore
//! use tokio::net::TcpListener;
//! use poll_server::{serve, Dispatcher, PollServer, SnapshotStorage};
//!
//! #[tokio::main]
//! async fn main() {
//!     let listener = TcpListener::bind("127.0.0.1:8080").await.unwrap();
//!     let dispatcher = Dispatcher::new(PollServer::spawn(), SnapshotStorage::new("data"));
//!
//!     serve(listener, dispatcher, 4096, std::future::pending()).await;
//! }
//! ```

pub mod command;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod poll;
pub mod section;
pub mod server;
pub mod session;
pub mod snapshot;
pub mod store;
pub mod types;

// Re-export main types for convenience
pub use command::Command;
pub use config::Config;
pub use dispatcher::{Dispatcher, Reply};
pub use error::{AppError, SendError};
pub use handler::{handle_connection, serve};
pub use poll::{BallotError, Poll};
pub use section::Section;
pub use server::{PollServer, ServerCommand, ServerHandle};
pub use session::{Phase, Session};
pub use snapshot::{SnapshotStorage, StoreSnapshot};
pub use store::Store;
pub use types::ConnectionId;
