//! TCP connection handler
//!
//! Accepts connections, frames each one into newline-terminated lines and
//! feeds them through the [`Dispatcher`] one at a time, writing one reply
//! per line.

use std::future::Future;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::{Framed, LinesCodec};
use tracing::{debug, error, info, warn};

use crate::dispatcher::Dispatcher;
use crate::error::AppError;
use crate::session::Session;
use crate::types::ConnectionId;

/// First line sent on every connection
pub const GREETING: &str = "Connected to poll server. Type help for the list of commands";

/// Accept connections until `shutdown` resolves
///
/// Each connection runs on its own task. Connections already open keep
/// running after shutdown; only accepting stops.
pub async fn serve<F>(listener: TcpListener, dispatcher: Dispatcher, max_line_length: usize, shutdown: F)
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutdown requested, no longer accepting connections");
                break;
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, addr)) => {
                    debug!("New TCP connection from {}", addr);
                    let dispatcher = dispatcher.clone();

                    // Spawn handler task for each connection
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, dispatcher, max_line_length).await {
                            error!("Connection handler error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                }
            }
        }
    }
}

/// Handle a new TCP connection
///
/// Owns the connection's [`Session`] for its whole life. The session's user
/// name is released however the connection ends.
pub async fn handle_connection(
    stream: TcpStream,
    dispatcher: Dispatcher,
    max_line_length: usize,
) -> Result<(), AppError> {
    let peer_addr = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    let connection_id = ConnectionId::new();
    info!("Connection {} opened from {}", connection_id, peer_addr);

    let mut lines = Framed::new(stream, LinesCodec::new_with_max_length(max_line_length));
    let mut session = Session::new(connection_id);

    let result = run_session(&mut lines, &dispatcher, &mut session).await;

    dispatcher.disconnect(&mut session).await;
    info!("Connection {} closed", connection_id);

    result
}

/// Request/response loop for one connection
async fn run_session(
    lines: &mut Framed<TcpStream, LinesCodec>,
    dispatcher: &Dispatcher,
    session: &mut Session,
) -> Result<(), AppError> {
    lines.send(GREETING).await?;

    while let Some(next) = lines.next().await {
        let line = match next {
            Ok(line) => line,
            Err(e) => {
                // Oversized line, invalid UTF-8 or a broken socket
                warn!("Connection {}: {}, closing", session.id, e);
                break;
            }
        };

        let reply = dispatcher.handle(session, &line).await;
        lines.send(reply.text).await?;

        if reply.close {
            debug!("Connection {} requested close", session.id);
            break;
        }
    }

    Ok(())
}
