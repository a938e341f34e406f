//! Per-client connection task.
//!
//! ```text
//!   socket ──► FramedRead<LineCodec> ──► Session::handle_line ──┐
//!                                                               │ notify / broadcast
//!   socket ◄── FramedWrite<LineCodec> ◄── writer task ◄── outgoing queue
//! ```
//!
//! Lines from one client are dispatched strictly in order on this task.
//! Output from anywhere (this session, broadcasts from other sessions) goes
//! through the connection's bounded queue and is written by a separate task.

use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, info, instrument, warn};

use super::codec::{Inbound, LineCodec};
use super::hooks::Hooks;
use crate::commands::Registry;
use crate::config::Config;
use crate::dispatch::DispatchResult;
use crate::error::TransportError;
use crate::session::Session;
use crate::state::{Connection, ConnectionId, Hub};

/// How long to wait for queued output to reach the client after disconnect.
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Settings applied to every accepted connection.
#[derive(Debug, Clone)]
pub struct ConnectionOptions {
    pub welcome: Vec<String>,
    pub max_line_length: usize,
    pub sendq: usize,
    pub abort_command: String,
}

impl ConnectionOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            welcome: config.server.welcome.clone(),
            max_line_length: config.limits.max_line_length,
            sendq: config.limits.sendq,
            abort_command: config.parser.abort_command.clone(),
        }
    }
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Drives one client from accept to disconnect.
pub(crate) struct ConnectionTask {
    id: ConnectionId,
    addr: SocketAddr,
    stream: TcpStream,
    hub: Arc<Hub>,
    registry: Arc<Registry>,
    hooks: Arc<dyn Hooks>,
    options: Arc<ConnectionOptions>,
}

impl ConnectionTask {
    pub(crate) fn new(
        id: ConnectionId,
        addr: SocketAddr,
        stream: TcpStream,
        hub: Arc<Hub>,
        registry: Arc<Registry>,
        hooks: Arc<dyn Hooks>,
        options: Arc<ConnectionOptions>,
    ) -> Self {
        Self {
            id,
            addr,
            stream,
            hub,
            registry,
            hooks,
            options,
        }
    }

    #[instrument(skip_all, fields(conn = %self.id, addr = %self.addr), name = "connection")]
    pub(crate) async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let limit = self.options.max_line_length;
        let (read_half, write_half) = self.stream.into_split();
        let mut reader = FramedRead::new(read_half, LineCodec::new(limit));
        let mut writer = FramedWrite::new(write_half, LineCodec::new(limit));

        let (connection, mut outgoing) =
            Connection::channel(self.id, self.addr, self.options.sendq);
        self.hub.insert(connection.clone());
        info!(clients = self.hub.len(), "Client connected");

        let writer_task = tokio::spawn(async move {
            while let Some(line) = outgoing.recv().await {
                if let Err(e) = writer.send(line).await {
                    debug!(error = %e, "Write error");
                    break;
                }
            }
        });

        for line in &self.options.welcome {
            connection.notify(line);
        }

        let mut session = Session::new(
            connection.clone(),
            Arc::clone(&self.hub),
            Arc::clone(&self.registry),
        )
        .with_abort_command(self.options.abort_command.as_str());
        session.establish();

        let hooks = Arc::clone(&self.hooks);
        let mut outcome = session.run_event(|caller| hooks.on_connect(caller));

        let reason = loop {
            if let DispatchResult::Quit(reason) = outcome {
                break reason;
            }

            tokio::select! {
                result = reader.next() => match result {
                    Some(Ok(Inbound::Line(line))) => {
                        debug!(%line, "Received line");
                        outcome = session.handle_line(&line);
                    }
                    Some(Ok(Inbound::TooLong { length })) => {
                        let error = TransportError::LineTooLong { actual: length, limit };
                        warn!(error = %error, "Dropped line");
                        connection.notify(format!("Line too long (limit {limit} bytes)."));
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "Read error");
                        break "Read error".to_string();
                    }
                    None => break "Connection closed".to_string(),
                },
                _ = shutdown.changed() => break "Server shutting down".to_string(),
            }
        };

        session.close(&reason);
        drop(session);
        self.hub.remove(self.id);
        self.hooks.on_disconnect(&connection, &self.hub, &reason);
        drop(connection);

        // The writer exits once every sender is gone and the queue is flushed
        if tokio::time::timeout(WRITER_DRAIN_TIMEOUT, writer_task).await.is_err() {
            warn!("Timed out flushing output");
        }
        info!(%reason, clients = self.hub.len(), "Client disconnected");
    }
}
