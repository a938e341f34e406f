//! Gateway - TCP listener that accepts incoming connections.
//!
//! The Gateway binds a socket and spawns a connection task for each client
//! whose host is not banned.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info, instrument, warn};

use super::connection::{ConnectionOptions, ConnectionTask};
use super::hooks::Hooks;
use crate::commands::Registry;
use crate::state::Hub;

/// Accepts TCP connections and hands each to its own task.
pub struct Gateway {
    listener: TcpListener,
    hub: Arc<Hub>,
    registry: Arc<Registry>,
    hooks: Arc<dyn Hooks>,
    options: Arc<ConnectionOptions>,
}

impl Gateway {
    /// Bind the gateway. Port 0 picks a free port; see [`Gateway::local_addr`].
    pub async fn bind(
        addr: SocketAddr,
        hub: Arc<Hub>,
        registry: Arc<Registry>,
        hooks: Arc<dyn Hooks>,
        options: ConnectionOptions,
    ) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!(address = %listener.local_addr()?, "Listener bound");

        Ok(Self {
            listener,
            hub,
            registry,
            hooks,
            options: Arc::new(options),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until `shutdown` becomes true or its sender is dropped.
    ///
    /// Connection tasks get a clone of `shutdown` and close their sessions when
    /// it fires. [`Hooks::on_start`] runs before the first accept and
    /// [`Hooks::on_stop`] after the last.
    #[instrument(skip_all, name = "gateway")]
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        self.hooks.on_start(&self.hub);
        info!("Gateway started");

        loop {
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        if self.hub.is_banned(&addr.ip()) {
                            warn!(%addr, "Connection rejected - host banned");
                            drop(stream);
                            continue;
                        }

                        let id = self.hub.next_id();
                        info!(%addr, conn = %id, "Connection accepted");
                        let task = ConnectionTask::new(
                            id,
                            addr,
                            stream,
                            Arc::clone(&self.hub),
                            Arc::clone(&self.registry),
                            Arc::clone(&self.hooks),
                            Arc::clone(&self.options),
                        );
                        tokio::spawn(task.run(shutdown.clone()));
                    }
                    Err(e) => {
                        error!(error = %e, "Failed to accept connection");
                    }
                },
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Gateway shutting down");
                        break;
                    }
                }
            }
        }

        self.hooks.on_stop(&self.hub);
        Ok(())
    }
}
