//! Test server management.
//!
//! Runs a gateway in-process on an ephemeral port.

use gsb_ng::commands::builtin::{self, Lobby};
use gsb_ng::commands::Registry;
use gsb_ng::config::Config;
use gsb_ng::network::{ConnectionOptions, Gateway, Hooks};
use gsb_ng::state::Hub;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub const WELCOME: &str = "Welcome to the chatroom. Type help for help.";

/// A test server instance. Shuts down when dropped.
pub struct TestServer {
    addr: SocketAddr,
    hub: Arc<Hub>,
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<anyhow::Result<()>>>,
}

impl TestServer {
    /// Spawn a chat room server with the built-in commands.
    pub async fn spawn() -> anyhow::Result<Self> {
        Self::spawn_with(test_config(), Arc::new(Hub::new())).await
    }

    /// Spawn a chat room server from `config`, sharing `hub` with the caller.
    #[allow(dead_code)]
    pub async fn spawn_with(config: Config, hub: Arc<Hub>) -> anyhow::Result<Self> {
        let registry = builtin::registry(&config.parser)?;
        Self::spawn_custom(config, hub, registry, Arc::new(Lobby)).await
    }

    /// Spawn a server with an arbitrary registry and hooks.
    #[allow(dead_code)]
    pub async fn spawn_custom(
        config: Config,
        hub: Arc<Hub>,
        registry: Registry,
        hooks: Arc<dyn Hooks>,
    ) -> anyhow::Result<Self> {
        let gateway = Gateway::bind(
            "127.0.0.1:0".parse()?,
            Arc::clone(&hub),
            Arc::new(registry),
            hooks,
            ConnectionOptions::from_config(&config),
        )
        .await?;
        let addr = gateway.local_addr()?;

        let (shutdown, rx) = watch::channel(false);
        let task = tokio::spawn(gateway.run(rx));

        Ok(Self {
            addr,
            hub,
            shutdown,
            task: Some(task),
        })
    }

    /// Get the server address.
    pub fn address(&self) -> String {
        self.addr.to_string()
    }

    #[allow(dead_code)]
    pub fn hub(&self) -> &Arc<Hub> {
        &self.hub
    }

    /// Create a new test client connected to this server.
    #[allow(dead_code)]
    pub async fn connect(&self) -> anyhow::Result<super::client::TestClient> {
        super::client::TestClient::connect(&self.address()).await
    }

    /// Stop accepting connections and close every session.
    #[allow(dead_code)]
    pub async fn shutdown(mut self) -> anyhow::Result<()> {
        let _ = self.shutdown.send(true);
        if let Some(task) = self.task.take() {
            task.await??;
        }
        Ok(())
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}

/// Configuration used by the chat room tests.
#[allow(dead_code)]
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.server.welcome = vec![WELCOME.to_string()];
    config.parser.substitutions.insert(":".to_string(), "emote".to_string());
    config
}
