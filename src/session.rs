//! Per-connection dispatch state.
//!
//! A `Session` owns the active interceptor and references the active command
//! registry. Every change of interceptor goes through [`Session::transition`],
//! which runs the outgoing interceptor's detach hook before the incoming one's
//! attach hook and then explains the incoming one.

use std::sync::Arc;
use tracing::debug;

use crate::commands::{Caller, Registry};
use crate::dispatch::{self, DispatchResult};
use crate::intercept::{DEFAULT_ABORT_COMMAND, Interceptor};
use crate::state::{Connection, Hub};

pub struct Session {
    connection: Connection,
    hub: Arc<Hub>,
    registry: Arc<Registry>,
    interceptor: Option<Interceptor>,
    abort_command: String,
    closing: Option<String>,
}

impl Session {
    pub fn new(connection: Connection, hub: Arc<Hub>, registry: Arc<Registry>) -> Self {
        Self {
            connection,
            hub,
            registry,
            interceptor: None,
            abort_command: DEFAULT_ABORT_COMMAND.to_string(),
            closing: None,
        }
    }

    /// Abort command used by interceptors that do not set their own.
    pub fn with_abort_command(mut self, command: impl Into<String>) -> Self {
        self.abort_command = command.into();
        self
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn hub(&self) -> &Arc<Hub> {
        &self.hub
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn interceptor(&self) -> Option<&Interceptor> {
        self.interceptor.as_ref()
    }

    pub fn is_intercepted(&self) -> bool {
        self.interceptor.is_some()
    }

    pub fn abort_command(&self) -> &str {
        &self.abort_command
    }

    /// The reason a handler asked for this connection to close, if any.
    pub fn closing(&self) -> Option<&str> {
        self.closing.as_deref()
    }

    /// The connection is up: attach the starting registry.
    pub fn establish(&self) {
        self.registry.attach(&self.connection);
    }

    /// Replace the active interceptor with `next` (or none), returning the old one.
    ///
    /// The old interceptor's detach hook sees `next`; `next`'s attach hook sees
    /// the old one. `next` is then explained to the connection.
    pub fn transition(&mut self, next: Option<Interceptor>) -> Option<Interceptor> {
        let mut previous = self.interceptor.take();
        let mut next = next;

        if let Some(incoming) = next.as_mut() {
            incoming.default_abort_command(&self.abort_command);
        }
        if let Some(outgoing) = previous.as_mut() {
            outgoing.detached(&self.connection, next.as_ref());
        }
        if let Some(incoming) = next.as_mut() {
            incoming.attached(&self.connection, previous.as_ref());
            incoming.explain(&self.connection);
        }

        debug!(
            conn = %self.connection.id(),
            from = previous.as_ref().map(Interceptor::kind),
            to = next.as_ref().map(Interceptor::kind),
            "Interceptor transition"
        );
        self.interceptor = next;
        previous
    }

    /// Switch to another command registry, running the detach and attach hooks.
    pub fn set_registry(&mut self, registry: Arc<Registry>) {
        self.registry.detach(&self.connection);
        self.registry = registry;
        self.registry.attach(&self.connection);
        debug!(conn = %self.connection.id(), "Registry switched");
    }

    /// Feed one inbound line through the dispatcher.
    pub fn handle_line(&mut self, line: &str) -> DispatchResult {
        dispatch::handle_line(self, line)
    }

    /// Run an event callback (such as a connect hook) with a caller whose text
    /// is empty, then apply whatever it requested.
    pub fn run_event<F>(&mut self, event: F) -> DispatchResult
    where
        F: FnOnce(&mut Caller<'_>),
    {
        dispatch::run_event(self, event)
    }

    /// The connection is gone. Any interceptor is released without running
    /// its completion callbacks.
    pub fn close(&mut self, reason: &str) {
        if let Some(mut active) = self.interceptor.take() {
            active.detached(&self.connection, None);
            debug!(conn = %self.connection.id(), kind = active.kind(), "Interceptor released on close");
        }
        self.registry.detach(&self.connection);
        debug!(conn = %self.connection.id(), reason, "Session closed");
    }

    pub(crate) fn take_interceptor(&mut self) -> Option<Interceptor> {
        self.interceptor.take()
    }

    /// Put back an interceptor that was taken out to be fed. No hooks run.
    pub(crate) fn restore_interceptor(&mut self, interceptor: Interceptor) {
        self.interceptor = Some(interceptor);
    }

    pub(crate) fn interceptor_mut(&mut self) -> Option<&mut Interceptor> {
        self.interceptor.as_mut()
    }

    pub(crate) fn request_close(&mut self, reason: String) {
        self.closing = Some(reason);
    }

    pub(crate) fn outcome(&self) -> DispatchResult {
        match &self.closing {
            Some(reason) => DispatchResult::Quit(reason.clone()),
            None => DispatchResult::Continue,
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("connection", &self.connection)
            .field("interceptor", &self.interceptor)
            .field("closing", &self.closing)
            .finish_non_exhaustive()
    }
}
