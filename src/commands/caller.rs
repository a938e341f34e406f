//! Per-invocation context passed to command handlers and prompt callbacks.
//!
//! A `Caller` borrows the connection and the hub for the duration of one
//! dispatch and is dropped when it returns. Writes (`notify`, `broadcast`)
//! happen immediately; changes to the session (attaching a prompt, swapping
//! registries, disconnecting) are recorded as requests and applied by the
//! dispatcher once the handler has returned.

use std::collections::HashMap;
use std::sync::Arc;

use super::Registry;
use crate::error::HandlerError;
use crate::intercept::Interceptor;
use crate::state::{Connection, Hub};

/// A session change requested from inside a handler.
pub(crate) enum Request {
    /// Attach an interceptor, replacing or nesting over the current one.
    Intercept(Interceptor),
    /// Drop every interceptor and return to command dispatch.
    Release,
    /// Switch the session to another command registry.
    Registry(Arc<Registry>),
    /// Close the connection once the line has been handled.
    Disconnect(String),
}

/// Context for one handler or callback invocation.
pub struct Caller<'a> {
    connection: &'a Connection,
    hub: &'a Hub,
    registry: Option<&'a Registry>,
    text: String,
    args: Vec<String>,
    kwargs: HashMap<String, String>,
    error: Option<HandlerError>,
    requests: Vec<Request>,
    keep_prompt: bool,
}

impl<'a> Caller<'a> {
    pub fn new(connection: &'a Connection, hub: &'a Hub, text: impl Into<String>) -> Self {
        Self {
            connection,
            hub,
            registry: None,
            text: text.into(),
            args: Vec::new(),
            kwargs: HashMap::new(),
            error: None,
            requests: Vec::new(),
            keep_prompt: false,
        }
    }

    pub(crate) fn with_registry(mut self, registry: &'a Registry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// The triggering text: the full command line, or the reader's buffer.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub(crate) fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    /// Positional capture groups from the command's pattern.
    ///
    /// Groups that did not participate in the match are empty strings.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }

    /// A named capture group from the command's pattern.
    pub fn named(&self, key: &str) -> Option<&str> {
        self.kwargs.get(key).map(String::as_str)
    }

    pub(crate) fn set_groups(&mut self, args: Vec<String>, kwargs: HashMap<String, String>) {
        self.args = args;
        self.kwargs = kwargs;
    }

    /// The failure being reported, set only while `on_error` runs.
    pub fn error(&self) -> Option<&HandlerError> {
        self.error.as_ref()
    }

    pub(crate) fn set_error(&mut self, error: HandlerError) {
        self.error = Some(error);
    }

    pub fn connection(&self) -> &'a Connection {
        self.connection
    }

    pub fn hub(&self) -> &'a Hub {
        self.hub
    }

    /// The registry the session was using when this line arrived.
    pub fn registry(&self) -> Option<&'a Registry> {
        self.registry
    }

    /// Send text to this caller's connection.
    pub fn notify(&self, text: impl AsRef<str>) {
        self.connection.notify(text);
    }

    /// Send text to every connected client. Returns how many received it.
    pub fn broadcast(&self, text: impl AsRef<str>) -> usize {
        self.hub.broadcast(text)
    }

    /// Attach `interceptor` to the session once this invocation returns.
    ///
    /// The interceptor is explained to the connection as it attaches.
    pub fn intercept(&mut self, interceptor: impl Into<Interceptor>) {
        self.requests.push(Request::Intercept(interceptor.into()));
    }

    /// Drop the active interceptor (and anything it would restore) and go back
    /// to command dispatch.
    pub fn release(&mut self) {
        self.requests.push(Request::Release);
    }

    /// Switch the session to `registry`.
    pub fn set_registry(&mut self, registry: Arc<Registry>) {
        self.requests.push(Request::Registry(registry));
    }

    /// Close the connection after this line.
    pub fn disconnect(&mut self, reason: impl Into<String>) {
        self.requests.push(Request::Disconnect(reason.into()));
    }

    /// Keep the menu that is currently being fed attached after this selection.
    pub fn keep_prompt(&mut self) {
        self.keep_prompt = true;
    }

    pub(crate) fn kept_prompt(&self) -> bool {
        self.keep_prompt
    }

    /// Whether an interceptor has been requested during this invocation.
    pub(crate) fn intercept_pending(&self) -> bool {
        self.requests
            .iter()
            .any(|request| matches!(request, Request::Intercept(_)))
    }

    pub(crate) fn take_requests(&mut self) -> Vec<Request> {
        std::mem::take(&mut self.requests)
    }

    /// Forget the requests of a handler that declined the line.
    pub(crate) fn discard_requests(&mut self) {
        self.requests.clear();
    }
}
