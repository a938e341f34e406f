//! Interceptors: prompts that take over a session's input.
//!
//! While an interceptor is attached, every line goes to it instead of the
//! command registry. The three kinds ([`Reader`], [`Menu`], [`YesOrNo`]) share
//! the fields in [`Interceptor`]: persistence, the abort protocol, attach and
//! detach hooks, and the interceptor to hand back to when this one completes.
//!
//! Interceptors are built by application code, attached through
//! [`Caller::intercept`](crate::commands::Caller::intercept) and discarded
//! when they complete, are aborted, or are replaced.

mod menu;
mod reader;
mod yes_or_no;

pub use menu::{DEFAULT_MENU_PROMPT, LabelPosition, Menu, MenuItem, MenuLabel, Selection};
pub use reader::Reader;
pub use yes_or_no::YesOrNo;

use std::fmt;
use tracing::warn;

use crate::commands::{Caller, Registry};
use crate::error::{PromptResult, contain};
use crate::state::Connection;

pub const DEFAULT_ABORT_COMMAND: &str = "@abort";
pub const DEFAULT_ABORT_MESSAGE: &str = "Aborted.";

/// A prompt callback: reader completion, menu action, yes/no answer.
pub type Callback = Box<dyn FnMut(&mut Caller<'_>) -> PromptResult + Send>;

/// Runs when an interceptor is attached (given the one it replaces) or
/// detached (given the one replacing it).
pub type TransitionHook = Box<dyn FnMut(&Connection, Option<&Interceptor>) + Send>;

/// Text to send, or a closure that sends it.
///
/// Closures receive the connection and a context string: the reader's buffer
/// for reader hooks, empty otherwise.
pub enum Notice {
    Text(String),
    With(Box<dyn FnMut(&Connection, &str) + Send>),
}

impl Notice {
    pub fn with<F>(f: F) -> Self
    where
        F: FnMut(&Connection, &str) + Send + 'static,
    {
        Self::With(Box::new(f))
    }

    /// Send the notice. A panicking closure is returned as an error.
    pub(crate) fn try_send(&mut self, connection: &Connection, context: &str) -> PromptResult {
        match self {
            Self::Text(text) => {
                connection.notify(text.as_str());
                Ok(())
            }
            Self::With(f) => contain(|| f(connection, context)),
        }
    }

    /// Send the notice outside of a dispatch, logging a panicking closure.
    pub(crate) fn send(&mut self, connection: &Connection, context: &str) {
        if let Err(error) = self.try_send(connection, context) {
            warn!(conn = %connection.id(), error = %error, "Notice failed");
        }
    }
}

impl From<&str> for Notice {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Notice {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl fmt::Debug for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::With(_) => f.write_str("With(..)"),
        }
    }
}

/// Whether an interceptor wants to stay attached after a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Stay,
    Done,
}

/// The kind-specific part of an interceptor.
pub enum Prompt {
    Reader(Reader),
    Menu(Menu),
    YesOrNo(YesOrNo),
}

/// What a prompt needs to know about its interceptor while it is fed.
pub(crate) struct Feed<'r> {
    pub registry: &'r Registry,
    /// The abort command to mention in prompts, or `None` when aborting is disabled.
    pub abort: Option<&'r str>,
    pub persistent: bool,
}

impl Feed<'_> {
    /// Run a prompt callback, reporting failures and panics to the registry's
    /// `on_error` hook.
    pub(crate) fn run(&self, callback: &mut Callback, caller: &mut Caller<'_>) {
        let result = contain(|| callback(caller)).and_then(|result| result);
        self.report(caller, result);
    }

    /// Run an application hook that cannot fail except by panicking.
    pub(crate) fn hook<F>(&self, caller: &mut Caller<'_>, f: F)
    where
        F: FnOnce(&mut Caller<'_>),
    {
        let result = contain(|| f(caller));
        self.report(caller, result);
    }

    /// Send a notice to the caller's connection.
    pub(crate) fn notice(&self, notice: &mut Notice, caller: &mut Caller<'_>, context: &str) {
        let result = notice.try_send(caller.connection(), context);
        self.report(caller, result);
    }

    fn report(&self, caller: &mut Caller<'_>, result: PromptResult) {
        if let Err(error) = result {
            self.registry.report_error(caller, error);
        }
    }
}

/// A prompt plus the state every interceptor shares.
pub struct Interceptor {
    prompt: Prompt,
    persistent: bool,
    no_abort: Option<Notice>,
    abort_message: String,
    abort_command: Option<String>,
    restore: Option<Box<Interceptor>>,
    on_attach: Option<TransitionHook>,
    on_detach: Option<TransitionHook>,
}

impl Interceptor {
    pub fn new(prompt: Prompt) -> Self {
        Self {
            prompt,
            persistent: false,
            no_abort: None,
            abort_message: DEFAULT_ABORT_MESSAGE.to_string(),
            abort_command: None,
            restore: None,
            on_attach: None,
            on_detach: None,
        }
    }

    /// Keep this interceptor attached after it completes.
    ///
    /// A persistent menu re-prompts after invalid input instead of going away.
    /// Persistent readers and questions start over after each answer.
    pub fn persistent(mut self, persistent: bool) -> Self {
        self.persistent = persistent;
        self
    }

    /// Refuse the abort command, answering it with `notice` instead.
    pub fn no_abort(mut self, notice: impl Into<Notice>) -> Self {
        self.no_abort = Some(notice.into());
        self
    }

    /// Message sent when this interceptor is aborted.
    pub fn abort_message(mut self, message: impl Into<String>) -> Self {
        self.abort_message = message.into();
        self
    }

    /// Override the session's abort command for this interceptor.
    pub fn abort_command(mut self, command: impl Into<String>) -> Self {
        self.abort_command = Some(command.into());
        self
    }

    /// Hand the session to `target` when this interceptor completes.
    pub fn restore_to(mut self, target: Interceptor) -> Self {
        self.restore = Some(Box::new(target));
        self
    }

    pub fn on_attach<F>(mut self, f: F) -> Self
    where
        F: FnMut(&Connection, Option<&Interceptor>) + Send + 'static,
    {
        self.on_attach = Some(Box::new(f));
        self
    }

    pub fn on_detach<F>(mut self, f: F) -> Self
    where
        F: FnMut(&Connection, Option<&Interceptor>) + Send + 'static,
    {
        self.on_detach = Some(Box::new(f));
        self
    }

    pub fn prompt(&self) -> &Prompt {
        &self.prompt
    }

    pub fn prompt_mut(&mut self) -> &mut Prompt {
        &mut self.prompt
    }

    pub fn is_persistent(&self) -> bool {
        self.persistent
    }

    pub fn is_abortable(&self) -> bool {
        self.no_abort.is_none()
    }

    pub fn kind(&self) -> &'static str {
        match self.prompt {
            Prompt::Reader(_) => "reader",
            Prompt::Menu(_) => "menu",
            Prompt::YesOrNo(_) => "yes_or_no",
        }
    }

    /// The command that aborts this interceptor.
    pub fn abort_command_str(&self) -> &str {
        self.abort_command.as_deref().unwrap_or(DEFAULT_ABORT_COMMAND)
    }

    pub(crate) fn abort_message_str(&self) -> &str {
        &self.abort_message
    }

    /// Whether `line` is the abort command.
    pub fn is_abort(&self, line: &str) -> bool {
        line.trim() == self.abort_command_str()
    }

    /// Whether this interceptor hands the session to another when it completes.
    pub fn has_restore(&self) -> bool {
        self.restore.is_some()
    }

    /// Use `command` as the abort command unless one was set explicitly.
    pub(crate) fn default_abort_command(&mut self, command: &str) {
        if self.abort_command.is_none() {
            self.abort_command = Some(command.to_string());
        }
    }

    pub(crate) fn take_restore(&mut self) -> Option<Interceptor> {
        self.restore.take().map(|target| *target)
    }

    /// Append `target` to the end of this interceptor's restore chain.
    ///
    /// An explicit `restore_to` is kept; `target` comes back after it.
    pub(crate) fn chain_restore(&mut self, target: Option<Interceptor>) {
        match &mut self.restore {
            Some(next) => next.chain_restore(target),
            None => self.restore = target.map(Box::new),
        }
    }

    /// Send the `no_abort` notice. Returns `false` if aborting is allowed.
    pub(crate) fn refuse_abort(&mut self, connection: &Connection) -> bool {
        match &mut self.no_abort {
            Some(notice) => {
                notice.send(connection, "");
                true
            }
            None => false,
        }
    }

    /// Render the prompt to `connection`.
    pub fn explain(&mut self, connection: &Connection) {
        let abort = self
            .no_abort
            .is_none()
            .then(|| self.abort_command.as_deref().unwrap_or(DEFAULT_ABORT_COMMAND));
        match &mut self.prompt {
            Prompt::Reader(reader) => reader.explain(connection, abort),
            Prompt::Menu(menu) => menu.explain(connection, abort),
            Prompt::YesOrNo(question) => question.explain(connection),
        }
    }

    /// Consume one line.
    pub(crate) fn feed(&mut self, caller: &mut Caller<'_>, registry: &Registry) -> Step {
        let abort = self
            .no_abort
            .is_none()
            .then(|| self.abort_command.as_deref().unwrap_or(DEFAULT_ABORT_COMMAND));
        let feed = Feed {
            registry,
            abort,
            persistent: self.persistent,
        };

        match &mut self.prompt {
            Prompt::Reader(reader) => {
                let step = reader.feed(caller, &feed);
                if step == Step::Done && self.persistent {
                    reader.reset();
                    reader.explain(caller.connection(), abort);
                    return Step::Stay;
                }
                step
            }
            Prompt::Menu(menu) => menu.feed(caller, &feed),
            Prompt::YesOrNo(question) => {
                question.feed(caller, &feed);
                if self.persistent {
                    question.explain(caller.connection());
                    Step::Stay
                } else {
                    Step::Done
                }
            }
        }
    }

    pub(crate) fn attached(&mut self, connection: &Connection, previous: Option<&Interceptor>) {
        if let Some(hook) = &mut self.on_attach
            && let Err(error) = contain(|| hook(connection, previous))
        {
            warn!(conn = %connection.id(), error = %error, "Attach hook failed");
        }
    }

    pub(crate) fn detached(&mut self, connection: &Connection, next: Option<&Interceptor>) {
        if let Some(hook) = &mut self.on_detach
            && let Err(error) = contain(|| hook(connection, next))
        {
            warn!(conn = %connection.id(), error = %error, "Detach hook failed");
        }
    }
}

impl From<Prompt> for Interceptor {
    fn from(prompt: Prompt) -> Self {
        Self::new(prompt)
    }
}

impl From<Reader> for Interceptor {
    fn from(reader: Reader) -> Self {
        Self::new(Prompt::Reader(reader))
    }
}

impl From<Menu> for Interceptor {
    fn from(menu: Menu) -> Self {
        Self::new(Prompt::Menu(menu))
    }
}

impl From<YesOrNo> for Interceptor {
    fn from(question: YesOrNo) -> Self {
        Self::new(Prompt::YesOrNo(question))
    }
}

impl fmt::Debug for Interceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interceptor")
            .field("kind", &self.kind())
            .field("persistent", &self.persistent)
            .field("abortable", &self.is_abortable())
            .field("restore", &self.restore)
            .finish_non_exhaustive()
    }
}
