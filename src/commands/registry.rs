//! Command registry and line matcher.
//!
//! A registry maps names to an ordered list of commands. Several commands may
//! share a name: they are tried in registration order, so later registrations
//! act as fallbacks for earlier ones that decline (`Flow::Continue`) or that
//! the caller is not permitted to use.
//!
//! Registries are plain values. Build one, wrap it in an `Arc` and hand it to
//! as many sessions as needed; nothing here is global.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, debug_span, trace, warn};

use super::{Caller, Command};
use crate::config::ParserConfig;
use crate::error::{HandlerError, Outcome, RegistryError, contain};
use crate::state::Connection;

pub const DEFAULT_HUH_MESSAGE: &str = "I don't understand that.";
pub const DEFAULT_ERROR_MESSAGE: &str = "There was an error with your command.";

/// A hook run with the current caller.
pub type Hook = Box<dyn Fn(&mut Caller<'_>) + Send + Sync>;
/// A hook that can veto a line before it is matched.
pub type Gate = Box<dyn Fn(&mut Caller<'_>) -> bool + Send + Sync>;
/// A hook run when a session starts or stops using this registry.
pub type LifecycleHook = Box<dyn Fn(&Connection) + Send + Sync>;

/// How a line was resolved against the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// A handler ran to completion.
    Handled,
    /// No permitted command under that name accepted the line.
    NoMatch,
    /// The command was found but its arguments did not match; it was explained.
    ArgumentMismatch,
    /// A handler failed; `on_error` was called.
    Failed,
    /// `pre_command` rejected the line before matching.
    Dropped,
}

/// Owns a set of commands and resolves input lines to them.
pub struct Registry {
    separator: String,
    substitutions: BTreeMap<char, String>,
    commands: HashMap<String, Vec<Arc<Command>>>,
    /// Every command once, in registration order.
    ordered: Vec<Arc<Command>>,
    huh_message: String,
    error_message: String,
    huh: Option<Hook>,
    on_error: Option<Hook>,
    pre_command: Option<Gate>,
    post_command: Option<Hook>,
    on_attach: Option<LifecycleHook>,
    on_detach: Option<LifecycleHook>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            separator: " ".to_string(),
            substitutions: BTreeMap::new(),
            commands: HashMap::new(),
            ordered: Vec::new(),
            huh_message: DEFAULT_HUH_MESSAGE.to_string(),
            error_message: DEFAULT_ERROR_MESSAGE.to_string(),
            huh: None,
            on_error: None,
            pre_command: None,
            post_command: None,
            on_attach: None,
            on_detach: None,
        }
    }

    /// Create an empty registry using the `[parser]` settings.
    pub fn from_config(config: &ParserConfig) -> Self {
        let mut registry = Self::new()
            .with_separator(config.separator.clone())
            .with_huh_message(config.huh_message.clone())
            .with_error_message(config.error_message.clone());
        registry.substitutions = config.substitution_chars();
        registry
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Make a leading `short` character stand for `name` followed by the separator.
    pub fn with_substitution(mut self, short: char, name: impl Into<String>) -> Self {
        self.substitutions.insert(short, name.into());
        self
    }

    pub fn with_huh_message(mut self, message: impl Into<String>) -> Self {
        self.huh_message = message.into();
        self
    }

    pub fn with_error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = message.into();
        self
    }

    /// Replace the "I don't understand that." response.
    pub fn on_huh<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut Caller<'_>) + Send + Sync + 'static,
    {
        self.huh = Some(Box::new(f));
        self
    }

    /// Replace the response to a failed handler. `caller.error()` is set.
    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut Caller<'_>) + Send + Sync + 'static,
    {
        self.on_error = Some(Box::new(f));
        self
    }

    pub fn pre_command<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut Caller<'_>) -> bool + Send + Sync + 'static,
    {
        self.pre_command = Some(Box::new(f));
        self
    }

    pub fn post_command<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut Caller<'_>) + Send + Sync + 'static,
    {
        self.post_command = Some(Box::new(f));
        self
    }

    pub fn on_attach<F>(mut self, f: F) -> Self
    where
        F: Fn(&Connection) + Send + Sync + 'static,
    {
        self.on_attach = Some(Box::new(f));
        self
    }

    pub fn on_detach<F>(mut self, f: F) -> Self
    where
        F: Fn(&Connection) + Send + Sync + 'static,
    {
        self.on_detach = Some(Box::new(f));
        self
    }

    /// Add `command` under each of its names, after any existing commands of
    /// the same name.
    pub fn register(&mut self, command: Command) -> Result<Arc<Command>, RegistryError> {
        if command.names().is_empty() {
            return Err(RegistryError::NoNames);
        }

        let command = Arc::new(command);
        for name in command.names() {
            self.commands
                .entry(name.clone())
                .or_default()
                .push(Arc::clone(&command));
        }
        self.ordered.push(Arc::clone(&command));
        debug!(names = ?command.names(), "Command registered");
        Ok(command)
    }

    /// All commands registered under exactly `name`, in registration order.
    pub fn lookup(&self, name: &str) -> &[Arc<Command>] {
        self.commands.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    /// Every distinct command, in registration order.
    pub fn all_commands(&self) -> &[Arc<Command>] {
        &self.ordered
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    pub fn substitutions(&self) -> &BTreeMap<char, String> {
        &self.substitutions
    }

    /// Split a line into the command name and the remainder at the first separator.
    pub fn split<'l>(&self, line: &'l str) -> (&'l str, &'l str) {
        line.split_once(self.separator.as_str()).unwrap_or((line, ""))
    }

    /// Expand a leading substitution character, if any.
    pub fn substitute<'l>(&self, line: &'l str) -> Cow<'l, str> {
        let Some(first) = line.chars().next() else {
            return Cow::Borrowed(line);
        };
        match self.substitutions.get(&first) {
            Some(name) => Cow::Owned(format!(
                "{name}{}{}",
                self.separator,
                &line[first.len_utf8()..]
            )),
            None => Cow::Borrowed(line),
        }
    }

    /// Lines describing `command`: names, shortcuts, description, help.
    pub fn explanation(&self, command: &Command) -> Vec<String> {
        let mut lines = vec![format!("{}:", command.names().join(" or "))];
        for (short, name) in &self.substitutions {
            if command.names().contains(name) {
                lines.push(format!(
                    "Instead of typing \"{name}{}\", you can type {short}.",
                    self.separator
                ));
            }
        }
        lines.push(command.description().to_string());
        lines.push(command.help().to_string());
        lines
    }

    /// Send the explanation of `command` to `connection`.
    pub fn explain(&self, command: &Command, connection: &Connection) {
        for line in self.explanation(command) {
            connection.notify(line);
        }
    }

    /// Match the caller's text against the registered commands and run the
    /// first one that accepts it.
    ///
    /// When nothing matches, the huh response is sent unless `allow_huh` is false.
    /// Predicates and hooks run under the same panic containment as handlers:
    /// a panic is reported to `on_error` and ends the line as `Failed`.
    pub fn handle_line(&self, caller: &mut Caller<'_>, allow_huh: bool) -> Resolution {
        let line = self.substitute(caller.text()).into_owned();
        caller.set_text(line.as_str());

        if let Some(gate) = &self.pre_command {
            match contain(|| gate(caller)) {
                Ok(true) => {}
                Ok(false) => {
                    trace!("Line dropped by pre_command");
                    return Resolution::Dropped;
                }
                Err(error) => {
                    self.report_error(caller, error);
                    return Resolution::Failed;
                }
            }
        }

        let (name, rest) = self.split(&line);
        let span = debug_span!("command", command = %name, conn = %caller.connection().id());
        let _enter = span.enter();

        let mut resolution = Resolution::NoMatch;
        for command in self.lookup(name) {
            match contain(|| command.allowed(caller)) {
                Ok(true) => {}
                Ok(false) => {
                    trace!("Not permitted, trying next candidate");
                    continue;
                }
                Err(error) => {
                    self.report_error(caller, error);
                    resolution = Resolution::Failed;
                    break;
                }
            }

            let Some((args, kwargs)) = command.match_args(rest) else {
                debug!("Arguments did not match, explaining");
                self.explain(command, caller.connection());
                resolution = Resolution::ArgumentMismatch;
                break;
            };
            caller.set_groups(args, kwargs);

            match command.invoke(caller) {
                Outcome::Handled => {
                    resolution = Resolution::Handled;
                    break;
                }
                Outcome::Continue => {
                    trace!("Handler declined, trying next candidate");
                    caller.discard_requests();
                }
                Outcome::Failed(error) => {
                    self.report_error(caller, error);
                    resolution = Resolution::Failed;
                    break;
                }
            }
        }

        if resolution == Resolution::NoMatch && allow_huh {
            self.huh(caller);
        }
        if let Some(hook) = &self.post_command
            && let Err(error) = contain(|| hook(caller))
        {
            self.report_error(caller, error);
        }
        resolution
    }

    /// Tell the caller the line was not understood.
    pub fn huh(&self, caller: &mut Caller<'_>) {
        match &self.huh {
            Some(hook) => {
                if let Err(error) = contain(|| hook(caller)) {
                    self.report_error(caller, error);
                }
            }
            None => caller.notify(&self.huh_message),
        }
    }

    /// Log a handler failure and pass it to `on_error`.
    ///
    /// If `on_error` itself panics, the default error message is sent instead.
    pub(crate) fn report_error(&self, caller: &mut Caller<'_>, error: HandlerError) {
        warn!(
            conn = %caller.connection().id(),
            error = %error,
            code = error.error_code(),
            "Handler failed"
        );
        caller.set_error(error);
        match &self.on_error {
            Some(hook) => {
                if let Err(error) = contain(|| hook(caller)) {
                    warn!(conn = %caller.connection().id(), error = %error, "on_error hook failed");
                    caller.notify(&self.error_message);
                }
            }
            None => caller.notify(&self.error_message),
        }
    }

    pub(crate) fn attach(&self, connection: &Connection) {
        if let Some(hook) = &self.on_attach
            && let Err(error) = contain(|| hook(connection))
        {
            warn!(conn = %connection.id(), error = %error, "Registry attach hook failed");
        }
    }

    pub(crate) fn detach(&self, connection: &Connection) {
        if let Some(hook) = &self.on_detach
            && let Err(error) = contain(|| hook(connection))
        {
            warn!(conn = %connection.id(), error = %error, "Registry detach hook failed");
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("separator", &self.separator)
            .field("substitutions", &self.substitutions)
            .field("commands", &self.ordered.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Flow, HandlerError};
    use crate::state::{ConnectionId, Hub};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::mpsc;

    fn connection() -> (Connection, mpsc::Receiver<String>) {
        Connection::channel(ConnectionId::new(1), "127.0.0.1:5000".parse().unwrap(), 64)
    }

    fn drain(rx: &mut mpsc::Receiver<String>) -> Vec<String> {
        let mut lines = Vec::new();
        while let Ok(line) = rx.try_recv() {
            lines.push(line);
        }
        lines
    }

    fn counter() -> Arc<AtomicUsize> {
        Arc::new(AtomicUsize::new(0))
    }

    fn run(registry: &Registry, conn: &Connection, line: &str) -> Resolution {
        let hub = Hub::new();
        let mut caller = Caller::new(conn, &hub, line);
        registry.handle_line(&mut caller, true)
    }

    #[test]
    fn test_split() {
        let registry = Registry::new();
        assert_eq!(registry.split("hello world"), ("hello", "world"));
        assert_eq!(registry.split("hello"), ("hello", ""));
        assert_eq!(registry.split(""), ("", ""));
        assert_eq!(registry.split("say a b"), ("say", "a b"));
    }

    #[test]
    fn test_register_rejects_nameless_command() {
        let mut registry = Registry::new();
        let err = registry
            .register(Command::new(Vec::<String>::new(), |_| Ok(Flow::Handled)))
            .unwrap_err();
        assert!(matches!(err, RegistryError::NoNames));
    }

    #[test]
    fn test_lookup_and_all_commands() {
        let mut registry = Registry::new();
        let look = registry
            .register(Command::new(["look", "l"], |_| Ok(Flow::Handled)))
            .unwrap();
        registry
            .register(Command::new(["look"], |_| Ok(Flow::Handled)))
            .unwrap();

        assert_eq!(registry.lookup("look").len(), 2);
        assert_eq!(registry.lookup("l").len(), 1);
        assert!(registry.lookup("nothing").is_empty());
        assert_eq!(registry.all_commands().len(), 2);
        assert!(Arc::ptr_eq(&registry.all_commands()[0], &look));
    }

    #[test]
    fn test_only_permitted_candidate_runs() {
        let (conn, mut rx) = connection();
        conn.set_name("Admin");
        let first = counter();
        let second = counter();

        let mut registry = Registry::new();
        let hits = Arc::clone(&first);
        registry
            .register(
                Command::new(["shutdown"], move |_| {
                    hits.fetch_add(1, Ordering::SeqCst);
                    Ok(Flow::Handled)
                })
                .with_predicate(super::super::permissions::named("root")),
            )
            .unwrap();
        let hits = Arc::clone(&second);
        registry
            .register(
                Command::new(["shutdown"], move |_| {
                    hits.fetch_add(1, Ordering::SeqCst);
                    Ok(Flow::Handled)
                })
                .with_predicate(super::super::permissions::named("admin")),
            )
            .unwrap();

        assert_eq!(run(&registry, &conn, "shutdown"), Resolution::Handled);
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_continue_tries_next_then_huh() {
        let (conn, mut rx) = connection();
        let calls = Arc::new(parking_lot::Mutex::new(Vec::new()));

        let mut registry = Registry::new();
        for label in ["first", "second"] {
            let calls = Arc::clone(&calls);
            registry
                .register(Command::new(["go"], move |_| {
                    calls.lock().push(label);
                    Ok(Flow::Continue)
                }))
                .unwrap();
        }

        assert_eq!(run(&registry, &conn, "go"), Resolution::NoMatch);
        assert_eq!(*calls.lock(), ["first", "second"]);
        assert_eq!(drain(&mut rx), [DEFAULT_HUH_MESSAGE]);
    }

    #[test]
    fn test_continue_falls_through_to_handler() {
        let (conn, mut rx) = connection();
        let mut registry = Registry::new();
        registry
            .register(Command::new(["go"], |_| Ok(Flow::Continue)))
            .unwrap();
        registry
            .register(Command::new(["go"], |caller| {
                caller.notify("went");
                Ok(Flow::Handled)
            }))
            .unwrap();

        assert_eq!(run(&registry, &conn, "go"), Resolution::Handled);
        assert_eq!(drain(&mut rx), ["went"]);
    }

    #[test]
    fn test_argument_mismatch_explains_and_stops() {
        let (conn, mut rx) = connection();
        let fallback = counter();

        let mut registry = Registry::new().with_substitution('\'', "say");
        registry
            .register(
                Command::new(["say"], |_| Ok(Flow::Handled))
                    .with_pattern(r".+")
                    .unwrap()
                    .with_description("Say something.")
                    .with_help("say <text>"),
            )
            .unwrap();
        let hits = Arc::clone(&fallback);
        registry
            .register(Command::new(["say"], move |_| {
                hits.fetch_add(1, Ordering::SeqCst);
                Ok(Flow::Handled)
            }))
            .unwrap();

        assert_eq!(run(&registry, &conn, "say"), Resolution::ArgumentMismatch);
        assert_eq!(fallback.load(Ordering::SeqCst), 0);
        assert_eq!(
            drain(&mut rx),
            [
                "say:",
                "Instead of typing \"say \", you can type '.",
                "Say something.",
                "say <text>",
            ]
        );
    }

    #[test]
    fn test_no_pattern_with_arguments_is_mismatch() {
        let (conn, mut rx) = connection();
        let mut registry = Registry::new();
        registry
            .register(Command::new(["who", "w"], |_| Ok(Flow::Handled)))
            .unwrap();

        assert_eq!(run(&registry, &conn, "who is there"), Resolution::ArgumentMismatch);
        let lines = drain(&mut rx);
        assert_eq!(lines[0], "who or w:");
        assert_eq!(lines[1], super::super::DEFAULT_DESCRIPTION);
    }

    #[test]
    fn test_substitution_and_groups() {
        let (conn, _rx) = connection();
        let seen = Arc::new(parking_lot::Mutex::new(None));

        let mut registry = Registry::new().with_substitution('\'', "say");
        let slot = Arc::clone(&seen);
        registry
            .register(
                Command::new(["say"], move |caller| {
                    *slot.lock() = Some((caller.text().to_string(), caller.arg(0).map(str::to_string)));
                    Ok(Flow::Handled)
                })
                .with_pattern(r"(.+)$")
                .unwrap(),
            )
            .unwrap();

        assert_eq!(run(&registry, &conn, "'hello there"), Resolution::Handled);
        let (text, arg) = seen.lock().clone().unwrap();
        assert_eq!(text, "say hello there");
        assert_eq!(arg.as_deref(), Some("hello there"));
    }

    #[test]
    fn test_failure_calls_on_error_once_and_stops() {
        let (conn, mut rx) = connection();
        let errors = counter();
        let fallback = counter();

        let hits = Arc::clone(&errors);
        let mut registry = Registry::new().on_error(move |caller| {
            assert!(matches!(caller.error(), Some(HandlerError::InvalidArgument(_))));
            hits.fetch_add(1, Ordering::SeqCst);
        });
        registry
            .register(Command::new(["fail"], |_| {
                Err(HandlerError::InvalidArgument("nope".into()))
            }))
            .unwrap();
        let hits = Arc::clone(&fallback);
        registry
            .register(Command::new(["fail"], move |_| {
                hits.fetch_add(1, Ordering::SeqCst);
                Ok(Flow::Handled)
            }))
            .unwrap();

        assert_eq!(run(&registry, &conn, "fail"), Resolution::Failed);
        assert_eq!(errors.load(Ordering::SeqCst), 1);
        assert_eq!(fallback.load(Ordering::SeqCst), 0);
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_panic_is_contained() {
        let (conn, mut rx) = connection();
        let mut registry = Registry::new();
        registry
            .register(Command::new(["explode"], |_| panic!("kaboom")))
            .unwrap();
        registry
            .register(Command::new(["ping"], |caller| {
                caller.notify("pong");
                Ok(Flow::Handled)
            }))
            .unwrap();

        assert_eq!(run(&registry, &conn, "explode"), Resolution::Failed);
        assert_eq!(drain(&mut rx), [DEFAULT_ERROR_MESSAGE]);
        assert_eq!(run(&registry, &conn, "ping"), Resolution::Handled);
        assert_eq!(drain(&mut rx), ["pong"]);
    }

    #[test]
    fn test_panicking_predicate_reports_once() {
        let (conn, mut rx) = connection();
        let errors = counter();
        let fallback = counter();

        let hits = Arc::clone(&errors);
        let mut registry = Registry::new().on_error(move |caller| {
            assert!(matches!(caller.error(), Some(HandlerError::Panicked(_))));
            hits.fetch_add(1, Ordering::SeqCst);
        });
        registry
            .register(
                Command::new(["x"], |_| Ok(Flow::Handled))
                    .with_predicate(super::super::permissions::predicate(|_| panic!("gate"))),
            )
            .unwrap();
        let hits = Arc::clone(&fallback);
        registry
            .register(Command::new(["x"], move |_| {
                hits.fetch_add(1, Ordering::SeqCst);
                Ok(Flow::Handled)
            }))
            .unwrap();

        assert_eq!(run(&registry, &conn, "x"), Resolution::Failed);
        assert_eq!(errors.load(Ordering::SeqCst), 1);
        assert_eq!(fallback.load(Ordering::SeqCst), 0);
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_panicking_hooks_are_contained() {
        let (conn, mut rx) = connection();
        let registry = Registry::new()
            .pre_command(|caller| {
                assert!(!caller.text().starts_with('!'), "bang");
                true
            })
            .on_huh(|_| panic!("huh"))
            .post_command(|caller| {
                if caller.text() == "late" {
                    panic!("post");
                }
            })
            .on_error(|_| panic!("on_error"));

        assert_eq!(run(&registry, &conn, "!boom"), Resolution::Failed);
        assert_eq!(drain(&mut rx), [DEFAULT_ERROR_MESSAGE]);

        assert_eq!(run(&registry, &conn, "dance"), Resolution::NoMatch);
        assert_eq!(drain(&mut rx), [DEFAULT_ERROR_MESSAGE]);

        assert_eq!(run(&registry, &conn, "late"), Resolution::NoMatch);
        assert_eq!(drain(&mut rx), [DEFAULT_ERROR_MESSAGE, DEFAULT_ERROR_MESSAGE]);
    }

    #[test]
    fn test_continue_discards_requests() {
        let (conn, _rx) = connection();
        let hub = Hub::new();
        let mut registry = Registry::new();
        registry
            .register(Command::new(["go"], |caller| {
                caller.disconnect("declined");
                Ok(Flow::Continue)
            }))
            .unwrap();
        registry
            .register(Command::new(["go"], |caller| {
                caller.release();
                Ok(Flow::Handled)
            }))
            .unwrap();

        let mut caller = Caller::new(&conn, &hub, "go");
        assert_eq!(registry.handle_line(&mut caller, true), Resolution::Handled);
        let requests = caller.take_requests();
        assert_eq!(requests.len(), 1);
        assert!(matches!(requests[0], crate::commands::Request::Release));
    }

    #[test]
    fn test_unknown_command_and_suppressed_huh() {
        let (conn, mut rx) = connection();
        let hub = Hub::new();
        let registry = Registry::new().with_huh_message("What?");

        assert_eq!(run(&registry, &conn, "dance"), Resolution::NoMatch);
        assert_eq!(drain(&mut rx), ["What?"]);

        let mut caller = Caller::new(&conn, &hub, "dance");
        assert_eq!(registry.handle_line(&mut caller, false), Resolution::NoMatch);
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_pre_and_post_command() {
        let (conn, mut rx) = connection();
        let post = counter();
        let hits = Arc::clone(&post);
        let registry = Registry::new()
            .pre_command(|caller| !caller.text().starts_with('#'))
            .post_command(move |_| {
                hits.fetch_add(1, Ordering::SeqCst);
            });

        assert_eq!(run(&registry, &conn, "# comment"), Resolution::Dropped);
        assert!(drain(&mut rx).is_empty());
        assert_eq!(post.load(Ordering::SeqCst), 0);

        assert_eq!(run(&registry, &conn, "dance"), Resolution::NoMatch);
        assert_eq!(post.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_from_config() {
        let config = ParserConfig {
            separator: ":".to_string(),
            huh_message: "Eh?".to_string(),
            ..ParserConfig::default()
        };
        let registry = Registry::from_config(&config);
        assert_eq!(registry.split("say:hi"), ("say", "hi"));
        assert_eq!(registry.substitute("'hi"), "say:hi");
        assert_eq!(registry.substitute("hi"), "hi");
        assert_eq!(registry.substitute(""), "");
    }
}
