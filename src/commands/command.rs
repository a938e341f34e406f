//! Command definition.

use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::Caller;
use super::permissions::{self, Predicate};
use crate::error::{HandlerResult, Outcome, RegistryError, contain};

pub const DEFAULT_DESCRIPTION: &str = "No description available.";
pub const DEFAULT_HELP: &str = "No help available.";

/// A command handler.
pub type Handler = Arc<dyn Fn(&mut Caller<'_>) -> HandlerResult + Send + Sync>;

/// One registration: names, argument pattern, permission check, help and handler.
///
/// Immutable once registered; the registry hands out `Arc<Command>`s.
pub struct Command {
    names: Vec<String>,
    pattern: Option<Regex>,
    allowed: Predicate,
    description: String,
    help: String,
    handler: Handler,
}

impl Command {
    /// Create a command answering to `names` that takes no arguments.
    pub fn new<N, S, F>(names: N, handler: F) -> Self
    where
        N: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&mut Caller<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        let mut unique: Vec<String> = Vec::new();
        for name in names {
            let name = name.into();
            if !name.is_empty() && !unique.contains(&name) {
                unique.push(name);
            }
        }

        Self {
            names: unique,
            pattern: None,
            allowed: permissions::anyone(),
            description: DEFAULT_DESCRIPTION.to_string(),
            help: DEFAULT_HELP.to_string(),
            handler: Arc::new(handler),
        }
    }

    /// Match the remainder of the line against `pattern`.
    ///
    /// The pattern is anchored at the start of the remainder; add `$` to
    /// anchor the end.
    pub fn with_pattern(mut self, pattern: &str) -> Result<Self, RegistryError> {
        let regex = Regex::new(&format!("^(?:{pattern})")).map_err(|source| {
            RegistryError::InvalidPattern {
                name: self.name().to_string(),
                source,
            }
        })?;
        self.pattern = Some(regex);
        Ok(self)
    }

    pub fn with_predicate(mut self, allowed: Predicate) -> Self {
        self.allowed = allowed;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = help.into();
        self
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// The primary (first) name.
    pub fn name(&self) -> &str {
        self.names.first().map(String::as_str).unwrap_or_default()
    }

    pub fn pattern(&self) -> Option<&Regex> {
        self.pattern.as_ref()
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn help(&self) -> &str {
        &self.help
    }

    pub fn allowed(&self, caller: &Caller<'_>) -> bool {
        (self.allowed)(caller)
    }

    /// Match the remainder of a line against this command's arguments.
    ///
    /// Without a pattern only a blank remainder is accepted.
    pub(crate) fn match_args(&self, rest: &str) -> Option<(Vec<String>, HashMap<String, String>)> {
        let Some(pattern) = &self.pattern else {
            return rest.trim().is_empty().then(Default::default);
        };

        let captures = pattern.captures(rest)?;
        let args = captures
            .iter()
            .skip(1)
            .map(|group| group.map_or_else(String::new, |m| m.as_str().to_string()))
            .collect();
        let kwargs = pattern
            .capture_names()
            .flatten()
            .filter_map(|name| {
                captures
                    .name(name)
                    .map(|m| (name.to_string(), m.as_str().to_string()))
            })
            .collect();
        Some((args, kwargs))
    }

    /// Run the handler, turning a panic into a
    /// [`HandlerError::Panicked`](crate::error::HandlerError::Panicked).
    pub(crate) fn invoke(&self, caller: &mut Caller<'_>) -> Outcome {
        Outcome::from(contain(|| (self.handler)(caller)).and_then(|result| result))
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("names", &self.names)
            .field("pattern", &self.pattern.as_ref().map(Regex::as_str))
            .finish_non_exhaustive()
    }
}
