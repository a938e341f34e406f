//! Yes/no confirmation prompt.
//!
//! Any answer starting with `y` (any case) is yes; everything else, including
//! garbage, is no. There is no "please answer yes or no" loop.

use std::fmt;

use super::{Callback, Feed};
use crate::commands::Caller;
use crate::error::PromptResult;
use crate::state::Connection;

pub const DEFAULT_NO_MESSAGE: &str = "Cancelled.";

pub struct YesOrNo {
    question: String,
    on_yes: Callback,
    on_no: Option<Callback>,
}

impl YesOrNo {
    pub fn new<F>(question: impl Into<String>, on_yes: F) -> Self
    where
        F: FnMut(&mut Caller<'_>) -> PromptResult + Send + 'static,
    {
        Self {
            question: question.into(),
            on_yes: Box::new(on_yes),
            on_no: None,
        }
    }

    /// Replace the default "Cancelled." response to a no.
    pub fn on_no<F>(mut self, f: F) -> Self
    where
        F: FnMut(&mut Caller<'_>) -> PromptResult + Send + 'static,
    {
        self.on_no = Some(Box::new(f));
        self
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn is_yes(answer: &str) -> bool {
        answer
            .trim_start()
            .chars()
            .next()
            .is_some_and(|c| c.eq_ignore_ascii_case(&'y'))
    }

    pub(crate) fn explain(&mut self, connection: &Connection) {
        connection.notify(self.question.as_str());
    }

    pub(crate) fn feed(&mut self, caller: &mut Caller<'_>, feed: &Feed<'_>) {
        if Self::is_yes(caller.text()) {
            feed.run(&mut self.on_yes, caller);
        } else {
            match &mut self.on_no {
                Some(on_no) => feed.run(on_no, caller),
                None => caller.notify(DEFAULT_NO_MESSAGE),
            }
        }
    }
}

impl fmt::Debug for YesOrNo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("YesOrNo")
            .field("question", &self.question)
            .finish_non_exhaustive()
    }
}
