//! Line reader prompt.
//!
//! Single-line readers complete on the first line. Multiline readers collect
//! lines until one equals the done marker (default `.`), then complete with the
//! joined buffer. The marker itself is never added to the buffer.

use std::fmt;

use super::{Callback, Feed, Notice, Step};
use crate::commands::Caller;
use crate::error::PromptResult;
use crate::state::Connection;

pub struct Reader {
    buffer: String,
    lines: usize,
    multiline: bool,
    done_marker: String,
    separator: String,
    on_done: Callback,
    prompt: Option<Notice>,
    before_line: Option<Notice>,
    after_line: Option<Notice>,
}

impl Reader {
    /// Create a single-line reader that calls `on_done` with the line as
    /// `caller.text()`.
    pub fn new<F>(on_done: F) -> Self
    where
        F: FnMut(&mut Caller<'_>) -> PromptResult + Send + 'static,
    {
        Self {
            buffer: String::new(),
            lines: 0,
            multiline: false,
            done_marker: ".".to_string(),
            separator: "\n".to_string(),
            on_done: Box::new(on_done),
            prompt: None,
            before_line: None,
            after_line: None,
        }
    }

    /// Collect lines until the done marker; `on_done` receives the joined buffer.
    pub fn multiline(mut self) -> Self {
        self.multiline = true;
        self
    }

    pub fn with_done_marker(mut self, marker: impl Into<String>) -> Self {
        self.done_marker = marker.into();
        self
    }

    /// String placed between collected lines (default newline).
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    pub fn with_prompt(mut self, prompt: impl Into<Notice>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    /// Sent before each line is read, including the first.
    pub fn before_line(mut self, notice: impl Into<Notice>) -> Self {
        self.before_line = Some(notice.into());
        self
    }

    /// Sent after each collected line.
    pub fn after_line(mut self, notice: impl Into<Notice>) -> Self {
        self.after_line = Some(notice.into());
        self
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn is_multiline(&self) -> bool {
        self.multiline
    }

    pub(crate) fn reset(&mut self) {
        self.buffer.clear();
        self.lines = 0;
    }

    pub(crate) fn explain(&mut self, connection: &Connection, abort: Option<&str>) {
        match &mut self.prompt {
            Some(prompt) => prompt.send(connection, &self.buffer),
            None => {
                let hint = abort.map(|cmd| format!(" or {cmd} to abort")).unwrap_or_default();
                if self.multiline {
                    connection.notify(format!(
                        "Enter lines of text. Type a full stop ({}) on a blank line to finish{hint}.",
                        self.done_marker
                    ));
                } else {
                    connection.notify(format!("Enter a line of text{hint}."));
                }
            }
        }
        if let Some(notice) = &mut self.before_line {
            notice.send(connection, &self.buffer);
        }
    }

    pub(crate) fn feed(&mut self, caller: &mut Caller<'_>, feed: &Feed<'_>) -> Step {
        if self.multiline && caller.text() == self.done_marker {
            caller.set_text(self.buffer.as_str());
            feed.run(&mut self.on_done, caller);
            return Step::Done;
        }

        if self.lines > 0 {
            self.buffer.push_str(&self.separator);
        }
        self.buffer.push_str(caller.text());
        self.lines += 1;

        if let Some(notice) = &mut self.after_line {
            feed.notice(notice, caller, &self.buffer);
        }

        if self.multiline {
            if let Some(notice) = &mut self.before_line {
                feed.notice(notice, caller, &self.buffer);
            }
            Step::Stay
        } else {
            caller.set_text(self.buffer.as_str());
            feed.run(&mut self.on_done, caller);
            Step::Done
        }
    }
}

impl fmt::Debug for Reader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reader")
            .field("buffer", &self.buffer)
            .field("multiline", &self.multiline)
            .field("done_marker", &self.done_marker)
            .finish_non_exhaustive()
    }
}
