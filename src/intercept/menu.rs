//! Menu prompt.
//!
//! Items are addressed by 1-based number, by `$` for the last item, or by an
//! unambiguous case-insensitive prefix of their label. Ambiguous input is
//! never resolved by guessing.
//!
//! After a successful selection the menu goes away unless the item's action
//! calls [`Caller::keep_prompt`]. After invalid or ambiguous input a
//! persistent menu re-prompts; any other menu goes away.

use std::fmt;

use super::{Callback, Feed, Step};
use crate::commands::Caller;
use crate::error::PromptResult;
use crate::state::Connection;

pub const DEFAULT_MENU_PROMPT: &str = "Type a number or @abort to abort.";

type NoMatchHook = Box<dyn FnMut(&mut Caller<'_>) + Send>;
type MultipleMatchHook = Box<dyn FnMut(&mut Caller<'_>, &[&MenuItem]) + Send>;

pub struct MenuItem {
    label: String,
    action: Callback,
}

impl MenuItem {
    pub fn new<F>(label: impl Into<String>, action: F) -> Self
    where
        F: FnMut(&mut Caller<'_>) -> PromptResult + Send + 'static,
    {
        Self {
            label: label.into(),
            action: Box::new(action),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl fmt::Debug for MenuItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MenuItem").field("label", &self.label).finish()
    }
}

/// Where a label is rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelPosition {
    /// Before the first item.
    Top,
    /// Immediately after the item with this label.
    After(String),
}

/// A presentational line between items. Labels are never selectable.
#[derive(Debug, Clone)]
pub struct MenuLabel {
    pub text: String,
    pub position: LabelPosition,
}

/// Result of resolving input against a menu's items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Index into the items.
    Item(usize),
    NoMatch,
    /// Indices of every item the input matched.
    Ambiguous(Vec<usize>),
}

pub struct Menu {
    title: String,
    items: Vec<MenuItem>,
    labels: Vec<MenuLabel>,
    prompt: Option<String>,
    no_matches: Option<NoMatchHook>,
    multiple_matches: Option<MultipleMatchHook>,
}

impl Menu {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            items: Vec::new(),
            labels: Vec::new(),
            prompt: None,
            no_matches: None,
            multiple_matches: None,
        }
    }

    pub fn item<F>(mut self, label: impl Into<String>, action: F) -> Self
    where
        F: FnMut(&mut Caller<'_>) -> PromptResult + Send + 'static,
    {
        self.add_item(MenuItem::new(label, action));
        self
    }

    pub fn add_item(&mut self, item: MenuItem) {
        self.items.push(item);
    }

    pub fn label(mut self, text: impl Into<String>, position: LabelPosition) -> Self {
        self.add_label(text, position);
        self
    }

    pub fn add_label(&mut self, text: impl Into<String>, position: LabelPosition) {
        self.labels.push(MenuLabel {
            text: text.into(),
            position,
        });
    }

    /// Line sent after the items. Defaults to a hint naming the abort command.
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    /// Replace the response to input that matches no item.
    pub fn on_no_matches<F>(mut self, f: F) -> Self
    where
        F: FnMut(&mut Caller<'_>) + Send + 'static,
    {
        self.no_matches = Some(Box::new(f));
        self
    }

    /// Replace the response to input that matches several items.
    pub fn on_multiple_matches<F>(mut self, f: F) -> Self
    where
        F: FnMut(&mut Caller<'_>, &[&MenuItem]) + Send + 'static,
    {
        self.multiple_matches = Some(Box::new(f));
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn items(&self) -> &[MenuItem] {
        &self.items
    }

    pub fn labels(&self) -> &[MenuLabel] {
        &self.labels
    }

    /// Resolve `text` to an item without running anything.
    pub fn select(&self, text: &str) -> Selection {
        let text = text.trim().to_lowercase();
        if self.items.is_empty() {
            return Selection::NoMatch;
        }
        if text == "$" {
            return Selection::Item(self.items.len() - 1);
        }
        if let Ok(number) = text.parse::<i64>() {
            return match usize::try_from(number) {
                Ok(n) if (1..=self.items.len()).contains(&n) => Selection::Item(n - 1),
                _ => Selection::NoMatch,
            };
        }

        let matches: Vec<usize> = self
            .items
            .iter()
            .enumerate()
            .filter(|(_, item)| item.label.to_lowercase().starts_with(&text))
            .map(|(index, _)| index)
            .collect();
        match matches.as_slice() {
            [] => Selection::NoMatch,
            [only] => Selection::Item(*only),
            _ => Selection::Ambiguous(matches),
        }
    }

    fn send_item(&self, connection: &Connection, index: usize) {
        connection.notify(format!("[{}] {}", index + 1, self.items[index].label));
    }

    fn send_prompt(&self, connection: &Connection, abort: Option<&str>) {
        match (&self.prompt, abort) {
            (Some(prompt), _) => connection.notify(prompt.as_str()),
            (None, Some(cmd)) => connection.notify(format!("Type a number or {cmd} to abort.")),
            (None, None) => connection.notify("Type a number."),
        }
    }

    fn send_labels(&self, connection: &Connection, position: &LabelPosition) {
        for label in self.labels.iter().filter(|l| &l.position == position) {
            connection.notify(label.text.as_str());
        }
    }

    pub(crate) fn explain(&mut self, connection: &Connection, abort: Option<&str>) {
        connection.notify(self.title.as_str());
        self.send_labels(connection, &LabelPosition::Top);
        for index in 0..self.items.len() {
            self.send_item(connection, index);
            self.send_labels(connection, &LabelPosition::After(self.items[index].label.clone()));
        }
        self.send_prompt(connection, abort);
    }

    pub(crate) fn feed(&mut self, caller: &mut Caller<'_>, feed: &Feed<'_>) -> Step {
        match self.select(caller.text()) {
            Selection::Item(index) => {
                feed.run(&mut self.items[index].action, caller);
                if caller.kept_prompt() {
                    // A nested prompt takes the screen; the menu is shown
                    // again when it is restored.
                    if !caller.intercept_pending() {
                        self.explain(caller.connection(), feed.abort);
                    }
                    Step::Stay
                } else {
                    Step::Done
                }
            }
            Selection::NoMatch => {
                match &mut self.no_matches {
                    Some(hook) => feed.hook(caller, |caller| hook(caller)),
                    None => {
                        caller.notify("Invalid selection.");
                        if feed.persistent {
                            self.explain(caller.connection(), feed.abort);
                        }
                    }
                }
                Self::after_invalid(feed)
            }
            Selection::Ambiguous(indices) => {
                match &mut self.multiple_matches {
                    Some(hook) => {
                        let matched: Vec<&MenuItem> =
                            indices.iter().map(|&i| &self.items[i]).collect();
                        feed.hook(caller, |caller| hook(caller, &matched));
                    }
                    None => {
                        caller.notify("That matched multiple items:");
                        for &index in &indices {
                            self.send_item(caller.connection(), index);
                        }
                        if feed.persistent {
                            self.send_prompt(caller.connection(), feed.abort);
                        }
                    }
                }
                Self::after_invalid(feed)
            }
        }
    }

    fn after_invalid(feed: &Feed<'_>) -> Step {
        if feed.persistent { Step::Stay } else { Step::Done }
    }
}

impl fmt::Debug for Menu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Menu")
            .field("title", &self.title)
            .field("items", &self.items)
            .field("labels", &self.labels)
            .finish_non_exhaustive()
    }
}
