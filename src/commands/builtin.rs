//! Built-in chat room commands.
//!
//! Every interceptor gets used here: `help` opens a menu, `name` and `post`
//! read text, `quit` asks for confirmation.

use tracing::info;

use super::{Caller, Command, Registry};
use crate::config::ParserConfig;
use crate::error::{Flow, HandlerError, HandlerResult, PromptResult, RegistryError};
use crate::intercept::{Menu, MenuItem, Reader, YesOrNo};
use crate::network::Hooks;
use crate::state::{Connection, Hub};

/// Build a registry holding the built-in commands.
pub fn registry(config: &ParserConfig) -> Result<Registry, RegistryError> {
    let mut registry = Registry::from_config(config);

    registry.register(
        Command::new(["help", "commands", "?"], help)
            .with_pattern(r"\s*(?P<topic>\S*)\s*$")?
            .with_description("Show every command, or explain one.")
            .with_help("help [command]"),
    )?;
    registry.register(
        Command::new(["who"], who).with_description("List everyone who is connected."),
    )?;
    registry.register(
        Command::new(["say"], say)
            .with_pattern(r"(?P<text>.+)$")?
            .with_description("Say something to everyone.")
            .with_help("say <text>"),
    )?;
    registry.register(
        Command::new(["emote", "me"], emote)
            .with_pattern(r"(?P<text>.+)$")?
            .with_description("Show everyone what you are doing.")
            .with_help("emote <action>"),
    )?;
    registry.register(
        Command::new(["name", "nick"], name)
            .with_pattern(r"\s*(?P<name>.*?)\s*$")?
            .with_description("Change the name everyone sees.")
            .with_help("name [new name]"),
    )?;
    registry.register(
        Command::new(["post"], post).with_description("Write several lines and share them."),
    )?;
    registry.register(
        Command::new(["quit", "exit"], quit).with_description("Disconnect from the server."),
    )?;

    Ok(registry)
}

fn help(caller: &mut Caller<'_>) -> HandlerResult {
    let Some(registry) = caller.registry() else {
        return Err(HandlerError::Internal("help invoked without a registry".into()));
    };

    let topic = caller.named("topic").unwrap_or_default();
    if !topic.is_empty() {
        match registry.lookup(topic).first() {
            Some(command) => registry.explain(command, caller.connection()),
            None => caller.notify("No such command."),
        }
        return Ok(Flow::Handled);
    }

    let commands = registry.all_commands();
    let mut menu = Menu::new(format!("Showing help for {} commands.", commands.len()));
    for command in commands {
        let lines = registry.explanation(command);
        menu.add_item(MenuItem::new(command.names().join(" or "), move |caller| {
            for line in &lines {
                caller.notify(line);
            }
            Ok(())
        }));
    }
    caller.intercept(menu);
    Ok(Flow::Handled)
}

fn who(caller: &mut Caller<'_>) -> HandlerResult {
    let connections = caller.hub().connections();
    caller.notify(format!("Connected ({}):", connections.len()));
    for connection in connections {
        caller.notify(format!("  {}", connection.name()));
    }
    Ok(Flow::Handled)
}

fn say(caller: &mut Caller<'_>) -> HandlerResult {
    let text = caller.named("text").unwrap_or_default();
    caller.broadcast(format!("{}: {}", caller.connection().name(), text));
    Ok(Flow::Handled)
}

fn emote(caller: &mut Caller<'_>) -> HandlerResult {
    let text = caller.named("text").unwrap_or_default();
    caller.broadcast(format!("{} {}", caller.connection().name(), text));
    Ok(Flow::Handled)
}

fn name(caller: &mut Caller<'_>) -> HandlerResult {
    let requested = caller.named("name").unwrap_or_default().to_string();
    if requested.is_empty() {
        caller.intercept(
            Reader::new(|caller| {
                let requested = caller.text().trim().to_string();
                rename(caller, &requested)
            })
            .with_prompt("What would you like to be called?"),
        );
    } else {
        rename(caller, &requested)?;
    }
    Ok(Flow::Handled)
}

fn rename(caller: &mut Caller<'_>, requested: &str) -> PromptResult {
    if requested.is_empty() {
        caller.notify("Names cannot be blank.");
        return Ok(());
    }

    let connection = caller.connection();
    if let Some(holder) = caller.hub().find_by_name(requested)
        && !holder.same(connection)
    {
        caller.notify("That name is already taken.");
        return Ok(());
    }

    let old = connection.name();
    connection.set_name(requested);
    info!(conn = %connection.id(), %old, new = %requested, "Name changed");
    caller.broadcast(format!("{old} is now known as {requested}."));
    Ok(())
}

fn post(caller: &mut Caller<'_>) -> HandlerResult {
    caller.intercept(
        Reader::new(|caller| {
            if caller.text().trim().is_empty() {
                caller.notify("Nothing to post.");
            } else {
                caller.broadcast(format!(
                    "{} posts:\n{}",
                    caller.connection().name(),
                    caller.text()
                ));
            }
            Ok(())
        })
        .multiline(),
    );
    Ok(Flow::Handled)
}

fn quit(caller: &mut Caller<'_>) -> HandlerResult {
    caller.intercept(YesOrNo::new("Are you sure you want to quit?", |caller| {
        caller.notify("Goodbye.");
        caller.disconnect("Quit");
        Ok(())
    }));
    Ok(Flow::Handled)
}

/// Connection hooks for the chat room: join and leave announcements.
#[derive(Debug, Default, Clone, Copy)]
pub struct Lobby;

impl Hooks for Lobby {
    fn on_start(&self, _hub: &Hub) {
        info!("Chat room open");
    }

    fn on_stop(&self, hub: &Hub) {
        let told = hub.broadcast("The chat room is closing.");
        info!(clients = told, "Chat room closed");
    }

    fn on_connect(&self, caller: &mut Caller<'_>) {
        caller.broadcast(format!("{} has connected.", caller.connection().name()));
    }

    fn on_disconnect(&self, connection: &Connection, hub: &Hub, _reason: &str) {
        hub.broadcast(format!("{} has disconnected.", connection.name()));
    }
}
