//! Help texts shared by the in-game chat and the chat platform.

use blockpilot_core::command::CommandRegistry;

/// `help` with no name lists every command; with a name, describes it.
pub fn help_text(registry: &CommandRegistry, name: Option<&str>) -> String {
    match name.map(str::trim).filter(|n| !n.is_empty()) {
        None => format!("Commands: {}", registry.names().join(", ")),
        Some(name) => match registry.get(name) {
            Some(command) => format!(
                "Usage: {} | Description: {}",
                command.usage(),
                command.description()
            ),
            None => format!("Command '{name}' not found."),
        },
    }
}

/// Answer an in-game chat line, if it asks for help.
///
/// Only `{prefix}help` and `{prefix}help <name>` are recognised; anything
/// else yields `None`.
pub fn chat_help(registry: &CommandRegistry, prefix: &str, message: &str) -> Option<String> {
    let rest = message.strip_prefix(prefix)?.strip_prefix("help")?;
    if rest.is_empty() {
        return Some(help_text(registry, None));
    }
    let name = rest.strip_prefix(' ')?;
    Some(help_text(registry, Some(name)))
}
