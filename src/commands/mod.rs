//! Chat command registration and parsing.
//!
//! A message is a command when it starts with the configured prefix directly
//! followed by a registered alias, e.g. `!sub` or `!unsubscribe now`.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Subscribe,
    Unsubscribe,
}

impl Command {
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            Command::Subscribe => &["sub", "subscribe"],
            Command::Unsubscribe => &["unsub", "unsubscribe"],
        }
    }
}

#[derive(Debug, Clone)]
pub struct CommandRegistry {
    prefix: String,
    aliases: HashMap<String, Command>,
}

impl CommandRegistry {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            aliases: HashMap::new(),
        }
    }

    /// Registry with the subscribe and unsubscribe commands under their aliases.
    pub fn with_default_commands(prefix: impl Into<String>) -> Self {
        let mut registry = Self::new(prefix);
        for command in [Command::Subscribe, Command::Unsubscribe] {
            registry.register(command, command.aliases());
        }
        registry
    }

    /// Register `command` under each alias. A later registration of the same
    /// alias replaces the earlier one.
    pub fn register(&mut self, command: Command, aliases: &[&str]) {
        for alias in aliases {
            self.aliases.insert(alias.to_lowercase(), command);
        }
    }

    pub fn parse(&self, body: &str) -> Option<Command> {
        let rest = body.trim_start().strip_prefix(self.prefix.as_str())?;
        let word = rest.split_whitespace().next()?;
        // "! sub" is not a command
        if !rest.starts_with(word) {
            return None;
        }
        self.aliases.get(&word.to_lowercase()).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> CommandRegistry {
        CommandRegistry::with_default_commands("!")
    }

    #[test]
    fn test_parse_aliases() {
        let registry = registry();
        assert_eq!(registry.parse("!sub"), Some(Command::Subscribe));
        assert_eq!(registry.parse("!subscribe"), Some(Command::Subscribe));
        assert_eq!(registry.parse("!unsub"), Some(Command::Unsubscribe));
        assert_eq!(registry.parse("!unsubscribe"), Some(Command::Unsubscribe));
    }

    #[test]
    fn test_parse_ignores_case_and_arguments() {
        let registry = registry();
        assert_eq!(registry.parse("  !SUB please"), Some(Command::Subscribe));
        assert_eq!(registry.parse("!Unsub\tnow"), Some(Command::Unsubscribe));
    }

    #[test]
    fn test_parse_rejects_non_commands() {
        let registry = registry();
        assert_eq!(registry.parse("sub"), None);
        assert_eq!(registry.parse("! sub"), None);
        assert_eq!(registry.parse("!"), None);
        assert_eq!(registry.parse("!subscribed"), None);
        assert_eq!(registry.parse("hello !sub"), None);
    }

    #[test]
    fn test_custom_prefix() {
        let registry = CommandRegistry::with_default_commands("fefe:");
        assert_eq!(registry.parse("fefe:sub"), Some(Command::Subscribe));
        assert_eq!(registry.parse("!sub"), None);
    }

    #[test]
    fn test_register_extra_alias() {
        let mut registry = registry();
        registry.register(Command::Subscribe, &["Follow"]);
        assert_eq!(registry.parse("!follow"), Some(Command::Subscribe));
    }
}
