use std::str::FromStr;

use strum::{AsRefStr, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

/// Commands that can be invoked by starting a message with a leading slash.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, EnumIter, AsRefStr, IntoStaticStr,
)]
#[strum(serialize_all = "kebab-case")]
pub enum SlashCommand {
    /// Show help
    Help,
    /// Exit the application
    Bye,
}

pub fn command_entries() -> Vec<CommandEntry> {
    SlashCommand::iter()
        .map(|command| CommandEntry {
            command,
            keyword: command.command(),
            description: command.description(),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub command: SlashCommand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandEntry {
    pub command: SlashCommand,
    pub keyword: &'static str,
    pub description: &'static str,
}

impl SlashCommand {
    /// User-visible description shown in help.
    pub fn description(self) -> &'static str {
        match self {
            SlashCommand::Help => "사용할 수 있는 명령어 보기",
            SlashCommand::Bye => "친구봇 끝내기",
        }
    }

    /// Command string without the leading '/'.
    pub fn command(self) -> &'static str {
        self.into()
    }
}

/// Parse a slash command from user input
pub fn parse_slash_command(input: &str) -> Option<ParsedCommand> {
    let rest = input.trim().strip_prefix('/')?;

    // trailing words are ignored; no command takes an argument
    let head = rest.split_whitespace().next()?.to_lowercase();

    let command = SlashCommand::from_str(&head).ok().or_else(|| match head.as_str() {
        "q" | "quit" | "exit" => Some(SlashCommand::Bye),
        "h" | "?" => Some(SlashCommand::Help),
        _ => None,
    })?;

    Some(ParsedCommand { command })
}

/// Get help text for all available commands
pub fn get_help_text() -> String {
    let mut help = String::from("명령어:\n");
    for entry in command_entries() {
        help.push_str(&format!("/{} - {}\n", entry.keyword, entry.description));
    }
    help.push_str("/q, /quit, /exit 도 /bye 처럼 동작해. Enter로 보내고 Shift+Enter로 줄바꿈, Ctrl+C로 종료.");
    help
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_commands_and_aliases() {
        assert_eq!(parse_slash_command("/help").unwrap().command, SlashCommand::Help);
        assert_eq!(parse_slash_command("/bye").unwrap().command, SlashCommand::Bye);
        assert_eq!(parse_slash_command("/Q").unwrap().command, SlashCommand::Bye);
        assert_eq!(parse_slash_command("  /exit  ").unwrap().command, SlashCommand::Bye);
    }

    #[test]
    fn test_parse_ignores_trailing_words() {
        let parsed = parse_slash_command("/help me please").unwrap();
        assert_eq!(parsed, ParsedCommand { command: SlashCommand::Help });
    }

    #[test]
    fn test_plain_text_and_unknown_commands_are_not_commands() {
        assert!(parse_slash_command("안녕 /help").is_none());
        assert!(parse_slash_command("/unknown").is_none());
        assert!(parse_slash_command("/").is_none());
    }

    #[test]
    fn test_help_lists_every_command() {
        let help = get_help_text();
        for entry in command_entries() {
            assert!(help.contains(&format!("/{}", entry.keyword)));
        }
    }
}
