#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlashCommand {
    Clear,
    SetKey(String),
    SetPrompt(String),
    Settings,
    Cancel,
    Help,
    Quit,
    MissingArgument(&'static str),
    Unknown(String),
}

impl SlashCommand {
    /// Parses input starting with `/`. Anything else is a chat message and yields `None`.
    pub fn parse(input: &str) -> Option<SlashCommand> {
        let input = input.trim();
        if !input.starts_with('/') {
            return None;
        }

        let (name, rest) = match input.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (input, ""),
        };

        let command = match name {
            "/clear" => SlashCommand::Clear,
            "/key" if rest.is_empty() => SlashCommand::MissingArgument("/key <API_KEY>"),
            "/key" => SlashCommand::SetKey(rest.to_string()),
            "/prompt" if rest.is_empty() => SlashCommand::MissingArgument("/prompt <TEXT>"),
            "/prompt" => SlashCommand::SetPrompt(rest.to_string()),
            "/settings" => SlashCommand::Settings,
            "/cancel" => SlashCommand::Cancel,
            "/help" | "/h" => SlashCommand::Help,
            "/quit" | "/exit" | "/q" => SlashCommand::Quit,
            other => SlashCommand::Unknown(other.to_string()),
        };

        Some(command)
    }
}

pub fn help_text() -> String {
    let text = r#"
COMMANDS:
- /clear - Removes every message from the current conversation.
- /key [API_KEY] - Saves your OpenAI API key. It is stored locally, unencrypted.
- /prompt [TEXT] - Saves the system prompt used for every request.
- /settings - Shows the current settings. The API key is masked.
- /cancel - Cancels the pending request, if any.
- /quit /exit (/q) - Exit.
- /help (/h) - Provides this help menu.

HOTKEYS:
- CTRL+C - Cancel the pending request if one is in progress, otherwise exit.
        "#;

    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_not_a_command() {
        assert_eq!(SlashCommand::parse("hello /clear"), None);
        assert_eq!(SlashCommand::parse(""), None);
    }

    #[test]
    fn test_commands_with_arguments() {
        assert_eq!(
            SlashCommand::parse("/key   sk-abc "),
            Some(SlashCommand::SetKey("sk-abc".to_string()))
        );
        assert_eq!(
            SlashCommand::parse("/prompt Be nice to people."),
            Some(SlashCommand::SetPrompt("Be nice to people.".to_string()))
        );
        assert_eq!(
            SlashCommand::parse("/key"),
            Some(SlashCommand::MissingArgument("/key <API_KEY>"))
        );
    }

    #[test]
    fn test_aliases_and_unknown() {
        assert_eq!(SlashCommand::parse("/q"), Some(SlashCommand::Quit));
        assert_eq!(SlashCommand::parse("/exit"), Some(SlashCommand::Quit));
        assert_eq!(SlashCommand::parse(" /clear "), Some(SlashCommand::Clear));
        assert_eq!(
            SlashCommand::parse("/frobnicate now"),
            Some(SlashCommand::Unknown("/frobnicate".to_string()))
        );
    }
}
