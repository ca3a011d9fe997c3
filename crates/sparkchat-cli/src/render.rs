//! Plain-text rendering for the terminal.

use chrono::Local;
use sparkchat_core::{ChatMessage, Credentials, Notification, NotificationLevel, Role};

pub fn format_message(message: &ChatMessage) -> String {
    let time = message.created_at().with_timezone(&Local).format("%H:%M");
    let author = match message.role() {
        Role::User => "You",
        Role::Assistant => "Assistant",
    };
    format!("[{}] {}: {}", time, author, message.content())
}

pub fn format_notification(notification: &Notification) -> String {
    let marker = match notification.level {
        NotificationLevel::Info => "*",
        NotificationLevel::Error => "!",
    };
    format!(
        "{} {}: {}",
        marker, notification.title, notification.description
    )
}

pub fn header(message_count: usize, has_api_key: bool) -> String {
    let mut text = format!("Spark Chat ({} messages)", message_count);
    if !has_api_key {
        text.push_str(" [No API Key]");
    }
    text
}

pub fn waiting() -> &'static str {
    "  Assistant is typing..."
}

pub fn welcome(has_api_key: bool) -> String {
    let mut text = "Ready to Chat! Ask questions, get help with tasks, or just chat. Type /help for commands.".to_string();
    if !has_api_key {
        text.push_str("\nAdd your OpenAI API key with /key <API_KEY> to start chatting.");
    }
    text
}

pub fn settings(credentials: &Credentials, api_base: &str) -> String {
    format!(
        "API key: {}\nSystem prompt: {}\nAPI base: {}",
        credentials.masked_api_key(),
        credentials.system_prompt,
        api_base
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_flags_missing_key() {
        assert_eq!(header(0, false), "Spark Chat (0 messages) [No API Key]");
        assert_eq!(header(3, true), "Spark Chat (3 messages)");
    }

    #[test]
    fn test_notification_markers() {
        let error = Notification::error("Error", "boom");
        assert_eq!(format_notification(&error), "! Error: boom");

        let info = Notification::info("Chat Cleared", "All messages have been removed.");
        assert_eq!(
            format_notification(&info),
            "* Chat Cleared: All messages have been removed."
        );
    }

    #[test]
    fn test_settings_masks_key() {
        let creds = Credentials {
            api_key: "sk-verysecret".to_string(),
            system_prompt: "Be brief.".to_string(),
        };
        let text = settings(&creds, "https://api.openai.com/v1");
        assert!(!text.contains("verysecret"));
        assert!(text.contains("cret"));
        assert!(text.contains("Be brief."));
    }
}
