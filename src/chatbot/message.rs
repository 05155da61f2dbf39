//! Inbound message types and doubt intake.

use serde::Deserialize;
use teloxide::types::Message;

/// How doubts arrive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntakeMode {
    /// Every plain text message is a doubt.
    #[default]
    AnyText,
    /// Only `/ask <doubt>` is a doubt.
    Command,
}

/// A student's doubt with sender metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingDoubt {
    pub chat_id: i64,
    pub user_id: i64,
    /// Display name (first + last name).
    pub sender_name: String,
    /// Raw doubt text, untrimmed.
    pub text: String,
}

impl IncomingDoubt {
    /// Build from a Telegram message and the already-extracted doubt text.
    pub fn from_telegram(msg: &Message, text: &str) -> Self {
        let user = msg.from.as_ref();
        Self {
            chat_id: msg.chat.id.0,
            user_id: user.map(|u| u.id.0 as i64).unwrap_or(0),
            sender_name: user
                .map(|u| u.full_name())
                .unwrap_or_else(|| "unknown".to_string()),
            text: text.to_string(),
        }
    }
}

/// What an inbound text means to the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intake<'a> {
    /// Text to answer (may be empty, e.g. a bare `/ask`).
    Doubt(&'a str),
    /// `/start`: explain how to ask.
    Start,
    /// Not for us.
    Skip,
}

/// Classify a message text under the given intake mode.
///
/// `/ask` and `/start` are commands in both modes; `/ask@SomeBot` is treated
/// like `/ask`. In `AnyText` mode any other slash-led text (`/r/ vs /l/`,
/// `/help`) is still a doubt.
pub fn parse_intake(text: &str, mode: IntakeMode) -> Intake<'_> {
    let trimmed = text.trim_start();
    let Some(command_text) = trimmed.strip_prefix('/') else {
        return match mode {
            IntakeMode::AnyText => Intake::Doubt(text),
            IntakeMode::Command => Intake::Skip,
        };
    };

    let (head, rest) = command_text
        .split_once(char::is_whitespace)
        .unwrap_or((command_text, ""));
    let name = head.split('@').next().unwrap_or(head).to_lowercase();

    match (name.as_str(), mode) {
        ("ask", _) => Intake::Doubt(rest),
        ("start", _) => Intake::Start,
        (_, IntakeMode::AnyText) => Intake::Doubt(text),
        (_, IntakeMode::Command) => Intake::Skip,
    }
}
