//! Telegram client using teloxide.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::InputFile;
use tracing::info;

/// Outbound side of the chat platform.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), DeliveryError>;
    async fn send_audio(&self, chat_id: i64, path: &Path) -> Result<(), DeliveryError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// The platform refused or failed the request.
    Rejected(String),
    Timeout(Duration),
}

impl std::fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryError::Rejected(e) => write!(f, "send rejected: {e}"),
            DeliveryError::Timeout(d) => write!(f, "send timed out after {}s", d.as_secs_f32()),
        }
    }
}

impl std::error::Error for DeliveryError {}

/// Telegram API client.
pub struct TelegramClient {
    bot: Bot,
}

impl TelegramClient {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Messenger for TelegramClient {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), DeliveryError> {
        self.bot
            .send_message(ChatId(chat_id), text)
            .await
            .map(|_| ())
            .map_err(|e| DeliveryError::Rejected(format!("Failed to send: {e}")))
    }

    /// Send an audio file (MP3) from local storage.
    async fn send_audio(&self, chat_id: i64, path: &Path) -> Result<(), DeliveryError> {
        info!("🔊 Sending audio to chat {} ({})", chat_id, path.display());

        self.bot
            .send_audio(ChatId(chat_id), InputFile::file(path))
            .title("Kritika")
            .await
            .map(|_| ())
            .map_err(|e| DeliveryError::Rejected(format!("Failed to send audio: {e}")))
    }
}
