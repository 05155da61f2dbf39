//! Conversation handler - answers doubts with text and voice.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Deserialize;
use tracing::{info, warn};

use crate::chatbot::conversation::{ConversationState, ConversationStore};
use crate::chatbot::message::{IncomingDoubt, IntakeMode};
use crate::chatbot::prompt::build_prompt;
use crate::chatbot::reply::ReplyGenerator;
use crate::chatbot::sanitize::clean_text;
use crate::chatbot::telegram::{DeliveryError, Messenger};
use crate::chatbot::tts::VoiceSynthesizer;

pub const THINKING_MESSAGE: &str = "🧠 Kritika soch rahi hai...";

/// What to do with a blank doubt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyDoubtPolicy {
    /// Ask the student to write something.
    #[default]
    Prompt,
    Ignore,
}

/// Handler configuration.
#[derive(Debug, Clone)]
pub struct HandlerConfig {
    /// Receives a copy of every answered doubt.
    pub admin_chat_id: i64,
    pub intake_mode: IntakeMode,
    pub empty_doubt_policy: EmptyDoubtPolicy,
    pub send_timeout: Duration,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            admin_chat_id: 0,
            intake_mode: IntakeMode::default(),
            empty_doubt_policy: EmptyDoubtPolicy::default(),
            send_timeout: Duration::from_secs(20),
        }
    }
}

/// How a message was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handled {
    Ignored,
    PromptedForInput,
    Answered {
        /// False when the fallback reply was used.
        generated: bool,
        voice_sent: bool,
    },
}

pub fn welcome_message(name: &str) -> String {
    format!(
        "🙏 Namaste {name}! Main Kritika hoon, aapki English teacher.\nAapka doubt mil gaya, jawab taiyaar ho raha hai..."
    )
}

/// Frame a reply for the student. The fallback reply gets the same header, so
/// the text after `"👩‍🏫 Kritika:\n"` is exactly [`FALLBACK_REPLY`] when the
/// model could not answer.
///
/// [`FALLBACK_REPLY`]: crate::chatbot::reply::FALLBACK_REPLY
pub fn reply_message(reply: &str) -> String {
    format!("👩‍🏫 Kritika:\n{reply}")
}

pub fn admin_notification(doubt: &IncomingDoubt, question: &str, reply: &str) -> String {
    format!(
        "📩 From {} (ID: {}):\n❓ {}\n📘 {}",
        doubt.sender_name, doubt.user_id, question, reply
    )
}

/// The stateful core: one instance serves every chat.
pub struct ConversationHandler {
    config: HandlerConfig,
    conversations: ConversationStore,
    messenger: Arc<dyn Messenger>,
    generator: ReplyGenerator,
    synthesizer: VoiceSynthesizer,
    clip_seq: AtomicU64,
}

impl ConversationHandler {
    pub fn new(
        config: HandlerConfig,
        messenger: Arc<dyn Messenger>,
        generator: ReplyGenerator,
        synthesizer: VoiceSynthesizer,
    ) -> Self {
        Self {
            config,
            conversations: ConversationStore::new(),
            messenger,
            generator,
            synthesizer,
            clip_seq: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &HandlerConfig {
        &self.config
    }

    pub async fn conversation_state(&self, chat_id: i64) -> ConversationState {
        self.conversations.state(chat_id).await
    }

    /// Answer one doubt: acknowledge, generate, speak, deliver, notify the admin.
    pub async fn handle(&self, doubt: IncomingDoubt) -> Handled {
        let question = doubt.text.trim();
        if question.is_empty() {
            return self.handle_empty(doubt.chat_id).await;
        }

        let preview: String = question.chars().take(50).collect();
        info!("📨 {} ({}) in chat {}: \"{}\"", doubt.sender_name, doubt.user_id, doubt.chat_id, preview);

        // The chat lock covers the check-and-set and the acknowledgment, so a
        // concurrent message from the same chat cannot overtake the welcome.
        {
            let mut state = self.conversations.lock(doubt.chat_id).await;
            match *state {
                ConversationState::New => {
                    *state = ConversationState::Welcomed;
                    info!("👋 Welcoming chat {}", doubt.chat_id);
                    self.send_text(doubt.chat_id, &welcome_message(&doubt.sender_name), "welcome")
                        .await;
                }
                ConversationState::Welcomed => {
                    self.send_text(doubt.chat_id, THINKING_MESSAGE, "acknowledgment").await;
                }
            }
        }

        let generation = self.generator.generate(&build_prompt(question)).await;
        let reply = generation.text();

        let filename = format!(
            "kritika_reply_{}_{}.mp3",
            doubt.chat_id,
            self.clip_seq.fetch_add(1, Ordering::Relaxed)
        );
        let clip = match self.synthesizer.synthesize(&clean_text(reply), Some(&filename)).await {
            Ok(clip) => Some(clip),
            Err(e) => {
                warn!("Voice synthesis failed for chat {}, sending text only: {}", doubt.chat_id, e);
                None
            }
        };

        self.send_text(doubt.chat_id, &reply_message(reply), "reply").await;

        let voice_sent = match clip {
            Some(clip) => {
                let sent = self.send_audio(doubt.chat_id, clip.path()).await;
                clip.discard().await;
                sent
            }
            None => false,
        };

        self.send_text(
            self.config.admin_chat_id,
            &admin_notification(&doubt, question, reply),
            "admin notification",
        )
        .await;

        Handled::Answered {
            generated: generation.is_generated(),
            voice_sent,
        }
    }

    /// Reply to `/start` with how to ask a doubt.
    pub async fn handle_start(&self, chat_id: i64) {
        let hint = match self.config.intake_mode {
            IntakeMode::AnyText => {
                "🙏 Namaste! Main Kritika hoon, aapki English teacher. Apna English doubt seedha likh kar bhejiye."
            }
            IntakeMode::Command => {
                "🙏 Namaste! Main Kritika hoon, aapki English teacher. /ask ke baad apna doubt likhiye, jaise:\n/ask Present perfect tense kya hota hai?"
            }
        };
        self.send_text(chat_id, hint, "start hint").await;
    }

    async fn handle_empty(&self, chat_id: i64) -> Handled {
        match self.config.empty_doubt_policy {
            EmptyDoubtPolicy::Ignore => Handled::Ignored,
            EmptyDoubtPolicy::Prompt => {
                let text = match self.config.intake_mode {
                    IntakeMode::Command => "❓ /ask ke baad apna doubt likhiye.",
                    IntakeMode::AnyText => "❓ Apna doubt likh kar bhejiye.",
                };
                self.send_text(chat_id, text, "input prompt").await;
                Handled::PromptedForInput
            }
        }
    }

    async fn send_text(&self, chat_id: i64, text: &str, what: &str) -> bool {
        let result = tokio::time::timeout(self.config.send_timeout, self.messenger.send_text(chat_id, text))
            .await
            .unwrap_or(Err(DeliveryError::Timeout(self.config.send_timeout)));
        log_delivery(result, chat_id, what)
    }

    async fn send_audio(&self, chat_id: i64, path: &Path) -> bool {
        let result = tokio::time::timeout(self.config.send_timeout, self.messenger.send_audio(chat_id, path))
            .await
            .unwrap_or(Err(DeliveryError::Timeout(self.config.send_timeout)));
        log_delivery(result, chat_id, "voice")
    }
}

fn log_delivery(result: Result<(), DeliveryError>, chat_id: i64, what: &str) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            warn!("Failed to deliver {} to chat {}: {}", what, chat_id, e);
            false
        }
    }
}
