//! Chatbot module - answers English doubts as Kritika.

pub mod conversation;
pub mod engine;
pub mod gemini;
pub mod message;
pub mod prompt;
pub mod reply;
pub mod sanitize;
pub mod telegram;
pub mod tts;


pub use engine::{ConversationHandler, EmptyDoubtPolicy, Handled, HandlerConfig};
pub use gemini::GeminiClient;
pub use message::{IncomingDoubt, Intake, IntakeMode, parse_intake};
pub use reply::{FALLBACK_REPLY, Generation, ReplyGenerator};
pub use telegram::TelegramClient;
pub use tts::{GoogleTts, VoiceSynthesizer};
