//! Reply generation with a fail-soft fallback.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

/// What the student sees when the model cannot answer.
pub const FALLBACK_REPLY: &str = "Kritika thoda busy hai abhi. Thodi der baad try kariye.";

/// A text-generation backend. Shared by every conversation task.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    Http(String),
    Api(String),
    Parse(String),
    Empty,
    Timeout(Duration),
}

impl std::fmt::Display for GenerationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerationError::Http(e) => write!(f, "HTTP error: {e}"),
            GenerationError::Api(e) => write!(f, "API error: {e}"),
            GenerationError::Parse(e) => write!(f, "Parse error: {e}"),
            GenerationError::Empty => write!(f, "Empty response"),
            GenerationError::Timeout(d) => write!(f, "Timed out after {}s", d.as_secs_f32()),
        }
    }
}

impl std::error::Error for GenerationError {}

/// Outcome of one generation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Generation {
    Generated(String),
    /// The model failed; `cause` is for logs only.
    Fallback { cause: GenerationError },
}

impl Generation {
    /// Text to deliver to the student.
    pub fn text(&self) -> &str {
        match self {
            Generation::Generated(text) => text,
            Generation::Fallback { .. } => FALLBACK_REPLY,
        }
    }

    pub fn is_generated(&self) -> bool {
        matches!(self, Generation::Generated(_))
    }
}

pub struct ReplyGenerator {
    model: Arc<dyn LanguageModel>,
    timeout: Duration,
}

impl ReplyGenerator {
    pub fn new(model: Arc<dyn LanguageModel>, timeout: Duration) -> Self {
        Self { model, timeout }
    }

    /// Ask the model for a reply. Never fails: errors collapse into [`Generation::Fallback`].
    pub async fn generate(&self, prompt: &str) -> Generation {
        let result = match tokio::time::timeout(self.timeout, self.model.generate(prompt)).await {
            Ok(result) => result,
            Err(_) => Err(GenerationError::Timeout(self.timeout)),
        };

        match result {
            Ok(text) => {
                let text = text.trim();
                if text.is_empty() {
                    warn!("Generation failed: {}", GenerationError::Empty);
                    return Generation::Fallback { cause: GenerationError::Empty };
                }
                info!("Generated reply ({} chars)", text.chars().count());
                Generation::Generated(text.to_string())
            }
            Err(cause) => {
                warn!("Generation failed: {cause}");
                Generation::Fallback { cause }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Result<String, GenerationError>);

    #[async_trait]
    impl LanguageModel for Fixed {
        async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
            self.0.clone()
        }
    }

    struct Stalled;

    #[async_trait]
    impl LanguageModel for Stalled {
        async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok("too late".to_string())
        }
    }

    fn generator(model: impl LanguageModel + 'static) -> ReplyGenerator {
        ReplyGenerator::new(Arc::new(model), Duration::from_millis(50))
    }

    #[tokio::test]
    async fn test_trims_generated_text() {
        let generation = generator(Fixed(Ok("  Namaste!\n".to_string()))).generate("p").await;
        assert_eq!(generation, Generation::Generated("Namaste!".to_string()));
        assert_eq!(generation.text(), "Namaste!");
    }

    #[tokio::test]
    async fn test_every_error_becomes_fallback() {
        let errors = [
            GenerationError::Http("connection refused".to_string()),
            GenerationError::Api("429 quota".to_string()),
            GenerationError::Parse("missing field".to_string()),
            GenerationError::Empty,
        ];
        for error in errors {
            let generation = generator(Fixed(Err(error.clone()))).generate("p").await;
            assert_eq!(generation.text(), FALLBACK_REPLY);
            assert_eq!(generation, Generation::Fallback { cause: error });
        }
    }

    #[tokio::test]
    async fn test_blank_response_is_fallback() {
        let generation = generator(Fixed(Ok(" \n\t".to_string()))).generate("p").await;
        assert_eq!(generation, Generation::Fallback { cause: GenerationError::Empty });
        assert!(!generation.is_generated());
    }

    #[tokio::test]
    async fn test_timeout_is_fallback() {
        let generation = generator(Stalled).generate("p").await;
        assert!(matches!(generation, Generation::Fallback { cause: GenerationError::Timeout(_) }));
        assert_eq!(generation.text(), FALLBACK_REPLY);
    }
}
