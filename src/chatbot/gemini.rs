//! Gemini API client for text generation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::chatbot::reply::{GenerationError, LanguageModel};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

pub const DEFAULT_MODEL: &str = "gemini-1.5-flash-latest";

/// Stateless Gemini client. Built once at startup and shared.
pub struct GeminiClient {
    api_key: String,
    model: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Deserialize, Debug)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
    error: Option<ApiError>,
}

#[derive(Deserialize, Debug)]
struct ApiError {
    message: String,
}

#[derive(Deserialize, Debug)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize, Debug)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize, Debug)]
struct ResponsePart {
    text: Option<String>,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            client: reqwest::Client::new(),
        }
    }

    fn url(&self) -> String {
        format!("{}/{}:generateContent?key={}", GEMINI_API_BASE, self.model, self.api_key)
    }
}

#[async_trait]
impl LanguageModel for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
        };

        let response = self
            .client
            .post(self.url())
            .json(&request)
            .send()
            .await
            .map_err(|e| GenerationError::Http(e.without_url().to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GenerationError::Http(format!("Failed to read response: {}", e.without_url())))?;

        debug!("Gemini response status: {status}");

        if !status.is_success() {
            return Err(GenerationError::Api(format!("{status}: {body}")));
        }

        extract_text(&body)
    }
}

/// Concatenate the text parts of the first candidate.
fn extract_text(body: &str) -> Result<String, GenerationError> {
    let parsed: GenerateResponse =
        serde_json::from_str(body).map_err(|e| GenerationError::Parse(e.to_string()))?;

    if let Some(error) = parsed.error {
        return Err(GenerationError::Api(error.message));
    }

    let text: String = parsed
        .candidates
        .unwrap_or_default()
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(GenerationError::Empty);
    }
    Ok(text)
}
