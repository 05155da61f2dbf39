//! Text-to-speech for Kritika's replies.
//!
//! Speech comes from the Google Translate TTS endpoint, which only accepts
//! short inputs, so text is spoken in chunks of at most [`MAX_CHUNK_CHARS`]
//! characters and the MP3 pieces are concatenated.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

/// Replies are always spoken in Hindi.
pub const HINDI: &str = "hi";

pub const DEFAULT_FILENAME: &str = "kritika_reply.mp3";

pub const DEFAULT_TTS_ENDPOINT: &str = "https://translate.google.com";

const MAX_CHUNK_CHARS: usize = 100;

/// A speech backend producing MP3 audio.
#[async_trait]
pub trait SpeechEngine: Send + Sync {
    async fn speak(&self, text: &str, lang: &str) -> Result<Vec<u8>, SynthesisError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SynthesisError {
    /// Nothing left to say after cleaning.
    EmptyText,
    Http(String),
    Api(String),
    Io(String),
    Timeout(Duration),
}

impl std::fmt::Display for SynthesisError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SynthesisError::EmptyText => write!(f, "No text to synthesize"),
            SynthesisError::Http(e) => write!(f, "TTS request failed: {e}"),
            SynthesisError::Api(e) => write!(f, "TTS error {e}"),
            SynthesisError::Io(e) => write!(f, "Failed to write audio: {e}"),
            SynthesisError::Timeout(d) => write!(f, "TTS timed out after {}s", d.as_secs_f32()),
        }
    }
}

impl std::error::Error for SynthesisError {}

/// An audio file on local storage, valid for one send.
#[derive(Debug)]
pub struct VoiceClip {
    path: PathBuf,
}

impl VoiceClip {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the file once it has been delivered (or delivery gave up).
    pub async fn discard(self) {
        if let Err(e) = tokio::fs::remove_file(&self.path).await {
            warn!("Failed to remove voice clip {}: {}", self.path.display(), e);
        }
    }
}

/// Renders text into an MP3 file under `dir`.
pub struct VoiceSynthesizer {
    engine: Arc<dyn SpeechEngine>,
    dir: PathBuf,
    timeout: Duration,
}

impl VoiceSynthesizer {
    pub fn new(engine: Arc<dyn SpeechEngine>, dir: PathBuf, timeout: Duration) -> Self {
        Self { engine, dir, timeout }
    }

    /// Speak `text` in Hindi and write it to `filename` (default [`DEFAULT_FILENAME`]),
    /// overwriting any previous file of that name.
    pub async fn synthesize(
        &self,
        text: &str,
        filename: Option<&str>,
    ) -> Result<VoiceClip, SynthesisError> {
        if text.trim().is_empty() {
            return Err(SynthesisError::EmptyText);
        }

        let audio = tokio::time::timeout(self.timeout, self.engine.speak(text, HINDI))
            .await
            .map_err(|_| SynthesisError::Timeout(self.timeout))??;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| SynthesisError::Io(e.to_string()))?;
        let path = self.dir.join(filename.unwrap_or(DEFAULT_FILENAME));
        tokio::fs::write(&path, &audio)
            .await
            .map_err(|e| SynthesisError::Io(e.to_string()))?;

        info!("Generated {} bytes of voice audio at {}", audio.len(), path.display());
        Ok(VoiceClip { path })
    }
}

/// Google Translate TTS client (the endpoint gTTS speaks to).
pub struct GoogleTts {
    endpoint: String,
    client: reqwest::Client,
}

impl GoogleTts {
    /// `endpoint` is the base URL, e.g. "https://translate.google.com".
    pub fn new(endpoint: String) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn chunk_url(&self, chunk: &str, lang: &str, idx: usize, total: usize) -> String {
        format!(
            "{}/translate_tts?ie=UTF-8&client=tw-ob&tl={}&total={}&idx={}&textlen={}&q={}",
            self.endpoint,
            lang,
            total,
            idx,
            chunk.chars().count(),
            urlencoding::encode(chunk)
        )
    }
}

#[async_trait]
impl SpeechEngine for GoogleTts {
    async fn speak(&self, text: &str, lang: &str) -> Result<Vec<u8>, SynthesisError> {
        let preview: String = text.chars().take(50).collect();
        info!("TTS: \"{}\"", preview);

        let chunks = split_for_speech(text, MAX_CHUNK_CHARS);
        if chunks.is_empty() {
            return Err(SynthesisError::EmptyText);
        }

        let mut audio = Vec::new();
        for (idx, chunk) in chunks.iter().enumerate() {
            let response = self
                .client
                .get(self.chunk_url(chunk, lang, idx, chunks.len()))
                .header("User-Agent", "Mozilla/5.0")
                .send()
                .await
                .map_err(|e| SynthesisError::Http(e.to_string()))?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(SynthesisError::Api(format!("{}: {}", status, body)));
            }

            let bytes = response
                .bytes()
                .await
                .map_err(|e| SynthesisError::Http(format!("Failed to read TTS response: {e}")))?;
            debug!("Chunk {}/{}: {} bytes", idx + 1, chunks.len(), bytes.len());
            audio.extend_from_slice(&bytes);
        }

        Ok(audio)
    }
}

/// Split text into chunks of at most `max_chars` characters, breaking on whitespace.
/// Words longer than `max_chars` are cut.
fn split_for_speech(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > max_chars {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let rest = word.split_off(max_chars);
            chunks.push(word.into_iter().collect());
            word = rest;
        }
        if word.is_empty() {
            continue;
        }

        let needed = if current.is_empty() { word.len() } else { word.len() + 1 };
        if current_len + needed > max_chars {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if !current.is_empty() {
            current.push(' ');
            current_len += 1;
        }
        current.extend(word.iter());
        current_len += word.len();
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_split_short_text_is_one_chunk() {
        assert_eq!(split_for_speech("I have eaten.", 100), vec!["I have eaten."]);
    }

    #[test]
    fn test_split_respects_limit_and_words() {
        let text = "one two three four five six";
        let chunks = split_for_speech(text, 9);
        assert_eq!(chunks, vec!["one two", "three", "four five", "six"]);
        assert!(chunks.iter().all(|c| c.chars().count() <= 9));
    }

    #[test]
    fn test_split_counts_chars_not_bytes() {
        // Each Devanagari word is 6 chars but 18 bytes.
        let text = "नमस्ते नमस्ते";
        assert_eq!(split_for_speech(text, 13).len(), 1);
    }

    #[test]
    fn test_split_cuts_long_words() {
        let chunks = split_for_speech("ab abcdefgh c", 3);
        assert_eq!(chunks, vec!["ab", "abc", "def", "gh", "c"]);
    }

    #[test]
    fn test_split_empty() {
        assert!(split_for_speech("  \n ", 100).is_empty());
    }

    #[test]
    fn test_chunk_url() {
        let tts = GoogleTts::new("https://translate.google.com/".to_string());
        let url = tts.chunk_url("I have eaten", HINDI, 0, 1);
        assert_eq!(
            url,
            "https://translate.google.com/translate_tts?ie=UTF-8&client=tw-ob&tl=hi&total=1&idx=0&textlen=12&q=I%20have%20eaten"
        );
    }

    struct Recording {
        calls: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl SpeechEngine for Recording {
        async fn speak(&self, text: &str, lang: &str) -> Result<Vec<u8>, SynthesisError> {
            self.calls.lock().unwrap().push((text.to_string(), lang.to_string()));
            Ok(b"ID3fake".to_vec())
        }
    }

    #[tokio::test]
    async fn test_synthesize_writes_default_file_in_hindi() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Arc::new(Recording { calls: Mutex::new(Vec::new()) });
        let synth = VoiceSynthesizer::new(engine.clone(), dir.path().join("voice"), Duration::from_secs(1));

        let clip = synth.synthesize("Namaste", None).await.unwrap();
        assert_eq!(clip.path(), dir.path().join("voice").join(DEFAULT_FILENAME));
        assert_eq!(std::fs::read(clip.path()).unwrap(), b"ID3fake");
        assert_eq!(*engine.calls.lock().unwrap(), vec![("Namaste".to_string(), "hi".to_string())]);

        let path = clip.path().to_path_buf();
        clip.discard().await;
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_synthesize_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("x.mp3"), b"old old old old").unwrap();
        let engine = Arc::new(Recording { calls: Mutex::new(Vec::new()) });
        let synth = VoiceSynthesizer::new(engine, dir.path().to_path_buf(), Duration::from_secs(1));

        let clip = synth.synthesize("hello", Some("x.mp3")).await.unwrap();
        assert_eq!(std::fs::read(clip.path()).unwrap(), b"ID3fake");
    }

    #[tokio::test]
    async fn test_synthesize_empty_text() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Arc::new(Recording { calls: Mutex::new(Vec::new()) });
        let synth = VoiceSynthesizer::new(engine.clone(), dir.path().to_path_buf(), Duration::from_secs(1));

        let err = synth.synthesize("   ", None).await.unwrap_err();
        assert_eq!(err, SynthesisError::EmptyText);
        assert!(engine.calls.lock().unwrap().is_empty());
    }

    struct Stalled;

    #[async_trait]
    impl SpeechEngine for Stalled {
        async fn speak(&self, _text: &str, _lang: &str) -> Result<Vec<u8>, SynthesisError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn test_synthesize_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let synth = VoiceSynthesizer::new(Arc::new(Stalled), dir.path().to_path_buf(), Duration::from_millis(20));
        let err = synth.synthesize("hello", None).await.unwrap_err();
        assert!(matches!(err, SynthesisError::Timeout(_)));
        assert!(!dir.path().join(DEFAULT_FILENAME).exists());
    }
}
