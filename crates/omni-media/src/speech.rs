//! Spoken report: truncation, hosted TTS providers, and the report file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::error::AnalysisError;
use crate::types::SpeechSynthesizer;

/// Characters of the result that are spoken.
pub const SPEECH_CHAR_LIMIT: usize = 200;

/// Suffix appended to every spoken excerpt.
pub const SPEECH_SUFFIX: &str = "...";

/// Fixed name of the written clip.
pub const REPORT_FILE_NAME: &str = "report.mp3";

/// Longest text the translate endpoint accepts per request.
const GOOGLE_CHUNK_CHARS: usize = 100;

/// Text fed to the synthesizer: the first 200 characters plus `"..."`.
///
/// Applied to every result, short ones included. The cut may land mid-word.
pub fn speech_text(text: &str) -> String {
    let mut excerpt: String = text.chars().take(SPEECH_CHAR_LIMIT).collect();
    excerpt.push_str(SPEECH_SUFFIX);
    excerpt
}

/// Write `audio` to `<dir>/report.mp3`, creating `dir` if needed.
pub async fn write_report(dir: &Path, audio: &[u8]) -> Result<PathBuf, AnalysisError> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(REPORT_FILE_NAME);
    tokio::fs::write(&path, audio).await?;
    Ok(path)
}

/// Synthesize the excerpt of `result_text` and write the report clip.
pub async fn speak_report(
    synth: &dyn SpeechSynthesizer,
    result_text: &str,
    dir: &Path,
) -> Result<PathBuf, AnalysisError> {
    let excerpt = speech_text(result_text);
    let audio = synth.synthesize(&excerpt).await?;
    let path = write_report(dir, &audio).await?;
    info!(
        provider = synth.id(),
        bytes = audio.len(),
        path = %path.display(),
        "Audio report saved"
    );
    Ok(path)
}

/// Error for a speech provider that answered with a non-success status.
fn speech_error(provider: &str, status: u16, body: &str) -> AnalysisError {
    let detail = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|j| {
            j.pointer("/error/message")
                .and_then(|m| m.as_str())
                .map(String::from)
        })
        .unwrap_or_else(|| body.trim().chars().take(200).collect());
    let message = if detail.is_empty() {
        format!("HTTP {status}")
    } else {
        format!("HTTP {status}: {detail}")
    };
    AnalysisError::Speech {
        provider: provider.to_string(),
        message,
    }
}

/// Error for a speech request that never got a response.
fn speech_transport_error(provider: &str, e: reqwest::Error) -> AnalysisError {
    AnalysisError::Speech {
        provider: provider.to_string(),
        message: e.to_string(),
    }
}

/// Split `text` into pieces of at most `max` characters, preferring word
/// boundaries. Words longer than `max` are cut.
fn split_chunks(text: &str, max: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > max {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let rest = word.split_off(max);
            chunks.push(word.into_iter().collect());
            word = rest;
        }
        if word.is_empty() {
            continue;
        }

        let needed = if current.is_empty() { word.len() } else { word.len() + 1 };
        if current_len + needed > max {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if !current.is_empty() {
            current.push(' ');
            current_len += 1;
        }
        current_len += word.len();
        current.extend(word);
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Keyless Google Translate speech endpoint.
pub struct GoogleTranslateTts {
    language: String,
    base_url: String,
    client: Client,
}

impl GoogleTranslateTts {
    pub fn with_base_url(language: String, base_url: String) -> Result<Self, AnalysisError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            language,
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn chunk_url(&self, chunk: &str, idx: usize, total: usize) -> Result<url::Url, AnalysisError> {
        let idx = idx.to_string();
        let total = total.to_string();
        let textlen = chunk.chars().count().to_string();
        url::Url::parse_with_params(
            &format!("{}/translate_tts", self.base_url),
            &[
                ("ie", "UTF-8"),
                ("q", chunk),
                ("tl", self.language.as_str()),
                ("total", total.as_str()),
                ("idx", idx.as_str()),
                ("textlen", textlen.as_str()),
                ("client", "tw-ob"),
            ],
        )
        .map_err(|e| AnalysisError::InvalidResponse(format!("bad TTS URL: {e}")))
    }
}

#[async_trait]
impl SpeechSynthesizer for GoogleTranslateTts {
    fn id(&self) -> &str {
        "google-translate-tts"
    }

    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, AnalysisError> {
        let chunks = split_chunks(text, GOOGLE_CHUNK_CHARS);
        let mut audio = Vec::new();

        for (idx, chunk) in chunks.iter().enumerate() {
            let url = self.chunk_url(chunk, idx, chunks.len())?;
            debug!(idx, total = chunks.len(), "Fetching speech chunk");
            let resp = self
                .client
                .get(url)
                .header("User-Agent", "Mozilla/5.0")
                .send()
                .await
                .map_err(|e| speech_transport_error(self.id(), e))?;

            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(speech_error(self.id(), status.as_u16(), &body));
            }
            // mp3 frames concatenate into a playable stream
            let bytes = resp
                .bytes()
                .await
                .map_err(|e| speech_transport_error(self.id(), e))?;
            audio.extend_from_slice(&bytes);
        }

        Ok(audio)
    }
}

/// OpenAI `/v1/audio/speech` provider.
pub struct OpenAiTts {
    api_key: String,
    model: String,
    voice: String,
    client: Client,
}

impl OpenAiTts {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            model: "tts-1".to_string(),
            voice: "alloy".to_string(),
            client: Client::new(),
        }
    }

    /// Build from `OPENAI_API_KEY`.
    pub fn from_env() -> Result<Self, AnalysisError> {
        std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .map(Self::new)
            .ok_or_else(|| AnalysisError::Speech {
                provider: "openai-tts".to_string(),
                message: "OPENAI_API_KEY is not set".to_string(),
            })
    }
}

#[async_trait]
impl SpeechSynthesizer for OpenAiTts {
    fn id(&self) -> &str {
        "openai-tts"
    }

    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, AnalysisError> {
        let resp = self
            .client
            .post("https://api.openai.com/v1/audio/speech")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&json!({
                "model": self.model,
                "input": text,
                "voice": self.voice,
                "response_format": "mp3"
            }))
            .send()
            .await
            .map_err(|e| speech_transport_error(self.id(), e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(speech_error(self.id(), status.as_u16(), &body));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| speech_transport_error(self.id(), e))?;
        Ok(bytes.to_vec())
    }
}
