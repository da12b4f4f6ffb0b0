//! omni-media: Prompt construction, remote multimodal analysis, video asset
//! polling, and the spoken report.

pub mod error;
pub mod gemini;
pub mod poll;
pub mod prompt;
pub mod runner;
pub mod speech;
pub mod types;

#[cfg(test)]
mod testing;

pub use error::AnalysisError;
pub use gemini::GeminiClient;
pub use poll::PollPolicy;
pub use prompt::{VIDEO_PROMPT, build_prompt};
pub use runner::{AnalysisRunner, RunnerSettings};
pub use speech::{GoogleTranslateTts, OpenAiTts, speak_report, speech_text};
pub use types::{InferenceClient, MediaPart, SpeechSynthesizer};
