//! Remote service traits and request parts.

use async_trait::async_trait;

use omni_types::AssetHandle;

use crate::error::AnalysisError;

/// Media attached to a generate call.
#[derive(Debug, Clone)]
pub enum MediaPart {
    /// Bytes sent inline with the request (images).
    Inline { data: Vec<u8>, mime_type: String },
    /// A finished uploaded asset (videos).
    Asset(AssetHandle),
}

/// The remote multimodal inference API.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Provider identifier.
    fn id(&self) -> &str;
    /// Run `model` on the instruction plus media and return the raw text.
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        media: MediaPart,
    ) -> Result<String, AnalysisError>;
    /// Upload an asset for later reference.
    async fn upload_asset(
        &self,
        data: Vec<u8>,
        mime_type: &str,
        display_name: &str,
    ) -> Result<AssetHandle, AnalysisError>;
    /// Re-read the processing state of an uploaded asset.
    async fn get_asset_status(&self, handle: &AssetHandle) -> Result<AssetHandle, AnalysisError>;
}

/// Hosted text-to-speech.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Provider identifier.
    fn id(&self) -> &str;
    /// Synthesize `text` and return mp3 bytes.
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, AnalysisError>;
}
