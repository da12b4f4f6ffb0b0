//! Gemini REST client (generateContent + Files API).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use omni_types::{AssetHandle, AssetState};

use crate::error::AnalysisError;
use crate::types::{InferenceClient, MediaPart};

/// Client for the hosted Gemini API.
pub struct GeminiClient {
    api_key: String,
    base_url: String,
    client: Client,
}

impl GeminiClient {
    pub fn with_base_url(api_key: String, base_url: String) -> Result<Self, AnalysisError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .timeout(Duration::from_secs(300))
            .build()?;
        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Turn a non-success response into an error, passing successes through.
    async fn check(resp: Response) -> Result<Response, AnalysisError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(classify_error(status.as_u16(), &body))
    }
}

/// Wire shape of a Files API resource.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileResource {
    name: String,
    #[serde(default)]
    uri: String,
    #[serde(default)]
    mime_type: String,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<FileError>,
}

#[derive(Debug, Deserialize)]
struct FileError {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    file: FileResource,
}

impl FileResource {
    fn into_handle(self) -> AssetHandle {
        AssetHandle {
            state: parse_state(self.state.as_deref()),
            id: self.name,
            uri: self.uri,
            mime_type: self.mime_type,
            error: self.error.map(|e| e.message),
        }
    }
}

/// Map a Files API state string onto [`AssetState`].
fn parse_state(state: Option<&str>) -> AssetState {
    match state {
        Some("PROCESSING") => AssetState::Processing,
        Some("FAILED") => AssetState::Failed,
        // ACTIVE, STATE_UNSPECIFIED, or absent: only PROCESSING keeps us waiting
        _ => AssetState::Ready,
    }
}

/// Build the JSON part for the attached media.
fn media_part_json(media: &MediaPart) -> Value {
    match media {
        MediaPart::Inline { data, mime_type } => {
            let encoded = base64::Engine::encode(&base64::engine::general_purpose::STANDARD, data);
            json!({ "inline_data": { "mime_type": mime_type, "data": encoded } })
        }
        MediaPart::Asset(handle) => {
            json!({ "file_data": { "mime_type": handle.mime_type, "file_uri": handle.uri } })
        }
    }
}

/// Concatenate the text parts of the first candidate.
fn extract_text(json: &Value) -> Result<String, AnalysisError> {
    let text: String = json
        .pointer("/candidates/0/content/parts")
        .and_then(|p| p.as_array())
        .map(|parts| {
            parts
                .iter()
                .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
                .collect()
        })
        .unwrap_or_default();

    if !text.is_empty() {
        return Ok(text);
    }

    if let Some(reason) = json
        .pointer("/promptFeedback/blockReason")
        .and_then(|r| r.as_str())
    {
        return Err(AnalysisError::InvalidResponse(format!(
            "prompt blocked: {reason}"
        )));
    }
    let finish = json
        .pointer("/candidates/0/finishReason")
        .and_then(|r| r.as_str())
        .unwrap_or("none");
    Err(AnalysisError::InvalidResponse(format!(
        "no text in response (finish reason: {finish})"
    )))
}

/// Classify an error response body into the closed error taxonomy.
pub(crate) fn classify_error(status: u16, body: &str) -> AnalysisError {
    let json: Option<Value> = serde_json::from_str(body).ok();
    let error = json.as_ref().and_then(|j| j.get("error"));

    let message = error
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
        .map(String::from)
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                "Unknown error".to_string()
            } else {
                body.trim().to_string()
            }
        });
    let rpc_status = error
        .and_then(|e| e.get("status"))
        .and_then(|s| s.as_str())
        .unwrap_or("");
    let key_invalid = error
        .and_then(|e| e.get("details"))
        .and_then(|d| d.as_array())
        .is_some_and(|details| {
            details
                .iter()
                .any(|d| d.get("reason").and_then(|r| r.as_str()) == Some("API_KEY_INVALID"))
        })
        || message.contains("API key not valid");

    match (status, rpc_status) {
        (401 | 403, _) | (_, "UNAUTHENTICATED" | "PERMISSION_DENIED") => {
            AnalysisError::CredentialInvalid(message)
        }
        (400, _) if key_invalid => AnalysisError::CredentialInvalid(message),
        (429, _) | (_, "RESOURCE_EXHAUSTED") => AnalysisError::QuotaExceeded(message),
        _ => AnalysisError::Api { status, message },
    }
}

#[async_trait]
impl InferenceClient for GeminiClient {
    fn id(&self) -> &str {
        "gemini"
    }

    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        media: MediaPart,
    ) -> Result<String, AnalysisError> {
        let body = json!({
            "contents": [{
                "role": "user",
                "parts": [
                    { "text": prompt },
                    media_part_json(&media),
                ]
            }]
        });

        debug!(model, "generateContent request");
        let resp = self
            .client
            .post(format!(
                "{}/v1beta/models/{model}:generateContent",
                self.base_url
            ))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let json: Value = Self::check(resp).await?.json().await?;
        extract_text(&json)
    }

    async fn upload_asset(
        &self,
        data: Vec<u8>,
        mime_type: &str,
        display_name: &str,
    ) -> Result<AssetHandle, AnalysisError> {
        let start = self
            .client
            .post(format!("{}/upload/v1beta/files", self.base_url))
            .header("x-goog-api-key", &self.api_key)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", data.len().to_string())
            .header("X-Goog-Upload-Header-Content-Type", mime_type)
            .json(&json!({ "file": { "display_name": display_name } }))
            .send()
            .await?;
        let start = Self::check(start).await?;

        let upload_url = start
            .headers()
            .get("x-goog-upload-url")
            .and_then(|v| v.to_str().ok())
            .map(String::from)
            .ok_or_else(|| {
                AnalysisError::InvalidResponse("upload start returned no upload URL".into())
            })?;

        debug!(bytes = data.len(), mime_type, "Uploading asset");
        let resp = self
            .client
            .post(upload_url)
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .body(data)
            .send()
            .await?;

        let uploaded: UploadResponse = Self::check(resp).await?.json().await?;
        Ok(uploaded.file.into_handle())
    }

    async fn get_asset_status(&self, handle: &AssetHandle) -> Result<AssetHandle, AnalysisError> {
        let resp = self
            .client
            .get(format!("{}/v1beta/{}", self.base_url, handle.id))
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await?;

        let file: FileResource = Self::check(resp).await?.json().await?;
        Ok(file.into_handle())
    }
}
