//! Analysis workflow runner.

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::info;

use omni_types::{AnalysisRequest, AnalysisResult, MediaKind, Mode};

use crate::error::AnalysisError;
use crate::gemini::GeminiClient;
use crate::poll::{self, PollPolicy};
use crate::prompt::{VIDEO_PROMPT, build_prompt};
use crate::types::{InferenceClient, MediaPart};

/// Models and polling bounds for one session.
#[derive(Debug, Clone)]
pub struct RunnerSettings {
    pub image_model: String,
    pub video_model: String,
    pub poll: PollPolicy,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            image_model: "gemini-3-flash-preview".to_string(),
            video_model: "gemini-1.5-pro-latest".to_string(),
            poll: PollPolicy::default(),
        }
    }
}

/// Routes an [`AnalysisRequest`] through the right remote workflow.
pub struct AnalysisRunner<C> {
    client: C,
    settings: RunnerSettings,
}

impl AnalysisRunner<GeminiClient> {
    /// Build a runner backed by the hosted Gemini API.
    ///
    /// Fails with `MissingCredential` before any client exists when the key is
    /// absent or blank.
    pub fn connect(
        api_key: Option<&str>,
        base_url: &str,
        settings: RunnerSettings,
    ) -> Result<Self, AnalysisError> {
        let api_key = api_key
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(AnalysisError::MissingCredential)?;
        let client = GeminiClient::with_base_url(api_key.to_string(), base_url.to_string())?;
        Ok(Self::new(client, settings))
    }
}

impl<C: InferenceClient> AnalysisRunner<C> {
    pub fn new(client: C, settings: RunnerSettings) -> Self {
        Self { client, settings }
    }

    #[cfg(test)]
    pub(crate) fn client(&self) -> &C {
        &self.client
    }

    /// Run one analysis. No retry; the first error ends the workflow.
    pub async fn analyze(
        &self,
        request: AnalysisRequest,
        mode: Mode,
        cancel: &CancellationToken,
    ) -> Result<AnalysisResult, AnalysisError> {
        let started = Instant::now();
        let media_kind = request.media_kind;
        info!(
            provider = self.client.id(),
            kind = %media_kind,
            %mode,
            bytes = request.media_bytes.len(),
            "Starting analysis"
        );

        let text = match media_kind {
            MediaKind::Image => self.analyze_image(request, mode, cancel).await?,
            MediaKind::Video => self.analyze_video(request, cancel).await?,
        };

        info!(
            kind = %media_kind,
            elapsed_ms = started.elapsed().as_millis() as u64,
            chars = text.chars().count(),
            "Analysis complete"
        );
        Ok(AnalysisResult {
            text,
            mode,
            media_kind,
        })
    }

    async fn analyze_image(
        &self,
        request: AnalysisRequest,
        mode: Mode,
        cancel: &CancellationToken,
    ) -> Result<String, AnalysisError> {
        let prompt = build_prompt(mode, request.user_question.as_deref());
        let media = MediaPart::Inline {
            data: request.media_bytes,
            mime_type: request.mime_type,
        };
        tokio::select! {
            _ = cancel.cancelled() => Err(AnalysisError::Cancelled),
            result = self.client.generate(&self.settings.image_model, &prompt, media) => result,
        }
    }

    async fn analyze_video(
        &self,
        request: AnalysisRequest,
        cancel: &CancellationToken,
    ) -> Result<String, AnalysisError> {
        let display_name = format!("omni-{}", uuid::Uuid::new_v4());
        let handle = poll::upload_and_await(
            &self.client,
            request.media_bytes,
            &request.mime_type,
            &display_name,
            &self.settings.poll,
            cancel,
        )
        .await?;

        info!(asset = %handle.id, "Video processed, generating insights");
        tokio::select! {
            _ = cancel.cancelled() => Err(AnalysisError::Cancelled),
            result = self.client.generate(
                &self.settings.video_model,
                VIDEO_PROMPT,
                MediaPart::Asset(handle),
            ) => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedClient;

    use omni_types::AssetState::{Failed, Processing, Ready};

    fn image_request(question: Option<&str>) -> AnalysisRequest {
        AnalysisRequest {
            media_kind: MediaKind::Image,
            media_bytes: vec![0xff, 0xd8, 0xff],
            mime_type: "image/jpeg".into(),
            user_question: question.map(String::from),
        }
    }

    fn video_request() -> AnalysisRequest {
        AnalysisRequest {
            media_kind: MediaKind::Video,
            media_bytes: b"video".to_vec(),
            mime_type: "video/mp4".into(),
            user_question: Some("ignored".into()),
        }
    }

    #[tokio::test]
    async fn test_image_uses_mode_prompt() {
        let runner = AnalysisRunner::new(ScriptedClient::new(vec![]), RunnerSettings::default());
        let result = runner
            .analyze(
                image_request(Some("Is this safe?")),
                Mode::Deep,
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(result.text, "scripted answer");
        assert_eq!(result.mode, Mode::Deep);
        assert_eq!(result.media_kind, MediaKind::Image);

        let client = runner.client();
        assert_eq!(client.generate_calls(), 1);
        assert_eq!(client.upload_calls(), 0);
        let (model, prompt) = client.last_prompt().unwrap();
        assert_eq!(model, "gemini-3-flash-preview");
        assert_eq!(prompt, build_prompt(Mode::Deep, Some("Is this safe?")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_video_polls_then_generates() {
        let runner = AnalysisRunner::new(
            ScriptedClient::new(vec![Processing, Processing, Ready]),
            RunnerSettings::default(),
        );
        let result = runner
            .analyze(video_request(), Mode::Fast, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result.media_kind, MediaKind::Video);

        let client = runner.client();
        assert_eq!(client.upload_calls(), 1);
        assert_eq!(client.status_calls(), 2);
        assert_eq!(client.generate_calls(), 1);
        let (model, prompt) = client.last_prompt().unwrap();
        assert_eq!(model, "gemini-1.5-pro-latest");
        assert_eq!(prompt, VIDEO_PROMPT);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_video_never_generates() {
        let runner = AnalysisRunner::new(
            ScriptedClient::new(vec![Processing, Processing, Failed]),
            RunnerSettings::default(),
        );
        let err = runner
            .analyze(video_request(), Mode::Deep, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::RemoteProcessingFailed(_)));
        assert_eq!(runner.client().generate_calls(), 0);
    }

    #[tokio::test]
    async fn test_remote_error_is_classified() {
        let runner = AnalysisRunner::new(ScriptedClient::failing(429), RunnerSettings::default());
        let err = runner
            .analyze(image_request(None), Mode::Fast, &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "quota_exceeded");
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let runner = AnalysisRunner::new(ScriptedClient::new(vec![]), RunnerSettings::default());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = runner
            .analyze(video_request(), Mode::Fast, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Cancelled));
        assert_eq!(runner.client().generate_calls(), 0);
    }

    #[test]
    fn test_connect_requires_credential() {
        for key in [None, Some(""), Some("   ")] {
            let err = AnalysisRunner::connect(key, "http://127.0.0.1:9", RunnerSettings::default())
                .err()
                .unwrap();
            assert!(matches!(err, AnalysisError::MissingCredential));
        }
        assert!(
            AnalysisRunner::connect(Some("k"), "http://127.0.0.1:9", RunnerSettings::default())
                .is_ok()
        );
    }
}
