use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use omni_config::{OmniConfig, SpeechProvider};
use omni_media::{
    AnalysisError, AnalysisRunner, GoogleTranslateTts, OpenAiTts, PollPolicy, RunnerSettings,
    SpeechSynthesizer, speak_report,
};
use omni_types::{AnalysisRequest, AnalysisResult, MediaKind, Mode, mime_for_path};

/// Media file named on the command line.
pub struct MediaInput {
    pub kind: MediaKind,
    pub path: PathBuf,
    pub question: Option<String>,
}

/// Per-invocation flags that override the config file.
#[derive(Default)]
pub struct SessionOverrides {
    pub mode: Option<Mode>,
    pub no_audio: bool,
    pub output_dir: Option<PathBuf>,
    pub poll_timeout: Option<u64>,
}

/// Everything one analysis needs, resolved once and passed explicitly.
pub struct Session {
    pub api_key: String,
    pub mode: Mode,
    pub audio_enabled: bool,
    pub output_dir: PathBuf,
    pub config: OmniConfig,
}

impl Session {
    pub fn new(api_key: String, config: OmniConfig, overrides: SessionOverrides) -> Self {
        let mut config = config;
        if let Some(secs) = overrides.poll_timeout {
            config.poll.timeout_secs = secs;
        }
        Self {
            api_key,
            mode: overrides.mode.unwrap_or(config.mode),
            audio_enabled: config.audio_enabled && !overrides.no_audio,
            output_dir: overrides
                .output_dir
                .unwrap_or_else(|| config.speech.output_dir.clone()),
            config,
        }
    }

    fn runner_settings(&self) -> RunnerSettings {
        RunnerSettings {
            image_model: self.config.models.image.clone(),
            video_model: self.config.models.video.clone(),
            poll: PollPolicy {
                interval: self.config.poll.interval(),
                max_attempts: self.config.poll.max_attempts,
                deadline: self.config.poll.timeout(),
            },
        }
    }

    fn synthesizer(&self) -> Result<Box<dyn SpeechSynthesizer>, AnalysisError> {
        match self.config.speech.provider {
            SpeechProvider::Google => Ok(Box::new(GoogleTranslateTts::with_base_url(
                self.config.speech.language.clone(),
                self.config.speech.base_url.clone(),
            )?)),
            SpeechProvider::Openai => Ok(Box::new(OpenAiTts::from_env()?)),
        }
    }
}

/// Validate the file type and read the media into a request.
pub fn collect_input(input: MediaInput) -> Result<AnalysisRequest, AnalysisError> {
    let mime_type = mime_for_path(input.kind, &input.path).ok_or_else(|| {
        AnalysisError::UnsupportedMedia(format!(
            "{} (expected {} file: {})",
            input.path.display(),
            input.kind,
            input.kind.extensions().join(", ")
        ))
    })?;
    let media_bytes = std::fs::read(&input.path)?;

    Ok(AnalysisRequest {
        media_kind: input.kind,
        media_bytes,
        mime_type: mime_type.to_string(),
        user_question: input.question,
    })
}

/// Text shown for a finished analysis.
pub fn render_result(result: &AnalysisResult) -> String {
    match (result.media_kind, result.mode) {
        (MediaKind::Video, _) => format!("### Video Insights\n\n{}", result.text),
        (MediaKind::Image, Mode::Deep) => {
            format!("### Reasoning (chain-of-thought)\n\n{}", result.text)
        }
        (MediaKind::Image, Mode::Fast) => result.text.clone(),
    }
}

/// Run one user action: collect, analyze, render, and optionally speak.
pub async fn run_analysis(session: Session, input: MediaInput) -> Result<()> {
    let kind = input.kind;
    let request = collect_input(input)?;

    let runner = AnalysisRunner::connect(
        Some(&session.api_key),
        &session.config.api_base_url,
        session.runner_settings(),
    )?;

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    match kind {
        MediaKind::Image => eprintln!("Processing multimodal data..."),
        MediaKind::Video => {
            eprintln!("Note: video analysis works best with short clips (< 1 minute).");
            eprintln!("Uploading video (this may take a moment)...");
        }
    }

    let result = match runner.analyze(request, session.mode, &cancel).await {
        Ok(result) => result,
        Err(AnalysisError::RemoteProcessingFailed(detail)) => {
            warn!(%detail, "Remote processing failed");
            anyhow::bail!("Video processing failed.");
        }
        Err(e) => {
            warn!(kind = e.kind(), "Analysis failed");
            return Err(e.into());
        }
    };

    eprintln!("Analysis complete");
    println!("{}", render_result(&result));

    if session.audio_enabled {
        let spoken = async {
            let synth = session.synthesizer()?;
            let report = speak_report(synth.as_ref(), &result.text, &session.output_dir);
            match tokio::time::timeout(Duration::from_secs(60), report).await {
                Ok(written) => written,
                Err(_) => Err(AnalysisError::Transport("speech synthesis timed out".into())),
            }
        };
        match spoken.await {
            Ok(path) => eprintln!("Audio report: {}", path.display()),
            // The text result stands even when the clip cannot be produced.
            Err(e) => {
                warn!(kind = e.kind(), "Audio report failed: {e}");
                eprintln!("Audio report unavailable: {e}");
            }
        }
    }

    Ok(())
}
