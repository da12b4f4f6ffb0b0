//! Scripted inference client for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;

use omni_types::{AssetHandle, AssetState};

use crate::error::AnalysisError;
use crate::types::{InferenceClient, MediaPart};

/// Replays a fixed sequence of asset states and counts every call.
///
/// The first state is what the upload reports; each status query pops the
/// next one. An exhausted script keeps reporting `Processing`.
pub(crate) struct ScriptedClient {
    states: Mutex<VecDeque<AssetState>>,
    reply: Result<String, u16>,
    upload_calls: AtomicU32,
    status_calls: AtomicU32,
    generate_calls: AtomicU32,
    last_prompt: Mutex<Option<(String, String)>>,
}

impl ScriptedClient {
    pub(crate) fn new(states: Vec<AssetState>) -> Self {
        Self {
            states: Mutex::new(states.into()),
            reply: Ok("scripted answer".to_string()),
            upload_calls: AtomicU32::new(0),
            status_calls: AtomicU32::new(0),
            generate_calls: AtomicU32::new(0),
            last_prompt: Mutex::new(None),
        }
    }

    /// A client whose generate call fails with the given HTTP status.
    pub(crate) fn failing(status: u16) -> Self {
        Self {
            reply: Err(status),
            ..Self::new(Vec::new())
        }
    }

    fn next_handle(&self) -> AssetHandle {
        let state = self
            .states
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(AssetState::Processing);
        AssetHandle {
            id: "files/scripted".into(),
            uri: "https://example.invalid/files/scripted".into(),
            mime_type: "video/mp4".into(),
            state,
            error: None,
        }
    }

    /// The handle an upload would have returned.
    pub(crate) fn initial_handle(&self) -> AssetHandle {
        self.next_handle()
    }

    pub(crate) fn upload_calls(&self) -> u32 {
        self.upload_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn status_calls(&self) -> u32 {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn generate_calls(&self) -> u32 {
        self.generate_calls.load(Ordering::SeqCst)
    }

    /// `(model, prompt)` of the most recent generate call.
    pub(crate) fn last_prompt(&self) -> Option<(String, String)> {
        self.last_prompt.lock().unwrap().clone()
    }
}

#[async_trait]
impl InferenceClient for ScriptedClient {
    fn id(&self) -> &str {
        "scripted"
    }

    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        _media: MediaPart,
    ) -> Result<String, AnalysisError> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock().unwrap() = Some((model.to_string(), prompt.to_string()));
        match &self.reply {
            Ok(text) => Ok(text.clone()),
            Err(status) => Err(crate::gemini::classify_error(*status, "")),
        }
    }

    async fn upload_asset(
        &self,
        _data: Vec<u8>,
        _mime_type: &str,
        _display_name: &str,
    ) -> Result<AssetHandle, AnalysisError> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.next_handle())
    }

    async fn get_asset_status(&self, _handle: &AssetHandle) -> Result<AssetHandle, AnalysisError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.next_handle())
    }
}
