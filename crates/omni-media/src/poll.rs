//! Video upload and asset-status polling.
//!
//! `Uploading -> Processing -> {Ready, Failed}`. The handle returned by the
//! upload is the first observed state; every further observation costs one
//! status query. The loop is bounded by [`PollPolicy`] and stops promptly
//! when the cancellation token fires.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use omni_types::{AssetHandle, AssetState};

use crate::error::AnalysisError;
use crate::types::InferenceClient;

/// Bounds for the status poll.
#[derive(Debug, Clone)]
pub struct PollPolicy {
    /// Sleep between status queries.
    pub interval: Duration,
    /// Maximum number of status queries.
    pub max_attempts: u32,
    /// Wall-clock limit measured from the first observation.
    pub deadline: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_attempts: 300,
            deadline: Duration::from_secs(600),
        }
    }
}

/// Upload `data` and wait until the remote service finishes processing it.
pub async fn upload_and_await<C: InferenceClient + ?Sized>(
    client: &C,
    data: Vec<u8>,
    mime_type: &str,
    display_name: &str,
    policy: &PollPolicy,
    cancel: &CancellationToken,
) -> Result<AssetHandle, AnalysisError> {
    info!(bytes = data.len(), mime_type, "Uploading video");
    let handle = tokio::select! {
        _ = cancel.cancelled() => return Err(AnalysisError::Cancelled),
        result = client.upload_asset(data, mime_type, display_name) => result?,
    };
    info!(asset = %handle.id, state = ?handle.state, "Upload complete");
    await_ready(client, handle, policy, cancel).await
}

/// Poll `handle` until it leaves `Processing`.
///
/// Returns the ready handle, or `RemoteProcessingFailed` when the service
/// reports failure. Never issues more than `policy.max_attempts` queries.
pub async fn await_ready<C: InferenceClient + ?Sized>(
    client: &C,
    mut handle: AssetHandle,
    policy: &PollPolicy,
    cancel: &CancellationToken,
) -> Result<AssetHandle, AnalysisError> {
    let started = Instant::now();
    let mut attempts: u32 = 0;

    loop {
        match handle.state {
            AssetState::Ready => {
                info!(asset = %handle.id, attempts, "Asset ready");
                return Ok(handle);
            }
            AssetState::Failed => {
                let detail = handle
                    .error
                    .unwrap_or_else(|| "remote service reported FAILED".to_string());
                warn!(asset = %handle.id, attempts, "Asset processing failed: {detail}");
                return Err(AnalysisError::RemoteProcessingFailed(detail));
            }
            AssetState::Processing => {}
        }

        let elapsed = started.elapsed();
        if attempts >= policy.max_attempts || elapsed >= policy.deadline {
            warn!(asset = %handle.id, attempts, ?elapsed, "Giving up on asset");
            return Err(AnalysisError::PollTimeout { attempts, elapsed });
        }

        tokio::select! {
            _ = cancel.cancelled() => return Err(AnalysisError::Cancelled),
            _ = tokio::time::sleep(policy.interval) => {}
        }

        attempts += 1;
        debug!(asset = %handle.id, attempt = attempts, "Querying asset status");
        handle = tokio::select! {
            _ = cancel.cancelled() => return Err(AnalysisError::Cancelled),
            result = client.get_asset_status(&handle) => result?,
        };
    }
}
