use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ──────────────────── Mode ────────────────────

/// User-selected reasoning strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Short instruction with the question embedded.
    #[default]
    Fast,
    /// Step-by-step reasoning ("Sherlock" mode).
    Deep,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Fast => f.write_str("fast"),
            Mode::Deep => f.write_str("deep"),
        }
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fast" => Ok(Mode::Fast),
            "deep" | "sherlock" => Ok(Mode::Deep),
            other => Err(format!("unknown mode '{other}' (expected 'fast' or 'deep')")),
        }
    }
}

// ──────────────────── Media Types ────────────────────

/// Kind of media carried by an analysis request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Accepted file extensions (lowercase, without the dot).
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            MediaKind::Image => &["jpg", "png", "jpeg"],
            MediaKind::Video => &["mp4", "mov"],
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Image => f.write_str("image"),
            MediaKind::Video => f.write_str("video"),
        }
    }
}

/// Resolve the MIME type for a file of the given kind, by extension.
///
/// Returns `None` when the extension is not one the kind accepts.
pub fn mime_for_path(kind: MediaKind, path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    if !kind.extensions().contains(&ext.as_str()) {
        return None;
    }
    let mime = match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        _ => return None,
    };
    Some(mime)
}

/// A single user-triggered analysis.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    /// Image or video.
    pub media_kind: MediaKind,
    /// Raw media bytes.
    pub media_bytes: Vec<u8>,
    /// MIME type (e.g. "image/png", "video/mp4").
    pub mime_type: String,
    /// Optional free-text question, used verbatim.
    pub user_question: Option<String>,
}

/// Text produced by the remote model for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub text: String,
    pub mode: Mode,
    pub media_kind: MediaKind,
}

// ──────────────────── Remote Assets ────────────────────

/// Processing state of an uploaded asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetState {
    Processing,
    Ready,
    Failed,
}

/// Remote reference to an uploaded media file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetHandle {
    /// Remote resource name (e.g. "files/abc123").
    pub id: String,
    /// URI used to reference the asset in a generate call.
    pub uri: String,
    /// MIME type reported by the service.
    pub mime_type: String,
    /// Current processing state.
    pub state: AssetState,
    /// Failure detail reported by the service, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_from_str() {
        assert_eq!("fast".parse::<Mode>().unwrap(), Mode::Fast);
        assert_eq!("Deep".parse::<Mode>().unwrap(), Mode::Deep);
        assert_eq!("sherlock".parse::<Mode>().unwrap(), Mode::Deep);
        assert!("slow".parse::<Mode>().is_err());
    }

    #[test]
    fn test_mode_serde() {
        assert_eq!(serde_json::to_string(&Mode::Deep).unwrap(), "\"deep\"");
        let parsed: Mode = serde_json::from_str("\"fast\"").unwrap();
        assert_eq!(parsed, Mode::Fast);
    }

    #[test]
    fn test_mime_for_path() {
        assert_eq!(
            mime_for_path(MediaKind::Image, Path::new("cat.JPG")),
            Some("image/jpeg")
        );
        assert_eq!(
            mime_for_path(MediaKind::Image, Path::new("a/b/wiring.png")),
            Some("image/png")
        );
        assert_eq!(
            mime_for_path(MediaKind::Video, Path::new("clip.mov")),
            Some("video/quicktime")
        );
    }

    #[test]
    fn test_mime_for_path_rejects_wrong_kind() {
        assert_eq!(mime_for_path(MediaKind::Image, Path::new("clip.mp4")), None);
        assert_eq!(mime_for_path(MediaKind::Video, Path::new("cat.png")), None);
        assert_eq!(mime_for_path(MediaKind::Image, Path::new("noext")), None);
        assert_eq!(mime_for_path(MediaKind::Image, Path::new("anim.gif")), None);
    }

    #[test]
    fn test_asset_handle_without_error_compat() {
        let json = r#"{"id":"files/x","uri":"https://u","mime_type":"video/mp4","state":"ready"}"#;
        let parsed: AssetHandle = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.state, AssetState::Ready);
        assert!(parsed.error.is_none());
    }
}
