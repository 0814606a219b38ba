use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;
use tracing::{debug, warn};

/// Codec name ffprobe reports for H.265 video
pub const HEVC_CODEC: &str = "hevc";

/// Looks up the codec of a file's primary video stream
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CodecInspectorTrait: Send + Sync {
    /// Codec name of stream `v:0`, or `None` when it cannot be determined
    async fn inspect_video_codec(&self, path: &Path) -> Option<String>;
}

/// ffprobe-backed codec inspector
pub struct FfprobeInspector {
    binary_path: String,
}

impl FfprobeInspector {
    pub fn new<S: Into<String>>(binary_path: S) -> Self {
        Self {
            binary_path: binary_path.into(),
        }
    }
}

#[async_trait]
impl CodecInspectorTrait for FfprobeInspector {
    async fn inspect_video_codec(&self, path: &Path) -> Option<String> {
        debug!("Probing video codec of {}", path.display());

        let output = Command::new(&self.binary_path)
            .arg("-v").arg("error")
            .arg("-select_streams").arg("v:0")
            .arg("-show_entries").arg("stream=codec_name")
            .arg("-of").arg("default=noprint_wrappers=1:nokey=1")
            .arg(path)
            .output()
            .await;

        let output = match output {
            Ok(output) => output,
            Err(e) => {
                warn!("Failed to run {} on {}: {}", self.binary_path, path.display(), e);
                return None;
            }
        };

        if !output.status.success() {
            warn!(
                "{} could not read {}: {}",
                self.binary_path,
                path.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return None;
        }

        let codec = parse_codec_output(&String::from_utf8_lossy(&output.stdout));
        if codec.is_none() {
            warn!("No video stream found in {}", path.display());
        }
        codec
    }
}

/// Trimmed probe output; empty output means no video stream
pub fn parse_codec_output(stdout: &str) -> Option<String> {
    let codec = stdout.trim();
    if codec.is_empty() {
        None
    } else {
        Some(codec.to_string())
    }
}
