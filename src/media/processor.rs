use async_trait::async_trait;
use tokio::process::Command;
use tracing::{info, debug};

use crate::config::MediaConfig;
use crate::error::{Result, ClipJoinError};
use super::{MediaProcessorTrait, MediaCommand, MediaCommandBuilder};

/// Concrete implementation of media processor (FFmpeg-based)
pub struct MediaProcessorImpl {
    config: MediaConfig,
    command_builder: MediaCommandBuilder,
    download_page: String,
}

impl MediaProcessorImpl {
    /// Create a new media processor implementation
    pub fn new(config: MediaConfig, download_page: String) -> Self {
        let command_builder = MediaCommandBuilder::new(&config.ffmpeg_path);

        Self {
            config,
            command_builder,
            download_page,
        }
    }

    fn not_installed(&self) -> ClipJoinError {
        ClipJoinError::ToolNotInstalled {
            binary: self.config.ffmpeg_path.clone(),
            download_page: self.download_page.clone(),
        }
    }
}

#[async_trait]
impl MediaProcessorTrait for MediaProcessorImpl {
    /// Check if media processor is available
    async fn check_availability(&self) -> Result<()> {
        let output = Command::new(&self.config.ffmpeg_path)
            .arg("-version")
            .output()
            .await
            .map_err(|e| {
                debug!("Failed to start {}: {}", self.config.ffmpeg_path, e);
                self.not_installed()
            })?;

        if output.status.success() {
            info!("Media processor is available");
            Ok(())
        } else {
            debug!("{} -version exited with {}", self.config.ffmpeg_path, output.status);
            Err(self.not_installed())
        }
    }

    /// Get media processor version information
    async fn get_version_info(&self) -> Result<String> {
        debug!("Getting media processor version information");

        let command = self.command_builder.version_check();
        let output = Command::new(&command.binary_path)
            .args(command.os_args())
            .output()
            .await
            .map_err(|_| self.not_installed())?;

        if output.status.success() {
            let version_info = String::from_utf8_lossy(&output.stdout);
            // First line carries the version banner
            let first_line = version_info.lines().next().unwrap_or("Unknown version");
            Ok(first_line.to_string())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(ClipJoinError::Media(format!("Media processor version check failed: {}", stderr)))
        }
    }

    async fn execute_command(&self, command: &MediaCommand) -> Result<()> {
        info!("Executing: {}", command.description);
        command.execute().await
    }
}
