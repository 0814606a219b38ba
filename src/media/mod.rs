// Media processing layer
//
// - Commands: typed ffmpeg command lines and the builder for plan steps
// - Processor: runs commands as child processes and checks tool availability
// - Probe: ffprobe-based codec inspection

pub mod commands;
pub mod probe;
pub mod processor;

use async_trait::async_trait;

pub use commands::*;
pub use probe::*;
pub use processor::*;

use crate::config::MediaConfig;
use crate::error::Result;

/// Main trait for media processing operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaProcessorTrait: Send + Sync {
    /// Check if media processor is available
    async fn check_availability(&self) -> Result<()>;

    /// Get media processor version information
    async fn get_version_info(&self) -> Result<String>;

    /// Execute one media processing command to completion
    async fn execute_command(&self, command: &MediaCommand) -> Result<()>;
}

/// Factory for creating media processor instances
pub struct MediaProcessorFactory;

impl MediaProcessorFactory {
    /// Create the default media processor implementation (FFmpeg-based)
    pub fn create_processor(
        config: MediaConfig,
        download_page: String,
    ) -> Box<dyn MediaProcessorTrait> {
        Box::new(processor::MediaProcessorImpl::new(config, download_page))
    }
}
