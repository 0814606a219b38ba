use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::error::{Result, ClipJoinError};

fn default_ffmpeg_path() -> String {
    "ffmpeg".to_string()
}

fn default_ffprobe_path() -> String {
    "ffprobe".to_string()
}

fn default_output_name() -> String {
    "output.mp4".to_string()
}

fn default_search_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_install_dir() -> PathBuf {
    PathBuf::from(".clipjoin").join("tools")
}

fn default_download_url() -> String {
    "https://www.gyan.dev/ffmpeg/builds/ffmpeg-release-essentials.zip".to_string()
}

fn default_download_page() -> String {
    "https://ffmpeg.org/download.html".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub setup: SetupConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Path to ffmpeg binary
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: String,
    /// Path to ffprobe binary
    #[serde(default = "default_ffprobe_path")]
    pub ffprobe_path: String,
    /// Directory for intermediate transport-stream files.
    /// When unset, intermediates are written to the current directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// File name used when no output path is given
    #[serde(default = "default_output_name")]
    pub default_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetupConfig {
    /// Directory searched recursively for a local ffmpeg install
    #[serde(default = "default_search_root")]
    pub search_root: PathBuf,
    /// Where downloaded ffmpeg builds are extracted
    #[serde(default = "default_install_dir")]
    pub install_dir: PathBuf,
    /// Archive fetched by `setup --download`
    #[serde(default = "default_download_url")]
    pub download_url: String,
    /// Page shown to the user when ffmpeg is missing
    #[serde(default = "default_download_page")]
    pub download_page: String,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            ffprobe_path: default_ffprobe_path(),
            work_dir: None,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            default_name: default_output_name(),
        }
    }
}

impl Default for SetupConfig {
    fn default() -> Self {
        Self {
            search_root: default_search_root(),
            install_dir: default_install_dir(),
            download_url: default_download_url(),
            download_page: default_download_page(),
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ClipJoinError::Config(format!("Failed to read config file: {}", e)))?;

        Ok(toml::from_str(&content)?)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ClipJoinError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| ClipJoinError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [media]
            ffmpeg_path = "/opt/ffmpeg/bin/ffmpeg"
            "#,
        )
        .unwrap();

        assert_eq!(config.media.ffmpeg_path, "/opt/ffmpeg/bin/ffmpeg");
        assert_eq!(config.media.ffprobe_path, "ffprobe");
        assert!(config.media.work_dir.is_none());
        assert_eq!(config.output.default_name, "output.mp4");
        assert_eq!(config.setup.download_page, "https://ffmpeg.org/download.html");
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clipjoin.toml");

        let mut config = Config::default();
        config.media.work_dir = Some(PathBuf::from("/tmp/clipjoin"));
        config.save_to_file(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.media.work_dir, Some(PathBuf::from("/tmp/clipjoin")));
        assert_eq!(loaded.setup.install_dir, default_install_dir());
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = Config::from_file("/nonexistent/clipjoin.toml").unwrap_err();
        assert!(matches!(err, ClipJoinError::Config(_)));
    }

    #[test]
    fn test_malformed_file_is_toml_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clipjoin.toml");
        std::fs::write(&path, "[media\nffmpeg_path = 3").unwrap();

        let err = Config::from_file(&path).unwrap_err();
        assert!(matches!(err, ClipJoinError::Toml(_)));
        assert!(err.to_string().starts_with("TOML parsing error"));
    }
}
