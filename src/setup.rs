use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use tokio::fs as async_fs;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::{Config, SetupConfig};
use crate::error::{Result, ClipJoinError};

const FFMPEG_NAMES: [&str; 2] = ["ffmpeg", "ffmpeg.exe"];

/// Finds a local ffmpeg install and downloads one on request
pub struct SetupManager {
    client: Client,
    config: SetupConfig,
}

impl SetupManager {
    pub fn new(config: SetupConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent("clipjoin/0.1.0")
            .build()
            .map_err(ClipJoinError::Http)?;

        Ok(Self { client, config })
    }

    /// Point the media config at a local ffmpeg install when one exists.
    ///
    /// Only bare binary names are resolved; explicit paths from the config
    /// file are left alone.
    pub fn initialize(&self, config: &mut Config) {
        if !is_bare_name(&config.media.ffmpeg_path) {
            debug!("Using configured ffmpeg at {}", config.media.ffmpeg_path);
            return;
        }

        let found = [&self.config.search_root, &self.config.install_dir]
            .into_iter()
            .filter(|root| root.is_dir())
            .find_map(|root| Self::locate_tool_dir(root));

        match found {
            Some(dir) => {
                info!("Found FFmpeg directory: {}", dir.display());
                apply_tool_dir(config, &dir);
            }
            None => info!("No local FFmpeg directory found, relying on PATH"),
        }
    }

    /// Recursively search `root` for an ffmpeg binary and return its directory
    pub fn locate_tool_dir(root: &Path) -> Option<PathBuf> {
        for entry in WalkDir::new(root) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Error while walking {}: {}", root.display(), e);
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let is_ffmpeg = entry
                .file_name()
                .to_str()
                .map(|name| FFMPEG_NAMES.contains(&name))
                .unwrap_or(false);

            if is_ffmpeg {
                return entry.path().parent().map(Path::to_path_buf);
            }
        }

        None
    }

    /// Download and unpack an ffmpeg build into the install directory,
    /// returning the directory holding the binaries
    pub async fn download_tools(&self) -> Result<PathBuf> {
        let install_dir = &self.config.install_dir;
        async_fs::create_dir_all(install_dir).await?;

        let archive_path = install_dir.join("ffmpeg-release-essentials.zip");
        info!("Downloading FFmpeg from {}", self.config.download_url);

        let mut response = self.client.get(&self.config.download_url).send().await?;

        if !response.status().is_success() {
            return Err(ClipJoinError::Setup(format!(
                "Failed to download FFmpeg: HTTP {}",
                response.status()
            )));
        }

        let pb = ProgressBar::new(response.content_length().unwrap_or(0));
        pb.set_style(ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
            .map_err(|e| ClipJoinError::Setup(format!("Invalid progress template: {}", e)))?
            .progress_chars("#>-"));

        // Stream into a temporary file, then move it into place
        let temp_path = archive_path.with_extension("tmp");
        let mut file = async_fs::File::create(&temp_path).await?;

        use tokio::io::AsyncWriteExt;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            pb.inc(chunk.len() as u64);
        }

        file.flush().await?;
        drop(file);
        async_fs::rename(&temp_path, &archive_path).await?;
        pb.finish_with_message("Downloaded FFmpeg");

        info!("Extracting {}", archive_path.display());
        let extract_from = archive_path.clone();
        let extract_to = install_dir.clone();
        tokio::task::spawn_blocking(move || extract_archive(&extract_from, &extract_to))
            .await
            .map_err(|e| ClipJoinError::Setup(format!("Extraction task failed: {}", e)))??;

        async_fs::remove_file(&archive_path).await?;

        Self::locate_tool_dir(install_dir).ok_or_else(|| {
            ClipJoinError::Setup(format!(
                "Downloaded archive did not contain an ffmpeg binary under {}",
                install_dir.display()
            ))
        })
    }

    pub fn download_page(&self) -> &str {
        &self.config.download_page
    }
}

/// Rewrite the binary paths to the tools found in `dir`
pub fn apply_tool_dir(config: &mut Config, dir: &Path) {
    if let Some(ffmpeg) = find_binary(dir, "ffmpeg") {
        config.media.ffmpeg_path = ffmpeg.to_string_lossy().to_string();
    }
    if is_bare_name(&config.media.ffprobe_path) {
        if let Some(ffprobe) = find_binary(dir, "ffprobe") {
            config.media.ffprobe_path = ffprobe.to_string_lossy().to_string();
        }
    }
}

fn find_binary(dir: &Path, stem: &str) -> Option<PathBuf> {
    [stem.to_string(), format!("{}.exe", stem)]
        .into_iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

fn is_bare_name(binary: &str) -> bool {
    let path = Path::new(binary);
    path.components().count() == 1 && !path.is_absolute()
}

/// Unpack a zip archive below `dest`, skipping entries that would escape it
pub fn extract_archive(archive_path: &Path, dest: &Path) -> Result<()> {
    let file = fs::File::open(archive_path)?;
    let mut archive = zip::ZipArchive::new(file)?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;

        let outpath = match entry.enclosed_name() {
            Some(path) => dest.join(path),
            None => {
                warn!("Skipping unsafe archive entry: {}", entry.name());
                continue;
            }
        };

        if entry.is_dir() {
            fs::create_dir_all(&outpath)?;
            continue;
        }

        if let Some(parent) = outpath.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut outfile = fs::File::create(&outpath)?;
        std::io::copy(&mut entry, &mut outfile)?;
        outfile.flush()?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = entry.unix_mode().map(|m| m & 0o7777).filter(|m| *m != 0) {
                fs::set_permissions(&outpath, fs::Permissions::from_mode(mode))?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use assert_fs::TempDir;

    fn setup_config(root: &Path) -> SetupConfig {
        SetupConfig {
            search_root: root.to_path_buf(),
            install_dir: root.join("tools"),
            ..SetupConfig::default()
        }
    }

    #[test]
    fn test_locate_nested_tool_dir() {
        let dir = TempDir::new().unwrap();
        dir.child("ffmpeg-7.0-essentials/readme.txt").touch().unwrap();
        dir.child("ffmpeg-7.0-essentials/bin/ffmpeg.exe").touch().unwrap();

        let found = SetupManager::locate_tool_dir(dir.path()).unwrap();
        assert_eq!(found, dir.path().join("ffmpeg-7.0-essentials").join("bin"));
    }

    #[test]
    fn test_locate_ignores_directory_named_ffmpeg() {
        let dir = TempDir::new().unwrap();
        dir.child("ffmpeg/notes.txt").touch().unwrap();

        assert_eq!(SetupManager::locate_tool_dir(dir.path()), None);
    }

    #[test]
    fn test_initialize_resolves_local_install() {
        let dir = TempDir::new().unwrap();
        dir.child("bin/ffmpeg").touch().unwrap();
        dir.child("bin/ffprobe").touch().unwrap();

        let manager = SetupManager::new(setup_config(dir.path())).unwrap();
        let mut config = Config::default();
        manager.initialize(&mut config);

        let bin = dir.path().join("bin");
        assert_eq!(config.media.ffmpeg_path, bin.join("ffmpeg").to_string_lossy());
        assert_eq!(config.media.ffprobe_path, bin.join("ffprobe").to_string_lossy());
    }

    #[test]
    fn test_initialize_keeps_explicit_path() {
        let dir = TempDir::new().unwrap();
        dir.child("bin/ffmpeg").touch().unwrap();

        let manager = SetupManager::new(setup_config(dir.path())).unwrap();
        let mut config = Config::default();
        config.media.ffmpeg_path = "/opt/ffmpeg/bin/ffmpeg".to_string();
        manager.initialize(&mut config);

        assert_eq!(config.media.ffmpeg_path, "/opt/ffmpeg/bin/ffmpeg");
        assert_eq!(config.media.ffprobe_path, "ffprobe");
    }

    #[test]
    fn test_bare_name_detection() {
        assert!(is_bare_name("ffmpeg"));
        assert!(!is_bare_name("./ffmpeg"));
        assert!(!is_bare_name("/usr/bin/ffmpeg"));
    }

    #[test]
    fn test_extract_archive() {
        use zip::write::SimpleFileOptions;

        let dir = TempDir::new().unwrap();
        let archive_path = dir.path().join("build.zip");
        {
            let file = fs::File::create(&archive_path).unwrap();
            let mut writer = zip::ZipWriter::new(file);
            writer.add_directory("ffmpeg-build/bin/", SimpleFileOptions::default()).unwrap();
            writer.start_file("ffmpeg-build/bin/ffmpeg", SimpleFileOptions::default()).unwrap();
            writer.write_all(b"binary").unwrap();
            writer.finish().unwrap();
        }

        let dest = dir.path().join("tools");
        extract_archive(&archive_path, &dest).unwrap();

        let bin = dest.join("ffmpeg-build").join("bin");
        assert_eq!(fs::read(bin.join("ffmpeg")).unwrap(), b"binary");
        assert_eq!(SetupManager::locate_tool_dir(&dest), Some(bin));
    }
}
