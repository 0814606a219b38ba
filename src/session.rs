//! Session state for one clipping job: the selected inputs, the output target,
//! the trim interval and the codec overrides.
//!
//! A `Session` is a plain value. The plan builder borrows it and never mutates
//! it, so the output target cannot change underneath a running plan.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{Result, ClipJoinError};

/// A media file chosen by the user
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputFile {
    pub path: PathBuf,
    pub name: String,
    pub media_type: String,
    pub size: u64,
}

impl InputFile {
    /// Resolve a path on disk into an input file with its name, type hint and size
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let metadata = std::fs::metadata(path)
            .map_err(|_| ClipJoinError::FileNotFound(path.display().to_string()))?;

        if !metadata.is_file() {
            return Err(ClipJoinError::FileNotFound(path.display().to_string()));
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self {
            path: path.to_path_buf(),
            name,
            media_type: media_type_for(path).to_string(),
            size: metadata.len(),
        })
    }
}

impl fmt::Display for InputFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {} bytes)", self.name, self.media_type, self.size)
    }
}

/// Best-effort MIME type from the file extension
fn media_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "mp4" | "m4v" => "video/mp4",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "mkv" => "video/x-matroska",
        "webm" => "video/webm",
        "ts" => "video/mp2t",
        "flv" => "video/x-flv",
        "wmv" => "video/x-ms-wmv",
        "mp3" => "audio/mpeg",
        "aac" => "audio/aac",
        "m4a" => "audio/mp4",
        "wav" => "audio/wav",
        _ => "application/octet-stream",
    }
}

/// Time range to keep from a single input, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct TrimInterval {
    pub start: f64,
    pub end: f64,
}

impl TrimInterval {
    pub fn new(start: f64, end: f64) -> Result<Self> {
        for (label, value) in [("start", start), ("end", end)] {
            if !value.is_finite() || value < 0.0 {
                return Err(ClipJoinError::InvalidSession(format!(
                    "trim {} must be a non-negative number of seconds, got {}",
                    label, value
                )));
            }
        }
        Ok(Self { start, end })
    }

    /// A trim is applied whenever either bound is positive
    pub fn is_engaged(&self) -> bool {
        self.start > 0.0 || self.end > 0.0
    }

    /// `end - start`, passed through even when non-positive
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Codec overrides; `None` keeps ffmpeg's default for that stream
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CodecSelection {
    pub video: Option<String>,
    pub audio: Option<String>,
}

impl CodecSelection {
    pub fn new(video: Option<String>, audio: Option<String>) -> Self {
        Self {
            video: non_blank(video),
            audio: non_blank(audio),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Container formats offered for the output file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Mp4,
    Avi,
    Mov,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 3] = [OutputFormat::Mp4, OutputFormat::Avi, OutputFormat::Mov];

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Mp4 => "mp4",
            OutputFormat::Avi => "avi",
            OutputFormat::Mov => "mov",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.extension().eq_ignore_ascii_case(ext))
    }

    pub fn parse(name: &str) -> Result<Self> {
        Self::from_extension(name).ok_or_else(|| {
            ClipJoinError::Config(format!(
                "Invalid output format '{}'. Valid formats: mp4, avi, mov",
                name
            ))
        })
    }
}

/// Where the finished file is written
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputTarget {
    path: PathBuf,
    format: OutputFormat,
}

impl OutputTarget {
    /// Pair a destination with a format.
    ///
    /// Without an explicit format the extension decides, falling back to mp4.
    /// A path without an extension receives the format's extension.
    pub fn new<P: Into<PathBuf>>(path: P, format: Option<OutputFormat>) -> Self {
        let mut path = path.into();
        let from_ext = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(OutputFormat::from_extension);
        let format = format.or(from_ext).unwrap_or(OutputFormat::Mp4);

        if path.extension().is_none() {
            path.set_extension(format.extension());
        }

        Self { path, format }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }
}

/// Everything the plan builder needs for one job
#[derive(Debug, Clone, Default, Serialize)]
pub struct Session {
    inputs: Vec<InputFile>,
    output: Option<OutputTarget>,
    trim: Option<TrimInterval>,
    codecs: CodecSelection,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append inputs, keeping selection order
    pub fn add_inputs<I: IntoIterator<Item = InputFile>>(&mut self, files: I) {
        self.inputs.extend(files);
    }

    pub fn set_output(&mut self, output: OutputTarget) {
        self.output = Some(output);
    }

    pub fn set_trim(&mut self, trim: Option<TrimInterval>) {
        self.trim = trim;
    }

    pub fn set_codecs(&mut self, codecs: CodecSelection) {
        self.codecs = codecs;
    }

    pub fn with_inputs<I: IntoIterator<Item = InputFile>>(mut self, files: I) -> Self {
        self.add_inputs(files);
        self
    }

    pub fn with_output(mut self, output: OutputTarget) -> Self {
        self.set_output(output);
        self
    }

    pub fn with_trim(mut self, trim: TrimInterval) -> Self {
        self.set_trim(Some(trim));
        self
    }

    pub fn with_codecs(mut self, codecs: CodecSelection) -> Self {
        self.set_codecs(codecs);
        self
    }

    pub fn inputs(&self) -> &[InputFile] {
        &self.inputs
    }

    pub fn output(&self) -> Option<&OutputTarget> {
        self.output.as_ref()
    }

    pub fn trim(&self) -> Option<&TrimInterval> {
        self.trim.as_ref()
    }

    pub fn codecs(&self) -> &CodecSelection {
        &self.codecs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_engagement() {
        assert!(!TrimInterval::default().is_engaged());
        assert!(TrimInterval::new(2.0, 5.0).unwrap().is_engaged());
        assert!(TrimInterval::new(0.0, 5.0).unwrap().is_engaged());
        assert!(TrimInterval::new(3.0, 0.0).unwrap().is_engaged());
    }

    #[test]
    fn test_trim_duration_is_not_validated() {
        let trim = TrimInterval::new(5.0, 2.0).unwrap();
        assert_eq!(trim.duration(), -3.0);
    }

    #[test]
    fn test_trim_rejects_negative_and_nan() {
        assert!(TrimInterval::new(-1.0, 2.0).is_err());
        assert!(TrimInterval::new(0.0, f64::NAN).is_err());
    }

    #[test]
    fn test_blank_codecs_are_absent() {
        let codecs = CodecSelection::new(Some("  ".to_string()), Some("aac".to_string()));
        assert_eq!(codecs.video, None);
        assert_eq!(codecs.audio.as_deref(), Some("aac"));
    }

    #[test]
    fn test_output_target_format_resolution() {
        let target = OutputTarget::new("clip.MOV", None);
        assert_eq!(target.format(), OutputFormat::Mov);
        assert_eq!(target.path(), Path::new("clip.MOV"));

        let target = OutputTarget::new("clip", Some(OutputFormat::Avi));
        assert_eq!(target.path(), Path::new("clip.avi"));

        let target = OutputTarget::new("clip.mkv", None);
        assert_eq!(target.format(), OutputFormat::Mp4);
        assert_eq!(target.path(), Path::new("clip.mkv"));
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!(OutputFormat::parse("MP4").unwrap(), OutputFormat::Mp4);
        assert!(OutputFormat::parse("gif").is_err());
    }

    #[test]
    fn test_input_file_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("holiday.mp4");
        std::fs::write(&path, b"0123456789").unwrap();

        let input = InputFile::from_path(&path).unwrap();
        assert_eq!(input.name, "holiday.mp4");
        assert_eq!(input.media_type, "video/mp4");
        assert_eq!(input.size, 10);
        assert_eq!(input.to_string(), "holiday.mp4 (video/mp4, 10 bytes)");
    }

    #[test]
    fn test_input_file_missing() {
        let err = InputFile::from_path("/nonexistent/clip.mp4").unwrap_err();
        assert!(matches!(err, ClipJoinError::FileNotFound(_)));
    }

    #[test]
    fn test_inputs_keep_selection_order() {
        let file = |name: &str| InputFile {
            path: PathBuf::from(name),
            name: name.to_string(),
            media_type: "video/mp4".to_string(),
            size: 0,
        };

        let mut session = Session::new().with_inputs([file("b.mp4")]);
        session.add_inputs([file("a.mp4"), file("c.mp4")]);

        let names: Vec<_> = session.inputs().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["b.mp4", "a.mp4", "c.mp4"]);
    }
}
