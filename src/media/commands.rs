use serde::{Serialize, Serializer};
use std::borrow::Cow;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::Path;
use tokio::process::Command;
use tracing::debug;

use crate::error::{Result, ClipJoinError};

/// One token of a media command line.
///
/// Paths are kept apart from flags so the display form can quote them.
/// They stay OS strings so a file name that is not valid UTF-8 reaches the
/// child process byte for byte; execution passes every token as a separate
/// argv entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaArg {
    Flag(String),
    Path(OsString),
}

impl MediaArg {
    pub fn as_os_str(&self) -> &OsStr {
        match self {
            MediaArg::Flag(s) => OsStr::new(s),
            MediaArg::Path(p) => p.as_os_str(),
        }
    }

    /// Text form, replacing invalid UTF-8 in paths
    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        match self {
            MediaArg::Flag(s) => Cow::Borrowed(s.as_str()),
            MediaArg::Path(p) => p.to_string_lossy(),
        }
    }
}

impl Serialize for MediaArg {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string_lossy())
    }
}

/// Abstract media processing command representation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaCommand {
    pub binary_path: String,
    pub args: Vec<MediaArg>,
    pub description: String,
}

impl MediaCommand {
    /// Create a new media processing command
    pub fn new<S1: Into<String>, S2: Into<String>>(binary_path: S1, description: S2) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: Vec::new(),
            description: description.into(),
        }
    }

    /// Add an argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(MediaArg::Flag(arg.into()));
        self
    }

    /// Add a path argument
    pub fn path_arg<S: Into<OsString>>(mut self, path: S) -> Self {
        self.args.push(MediaArg::Path(path.into()));
        self
    }

    /// Add input file
    pub fn input<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg("-i").path_arg(path.as_ref())
    }

    /// Add output file
    pub fn output<P: AsRef<Path>>(self, path: P) -> Self {
        self.path_arg(path.as_ref())
    }

    /// Force overwrite output
    pub fn overwrite(self) -> Self {
        self.arg("-y")
    }

    /// Seek to `start` and keep `duration` seconds
    pub fn trim(self, start: f64, duration: f64) -> Self {
        self.arg("-ss")
            .arg(format_seconds(start))
            .arg("-t")
            .arg(format_seconds(duration))
    }

    /// Set video codec
    pub fn video_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:v").arg(codec)
    }

    /// Set audio codec
    pub fn audio_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:a").arg(codec)
    }

    /// Copy every stream without re-encoding
    pub fn copy_streams(self) -> Self {
        self.arg("-c").arg("copy")
    }

    /// Apply a bitstream filter to the video stream
    pub fn video_bitstream_filter<S: Into<String>>(self, filter: S) -> Self {
        self.arg("-bsf:v").arg(filter)
    }

    /// Apply a bitstream filter to the audio stream
    pub fn audio_bitstream_filter<S: Into<String>>(self, filter: S) -> Self {
        self.arg("-bsf:a").arg(filter)
    }

    /// Force the output container format
    pub fn format<S: Into<String>>(self, format: S) -> Self {
        self.arg("-f").arg(format)
    }

    /// Argument tokens exactly as they are handed to the child process
    pub fn os_args(&self) -> impl Iterator<Item = &OsStr> + '_ {
        self.args.iter().map(MediaArg::as_os_str)
    }

    /// Argument tokens as text, for logs and assertions
    pub fn arg_strs(&self) -> Vec<Cow<'_, str>> {
        self.args.iter().map(MediaArg::to_string_lossy).collect()
    }

    /// Execute the command, waiting for the child process to exit
    pub async fn execute(&self) -> Result<()> {
        debug!("Executing media processing command: {} {:?}", self.binary_path, self.arg_strs());
        debug!("Description: {}", self.description);

        let output = Command::new(&self.binary_path)
            .args(self.os_args())
            .output()
            .await
            .map_err(|e| ClipJoinError::CommandFailed {
                command: self.to_string(),
                detail: format!("Failed to start {}: {}", self.binary_path, e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ClipJoinError::CommandFailed {
                command: self.to_string(),
                detail: format!(
                    "{} failed ({}): {}",
                    self.description,
                    output.status,
                    stderr.trim()
                ),
            });
        }

        Ok(())
    }
}

/// Shell-style rendering, with path tokens double-quoted
impl fmt::Display for MediaCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.binary_path)?;
        for arg in &self.args {
            match arg {
                MediaArg::Flag(s) => write!(f, " {}", s)?,
                MediaArg::Path(p) => {
                    write!(f, " \"{}\"", escape_double_quoted(&p.to_string_lossy()))?
                }
            }
        }
        Ok(())
    }
}

fn escape_double_quoted(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '"' | '\\' | '$' | '`') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Seconds as ffmpeg expects them: `2` rather than `2.0`, `2.5` stays `2.5`
pub fn format_seconds(seconds: f64) -> String {
    seconds.to_string()
}

/// Builder for the commands a clipping plan is made of
#[derive(Debug, Clone)]
pub struct MediaCommandBuilder {
    binary_path: String,
}

impl MediaCommandBuilder {
    /// Create a new command builder
    pub fn new<S: Into<String>>(binary_path: S) -> Self {
        Self {
            binary_path: binary_path.into(),
        }
    }

    /// Build remux command: copy all streams into an MPEG-TS container,
    /// converting the video bitstream to Annex B
    pub fn remux_to_transport_stream<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        input_path: P,
        intermediate_path: Q,
        video_filter: &str,
    ) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Remux to transport stream")
            .overwrite()
            .input(input_path)
            .copy_streams()
            .video_bitstream_filter(video_filter)
            .format("mpegts")
            .output(intermediate_path)
    }

    /// Build concat command joining transport streams through the concat protocol
    pub fn concat_transport_streams<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        parts: &[P],
        output_path: Q,
    ) -> MediaCommand {
        let mut source = OsString::from("concat:");
        for (i, part) in parts.iter().enumerate() {
            if i > 0 {
                source.push("|");
            }
            source.push(part.as_ref().as_os_str());
        }

        MediaCommand::new(&self.binary_path, "Concatenate transport streams")
            .overwrite()
            .arg("-i")
            .path_arg(source)
            .copy_streams()
            .audio_bitstream_filter("aac_adtstoasc")
            .output(output_path)
    }

    /// Build version check command
    pub fn version_check(&self) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Version check")
            .arg("-version")
    }

    /// Build custom command
    pub fn custom<S: Into<String>>(&self, description: S) -> MediaCommand {
        MediaCommand::new(&self.binary_path, description.into())
    }
}
