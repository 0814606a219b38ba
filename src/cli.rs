use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::error::Result;
use crate::session::{CodecSelection, InputFile, OutputFormat, OutputTarget, Session, TrimInterval};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the ffmpeg commands that would produce the output
    Plan {
        #[command(flatten)]
        session: SessionArgs,

        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// Build the plan, run it and remove intermediate files
    Run {
        #[command(flatten)]
        session: SessionArgs,
    },

    /// Print the codec of a file's first video stream
    Probe {
        /// Media file to inspect
        input: PathBuf,
    },

    /// Locate ffmpeg, optionally downloading a build
    Setup {
        /// Download and extract ffmpeg when it is not available
        #[arg(long)]
        download: bool,
    },

    /// Write the default configuration file
    InitConfig {
        /// Destination path
        #[arg(default_value = "clipjoin.toml")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

impl Commands {
    /// Whether the command starts ffmpeg or ffprobe and so needs a local
    /// install resolved first
    pub fn uses_tools(&self) -> bool {
        matches!(
            self,
            Commands::Run { .. } | Commands::Probe { .. } | Commands::Setup { .. }
        )
    }
}

/// Inputs, output and options describing one job
#[derive(clap::Args, Debug, Clone)]
pub struct SessionArgs {
    /// Input media files, concatenated in the order given
    #[arg(short, long = "input", required = true, num_args = 1..)]
    pub inputs: Vec<PathBuf>,

    /// Output file (defaults to the configured default name)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output container: mp4, avi or mov
    #[arg(short, long)]
    pub format: Option<String>,

    /// Trim start in seconds (single input only)
    #[arg(long)]
    pub start: Option<f64>,

    /// Trim end in seconds (single input only)
    #[arg(long)]
    pub end: Option<f64>,

    /// Video codec override, e.g. libx264 (single input only)
    #[arg(long)]
    pub video_codec: Option<String>,

    /// Audio codec override, e.g. aac (single input only)
    #[arg(long)]
    pub audio_codec: Option<String>,
}

impl SessionArgs {
    /// Resolve the arguments into a session, reading input metadata from disk
    pub fn to_session(&self, default_output: &str) -> Result<Session> {
        let inputs = self
            .inputs
            .iter()
            .map(InputFile::from_path)
            .collect::<Result<Vec<_>>>()?;

        let format = self.format.as_deref().map(OutputFormat::parse).transpose()?;
        let output_path = self
            .output
            .clone()
            .unwrap_or_else(|| PathBuf::from(default_output));

        let mut session = Session::new()
            .with_inputs(inputs)
            .with_output(OutputTarget::new(output_path, format))
            .with_codecs(CodecSelection::new(self.video_codec.clone(), self.audio_codec.clone()));

        if self.start.is_some() || self.end.is_some() {
            let trim = TrimInterval::new(self.start.unwrap_or(0.0), self.end.unwrap_or(0.0))?;
            session.set_trim(Some(trim));
        }

        Ok(session)
    }
}
