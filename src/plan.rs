//! Command plan generation.
//!
//! A plan is the ordered list of ffmpeg invocations that turns a [`Session`]
//! into one output file, plus the intermediate files those invocations leave
//! behind. Building a plan only computes commands. The single exception to
//! "no side effects" is the codec probe run for multi-input sessions.
//!
//! Two shapes exist:
//!
//! * one input: a single command that optionally trims and transcodes;
//! * several inputs: every input is remuxed into an MPEG-TS intermediate,
//!   then the intermediates are joined with the concat protocol. Trim and
//!   codec overrides do not apply to this shape.

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{Result, ClipJoinError};
use crate::media::{CodecInspectorTrait, MediaCommand, MediaCommandBuilder, HEVC_CODEC};
use crate::session::{InputFile, OutputTarget, Session};

/// Annex B conversion applied while remuxing into a transport stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BitstreamFilter {
    H264AnnexB,
    HevcAnnexB,
}

impl BitstreamFilter {
    /// HEVC gets its own filter; everything else, including an unknown codec,
    /// is treated as H.264.
    pub fn for_codec(codec: Option<&str>) -> Self {
        match codec {
            Some(HEVC_CODEC) => BitstreamFilter::HevcAnnexB,
            _ => BitstreamFilter::H264AnnexB,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BitstreamFilter::H264AnnexB => "h264_mp4toannexb",
            BitstreamFilter::HevcAnnexB => "hevc_mp4toannexb",
        }
    }
}

/// Ordered commands plus the intermediate files they create
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandPlan {
    commands: Vec<MediaCommand>,
    artifacts: Vec<PathBuf>,
}

impl CommandPlan {
    pub fn commands(&self) -> &[MediaCommand] {
        &self.commands
    }

    /// Intermediate files, in creation order. Empty for single-input plans.
    pub fn artifacts(&self) -> &[PathBuf] {
        &self.artifacts
    }

    /// One shell-style line per command
    pub fn render(&self) -> String {
        self.commands
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Pretty-printed JSON form of the plan
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

pub struct PlanBuilder {
    commands: MediaCommandBuilder,
    inspector: Arc<dyn CodecInspectorTrait>,
    work_dir: Option<PathBuf>,
}

impl PlanBuilder {
    pub fn new<S: Into<String>>(ffmpeg_path: S, inspector: Arc<dyn CodecInspectorTrait>) -> Self {
        Self {
            commands: MediaCommandBuilder::new(ffmpeg_path),
            inspector,
            work_dir: None,
        }
    }

    /// Place intermediates under `dir` instead of the current directory
    pub fn with_work_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.work_dir = dir;
        self
    }

    /// Build the plan for the current session state.
    ///
    /// Calling this again with the same session yields an identical plan; the
    /// artifact list is rebuilt each time, never accumulated.
    pub async fn build(&self, session: &Session) -> Result<CommandPlan> {
        let output = session
            .output()
            .ok_or_else(|| ClipJoinError::InvalidSession("no output file selected".to_string()))?;

        match session.inputs() {
            [] => Err(ClipJoinError::InvalidSession("no input files selected".to_string())),
            [_] => Ok(self.single_input_plan(session, output)),
            inputs => self.concat_plan(inputs, output).await,
        }
    }

    fn single_input_plan(&self, session: &Session, output: &OutputTarget) -> CommandPlan {
        let mut command = self.commands.custom("Trim and transcode").overwrite();

        for input in session.inputs() {
            command = command.input(&input.path);
        }

        if let Some(trim) = session.trim().filter(|t| t.is_engaged()) {
            command = command.trim(trim.start, trim.duration());
        }

        let codecs = session.codecs();
        if let Some(video) = &codecs.video {
            command = command.video_codec(video);
        }
        if let Some(audio) = &codecs.audio {
            command = command.audio_codec(audio);
        }

        let command = command.output(output.path());
        debug!("Single-input plan: {}", command);

        CommandPlan {
            commands: vec![command],
            artifacts: Vec::new(),
        }
    }

    async fn concat_plan(
        &self,
        inputs: &[InputFile],
        output: &OutputTarget,
    ) -> Result<CommandPlan> {
        let artifacts: Vec<PathBuf> = (1..=inputs.len())
            .map(|n| self.intermediate_path(n))
            .collect();

        // Remuxes overwrite their targets and cleanup deletes them afterwards
        let user_paths = inputs.iter().map(|i| i.path.as_path()).chain([output.path()]);
        for path in user_paths {
            if artifacts.iter().any(|a| same_location(a, path)) {
                return Err(ClipJoinError::InvalidSession(format!(
                    "{} collides with an intermediate file; rename or move it",
                    path.display()
                )));
            }
        }

        // The first input decides the filter for the whole batch
        let codec = self.inspector.inspect_video_codec(&inputs[0].path).await;
        let filter = BitstreamFilter::for_codec(codec.as_deref());
        info!(
            "Concatenating {} inputs using {} (first input codec: {})",
            inputs.len(),
            filter.name(),
            codec.as_deref().unwrap_or("unknown")
        );

        let mut commands: Vec<MediaCommand> = inputs
            .iter()
            .zip(&artifacts)
            .map(|(input, intermediate)| {
                self.commands
                    .remux_to_transport_stream(&input.path, intermediate, filter.name())
            })
            .collect();

        commands.push(self.commands.concat_transport_streams(&artifacts[..], output.path()));

        Ok(CommandPlan { commands, artifacts })
    }

    fn intermediate_path(&self, n: usize) -> PathBuf {
        let name = format!("intermediate{}.ts", n);
        match &self.work_dir {
            Some(dir) => dir.join(name),
            None => PathBuf::from(name),
        }
    }
}

/// Lexical comparison after resolving against the current directory
fn same_location(a: &Path, b: &Path) -> bool {
    match (std::path::absolute(a), std::path::absolute(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
