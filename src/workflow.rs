use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::cleanup::{cleanup, CleanupReport};
use crate::config::Config;
use crate::error::{Result, ClipJoinError};
use crate::media::{
    CodecInspectorTrait, FfprobeInspector, MediaProcessorFactory, MediaProcessorTrait,
};
use crate::plan::{CommandPlan, PlanBuilder};
use crate::session::Session;

/// Result of one attempted command
#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub command: String,
    pub success: bool,
    pub detail: Option<String>,
}

/// The command that stopped a plan early
#[derive(Debug, Clone, Serialize)]
pub struct StepFailure {
    pub command: String,
    pub detail: String,
}

/// Everything a finished (or aborted) run reports back
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub steps: Vec<StepReport>,
    pub failure: Option<StepFailure>,
    pub cleanup: CleanupReport,
    pub output_path: PathBuf,
    pub output_exists: bool,
}

impl RunOutcome {
    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }
}

pub struct Workflow {
    media: Box<dyn MediaProcessorTrait>,
    inspector: Arc<dyn CodecInspectorTrait>,
    builder: PlanBuilder,
}

impl Workflow {
    pub fn new(config: &Config) -> Self {
        let media = MediaProcessorFactory::create_processor(
            config.media.clone(),
            config.setup.download_page.clone(),
        );
        let inspector: Arc<dyn CodecInspectorTrait> =
            Arc::new(FfprobeInspector::new(&config.media.ffprobe_path));

        Self::with_parts(config, media, inspector)
    }

    /// Assemble a workflow from explicit collaborators
    pub fn with_parts(
        config: &Config,
        media: Box<dyn MediaProcessorTrait>,
        inspector: Arc<dyn CodecInspectorTrait>,
    ) -> Self {
        let builder = PlanBuilder::new(&config.media.ffmpeg_path, inspector.clone())
            .with_work_dir(config.media.work_dir.clone());

        Self {
            media,
            inspector,
            builder,
        }
    }

    /// Compute the plan for a session without running anything
    pub async fn plan(&self, session: &Session) -> Result<CommandPlan> {
        self.builder.build(session).await
    }

    /// Report the codec of a file's primary video stream
    pub async fn probe(&self, path: &std::path::Path) -> Option<String> {
        self.inspector.inspect_video_codec(path).await
    }

    /// Check ffmpeg, build the plan, run it step by step and clean up.
    ///
    /// A missing ffmpeg is returned as an error before anything runs. A failing
    /// step is reported in the outcome; intermediates are removed either way.
    pub async fn run(&self, session: &Session) -> Result<RunOutcome> {
        self.media.check_availability().await?;

        let plan = self.plan(session).await?;
        let output_path = session
            .output()
            .map(|o| o.path().to_path_buf())
            .ok_or_else(|| ClipJoinError::InvalidSession("no output file selected".to_string()))?;

        info!("Running plan with {} commands", plan.commands().len());
        let (steps, failure) = self.execute_plan(&plan).await;

        let cleanup = cleanup(plan.artifacts()).await;
        if !cleanup.is_clean() {
            warn!("{} intermediate files could not be deleted", cleanup.failed.len());
        }

        let output_exists = tokio::fs::try_exists(&output_path).await.unwrap_or(false);
        if output_exists {
            info!("Output file: {}", output_path.display());
        } else {
            warn!("Output file not produced: {}", output_path.display());
        }

        Ok(RunOutcome {
            steps,
            failure,
            cleanup,
            output_path,
            output_exists,
        })
    }

    /// Run commands strictly in order, stopping at the first failure
    async fn execute_plan(&self, plan: &CommandPlan) -> (Vec<StepReport>, Option<StepFailure>) {
        let mut steps = Vec::with_capacity(plan.commands().len());

        for command in plan.commands() {
            let rendered = command.to_string();
            match self.media.execute_command(command).await {
                Ok(()) => {
                    info!("Command succeeded: {}", rendered);
                    steps.push(StepReport {
                        command: rendered,
                        success: true,
                        detail: None,
                    });
                }
                Err(e) => {
                    let detail = match e {
                        ClipJoinError::CommandFailed { detail, .. } => detail,
                        other => other.to_string(),
                    };
                    error!("Command failed: {}\n{}", rendered, detail);
                    steps.push(StepReport {
                        command: rendered.clone(),
                        success: false,
                        detail: Some(detail.clone()),
                    });
                    return (steps, Some(StepFailure { command: rendered, detail }));
                }
            }
        }

        (steps, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{MockCodecInspectorTrait, MockMediaProcessorTrait};
    use crate::session::{InputFile, OutputTarget};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn input(path: &str) -> InputFile {
        InputFile {
            path: PathBuf::from(path),
            name: path.to_string(),
            media_type: "video/mp4".to_string(),
            size: 0,
        }
    }

    fn config_in(dir: &TempDir) -> Config {
        let mut config = Config::default();
        config.media.work_dir = Some(dir.path().to_path_buf());
        config
    }

    fn h264_inspector() -> Arc<dyn CodecInspectorTrait> {
        let mut mock = MockCodecInspectorTrait::new();
        mock.expect_inspect_video_codec()
            .returning(|_| Some("h264".to_string()));
        Arc::new(mock)
    }

    #[tokio::test]
    async fn test_missing_tool_stops_before_planning() {
        let dir = TempDir::new().unwrap();
        let mut media = MockMediaProcessorTrait::new();
        media.expect_check_availability().returning(|| {
            Err(ClipJoinError::ToolNotInstalled {
                binary: "ffmpeg".to_string(),
                download_page: "https://ffmpeg.org/download.html".to_string(),
            })
        });
        media.expect_execute_command().never();

        let mut inspector = MockCodecInspectorTrait::new();
        inspector.expect_inspect_video_codec().never();

        let workflow = Workflow::with_parts(&config_in(&dir), Box::new(media), Arc::new(inspector));
        let session = Session::new()
            .with_inputs([input("a.mp4"), input("b.mp4")])
            .with_output(OutputTarget::new(dir.path().join("out.mp4"), None));

        let err = workflow.run(&session).await.unwrap_err();
        assert!(matches!(err, ClipJoinError::ToolNotInstalled { .. }));
    }

    #[tokio::test]
    async fn test_failure_aborts_remaining_steps_and_cleans_up() {
        let dir = TempDir::new().unwrap();
        let executed = Arc::new(AtomicUsize::new(0));

        let mut media = MockMediaProcessorTrait::new();
        media.expect_check_availability().returning(|| Ok(()));
        let counter = executed.clone();
        media.expect_execute_command().returning(move |command| {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            // The remux writes its intermediate; the second one fails
            let target = PathBuf::from(command.os_args().last().unwrap_or_default());
            std::fs::write(&target, b"ts").unwrap();
            if n == 1 {
                Err(ClipJoinError::CommandFailed {
                    command: command.to_string(),
                    detail: "Invalid data found when processing input".to_string(),
                })
            } else {
                Ok(())
            }
        });

        let workflow = Workflow::with_parts(&config_in(&dir), Box::new(media), h264_inspector());
        let session = Session::new()
            .with_inputs([input("a.mp4"), input("b.mp4"), input("c.mp4")])
            .with_output(OutputTarget::new(dir.path().join("out.mp4"), None));

        let outcome = workflow.run(&session).await.unwrap();

        assert_eq!(executed.load(Ordering::SeqCst), 2);
        assert_eq!(outcome.steps.len(), 2);
        assert!(outcome.steps[0].success);
        assert!(!outcome.steps[1].success);

        let failure = outcome.failure.as_ref().unwrap();
        assert!(failure.command.contains("b.mp4"));
        assert_eq!(failure.detail, "Invalid data found when processing input");

        // All three intermediates are swept; the third was never written
        assert_eq!(outcome.cleanup.removed.len(), 2);
        assert_eq!(outcome.cleanup.failed.len(), 1);
        assert!(!dir.path().join("intermediate1.ts").exists());
        assert!(!dir.path().join("intermediate2.ts").exists());

        assert!(!outcome.output_exists);
        assert!(!outcome.succeeded());
    }

    #[tokio::test]
    async fn test_successful_concat_reports_output() {
        let dir = TempDir::new().unwrap();

        let mut media = MockMediaProcessorTrait::new();
        media.expect_check_availability().returning(|| Ok(()));
        media.expect_execute_command().times(3).returning(|command| {
            let target = PathBuf::from(command.os_args().last().unwrap_or_default());
            std::fs::write(&target, b"data").unwrap();
            Ok(())
        });

        let workflow = Workflow::with_parts(&config_in(&dir), Box::new(media), h264_inspector());
        let output = dir.path().join("joined.mp4");
        let session = Session::new()
            .with_inputs([input("a.mp4"), input("b.mp4")])
            .with_output(OutputTarget::new(&output, None));

        let outcome = workflow.run(&session).await.unwrap();

        assert!(outcome.succeeded());
        assert_eq!(outcome.steps.len(), 3);
        assert!(outcome.steps.iter().all(|s| s.success));
        assert!(outcome.cleanup.is_clean());
        assert_eq!(outcome.cleanup.removed.len(), 2);
        assert!(outcome.output_exists);
        assert_eq!(outcome.output_path, output);
    }

    #[tokio::test]
    async fn test_single_input_run_has_nothing_to_clean() {
        let dir = TempDir::new().unwrap();

        let mut media = MockMediaProcessorTrait::new();
        media.expect_check_availability().returning(|| Ok(()));
        media.expect_execute_command().times(1).returning(|_| Ok(()));

        let mut inspector = MockCodecInspectorTrait::new();
        inspector.expect_inspect_video_codec().never();

        let workflow = Workflow::with_parts(&config_in(&dir), Box::new(media), Arc::new(inspector));
        let session = Session::new()
            .with_inputs([input("a.mp4")])
            .with_output(OutputTarget::new(dir.path().join("out.mp4"), None));

        let outcome = workflow.run(&session).await.unwrap();

        assert!(outcome.succeeded());
        assert_eq!(outcome.cleanup, CleanupReport::default());
        assert!(!outcome.output_exists);
    }
}
