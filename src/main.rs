//! clipjoin - trim, transcode and concatenate media files with ffmpeg
//!
//! Entry point: parses arguments, loads configuration, resolves the ffmpeg
//! install and dispatches to the workflow.

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use tracing_appender::{non_blocking, rolling};

use clipjoin::cli::{Args, Commands};
use clipjoin::config::Config;
use clipjoin::error::ClipJoinError;
use clipjoin::media::MediaProcessorFactory;
use clipjoin::setup::{apply_tool_dir, SetupManager};
use clipjoin::workflow::Workflow;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    setup_logging(args.verbose)?;

    // Load configuration
    let mut config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if std::path::Path::new("clipjoin.toml").exists() {
                info!("Found clipjoin.toml in current directory, loading...");
                Config::from_file("clipjoin.toml")?
            } else {
                Config::default()
            }
        }
    };

    let setup_manager = SetupManager::new(config.setup.clone())?;
    if args.command.uses_tools() {
        setup_manager.initialize(&mut config);
    }

    match args.command {
        Commands::Plan { session, json } => {
            let session = session.to_session(&config.output.default_name)?;
            let workflow = Workflow::new(&config);
            let plan = workflow.plan(&session).await?;

            if json {
                println!("{}", plan.to_json()?);
            } else {
                println!("Input files:");
                for input in session.inputs() {
                    println!("  {}", input);
                }
                println!();
                println!("{}", plan.render());
            }
        }
        Commands::Run { session } => {
            let session = session.to_session(&config.output.default_name)?;
            let workflow = Workflow::new(&config);
            let outcome = workflow.run(&session).await?;

            for step in &outcome.steps {
                let status = if step.success { "ok" } else { "FAILED" };
                println!("[{}] {}", status, step.command);
            }

            if outcome.output_exists {
                println!("Output file: {}", outcome.output_path.display());
            } else {
                println!("Output file not produced: {}", outcome.output_path.display());
            }

            if let Some(failure) = outcome.failure {
                return Err(ClipJoinError::CommandFailed {
                    command: failure.command,
                    detail: failure.detail,
                }
                .into());
            }
        }
        Commands::Probe { input } => {
            if !input.exists() {
                return Err(ClipJoinError::FileNotFound(input.display().to_string()).into());
            }
            let workflow = Workflow::new(&config);
            match workflow.probe(&input).await {
                Some(codec) => println!("{}", codec),
                None => println!("unknown"),
            }
        }
        Commands::Setup { download } => {
            let media = MediaProcessorFactory::create_processor(
                config.media.clone(),
                config.setup.download_page.clone(),
            );

            match media.check_availability().await {
                Ok(()) => {
                    println!("ffmpeg: {}", config.media.ffmpeg_path);
                    println!("ffprobe: {}", config.media.ffprobe_path);
                    println!("{}", media.get_version_info().await?);
                }
                Err(ClipJoinError::ToolNotInstalled { .. }) if download => {
                    let dir = setup_manager.download_tools().await?;
                    apply_tool_dir(&mut config, &dir);
                    println!("Installed ffmpeg into {}", dir.display());
                    println!("ffmpeg: {}", config.media.ffmpeg_path);
                }
                Err(ClipJoinError::ToolNotInstalled { binary, .. }) => {
                    println!("{} was not found.", binary);
                    println!(
                        "Run `clipjoin setup --download` or install it from {}",
                        setup_manager.download_page()
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }
        Commands::InitConfig { path, force } => {
            if path.exists() && !force {
                return Err(ClipJoinError::Config(format!(
                    "{} already exists; pass --force to overwrite",
                    path.display()
                ))
                .into());
            }
            Config::default().save_to_file(&path)?;
            println!("Wrote default configuration to {}", path.display());
        }
    }

    Ok(())
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool) -> Result<()> {
    let log_dir = std::env::current_dir()?.join(".clipjoin").join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Set up file appender with daily rotation
    let file_appender = rolling::daily(&log_dir, "clipjoin.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(guard);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    // Console output goes to stderr so plan output on stdout stays clean
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_file(verbose)
        .with_line_number(verbose);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!("Logging initialized - console: {}, file: {}",
          log_level, log_dir.join("clipjoin.log").display());

    Ok(())
}
