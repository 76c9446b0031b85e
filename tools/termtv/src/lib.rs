pub mod archival;
pub mod config;
pub mod errors;
pub mod http;
pub mod lifecycle;
pub mod logging;
pub mod recording;
pub mod resolver;
pub mod runtime;
pub mod types;

use clap::{error::ErrorKind, Args, CommandFactory, Parser, Subcommand};
use config::{absolutize_path, load_config, AppConfig, CliOverrides};
use errors::TermtvError;
use http::BuildRegistry;
use lifecycle::{BuildLifecycle, RecordingHandle, RecordingLifecycle};
use logging::JsonlLogger;
use runtime::ProductionRuntime;
use std::path::{Path, PathBuf};
use types::{BuildContext, RecordingName};

#[derive(Debug, Clone, Parser)]
#[command(name = "termtv")]
#[command(about = "Serve terminal recordings of builds, live or archived")]
pub struct Cli {
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    #[arg(long, global = true)]
    pub log_path: Option<PathBuf>,
    #[arg(long, global = true)]
    pub max_recording_bytes: Option<u64>,
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Clone, Args)]
pub struct RecordingArgs {
    /// Build workspace holding the live recording.
    #[arg(long)]
    pub workspace: PathBuf,
    /// Build artifacts directory holding the archive.
    #[arg(long)]
    pub artifacts: PathBuf,
    #[arg(long)]
    pub name: String,
    #[arg(long, default_value = "1")]
    pub build_id: String,
}

#[derive(Debug, Clone, Subcommand)]
pub enum CliCommand {
    /// Write the current recording bytes to stdout.
    Show(RecordingArgs),
    /// Print whether the recording is missing, live or archived.
    Status(RecordingArgs),
    /// Copy the live recording into the archive (build teardown).
    Archive(RecordingArgs),
    /// Serve the recording over HTTP until interrupted.
    Serve {
        #[command(flatten)]
        recording: RecordingArgs,
        #[arg(long)]
        bind: Option<String>,
    },
}

pub fn run() -> Result<i32, TermtvError> {
    let args = std::env::args_os().collect::<Vec<_>>();
    let cwd = std::env::current_dir().map_err(|e| TermtvError::Io(e.to_string()))?;
    let runtime = ProductionRuntime::new();
    run_with_runtime(&args, &cwd, &runtime)
}

pub fn run_with_runtime(
    args: &[std::ffi::OsString],
    cwd: &Path,
    runtime: &ProductionRuntime,
) -> Result<i32, TermtvError> {
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => match error.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                print!("{error}");
                return Ok(0);
            }
            _ => return Err(TermtvError::Cli(error.to_string())),
        },
    };

    let bind = match &cli.command {
        CliCommand::Serve { bind, .. } => bind.clone(),
        _ => None,
    };
    let overrides = CliOverrides {
        config_path: cli.config.clone(),
        bind,
        log_path: cli.log_path.clone(),
        max_recording_bytes: cli.max_recording_bytes,
    };
    let cfg = load_config(&overrides, cwd, runtime.file_system.as_ref())?;
    let lifecycle = RecordingLifecycle::new(runtime.file_system.clone(), cfg.clone());

    match &cli.command {
        CliCommand::Show(args) => {
            let handle = start_build(&lifecycle, args, cwd)?;
            if let Some(bytes) = handle.fetch().into_bytes() {
                runtime.terminal.write_bytes(&bytes)?;
            }
        }
        CliCommand::Status(args) => {
            let handle = start_build(&lifecycle, args, cwd)?;
            runtime.terminal.write_line(&format!(
                "state={} archive={} live={}",
                handle.state().as_str(),
                handle.recording().archive_location.display(),
                handle.recording().live_location.display()
            ))?;
        }
        CliCommand::Archive(args) => {
            let handle = start_build(&lifecycle, args, cwd)?;
            let outcome = lifecycle.on_build_end(&handle);
            runtime.terminal.write_line(&outcome.describe())?;
        }
        CliCommand::Serve { recording, .. } => {
            let handle = start_build(&lifecycle, recording, cwd)?;
            serve_single_build(runtime, &cfg, handle)?;
        }
    }

    Ok(0)
}

fn start_build(
    lifecycle: &RecordingLifecycle,
    args: &RecordingArgs,
    cwd: &Path,
) -> Result<RecordingHandle, TermtvError> {
    let name = RecordingName::parse(&args.name)?;
    let build = BuildContext {
        build_id: args.build_id.clone(),
        workspace_dir: absolutize_path(cwd, &args.workspace),
        artifacts_dir: absolutize_path(cwd, &args.artifacts),
    };
    lifecycle.on_build_start(build, &name)
}

fn serve_single_build(
    runtime: &ProductionRuntime,
    cfg: &AppConfig,
    handle: RecordingHandle,
) -> Result<(), TermtvError> {
    let server = http::bind(&cfg.server.bind)?;
    let addr = server
        .server_addr()
        .to_ip()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|| cfg.server.bind.clone());
    runtime.terminal.write_line(&format!(
        "serving http://{addr}/builds/{}/{}",
        handle.build().build_id,
        cfg.viewer.url_name
    ))?;

    let registry = BuildRegistry::new();
    registry.register(handle);
    let logger = JsonlLogger::from_config(&cfg.logging);
    http::serve(&server, &registry, logger.as_ref());
    Ok(())
}

pub fn render_help() -> String {
    let mut cmd = Cli::command();
    cmd.render_long_help().to_string()
}
