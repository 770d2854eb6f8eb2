use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::CommandFactory;
use sara::backend::SubprocessBackend;
use sara::cli::commands::{
    BatchCommand, BatchInvocation, FramesToTimeCommand, ListCommand, ReplayCommand, RunCommand, SerialCommand,
    SweepCommand,
};
use sara::cli::output::*;
use sara::cli::{Cli, Command};
use sara::core::{Config, OutputLayout, PipelineError, Recording};
use sara::execution::{JobSelection, Partition, PipelineEvent, PipelineOrchestrator, RunSummary};
use sara::export;
use sara::persistence::SettingsStore;
use sara::prompt::Prompter;
use sara::stages::{ConfigSource, StageOptions};
use sara::sweep::SweepPlan;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, Level};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set logging subscriber")?;

    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    debug!("Using backend '{}'", config.backend.command);

    // Execute command
    match &cli.command {
        Command::Batch(cmd) => batch_job(cmd, &config)?,
        Command::Serial(cmd) => serial_batch(cmd, &config)?,
        Command::Run(cmd) => capture_run(cmd, &config)?,
        Command::Replay(cmd) => replay_one(cmd, &config)?,
        Command::Sweep(cmd) => generate_sweep(cmd, &config)?,
        Command::FramesToTime(cmd) => convert_frames(cmd)?,
        Command::List(cmd) => list_recordings(cmd, &config)?,
    }

    Ok(())
}

/// Print usage with `message` and exit with status 2
fn usage_error(kind: ErrorKind, message: impl std::fmt::Display) -> ! {
    Cli::command().error(kind, message).exit()
}

fn orchestrator(config: &Config) -> PipelineOrchestrator<SubprocessBackend> {
    let backend = SubprocessBackend::from_config(&config.backend);
    let mut orchestrator = PipelineOrchestrator::new(backend, StageOptions::from(config));
    orchestrator.add_event_handler(|event| {
        if matches!(event, PipelineEvent::RecordingStarted { .. }) {
            println!("{}", separator());
        }
        println!("{}", format_pipeline_event(&event));
    });
    orchestrator
}

fn discover(data_root: Option<&PathBuf>, config: &Config) -> Result<Partition> {
    let data_root = data_root.cloned().unwrap_or_else(|| config.data_root());
    Partition::discover(&data_root, &config.recording_extension)
        .with_context(|| format!("Failed to enumerate recordings under {}", data_root.display()))
}

fn finish_run(result: Result<RunSummary, PipelineError>) -> Result<()> {
    match result {
        Ok(summary) => {
            let elapsed = summary
                .elapsed
                .and_then(|elapsed| elapsed.to_std().ok())
                .map(format_duration)
                .unwrap_or_default();
            println!(
                "\n{} Settings and outputs for {} written {}",
                INFO,
                style(summary.targets.recording.display()).bold(),
                style(elapsed).dim()
            );
            Ok(())
        }
        Err(e) => {
            println!("\n{} {}", CROSS, style(&e).red());
            error!("{}", e);
            std::process::exit(1);
        }
    }
}

fn batch_job(cmd: &BatchCommand, config: &Config) -> Result<()> {
    let invocation = cmd
        .invocation()
        .unwrap_or_else(|message| usage_error(ErrorKind::MissingRequiredArgument, message));

    let partition = discover(cmd.data_root.as_ref(), config)?;
    let (job_id, settings_file, out_dir) = match invocation {
        BatchInvocation::List => {
            partition.write_listing(io::stdout().lock())?;
            return Ok(());
        }
        BatchInvocation::Run {
            job_id,
            settings_file,
            out_dir,
        } => (job_id, settings_file, out_dir),
    };

    let recording = match partition.select(job_id) {
        Ok(JobSelection::Run(recording)) => recording,
        Ok(JobSelection::List(_)) => {
            partition.write_listing(io::stdout().lock())?;
            return Ok(());
        }
        Err(e) => usage_error(ErrorKind::InvalidValue, e),
    };

    info!(job_id, recording = %recording, "Batch job selected its recording");
    let layout = OutputLayout::new(out_dir, config.dataset_suffix.as_str());
    finish_run(orchestrator(config).replay(recording, &settings_file, &layout))
}

fn serial_batch(cmd: &SerialCommand, config: &Config) -> Result<()> {
    let partition = discover(cmd.data_root.as_ref(), config)?;
    if partition.is_empty() {
        println!("{} No recordings found", WARN);
        return Ok(());
    }

    println!("{} Replaying {} on {} recordings", INFO, style(cmd.settings_file.display()).bold(), partition.len());
    let layout = OutputLayout::new(cmd.out_dir.clone(), config.dataset_suffix.as_str());
    let report = orchestrator(config).run_batch(partition.recordings(), &cmd.settings_file, &layout);

    println!("{}\n{}", separator(), format_batch_report(&report));
    if !report.is_success() {
        std::process::exit(1);
    }
    Ok(())
}

fn capture_run(cmd: &RunCommand, config: &Config) -> Result<()> {
    let mut prompter = Prompter::stdio().with_max_attempts(config.max_prompt_attempts);

    let recording = match &cmd.recording {
        Some(path) => path.clone(),
        None => prompter.existing_file_with_extension(
            Some("Which recording should be analyzed?"),
            None,
            &[config.recording_extension.as_str()],
        )?,
    };
    let recording = Recording::new(recording);
    let home = recording.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();

    let settings_path = match &cmd.settings {
        Some(path) => path.clone(),
        None => prompter.new_file(
            Some("Where should the captured settings be saved?"),
            Some(home.join(format!("{}_settings.csv", recording.stem()))),
            false,
        )?,
    };

    // Defaults offered at each prompt; the operator may redirect any of them
    let targets = OutputLayout::new(home, config.dataset_suffix.as_str()).targets_for(&recording);

    let result = orchestrator(config).run(&mut ConfigSource::Capture(&mut prompter), targets, &settings_path);
    if result.is_ok() {
        println!("{} Settings captured in {}", CHECK, style(settings_path.display()).bold());
    }
    finish_run(result)
}

fn replay_one(cmd: &ReplayCommand, config: &Config) -> Result<()> {
    let recording = Recording::new(cmd.recording.clone());
    let layout = OutputLayout::new(cmd.out_dir.clone(), config.dataset_suffix.as_str());
    finish_run(orchestrator(config).replay(&recording, &cmd.settings_file, &layout))
}

fn generate_sweep(cmd: &SweepCommand, config: &Config) -> Result<()> {
    let mut prompter = Prompter::stdio().with_max_attempts(config.max_prompt_attempts);

    let defaults_path = match &cmd.defaults {
        Some(path) => path.clone(),
        None => prompter.existing_file(Some("Which settings file holds the default values?"), None)?,
    };
    let params_path = match &cmd.params {
        Some(path) => path.clone(),
        None => prompter.existing_file(Some("Which settings file holds the parameter ranges?"), None)?,
    };
    let outdir = match &cmd.outdir {
        Some(path) => path.clone(),
        None => prompter.directory(Some("Where should the settings files be written?"), None, None)?,
    };

    let defaults = SettingsStore::load(&defaults_path).context("Failed to load default settings")?;
    let params = SettingsStore::load(&params_path).context("Failed to load parameter ranges")?;
    let plan = SweepPlan::new(&defaults, cmd.parameters(&params)?)?;

    let question = format_sweep_confirmation(plan.len(), plan.estimated_size_mb(config.sweep_file_size_mb), &outdir);
    if !cmd.yes && !prompter.boolean(Some(question.as_str()), None)? {
        println!("{} Aborted, nothing was written", INFO);
        return Ok(());
    }

    let progress = create_progress_bar(plan.len());
    let result = plan.write_all(&outdir, |point, _| {
        progress.set_message(point.filename.clone());
        progress.inc(1);
    });
    progress.finish_and_clear();

    let written = result?;
    println!("{} Wrote {} settings files to {}", CHECK, style(written).cyan(), style(outdir.display()).bold());
    Ok(())
}

fn convert_frames(cmd: &FramesToTimeCommand) -> Result<()> {
    if !(cmd.seconds_per_frame.is_finite() && cmd.seconds_per_frame > 0.0) {
        usage_error(ErrorKind::InvalidValue, "--seconds-per-frame must be a positive number");
    }

    let rows = export::frames_to_time(&cmd.file, cmd.seconds_per_frame)
        .with_context(|| format!("Failed to convert {}", cmd.file.display()))?;
    println!("{} Converted {} rows of {}", CHECK, style(rows).cyan(), style(cmd.file.display()).bold());
    Ok(())
}

fn list_recordings(cmd: &ListCommand, config: &Config) -> Result<()> {
    let partition = discover(cmd.data_root.as_ref(), config)?;

    if cmd.json {
        let recordings: Vec<String> = partition.recordings().iter().map(|r| r.to_string()).collect();
        let data = serde_json::json!({
            "count": recordings.len(),
            "recordings": recordings,
        });
        println!("{}", serde_json::to_string_pretty(&data)?);
    } else {
        partition.write_listing(io::stdout().lock())?;
    }
    Ok(())
}
