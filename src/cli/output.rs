//! CLI output formatting

use crate::execution::{BatchReport, PipelineEvent};
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "!");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");

/// Create a progress bar
pub fn create_progress_bar(total: usize) -> ProgressBar {
    let progress = ProgressBar::new(total as u64);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    progress.set_style(style);
    progress.enable_steady_tick(Duration::from_millis(100));
    progress
}

/// Horizontal rule as wide as the terminal
pub fn separator() -> String {
    let width = term_size::dimensions().map_or(80, |(w, _)| w);
    style("─".repeat(width)).dim().to_string()
}

fn short_id(id: &uuid::Uuid) -> String {
    id.to_string()[..8].to_string()
}

/// Format a pipeline event for display
pub fn format_pipeline_event(event: &PipelineEvent) -> String {
    match event {
        PipelineEvent::RecordingStarted {
            run_id,
            recording,
            capture,
        } => format!(
            "{} {} {} ({})",
            ROCKET,
            if *capture { "Capturing" } else { "Replaying" },
            style(recording.display()).bold(),
            style(short_id(run_id)).dim()
        ),
        PipelineEvent::StageStarted { stage, .. } => format!("{} {}", SPINNER, style(stage).cyan()),
        PipelineEvent::StageCompleted { stage, persisted, .. } => format!(
            "{} {} {}",
            CHECK,
            style(stage).green(),
            style(format!("({} settings saved)", persisted)).dim()
        ),
        PipelineEvent::RegionIdentified { point, region, .. } => {
            let hit = match region {
                Some(id) => style(format!("Region {}", id)).bold().to_string(),
                None => style("no region").dim().to_string(),
            };
            format!("{} ({:.1}, {:.1}) -> {}", INFO, point[0], point[1], hit)
        }
        PipelineEvent::RecordingCompleted {
            recording, regions, ..
        } => format!(
            "{} {} completed {} with {} regions",
            CHECK,
            style(recording.display()).bold(),
            style("successfully").green(),
            style(regions).cyan()
        ),
        PipelineEvent::RecordingFailed {
            recording,
            stage,
            error,
            ..
        } => match stage {
            Some(stage) => format!(
                "{} {} failed at {}: {}",
                CROSS,
                style(recording.display()).red(),
                style(stage).bold(),
                style(error).dim()
            ),
            None => format!(
                "{} {} could not start: {}",
                CROSS,
                style(recording.display()).red(),
                style(error).dim()
            ),
        },
    }
}

/// Question asked before a sweep writes anything
pub fn format_sweep_confirmation(files: usize, size_mb: f64, outdir: &Path) -> String {
    format!(
        "Will create {} settings files ({:.2} MB) in {}, proceed (y/n)?",
        files,
        size_mb,
        outdir.display()
    )
}

/// Format a batch summary, one line per failure
pub fn format_batch_report(report: &BatchReport) -> String {
    let mut lines = vec![format!(
        "{} {} of {} recordings succeeded",
        if report.is_success() { CHECK } else { WARN },
        style(report.succeeded.len()).green(),
        style(report.total()).bold()
    )];
    for failure in &report.failed {
        let stage = failure
            .stage
            .map_or_else(|| "setup".to_string(), |stage| stage.to_string());
        lines.push(format!(
            "  {} {} ({}): {}",
            CROSS,
            style(failure.recording.display()).red(),
            stage,
            style(&failure.error).dim()
        ));
    }
    lines.join("\n")
}

/// Format a duration as `1h 2m 3s`
pub fn format_duration(duration: std::time::Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
