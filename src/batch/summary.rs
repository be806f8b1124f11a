//! Per-track results and the end-of-run summary

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::config::MixSettings;
use crate::error::MixError;
use crate::mixing::IntroFilterGraph;

/// Outcome of one track
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum TrackOutcome {
    Success { output: PathBuf },
    Failure { error: String },
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TrackResult {
    pub input: PathBuf,
    #[serde(flatten)]
    pub outcome: TrackOutcome,
}

impl TrackResult {
    pub fn from_mix(input: &Path, result: Result<PathBuf, MixError>) -> Self {
        let outcome = match result {
            Ok(output) => TrackOutcome::Success { output },
            Err(e) => TrackOutcome::Failure {
                error: e.to_string(),
            },
        };
        Self {
            input: input.to_path_buf(),
            outcome,
        }
    }

    pub fn name(&self) -> String {
        display_name(&self.input)
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, TrackOutcome::Success { .. })
    }

    /// Console line for this track
    pub fn progress_line(&self) -> String {
        match &self.outcome {
            TrackOutcome::Success { output } => {
                format!("✔ {} → {}", self.name(), display_name(output))
            }
            TrackOutcome::Failure { error } => {
                format!("⚠ Error in '{}': {}", self.name(), error)
            }
        }
    }
}

/// Summary of a completed batch, in discovery order
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
    pub discovered: usize,
    pub intro_duration: f64,
    pub fade_duration: f64,
    pub intro_volume: f64,
    pub filter_graph: String,
    pub settings: MixSettings,
    pub tracks: Vec<TrackResult>,
}

impl RunSummary {
    pub fn new(settings: &MixSettings, started_at: DateTime<Local>, tracks: Vec<TrackResult>) -> Self {
        Self {
            started_at,
            finished_at: Local::now(),
            discovered: tracks.len(),
            intro_duration: settings.intro_duration,
            fade_duration: settings.fade_duration,
            intro_volume: settings.intro_volume,
            filter_graph: IntroFilterGraph::from_settings(settings).render(),
            settings: settings.clone(),
            tracks,
        }
    }

    pub fn succeeded(&self) -> usize {
        self.tracks.iter().filter(|t| t.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.tracks.len() - self.succeeded()
    }

    pub fn failures(&self) -> impl Iterator<Item = &TrackResult> {
        self.tracks.iter().filter(|t| !t.is_success())
    }

    /// Final line restating the effective intro settings
    pub fn closing_line(&self) -> String {
        format!(
            "✅ Done. Intro overlaid on the first {} s (fade {} s), intro volume = {}. Metadata kept.",
            self.intro_duration, self.fade_duration, self.intro_volume
        )
    }

    pub fn print(&self) {
        println!();
        println!(
            "Summary: {} mixed, {} failed (of {} tracks)",
            self.succeeded(),
            self.failed(),
            self.discovered
        );
        for failure in self.failures() {
            println!("  {}", failure.progress_line());
        }
        println!();
        println!("{}", self.closing_line());
    }

    /// Write the summary as pretty JSON
    pub fn write_report(&self, path: &Path) -> Result<(), String> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize report: {}", e))?;

        std::fs::write(path, json).map_err(|e| format!("Failed to write report: {}", e))?;

        log::info!("Wrote run report to {}", path.display());
        Ok(())
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
