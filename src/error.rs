//! Error types for jingle-glue
//!
//! Error strategy:
//! - Configuration and precondition errors: fatal, abort before any track is touched
//! - Per-track mixing errors: recorded against that track, the batch continues

use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

/// Invalid settings, caught before the engine is ever invoked
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Intro duration must be a positive number of seconds (got {0})")]
    IntroDuration(f64),

    #[error("Fade duration must be between 0 and the intro duration {intro}s (got {fade}s)")]
    FadeDuration { fade: f64, intro: f64 },

    #[error("Intro volume must be a non-negative number (got {0})")]
    IntroVolume(f64),

    #[error("At least one input extension is required")]
    NoExtensions,

    #[error("Invalid input extension '{0}'\n  Tip: Use plain extensions such as 'mp3' or 'flac'")]
    InvalidExtension(String),

    #[error("Quality {quality} is out of range for {codec} (expected {min}..={max})")]
    QualityOutOfRange {
        codec: String,
        quality: u8,
        min: u8,
        max: u8,
    },

    #[error("Bitrate must be positive")]
    ZeroBitrate,

    #[error("Worker count must be at least 1")]
    ZeroJobs,

    #[error("Track timeout must be at least one second")]
    ZeroTimeout,

    #[error("Output directory '{0}' is the input directory\n  Tip: Mixed tracks would overwrite their sources")]
    OutputIsInput(PathBuf),
}

/// Reasons a batch cannot run at all
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Input folder not found: '{0}'\n  Tip: Check the path exists and is accessible")]
    InputDirMissing(PathBuf),

    #[error("Intro jingle not found: '{0}'")]
    JingleMissing(PathBuf),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("Failed to scan '{path}': {source}")]
    Scan {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure of a single track's mix
#[derive(Debug, Error)]
pub enum MixError {
    #[error("ffmpeg exited with {status}: {}", last_line(.stderr))]
    ExternalToolFailure { status: ExitStatus, stderr: String },

    #[error("Failed to spawn ffmpeg: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("ffmpeg did not finish within {secs}s and was killed")]
    Timeout { secs: u64 },

    #[error("Failed to create output directory '{path}': {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cancelled before processing started")]
    Cancelled,

    #[error("Aborted while ffmpeg was running")]
    Aborted,

    #[error("Output name already used by '{0}'")]
    OutputCollision(PathBuf),

    #[error("Processing task panicked: {0}")]
    TaskPanicked(String),

    /// Scripted failure from a test mixer
    #[cfg(test)]
    #[error("{0}")]
    Simulated(String),
}

/// ffmpeg binary could not be located or used
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("ffmpeg not found\n  Tip: Install ffmpeg, put it on PATH, or pass --ffmpeg /path/to/ffmpeg")]
    NotFound,

    #[error("ffmpeg not found at '{0}'")]
    Missing(PathBuf),

    #[error("ffmpeg at '{0}' is not executable")]
    NotExecutable(PathBuf),
}

fn last_line(text: &str) -> &str {
    text.lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("Unknown error")
}
