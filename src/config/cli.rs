//! CLI argument parsing

use clap::Parser;
use std::path::PathBuf;

use super::format::OutputFormat;

/// jingle-glue - overlay an intro jingle onto the start of every track in a folder
///
/// Each track is mixed with the jingle through ffmpeg: the jingle is trimmed to the
/// intro length, scaled, faded out and mixed over the track start. Tags are copied
/// from the original track.
#[derive(Parser, Debug)]
#[command(name = "jingle-glue")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Folder with the tracks to process (not scanned recursively)
    #[arg(short, long, value_name = "DIR", default_value = "music")]
    pub input: PathBuf,

    /// Intro jingle overlaid onto every track
    #[arg(short = 'g', long, value_name = "FILE", default_value = "glue/intro.mp3")]
    pub jingle: PathBuf,

    /// Output folder (created if missing)
    #[arg(short, long, value_name = "DIR", default_value = "gotovo")]
    pub output: PathBuf,

    /// Seconds of jingle played over the start of each track
    #[arg(long, value_name = "SECS", default_value_t = 5.0)]
    pub intro: f64,

    /// Seconds of fade-out at the end of the intro
    #[arg(long, value_name = "SECS", default_value_t = 2.0)]
    pub fade: f64,

    /// Jingle volume multiplier (0.5 = half as loud, 1.5 = louder)
    #[arg(long, value_name = "GAIN", default_value_t = 1.5)]
    pub volume: f64,

    /// Input extension to process (repeatable, defaults to mp3)
    #[arg(long = "ext", value_name = "EXT")]
    pub extensions: Vec<String>,

    /// Output container
    #[arg(long, value_enum, default_value_t = OutputFormat::Mp3)]
    pub format: OutputFormat,

    /// Override the audio encoder (e.g. libmp3lame, aac)
    #[arg(long, value_name = "CODEC")]
    pub codec: Option<String>,

    /// VBR quality passed as -q:a
    #[arg(long, value_name = "N", conflicts_with = "bitrate")]
    pub quality: Option<u8>,

    /// Constant bitrate in kbps passed as -b:a
    #[arg(long, value_name = "KBPS")]
    pub bitrate: Option<u32>,

    /// Do not copy tags from the original track
    #[arg(long, default_value = "false")]
    pub no_metadata: bool,

    /// Number of ffmpeg processes to run at once (defaults to 75% of cores, 2-8)
    #[arg(short = 'j', long, value_name = "N")]
    pub jobs: Option<usize>,

    /// Seconds before a single ffmpeg run is considered hung
    #[arg(long, value_name = "SECS", default_value_t = 600)]
    pub timeout: u64,

    /// Path to the ffmpeg binary (defaults to bundled or PATH lookup)
    #[arg(long, value_name = "PATH")]
    pub ffmpeg: Option<PathBuf>,

    /// Write a JSON report of the run to this file
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (only errors in the log)
    #[arg(short, long, default_value = "false")]
    pub quiet: bool,
}

impl Cli {
    /// Terminal log level based on verbosity flags
    pub fn log_level(&self) -> log::LevelFilter {
        if self.quiet {
            return log::LevelFilter::Error;
        }
        match self.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_original_layout() {
        let cli = Cli::parse_from(["jingle-glue"]);
        assert_eq!(cli.input, PathBuf::from("music"));
        assert_eq!(cli.jingle, PathBuf::from("glue/intro.mp3"));
        assert_eq!(cli.output, PathBuf::from("gotovo"));
        assert_eq!(cli.intro, 5.0);
        assert_eq!(cli.fade, 2.0);
        assert_eq!(cli.volume, 1.5);
        assert!(cli.extensions.is_empty());
    }

    #[test]
    fn test_quality_and_bitrate_conflict() {
        let result = Cli::try_parse_from(["jingle-glue", "--quality", "2", "--bitrate", "192"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_log_level() {
        let cli = Cli::parse_from(["jingle-glue", "-vv"]);
        assert_eq!(cli.log_level(), log::LevelFilter::Debug);

        let cli = Cli::parse_from(["jingle-glue", "-v", "-q"]);
        assert_eq!(cli.log_level(), log::LevelFilter::Error);
    }
}
