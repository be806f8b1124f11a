//! Runtime settings for a mixing run

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;

use super::cli::Cli;
use super::format::{AudioEncoding, MetadataPolicy, OutputFormat, Quality};
use crate::error::ConfigError;

/// Default `amix` dropout transition, in seconds
pub const DROPOUT_TRANSITION: u32 = 2;

/// Default per-track limit before ffmpeg is considered hung
pub const DEFAULT_TRACK_TIMEOUT: Duration = Duration::from_secs(600);

/// Immutable settings shared by the orchestrator and every track job
#[derive(Debug, Clone, Serialize)]
pub struct MixSettings {
    /// Folder with the primary tracks (scanned non-recursively)
    pub input_dir: PathBuf,
    /// Jingle overlaid onto the start of every track
    pub jingle_path: PathBuf,
    /// Where mixed tracks are written
    pub output_dir: PathBuf,
    /// Seconds of jingle played over the track start
    pub intro_duration: f64,
    /// Seconds of fade-out at the end of the intro
    pub fade_duration: f64,
    /// Jingle amplitude multiplier (may exceed 1.0)
    pub intro_volume: f64,
    /// Lower-case extensions (no dot) treated as input tracks
    pub extensions: Vec<String>,
    pub format: OutputFormat,
    pub encoding: AudioEncoding,
    pub metadata: MetadataPolicy,
    /// Maximum concurrent ffmpeg processes
    pub jobs: usize,
    #[serde(skip)]
    pub track_timeout: Duration,
    pub dropout_transition: u32,
}

impl Default for MixSettings {
    fn default() -> Self {
        let format = OutputFormat::default();
        Self {
            input_dir: PathBuf::from("music"),
            jingle_path: PathBuf::from("glue/intro.mp3"),
            output_dir: PathBuf::from("gotovo"),
            intro_duration: 5.0,
            fade_duration: 2.0,
            intro_volume: 1.5,
            extensions: vec!["mp3".to_string()],
            format,
            encoding: format.default_encoding(),
            metadata: MetadataPolicy::default(),
            jobs: default_worker_count(),
            track_timeout: DEFAULT_TRACK_TIMEOUT,
            dropout_transition: DROPOUT_TRANSITION,
        }
    }
}

impl MixSettings {
    /// Build settings from CLI arguments and validate them
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let format = cli.format;

        let mut encoding = format.default_encoding();
        if let Some(codec) = &cli.codec {
            encoding.codec = codec.clone();
        }
        if let Some(q) = cli.quality {
            encoding.quality = Quality::Vbr(q);
        } else if let Some(kbps) = cli.bitrate {
            encoding.quality = Quality::Bitrate(kbps);
        }

        let extensions = if cli.extensions.is_empty() {
            defaults.extensions
        } else {
            normalize_extensions(&cli.extensions)?
        };

        let settings = Self {
            input_dir: cli.input.clone(),
            jingle_path: cli.jingle.clone(),
            output_dir: cli.output.clone(),
            intro_duration: cli.intro,
            fade_duration: cli.fade,
            intro_volume: cli.volume,
            extensions,
            format,
            encoding,
            metadata: MetadataPolicy {
                copy_from_primary: !cli.no_metadata,
            },
            jobs: cli.jobs.unwrap_or(defaults.jobs),
            track_timeout: Duration::from_secs(cli.timeout),
            dropout_transition: DROPOUT_TRANSITION,
        };

        settings.validate()?;
        Ok(settings)
    }

    /// Check every invariant the filter graph and scheduler depend on
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.intro_duration.is_finite() || self.intro_duration <= 0.0 {
            return Err(ConfigError::IntroDuration(self.intro_duration));
        }
        // A fade longer than the intro would give a negative fade start offset
        if !self.fade_duration.is_finite()
            || self.fade_duration < 0.0
            || self.fade_duration > self.intro_duration
        {
            return Err(ConfigError::FadeDuration {
                fade: self.fade_duration,
                intro: self.intro_duration,
            });
        }
        if !self.intro_volume.is_finite() || self.intro_volume < 0.0 {
            return Err(ConfigError::IntroVolume(self.intro_volume));
        }

        if self.extensions.is_empty() {
            return Err(ConfigError::NoExtensions);
        }
        for ext in &self.extensions {
            if !is_valid_extension(ext) {
                return Err(ConfigError::InvalidExtension(ext.clone()));
            }
        }

        match self.encoding.quality {
            Quality::Vbr(q) => {
                if let Some((min, max)) = self.encoding.vbr_range()
                    && !(min..=max).contains(&q)
                {
                    return Err(ConfigError::QualityOutOfRange {
                        codec: self.encoding.codec.clone(),
                        quality: q,
                        min,
                        max,
                    });
                }
            }
            Quality::Bitrate(0) => return Err(ConfigError::ZeroBitrate),
            Quality::Bitrate(_) | Quality::Default => {}
        }

        if self.jobs == 0 {
            return Err(ConfigError::ZeroJobs);
        }
        if self.track_timeout.as_secs() == 0 {
            return Err(ConfigError::ZeroTimeout);
        }

        if same_dir(&self.input_dir, &self.output_dir) {
            return Err(ConfigError::OutputIsInput(self.output_dir.clone()));
        }

        Ok(())
    }
}

/// Lower-case, strip leading dots and reject anything that is not a plain extension
pub fn normalize_extensions(raw: &[String]) -> Result<Vec<String>, ConfigError> {
    let mut out: Vec<String> = Vec::with_capacity(raw.len());
    for ext in raw {
        let ext = ext.trim().trim_start_matches('.').to_lowercase();
        if !is_valid_extension(&ext) {
            return Err(ConfigError::InvalidExtension(ext));
        }
        if !out.contains(&ext) {
            out.push(ext);
        }
    }
    if out.is_empty() {
        return Err(ConfigError::NoExtensions);
    }
    Ok(out)
}

fn is_valid_extension(ext: &str) -> bool {
    !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Compare two directories, resolving them when they exist
fn same_dir(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Calculate the default number of parallel ffmpeg workers based on CPU cores
pub fn default_worker_count() -> usize {
    let available = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4);

    // Use 75% of cores, clamped between 2 and 8
    ((available as f32 * 0.75).ceil() as usize).clamp(2, 8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_defaults_are_valid() {
        let settings = MixSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.intro_duration - settings.fade_duration, 3.0);
        assert_eq!(settings.extensions, vec!["mp3"]);
    }

    #[test]
    fn test_fade_longer_than_intro_rejected() {
        let settings = MixSettings {
            intro_duration: 2.0,
            fade_duration: 3.0,
            ..MixSettings::default()
        };
        assert_eq!(
            settings.validate(),
            Err(ConfigError::FadeDuration { fade: 3.0, intro: 2.0 })
        );
    }

    #[test]
    fn test_fade_equal_to_intro_allowed() {
        let settings = MixSettings {
            intro_duration: 4.0,
            fade_duration: 4.0,
            ..MixSettings::default()
        };
        assert!(settings.validate().is_ok());
        assert_eq!(settings.intro_duration - settings.fade_duration, 0.0);
    }

    #[test]
    fn test_non_positive_intro_rejected() {
        for intro in [0.0, -1.0, f64::NAN] {
            let settings = MixSettings {
                intro_duration: intro,
                fade_duration: 0.0,
                ..MixSettings::default()
            };
            assert!(matches!(settings.validate(), Err(ConfigError::IntroDuration(_))));
        }
    }

    #[test]
    fn test_negative_volume_rejected_but_boost_allowed() {
        let loud = MixSettings {
            intro_volume: 3.0,
            ..MixSettings::default()
        };
        assert!(loud.validate().is_ok());

        let negative = MixSettings {
            intro_volume: -0.5,
            ..MixSettings::default()
        };
        assert_eq!(negative.validate(), Err(ConfigError::IntroVolume(-0.5)));
    }

    #[test]
    fn test_quality_out_of_range_rejected() {
        let mut settings = MixSettings::default();
        settings.encoding.quality = Quality::Vbr(12);
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::QualityOutOfRange { quality: 12, .. })
        ));
    }

    #[test]
    fn test_output_same_as_input_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let settings = MixSettings {
            input_dir: dir.path().to_path_buf(),
            output_dir: dir.path().join("."),
            ..MixSettings::default()
        };
        assert!(matches!(settings.validate(), Err(ConfigError::OutputIsInput(_))));
    }

    #[test]
    fn test_normalize_extensions() {
        let raw = vec![".MP3".to_string(), "flac".to_string(), "mp3".to_string()];
        assert_eq!(normalize_extensions(&raw).unwrap(), vec!["mp3", "flac"]);

        let bad = vec!["m p3".to_string()];
        assert!(matches!(
            normalize_extensions(&bad),
            Err(ConfigError::InvalidExtension(_))
        ));
    }

    #[test]
    fn test_from_cli_applies_overrides() {
        let cli = Cli::parse_from([
            "jingle-glue",
            "--intro",
            "8",
            "--fade",
            "3",
            "--volume",
            "0.5",
            "--ext",
            "FLAC",
            "--ext",
            ".wav",
            "--format",
            "ogg",
            "--bitrate",
            "160",
            "--no-metadata",
            "-j",
            "3",
        ]);
        let settings = MixSettings::from_cli(&cli).unwrap();
        assert_eq!(settings.intro_duration, 8.0);
        assert_eq!(settings.fade_duration, 3.0);
        assert_eq!(settings.intro_volume, 0.5);
        assert_eq!(settings.extensions, vec!["flac", "wav"]);
        assert_eq!(settings.format, OutputFormat::Ogg);
        assert_eq!(settings.encoding, AudioEncoding::new("libvorbis", Quality::Bitrate(160)));
        assert!(!settings.metadata.copy_from_primary);
        assert_eq!(settings.jobs, 3);
    }

    #[test]
    fn test_from_cli_rejects_bad_fade() {
        let cli = Cli::parse_from(["jingle-glue", "--intro", "2", "--fade", "5"]);
        assert!(matches!(
            MixSettings::from_cli(&cli),
            Err(ConfigError::FadeDuration { .. })
        ));
    }

    #[test]
    fn test_default_worker_count() {
        let count = default_worker_count();
        assert!((2..=8).contains(&count));
    }
}
