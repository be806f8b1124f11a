//! Tag and duration probing with lofty
//!
//! Probing is advisory only: a file lofty cannot read is still handed to ffmpeg,
//! which has the final say on whether it decodes.

use std::path::Path;
use std::time::Duration;

use lofty::{Accessor, AudioFile, TaggedFileExt};

/// What we could learn about a file without decoding it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackInfo {
    pub duration: Option<Duration>,
    pub title: Option<String>,
    pub artist: Option<String>,
}

impl TrackInfo {
    /// "Artist - Title" when both tags are present
    pub fn display_name(&self) -> Option<String> {
        match (&self.artist, &self.title) {
            (Some(artist), Some(title)) => Some(format!("{} - {}", artist, title)),
            (None, Some(title)) => Some(title.clone()),
            _ => None,
        }
    }
}

/// Read duration and primary tags from an audio file
pub fn probe_track(path: &Path) -> Result<TrackInfo, String> {
    let tagged_file =
        lofty::read_from_path(path).map_err(|e| format!("Failed to read file: {}", e))?;

    let duration = tagged_file.properties().duration();
    let mut info = TrackInfo {
        duration: (!duration.is_zero()).then_some(duration),
        ..TrackInfo::default()
    };

    if let Some(tag) = tagged_file.primary_tag().or_else(|| tagged_file.first_tag()) {
        info.title = tag.title().map(|s| s.to_string());
        info.artist = tag.artist().map(|s| s.to_string());
    }

    Ok(info)
}

/// Warn when the jingle is shorter than the configured intro
///
/// Returns the jingle duration when it could be determined.
pub fn check_jingle_length(path: &Path, intro_duration: f64) -> Option<Duration> {
    match probe_track(path) {
        Ok(TrackInfo {
            duration: Some(duration),
            ..
        }) => {
            if duration.as_secs_f64() < intro_duration {
                log::warn!(
                    "Jingle {} is {:.1}s long, shorter than the {}s intro; the intro will end early",
                    path.display(),
                    duration.as_secs_f64(),
                    intro_duration
                );
            }
            Some(duration)
        }
        Ok(_) => {
            log::debug!("Could not determine jingle duration for {}", path.display());
            None
        }
        Err(e) => {
            log::debug!("Could not probe jingle {}: {}", path.display(), e);
            None
        }
    }
}
