//! Track discovery

use std::collections::HashMap;
use std::path::PathBuf;

use walkdir::WalkDir;

use crate::audio::has_recognized_extension;
use crate::config::MixSettings;
use crate::error::BatchError;
use crate::mixing::output_path_for;

/// A discovered input track and where its mix will be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Earlier track that already writes `output`; this one is not mixed
    pub collides_with: Option<PathBuf>,
}

impl Track {
    pub fn name(&self) -> String {
        self.input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// List the regular files directly inside the input folder with a recognized extension
///
/// Tracks are sorted by file name so runs are reproducible.
pub fn scan_tracks(settings: &MixSettings) -> Result<Vec<Track>, BatchError> {
    let input = &settings.input_dir;
    let mut tracks = Vec::new();

    for entry in WalkDir::new(input)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| BatchError::Scan {
            path: input.clone(),
            source: e.into(),
        })?;

        let path = entry.path();
        if path.is_file() && has_recognized_extension(path, &settings.extensions) {
            log::debug!("Discovered: {}", path.display());
            tracks.push(Track {
                input: path.to_path_buf(),
                output: output_path_for(path, &settings.output_dir, settings.format),
                collides_with: None,
            });
        }
    }

    mark_collisions(&mut tracks);
    log::info!("Discovered {} tracks in {}", tracks.len(), input.display());

    Ok(tracks)
}

/// Two inputs differing only in extension map to the same output
///
/// The first track in file-name order keeps the output; later ones are marked so
/// they are never mixed into a file another job is writing.
fn mark_collisions(tracks: &mut [Track]) {
    let mut claimed: HashMap<PathBuf, PathBuf> = HashMap::new();
    for track in tracks.iter_mut() {
        if let Some(first) = claimed.get(&track.output) {
            log::warn!(
                "{} would overwrite {} from {}; skipping it",
                track.input.display(),
                track.output.display(),
                first.display()
            );
            track.collides_with = Some(first.clone());
        } else {
            claimed.insert(track.output.clone(), track.input.clone());
        }
    }
}
