//! Per-track processing: output naming, request construction and mixer invocation

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use super::filter_graph::IntroFilterGraph;
use super::AudioMixer;
use crate::config::{MixSettings, OutputFormat};
use crate::error::MixError;

/// Everything the engine needs to produce one mixed file
#[derive(Debug, Clone, PartialEq)]
pub struct MixRequest {
    /// Input 0: the track whose length and tags the output keeps
    pub primary: PathBuf,
    /// Input 1: the jingle
    pub jingle: PathBuf,
    pub output: PathBuf,
    pub filter_graph: IntroFilterGraph,
    /// `-c:a ...` plus quality arguments
    pub codec_args: Vec<String>,
    /// `-map_metadata ...` plus tag-version arguments
    pub metadata_args: Vec<String>,
}

impl MixRequest {
    pub fn new(primary: &Path, output: &Path, settings: &MixSettings) -> Self {
        Self {
            primary: primary.to_path_buf(),
            jingle: settings.jingle_path.clone(),
            output: output.to_path_buf(),
            filter_graph: IntroFilterGraph::from_settings(settings),
            codec_args: settings.encoding.ffmpeg_args(),
            metadata_args: settings.metadata.ffmpeg_args(settings.format),
        }
    }
}

/// Output path for a source file
///
/// Output files keep the source file stem byte for byte and get the container's extension.
pub fn output_path_for(input: &Path, output_dir: &Path, format: OutputFormat) -> PathBuf {
    let mut name = input
        .file_stem()
        .map(OsStr::to_os_string)
        .unwrap_or_else(|| OsString::from("output"));
    name.push(".");
    name.push(format.extension());

    output_dir.join(name)
}

/// Mix the jingle into one track and return the written output path
pub async fn process_track(
    mixer: &dyn AudioMixer,
    track: &Path,
    settings: &MixSettings,
) -> Result<PathBuf, MixError> {
    // create_dir_all tolerates concurrent creation and an existing directory
    tokio::fs::create_dir_all(&settings.output_dir)
        .await
        .map_err(|e| MixError::OutputDir {
            path: settings.output_dir.clone(),
            source: e,
        })?;

    let output = output_path_for(track, &settings.output_dir, settings.format);
    let request = MixRequest::new(track, &output, settings);

    log::debug!(
        "Mixing {} + {} -> {}",
        request.primary.display(),
        request.jingle.display(),
        request.output.display()
    );

    mixer.mix(&request).await?;
    Ok(output)
}
