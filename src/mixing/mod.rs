//! Audio mixing
//!
//! The actual decode/mix/encode work is done by an external engine (ffmpeg).
//! This module describes a mix, hides the engine behind [`AudioMixer`] and
//! drives one track through it.

mod ffmpeg;
mod filter_graph;
mod processor;

pub use ffmpeg::{locate_ffmpeg, FfmpegMixer};
pub use filter_graph::IntroFilterGraph;
pub use processor::{output_path_for, process_track, MixRequest};

use futures::future::BoxFuture;

use crate::error::MixError;

/// Anything that can turn a [`MixRequest`] into an output file
///
/// Implementations must write only `request.output` and must leave no file there
/// when they fail.
pub trait AudioMixer: Send + Sync {
    fn mix<'a>(&'a self, request: &'a MixRequest) -> BoxFuture<'a, Result<(), MixError>>;
}
