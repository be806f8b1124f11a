//! Batch orchestration
//!
//! Validates preconditions, discovers tracks and mixes them through a bounded
//! worker pool. A failing track is recorded and the batch moves on.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::Local;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use tokio::sync::Semaphore;

use super::scanner::{scan_tracks, Track};
use super::summary::{RunSummary, TrackResult};
use crate::audio::probe_track;
use crate::config::MixSettings;
use crate::error::{BatchError, MixError};
use crate::mixing::{process_track, AudioMixer, IntroFilterGraph};

/// How a run ended, when it could run at all
#[derive(Debug)]
pub enum BatchOutcome {
    /// The input folder had no recognized tracks
    Empty { input_dir: PathBuf },
    Completed(RunSummary),
}

/// Progress tracking for a batch
#[derive(Debug)]
pub struct BatchProgress {
    pub succeeded: AtomicUsize,
    pub failed: AtomicUsize,
    pub total: usize,
}

impl BatchProgress {
    pub fn new(total: usize) -> Self {
        Self {
            succeeded: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            total,
        }
    }

    pub fn record(&self, result: &TrackResult) -> usize {
        if result.is_success() {
            self.succeeded.fetch_add(1, Ordering::SeqCst);
        } else {
            self.failed.fetch_add(1, Ordering::SeqCst);
        }
        self.finished_count()
    }

    pub fn finished_count(&self) -> usize {
        self.succeeded.load(Ordering::SeqCst) + self.failed.load(Ordering::SeqCst)
    }
}

/// Run the whole batch
///
/// `on_track_complete` is called once per track as soon as it finishes (in
/// completion order). The returned summary is always in discovery order.
///
/// Setting `cancel_token` stops new tracks from starting; tracks already running
/// complete and the rest are recorded as cancelled.
pub async fn run<F>(
    settings: Arc<MixSettings>,
    mixer: Arc<dyn AudioMixer>,
    cancel_token: Arc<AtomicBool>,
    on_track_complete: F,
) -> Result<BatchOutcome, BatchError>
where
    F: Fn(&TrackResult, &BatchProgress) + Send + Sync + 'static,
{
    let started_at = Local::now();

    settings.validate()?;

    if !settings.input_dir.is_dir() {
        return Err(BatchError::InputDirMissing(settings.input_dir.clone()));
    }
    if !settings.jingle_path.is_file() {
        return Err(BatchError::JingleMissing(settings.jingle_path.clone()));
    }

    let tracks = scan_tracks(&settings)?;
    if tracks.is_empty() {
        return Ok(BatchOutcome::Empty {
            input_dir: settings.input_dir.clone(),
        });
    }

    crate::audio::check_jingle_length(&settings.jingle_path, settings.intro_duration);
    log::info!(
        "Filter graph: {}",
        IntroFilterGraph::from_settings(&settings).render()
    );

    let results = mix_tracks(&settings, mixer, cancel_token, tracks, on_track_complete).await;

    Ok(BatchOutcome::Completed(RunSummary::new(
        &settings, started_at, results,
    )))
}

async fn mix_tracks<F>(
    settings: &Arc<MixSettings>,
    mixer: Arc<dyn AudioMixer>,
    cancel_token: Arc<AtomicBool>,
    tracks: Vec<Track>,
    on_track_complete: F,
) -> Vec<TrackResult>
where
    F: Fn(&TrackResult, &BatchProgress) + Send + Sync + 'static,
{
    let semaphore = Arc::new(Semaphore::new(settings.jobs));
    let progress = Arc::new(BatchProgress::new(tracks.len()));
    let on_complete = Arc::new(on_track_complete);

    log::info!(
        "Mixing {} tracks with {} workers",
        tracks.len(),
        settings.jobs
    );

    let mut slots: Vec<Option<TrackResult>> = vec![None; tracks.len()];
    let mut futures = FuturesUnordered::new();

    for (index, track) in tracks.iter().enumerate() {
        if let Some(first) = &track.collides_with {
            let result = TrackResult::from_mix(
                &track.input,
                Err(MixError::OutputCollision(first.clone())),
            );
            progress.record(&result);
            on_complete(&result, progress.as_ref());
            slots[index] = Some(result);
            continue;
        }

        let permit = match semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => break,
        };

        // Check for cancellation before starting each new track
        if cancel_token.load(Ordering::SeqCst) {
            log::warn!("Cancellation requested - skipping remaining tracks");
            break;
        }

        let settings = settings.clone();
        let mixer = mixer.clone();
        let progress = progress.clone();
        let on_complete = on_complete.clone();
        let track = track.clone();

        let handle = tokio::spawn(async move {
            if log::log_enabled!(log::Level::Debug)
                && let Some(tags) = track_tags(track.input.clone()).await
            {
                log::debug!("Processing {} [{}]", track.name(), tags);
            }

            let mixed = AssertUnwindSafe(process_track(mixer.as_ref(), &track.input, &settings))
                .catch_unwind()
                .await
                .unwrap_or_else(|payload| Err(MixError::TaskPanicked(panic_message(&*payload))));
            drop(permit);

            // The only place a finished track is counted
            let result = TrackResult::from_mix(&track.input, mixed);
            progress.record(&result);
            on_complete(&result, progress.as_ref());
            result
        });

        futures.push(async move { (index, handle.await) });
    }

    // Wait for all in-flight tasks to complete (even if cancelled)
    while let Some((index, joined)) = futures.next().await {
        let result = joined.unwrap_or_else(|e| {
            log::error!("Task for {} failed after mixing: {}", tracks[index].name(), e);
            TrackResult::from_mix(
                &tracks[index].input,
                Err(MixError::TaskPanicked(e.to_string())),
            )
        });
        slots[index] = Some(result);
    }

    // Anything never started was cancelled
    slots
        .into_iter()
        .zip(&tracks)
        .map(|(slot, track)| {
            slot.unwrap_or_else(|| TrackResult::from_mix(&track.input, Err(MixError::Cancelled)))
        })
        .collect()
}

/// "Artist - Title" of a track, read off the async workers
async fn track_tags(path: PathBuf) -> Option<String> {
    tokio::task::spawn_blocking(move || probe_track(&path))
        .await
        .ok()?
        .ok()?
        .display_name()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
