//! jingle-glue - batch intro overlay
//!
//! Mixes a short jingle over the start of every track in a folder using ffmpeg,
//! writing the results (with the original tags) to an output folder.

mod audio;
mod batch;
mod config;
mod error;
mod logging;
mod mixing;
mod test_fixtures;

use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use tokio::sync::watch;

use batch::BatchOutcome;
use config::{Cli, MixSettings};
use mixing::{locate_ffmpeg, FfmpegMixer};

/// Conventional exit status for a run stopped by SIGINT
const INTERRUPTED_EXIT_CODE: u8 = 130;

/// First Ctrl-C stops new tracks from starting and lets running ones finish;
/// a second one kills the running ffmpeg processes; a third exits immediately.
fn watch_for_interrupts(cancel_token: Arc<AtomicBool>, abort: watch::Sender<bool>) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        eprintln!("Stopping after the tracks in progress... (Ctrl-C again to abort them)");
        cancel_token.store(true, Ordering::SeqCst);

        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Aborting running tracks...");
            let _ = abort.send(true);
        }

        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(i32::from(INTERRUPTED_EXIT_CODE));
        }
    });
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    logging::init_logging(cli.log_level());

    let settings = match MixSettings::from_cli(&cli) {
        Ok(settings) => Arc::new(settings),
        Err(e) => {
            eprintln!("❌ Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let ffmpeg_path = match locate_ffmpeg(cli.ffmpeg.as_deref()) {
        Ok(path) => path,
        Err(e) => {
            eprintln!("❌ {}", e);
            return ExitCode::FAILURE;
        }
    };
    log::info!("Using ffmpeg at {}", ffmpeg_path.display());

    let cancel_token = Arc::new(AtomicBool::new(false));
    let (abort_tx, abort_rx) = watch::channel(false);
    watch_for_interrupts(cancel_token.clone(), abort_tx);

    let mixer = Arc::new(
        FfmpegMixer::new(ffmpeg_path, settings.track_timeout).with_abort(abort_rx),
    );

    let outcome = batch::run(settings.clone(), mixer, cancel_token.clone(), |result, progress| {
        println!(
            "[{}/{}] {}",
            progress.finished_count(),
            progress.total,
            result.progress_line()
        );
    })
    .await;

    match outcome {
        Ok(BatchOutcome::Completed(summary)) => {
            summary.print();
            if let Some(report) = &cli.report
                && let Err(e) = summary.write_report(report)
            {
                eprintln!("Warning: {}", e);
            }
            if cancel_token.load(Ordering::SeqCst) {
                ExitCode::from(INTERRUPTED_EXIT_CODE)
            } else {
                ExitCode::SUCCESS
            }
        }
        Ok(BatchOutcome::Empty { input_dir }) => {
            println!(
                "⚠️ No {} files in '{}', nothing to do.",
                settings.extensions.join("/"),
                input_dir.display()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("❌ {}", e);
            ExitCode::FAILURE
        }
    }
}
