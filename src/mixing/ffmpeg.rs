//! FFmpeg subprocess handling for mixing

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::process::Command;
use tokio::sync::watch;

use super::filter_graph::MIXED_STREAM_LABEL;
use super::{AudioMixer, MixRequest};
use crate::error::{MixError, ToolError};

/// Number of trailing stderr lines kept in an error
const STDERR_TAIL_LINES: usize = 20;

/// Mixer that runs one ffmpeg process per track
#[derive(Debug, Clone)]
pub struct FfmpegMixer {
    ffmpeg_path: PathBuf,
    timeout: Duration,
    abort: Option<watch::Receiver<bool>>,
}

impl FfmpegMixer {
    pub fn new(ffmpeg_path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            timeout,
            abort: None,
        }
    }

    /// Kill running ffmpeg processes once `abort` turns true
    pub fn with_abort(mut self, abort: watch::Receiver<bool>) -> Self {
        self.abort = Some(abort);
        self
    }

    async fn run(&self, request: &MixRequest) -> Result<(), MixError> {
        let mut cmd = Command::new(&self.ffmpeg_path);
        cmd.args(build_args(request))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Own process group: a terminal Ctrl-C reaches only us, not the running mixes
        #[cfg(unix)]
        cmd.process_group(0);

        // Dropping the output future on timeout or abort kills the child
        let output = tokio::select! {
            result = tokio::time::timeout(self.timeout, cmd.output()) => match result {
                Ok(Ok(output)) => output,
                Ok(Err(e)) => return Err(MixError::Spawn(e)),
                Err(_) => {
                    remove_partial_output(&request.output).await;
                    return Err(MixError::Timeout {
                        secs: self.timeout.as_secs(),
                    });
                }
            },
            _ = wait_for_abort(self.abort.clone()) => {
                remove_partial_output(&request.output).await;
                return Err(MixError::Aborted);
            }
        };

        if output.status.success() {
            return Ok(());
        }

        // Process failed - delete partial output
        remove_partial_output(&request.output).await;

        let stderr = stderr_tail(&String::from_utf8_lossy(&output.stderr));
        log::debug!(
            "ffmpeg failed for {} ({}):\n{}",
            request.primary.display(),
            output.status,
            stderr
        );
        Err(MixError::ExternalToolFailure {
            status: output.status,
            stderr,
        })
    }
}

impl AudioMixer for FfmpegMixer {
    fn mix<'a>(&'a self, request: &'a MixRequest) -> BoxFuture<'a, Result<(), MixError>> {
        self.run(request).boxed()
    }
}

/// Build the ffmpeg argument list for one mix
///
/// Order matters: the filter graph refers to the primary track as input 0 and
/// to the jingle as input 1.
pub fn build_args(request: &MixRequest) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "-y".into(), // overwrite output without asking
        "-i".into(),
        request.primary.clone().into_os_string(),
        "-i".into(),
        request.jingle.clone().into_os_string(),
        "-filter_complex".into(),
        request.filter_graph.render().into(),
        "-map".into(),
        MIXED_STREAM_LABEL.into(), // only the mixed stream, no passthrough
    ];
    args.extend(request.codec_args.iter().map(OsString::from));
    args.extend(request.metadata_args.iter().map(OsString::from));
    args.push(request.output.clone().into_os_string());
    args
}

/// Resolves once an abort is requested; never resolves without an abort channel
async fn wait_for_abort(abort: Option<watch::Receiver<bool>>) {
    if let Some(mut abort) = abort {
        let requested = abort.wait_for(|aborted| *aborted).await.is_ok();
        if requested {
            return;
        }
    }
    std::future::pending::<()>().await
}

async fn remove_partial_output(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => log::debug!("Removed partial output {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => log::warn!("Failed to remove partial output {}: {}", path.display(), e),
    }
}

fn stderr_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.lines().collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}

/// Find the ffmpeg binary
///
/// Looks at the explicit path first, then a bundled `resources/bin/ffmpeg` next to
/// the executable, then `PATH`.
pub fn locate_ffmpeg(explicit: Option<&Path>) -> Result<PathBuf, ToolError> {
    if let Some(path) = explicit {
        return verify_ffmpeg(path);
    }

    let binary = if cfg!(windows) { "ffmpeg.exe" } else { "ffmpeg" };

    if let Ok(exe_path) = std::env::current_exe()
        && let Some(exe_dir) = exe_path.parent()
    {
        let bundled = exe_dir.join("resources").join("bin").join(binary);
        if bundled.is_file() {
            log::debug!("Found ffmpeg at bundled path: {}", bundled.display());
            return verify_ffmpeg(&bundled);
        }
    }

    if let Some(paths) = std::env::var_os("PATH") {
        for dir in std::env::split_paths(&paths) {
            let candidate = dir.join(binary);
            if candidate.is_file() {
                log::debug!("Found ffmpeg on PATH: {}", candidate.display());
                return verify_ffmpeg(&candidate);
            }
        }
    }

    Err(ToolError::NotFound)
}

/// Verify that ffmpeg exists and is executable
pub fn verify_ffmpeg(path: &Path) -> Result<PathBuf, ToolError> {
    if !path.is_file() {
        return Err(ToolError::Missing(path.to_path_buf()));
    }

    // On Unix, check if executable
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let metadata =
            std::fs::metadata(path).map_err(|_| ToolError::Missing(path.to_path_buf()))?;
        if metadata.permissions().mode() & 0o111 == 0 {
            return Err(ToolError::NotExecutable(path.to_path_buf()));
        }
    }

    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MixSettings;
    use std::ffi::OsStr;

    fn request_in(dir: &Path) -> MixRequest {
        let settings = MixSettings {
            jingle_path: dir.join("intro.mp3"),
            ..MixSettings::default()
        };
        MixRequest::new(&dir.join("song.mp3"), &dir.join("out").join("song.mp3"), &settings)
    }

    #[test]
    fn test_build_args_exact_order() {
        let settings = MixSettings::default();
        let request = MixRequest::new(Path::new("music/a.mp3"), Path::new("gotovo/a.mp3"), &settings);
        let args = build_args(&request);
        let args: Vec<&OsStr> = args.iter().map(|a| a.as_os_str()).collect();

        let expected: Vec<&OsStr> = [
            "-y",
            "-i",
            "music/a.mp3",
            "-i",
            "glue/intro.mp3",
            "-filter_complex",
            "[1:a]atrim=0:5,asetpts=PTS-STARTPTS,volume=1.5,afade=t=out:st=3:d=2[a1];\
             [0:a][a1]amix=inputs=2:duration=first:dropout_transition=2[m]",
            "-map",
            "[m]",
            "-c:a",
            "libmp3lame",
            "-q:a",
            "2",
            "-map_metadata",
            "0",
            "-id3v2_version",
            "3",
            "gotovo/a.mp3",
        ]
        .iter()
        .map(OsStr::new)
        .collect();

        assert_eq!(args, expected);
    }

    #[test]
    fn test_stderr_tail_keeps_last_lines() {
        let text: String = (0..30).map(|i| format!("line {}\n", i)).collect();
        let tail = stderr_tail(&text);
        assert!(tail.starts_with("line 10"));
        assert!(tail.ends_with("line 29"));
    }

    #[test]
    fn test_verify_missing_binary() {
        let result = verify_ffmpeg(Path::new("/nonexistent/ffmpeg"));
        assert!(matches!(result, Err(ToolError::Missing(_))));
    }

    #[test]
    fn test_locate_with_explicit_missing_path() {
        let result = locate_ffmpeg(Some(Path::new("/nonexistent/ffmpeg")));
        assert!(matches!(result, Err(ToolError::Missing(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_verify_rejects_non_executable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ffmpeg");
        std::fs::write(&path, "#!/bin/sh\n").unwrap();

        let result = verify_ffmpeg(&path);
        assert!(matches!(result, Err(ToolError::NotExecutable(_))));
    }

    #[tokio::test]
    async fn test_spawn_failure_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mixer = FfmpegMixer::new("/nonexistent/ffmpeg", Duration::from_secs(5));

        let result = mixer.mix(&request_in(dir.path())).await;
        assert!(matches!(result, Err(MixError::Spawn(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_successful_run_passes_args_in_order() {
        use crate::test_fixtures::recording_ffmpeg;

        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("out")).unwrap();
        let (script, args_log) = recording_ffmpeg(dir.path());
        let mixer = FfmpegMixer::new(&script, Duration::from_secs(10));
        let request = request_in(dir.path());

        mixer.mix(&request).await.unwrap();

        assert!(request.output.exists());
        let logged = std::fs::read_to_string(args_log).unwrap();
        let logged: Vec<&str> = logged.lines().collect();
        assert_eq!(logged[0], "-y");
        assert_eq!(logged[2], dir.path().join("song.mp3").to_string_lossy());
        assert_eq!(logged[4], dir.path().join("intro.mp3").to_string_lossy());
        assert_eq!(logged[8], "[m]");
        assert_eq!(*logged.last().unwrap(), request.output.to_string_lossy());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_carries_stderr_and_removes_output() {
        use crate::test_fixtures::failing_ffmpeg;

        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("out")).unwrap();
        let script = failing_ffmpeg(dir.path(), "song.mp3: Invalid data found when processing input");
        let mixer = FfmpegMixer::new(&script, Duration::from_secs(10));
        let request = request_in(dir.path());

        let err = mixer.mix(&request).await.unwrap_err();

        match &err {
            MixError::ExternalToolFailure { status, stderr } => {
                assert_eq!(status.code(), Some(1));
                assert!(stderr.contains("Invalid data found"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("Invalid data found"));
        assert!(!request.output.exists(), "partial output should be removed");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_hung_process_times_out() {
        use crate::test_fixtures::hanging_ffmpeg;

        let dir = tempfile::tempdir().unwrap();
        let script = hanging_ffmpeg(dir.path());
        let mixer = FfmpegMixer::new(&script, Duration::from_millis(300));

        let result = mixer.mix(&request_in(dir.path())).await;
        assert!(matches!(result, Err(MixError::Timeout { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_abort_kills_running_process() {
        use crate::test_fixtures::hanging_ffmpeg;

        let dir = tempfile::tempdir().unwrap();
        let script = hanging_ffmpeg(dir.path());
        let (abort_tx, abort_rx) = watch::channel(false);
        let mixer = FfmpegMixer::new(&script, Duration::from_secs(30)).with_abort(abort_rx);

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            abort_tx.send(true).unwrap();
        });

        let started = std::time::Instant::now();
        let result = mixer.mix(&request_in(dir.path())).await;

        assert!(matches!(result, Err(MixError::Aborted)));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_dropped_abort_sender_never_aborts() {
        let (abort_tx, abort_rx) = watch::channel(false);
        drop(abort_tx);

        let waited =
            tokio::time::timeout(Duration::from_millis(100), wait_for_abort(Some(abort_rx))).await;
        assert!(waited.is_err());
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_child_runs_in_own_process_group() {
        use crate::test_fixtures::process_group_ffmpeg;

        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("out")).unwrap();
        let (script, stat_log) = process_group_ffmpeg(dir.path());
        let mixer = FfmpegMixer::new(&script, Duration::from_secs(10));

        mixer.mix(&request_in(dir.path())).await.unwrap();

        // /proc/<pid>/stat: "pid (comm) state ppid pgrp ..."
        let stat = std::fs::read_to_string(stat_log).unwrap();
        let pid = stat.split_whitespace().next().unwrap();
        let after_comm = &stat[stat.rfind(')').unwrap() + 1..];
        let pgrp = after_comm.split_whitespace().nth(2).unwrap();
        assert_eq!(pgrp, pid);
        assert_ne!(pgrp, std::process::id().to_string());
    }
}
