//! Test fixtures for mixing and batch tests
//!
//! Provides a scripted in-process mixer, throwaway input folders and (on unix)
//! fake `ffmpeg` executables, so no test needs a real ffmpeg install.

#![cfg(test)]

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::error::MixError;
use crate::mixing::{AudioMixer, MixRequest};

/// In-process mixer that records every request
///
/// Successful mixes write a small deterministic file at the output path; tracks
/// whose file name is in `fail_on` fail without writing anything, and those in
/// `panic_on` panic.
#[derive(Default)]
pub struct FakeMixer {
    fail_on: HashSet<String>,
    panic_on: HashSet<String>,
    delay: Option<Duration>,
    invocations: Mutex<Vec<MixRequest>>,
}

impl FakeMixer {
    pub fn failing(names: &[&str]) -> Self {
        Self {
            fail_on: names.iter().map(|n| n.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn panicking(names: &[&str]) -> Self {
        Self {
            panic_on: names.iter().map(|n| n.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn invocations(&self) -> Vec<MixRequest> {
        self.invocations.lock().unwrap().clone()
    }

    pub fn invoked_names(&self) -> Vec<String> {
        self.invocations()
            .iter()
            .map(|r| file_name(&r.primary))
            .collect()
    }
}

impl AudioMixer for FakeMixer {
    fn mix<'a>(&'a self, request: &'a MixRequest) -> BoxFuture<'a, Result<(), MixError>> {
        async move {
            self.invocations.lock().unwrap().push(request.clone());

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            let name = file_name(&request.primary);
            if self.panic_on.contains(&name) {
                panic!("mixer blew up on {}", name);
            }
            if self.fail_on.contains(&name) {
                return Err(MixError::Simulated(format!("{}: Invalid data found", name)));
            }

            let body = format!("{}|{}", name, request.filter_graph);
            std::fs::write(&request.output, body).unwrap();
            Ok(())
        }
        .boxed()
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Create `files` (empty) inside `dir`, returning `dir`
pub fn create_input_dir(dir: &Path, files: &[&str]) -> PathBuf {
    std::fs::create_dir_all(dir).expect("Failed to create input directory");
    for name in files {
        std::fs::write(dir.join(name), b"").expect("Failed to create input file");
    }
    dir.to_path_buf()
}

/// Write an executable shell script named `ffmpeg` into `dir`
#[cfg(unix)]
fn write_script(dir: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("ffmpeg");
    std::fs::write(&path, format!("#!/bin/sh\n{}", body)).expect("Failed to write script");
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

/// Fake ffmpeg that logs its arguments (one per line) and creates the output file
///
/// Returns `(script, args_log)`.
#[cfg(unix)]
pub fn recording_ffmpeg(dir: &Path) -> (PathBuf, PathBuf) {
    let log = dir.join("ffmpeg_args.txt");
    let script = write_script(
        dir,
        &format!(
            "printf '%s\\n' \"$@\" > '{}'\nfor last; do :; done\n: > \"$last\"\n",
            log.display()
        ),
    );
    (script, log)
}

/// Fake ffmpeg that starts writing the output, prints `message` to stderr and exits 1
#[cfg(unix)]
pub fn failing_ffmpeg(dir: &Path, message: &str) -> PathBuf {
    write_script(
        dir,
        &format!(
            "for last; do :; done\n: > \"$last\"\necho 'ffmpeg version test' >&2\necho '{}' >&2\nexit 1\n",
            message
        ),
    )
}

/// Fake ffmpeg that saves its own `/proc/<pid>/stat` line and creates the output file
///
/// Returns `(script, stat_log)`.
#[cfg(target_os = "linux")]
pub fn process_group_ffmpeg(dir: &Path) -> (PathBuf, PathBuf) {
    let log = dir.join("ffmpeg_stat.txt");
    let script = write_script(
        dir,
        &format!(
            "cat /proc/$$/stat > '{}'\nfor last; do :; done\n: > \"$last\"\n",
            log.display()
        ),
    );
    (script, log)
}

/// Fake ffmpeg that never finishes on its own
#[cfg(unix)]
pub fn hanging_ffmpeg(dir: &Path) -> PathBuf {
    write_script(dir, "exec sleep 30\n")
}
