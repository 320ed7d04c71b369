//! Detached launches of the backend scripts and the platform file opener.

use std::{
    ffi::OsStr,
    io,
    path::{Path, PathBuf},
    process::{Child, Command, Stdio},
};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::paths::GemPaths;

pub const DEFAULT_INTERPRETER: &str = "node";

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("failed to launch {program} {}: {source}", .target.display())]
    Spawn {
        program: String,
        target: PathBuf,
        source: io::Error,
    },
}

/// Starts and stops the backend through its helper scripts.
///
/// No child handle is kept: the backend manages its own lifetime and
/// `stop()` is just another script invocation.
#[derive(Debug, Clone)]
pub struct ProcessController {
    interpreter: String,
    start_script: PathBuf,
    stop_script: PathBuf,
}

impl ProcessController {
    pub fn new(
        interpreter: impl Into<String>,
        start_script: impl Into<PathBuf>,
        stop_script: impl Into<PathBuf>,
    ) -> Self {
        Self {
            interpreter: interpreter.into(),
            start_script: start_script.into(),
            stop_script: stop_script.into(),
        }
    }

    pub fn from_paths(interpreter: impl Into<String>, paths: &GemPaths) -> Self {
        Self::new(interpreter, paths.start_script(), paths.stop_script())
    }

    pub fn interpreter(&self) -> &str {
        &self.interpreter
    }

    pub fn start(&self) -> Result<(), LaunchError> {
        info!(interpreter = %self.interpreter, script = %self.start_script.display(), "starting backend");
        spawn_detached(&self.interpreter, &self.start_script)
    }

    /// Fire-and-forget; a failed stop is logged, never surfaced.
    pub fn stop(&self) {
        info!(interpreter = %self.interpreter, script = %self.stop_script.display(), "stopping backend");
        if let Err(err) = spawn_detached(&self.interpreter, &self.stop_script) {
            warn!("backend stop script failed: {err}");
        }
    }
}

/// Opens `path` with the desktop's default handler.
pub fn open_path(path: &Path) -> Result<(), LaunchError> {
    let opener = if cfg!(target_os = "windows") {
        "explorer"
    } else if cfg!(target_os = "macos") {
        "open"
    } else {
        "xdg-open"
    };
    info!(path = %path.display(), opener, "opening file");
    spawn_detached(opener, path)
}

fn spawn_detached(program: &str, arg: &Path) -> Result<(), LaunchError> {
    let mut command = Command::new(program);
    command
        .arg(arg)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    detach(&mut command);

    let child = command.spawn().map_err(|source| LaunchError::Spawn {
        program: program.to_owned(),
        target: arg.to_path_buf(),
        source,
    })?;
    reap_in_background(child, arg.as_os_str());
    Ok(())
}

#[cfg(target_os = "windows")]
fn detach(command: &mut Command) {
    use std::os::windows::process::CommandExt;

    const DETACHED_PROCESS: u32 = 0x0000_0008;
    const CREATE_NO_WINDOW: u32 = 0x0800_0000;
    command.creation_flags(DETACHED_PROCESS | CREATE_NO_WINDOW);
}

#[cfg(not(target_os = "windows"))]
fn detach(_command: &mut Command) {}

/// Waits on the child off the UI thread so it does not linger as a zombie.
fn reap_in_background(mut child: Child, label: &OsStr) {
    let label = label.to_string_lossy().into_owned();
    let spawned = std::thread::Builder::new()
        .name("gem-reaper".to_owned())
        .spawn(move || match child.wait() {
            Ok(status) => debug!(target_file = %label, %status, "detached process exited"),
            Err(err) => debug!(target_file = %label, "wait on detached process failed: {err}"),
        });
    if let Err(err) = spawned {
        debug!("reaper thread not started: {err}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_interpreter_reports_spawn_error() {
        let controller = ProcessController::new(
            "gem-no-such-interpreter-7f3a",
            "/nonexistent/start-assistant.js",
            "/nonexistent/stop-assistant.js",
        );
        let err = controller.start().expect_err("spawn should fail");
        let LaunchError::Spawn { program, .. } = &err;
        assert_eq!(program, "gem-no-such-interpreter-7f3a");
        assert!(err.to_string().contains("start-assistant.js"));

        // Stop never panics or surfaces the failure.
        controller.stop();
    }

    #[cfg(unix)]
    #[test]
    fn start_runs_script_through_interpreter() {
        let dir = tempfile::tempdir().expect("create tempdir");
        let marker = dir.path().join("started");
        let script = dir.path().join("start.sh");
        std::fs::write(&script, format!("touch '{}'\n", marker.display())).expect("write script");

        let controller = ProcessController::new("sh", &script, &script);
        controller.start().expect("spawn sh");

        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        while !marker.exists() && std::time::Instant::now() < deadline {
            std::thread::sleep(std::time::Duration::from_millis(20));
        }
        assert!(marker.exists(), "start script did not run");
    }

    #[test]
    fn controller_uses_layout_scripts() {
        let paths = GemPaths::new("/opt/gem");
        let controller = ProcessController::from_paths(DEFAULT_INTERPRETER, &paths);
        assert_eq!(controller.interpreter(), "node");
        assert_eq!(controller.start_script, paths.start_script());
        assert_eq!(controller.stop_script, paths.stop_script());
    }
}
