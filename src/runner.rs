//! Runs a job specification in the foreground.
#[cfg(unix)]
use std::os::unix::process::ExitStatusExt;
use std::process::{Command, ExitStatus, Stdio};

use tracing::{debug, info};

use crate::{constants::SIGNAL_EXIT_CODE, error::RunError, job::JobSpec};

/// Spawns the job with the caller's stdio and waits for it.
///
/// Returns the exit code the caller should exit with: the child's own status,
/// or [`SIGNAL_EXIT_CODE`] when it was killed by a signal.
pub fn run(job: &JobSpec) -> Result<i32, RunError> {
    info!("Running '{}' in {:?}", job.exec, job.cwd);

    let mut child = Command::new(&job.exec)
        .args(&job.args)
        .current_dir(&job.cwd)
        .env_clear()
        .envs(&job.env)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(|source| RunError::Spawn {
            exec: job.exec.clone(),
            source,
        })?;

    let status = child.wait().map_err(|source| RunError::Wait {
        exec: job.exec.clone(),
        source,
    })?;

    Ok(exit_code(status))
}

/// Maps a child's termination to the code npkg exits with.
pub fn exit_code(status: ExitStatus) -> i32 {
    match status.code() {
        Some(code) => code,
        None => {
            #[cfg(unix)]
            debug!("Child terminated by signal {:?}", status.signal());
            SIGNAL_EXIT_CODE
        }
    }
}
