// src/system/executor.rs

use crate::{CancellationToken, core::task_executor::Dispatcher, models::Invocation};
use anyhow::Result;
use std::process::{Command as StdCommand, Stdio};
use std::sync::atomic::Ordering;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("command '{0}' could not be executed: {1}")]
    CommandFailed(String, std::io::Error),
    #[error("command '{0}' exited with status {1}")]
    NonZeroExitStatus(String, i32),
    #[error("operation was cancelled by the user")]
    Cancelled,
}

/// Spawns expanded invocations as child processes with inherited stdio.
/// This is the production `Dispatcher`; the engine itself never touches
/// the process table.
pub struct SystemDispatcher {
    cancellation_token: CancellationToken,
}

impl SystemDispatcher {
    pub fn new(cancellation_token: CancellationToken) -> Self {
        Self { cancellation_token }
    }

    fn run(&self, invocation: &Invocation) -> Result<(), ExecutionError> {
        let Some((program, args)) = invocation.argv.split_first() else {
            return Ok(()); // An empty invocation is a success, not an error.
        };
        let display = invocation.display();

        let mut child = StdCommand::new(program)
            .args(args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| ExecutionError::CommandFailed(display.clone(), e))?;

        // Non-blocking wait loop so a cancellation request can kill the child.
        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    if status.success() {
                        return Ok(());
                    }
                    return Err(ExecutionError::NonZeroExitStatus(
                        display,
                        status.code().unwrap_or(-1),
                    ));
                }
                Ok(None) => {
                    if self.cancellation_token.load(Ordering::SeqCst) {
                        log::debug!("Cancellation requested, killing child (PID: {})", child.id());
                        if let Err(e) = child.kill() {
                            log::warn!("Failed to kill child process {}: {}", child.id(), e);
                        }
                        child.wait().ok();
                        return Err(ExecutionError::Cancelled);
                    }
                    std::thread::sleep(Duration::from_millis(50));
                }
                Err(e) => {
                    return Err(ExecutionError::CommandFailed(display, e));
                }
            }
        }
    }
}

impl Dispatcher for SystemDispatcher {
    fn dispatch(&self, invocation: &Invocation) -> Result<()> {
        log::debug!("Spawning: {}", invocation.display());
        self.run(invocation).map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicBool;

    fn dispatcher() -> SystemDispatcher {
        SystemDispatcher::new(Arc::new(AtomicBool::new(false)))
    }

    fn invocation(parts: &[&str]) -> Invocation {
        Invocation::new(parts.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_empty_invocation_is_a_noop() {
        dispatcher().dispatch(&invocation(&[])).unwrap();
    }

    #[test]
    #[cfg(unix)]
    fn test_successful_command() {
        dispatcher().dispatch(&invocation(&["true"])).unwrap();
    }

    #[test]
    #[cfg(unix)]
    fn test_failing_command_reports_status() {
        let err = dispatcher().dispatch(&invocation(&["false"])).unwrap_err();
        let exec_err = err.downcast_ref::<ExecutionError>().unwrap();
        assert!(matches!(exec_err, ExecutionError::NonZeroExitStatus(_, 1)));
    }

    #[test]
    #[cfg(unix)]
    fn test_cancellation_kills_running_child() {
        let token = Arc::new(AtomicBool::new(false));
        let dispatcher = SystemDispatcher::new(token.clone());

        let flipper = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(100));
            token.store(true, Ordering::SeqCst);
        });

        let start = std::time::Instant::now();
        let err = dispatcher
            .dispatch(&invocation(&["sleep", "5"]))
            .unwrap_err();
        flipper.join().unwrap();

        let exec_err = err.downcast_ref::<ExecutionError>().unwrap();
        assert!(matches!(exec_err, ExecutionError::Cancelled));
        // The child must have been killed, not waited out.
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_unknown_program_fails_to_spawn() {
        let err = dispatcher()
            .dispatch(&invocation(&["balias-test-no-such-program"]))
            .unwrap_err();
        let exec_err = err.downcast_ref::<ExecutionError>().unwrap();
        assert!(matches!(exec_err, ExecutionError::CommandFailed(..)));
    }
}
