//! # Task Executor
//!
//! Runs a `ResolvedCommand` against a `Dispatcher`. Sequential meta
//! strategies (`loop`, `sloop`, `cloop`) dispatch strictly in input order and
//! fail fast. Concurrent strategies (`parallel`, `xargs`) run on a bounded
//! rayon pool: in-flight invocations finish after a failure, but no new ones
//! are started, and every failure is reported in one aggregate error.

use crate::models::{Invocation, ResolvedCommand};
use anyhow::{Context, Result};
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

/// The external collaborator that actually executes expanded invocations.
/// Implementations must be callable from rayon worker threads.
pub trait Dispatcher: Sync {
    fn dispatch(&self, invocation: &Invocation) -> Result<()>;
}

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("{failed} of {total} sub-invocation(s) failed:\n{details}")]
    SubInvocationFailure {
        failed: usize,
        total: usize,
        details: String,
    },
}

/// Executes a fully resolved command. Errors from single commands carry the
/// rendered invocation; batch errors aggregate every failed sub-invocation.
pub fn execute(command: &ResolvedCommand, dispatcher: &dyn Dispatcher) -> Result<()> {
    match command {
        ResolvedCommand::Passthrough(argv) => {
            let invocation = Invocation::new(argv.clone());
            dispatcher
                .dispatch(&invocation)
                .with_context(|| format!("'{}' failed", invocation.display()))
        }
        ResolvedCommand::Single(invocation) => dispatcher
            .dispatch(invocation)
            .with_context(|| format!("'{}' failed", invocation.display())),
        ResolvedCommand::Batch {
            strategy,
            invocations,
        } => {
            if strategy.is_concurrent() {
                execute_concurrent(invocations, strategy.jobs(), dispatcher)
            } else {
                execute_sequential(invocations, dispatcher)
            }
        }
    }
}

/// Runs invocations one at a time, in input order. The first failure
/// abandons the rest of the batch.
fn execute_sequential(invocations: &[Invocation], dispatcher: &dyn Dispatcher) -> Result<()> {
    let total = invocations.len();
    for (i, invocation) in invocations.iter().enumerate() {
        log::debug!("Batch [{}/{}]: {}", i + 1, total, invocation.display());
        if let Err(e) = dispatcher.dispatch(invocation) {
            let remaining = total - i - 1;
            if remaining > 0 {
                log::debug!("Abandoning {remaining} remaining invocation(s) after failure.");
            }
            return Err(BatchError::SubInvocationFailure {
                failed: 1,
                total,
                details: format!("  {}: {e:#}", invocation.display()),
            })
            .with_context(|| format!("'{}' failed", invocation.display()));
        }
    }
    Ok(())
}

/// Runs invocations concurrently on a pool bounded to `jobs` workers (the
/// default pool size if unspecified). A shared flag stops new invocations
/// from launching once any has failed; already-running ones complete.
fn execute_concurrent(
    invocations: &[Invocation],
    jobs: Option<usize>,
    dispatcher: &dyn Dispatcher,
) -> Result<()> {
    let failed = AtomicBool::new(false);
    let run = || {
        invocations
            .par_iter()
            .map(|invocation| {
                if failed.load(Ordering::SeqCst) {
                    // Fail-fast: skipped, not failed.
                    return Ok(());
                }
                log::debug!("Dispatching concurrently: {}", invocation.display());
                match dispatcher.dispatch(invocation) {
                    Ok(()) => Ok(()),
                    Err(e) => {
                        failed.store(true, Ordering::SeqCst);
                        Err(format!("  {}: {e:#}", invocation.display()))
                    }
                }
            })
            .collect::<Vec<Result<(), String>>>()
    };

    let results = match jobs {
        Some(n) => rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build()
            .context("failed to build worker pool")?
            .install(run),
        None => run(),
    };

    let errors: Vec<String> = results.into_iter().filter_map(Result::err).collect();
    if !errors.is_empty() {
        return Err(BatchError::SubInvocationFailure {
            failed: errors.len(),
            total: invocations.len(),
            details: errors.join("\n"),
        }
        .into());
    }
    Ok(())
}
