// src/bin/balias.rs

use balias::{CancellationToken, cli, system::executor};
use clap::Parser;
use colored::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Sets up logging, parses arguments, runs the resolution pipeline, and
/// performs centralized error handling.
fn main() {
    let cancellation_token: CancellationToken = Arc::new(AtomicBool::new(false));
    env_logger::init();

    // Ctrl-C flips the shared flag; the dispatcher's wait loop sees it and
    // kills the running child.
    let token = cancellation_token.clone();
    if let Err(e) = ctrlc::set_handler(move || token.store(true, Ordering::SeqCst)) {
        log::warn!("Could not install Ctrl-C handler: {e}");
    }

    if let Err(e) = cli::run(cli::Cli::parse(), &cancellation_token) {
        // A cancelled child exits with the conventional interrupt status.
        if let Some(exec_err) = e.downcast_ref::<executor::ExecutionError>()
            && matches!(exec_err, executor::ExecutionError::Cancelled)
        {
            std::process::exit(130);
        }

        eprintln!("\n{}: {:#}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}
