//! # System Interaction Layer
//!
//! The boundary between the resolution engine and the operating system.
//!
//! - **`executor`**: the process-spawning `Dispatcher` implementation. It
//!   handles cooperative cancellation (`Ctrl+C` via the shared token) and
//!   maps child exit status onto typed errors.

pub mod executor;
