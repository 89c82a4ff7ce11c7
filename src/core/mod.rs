// src/core/mod.rs

pub mod config_loader;
pub mod errors;
pub mod expander;
pub mod interpolator;
pub mod resolver;
pub mod store;
pub mod task_executor;
