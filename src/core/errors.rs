// src/core/errors.rs

use thiserror::Error;

/// Failures raised while resolving a command line into a `ResolvedCommand`.
///
/// An unknown leading token is deliberately *not* represented here: it falls
/// through to passthrough dispatch instead of failing. Every variant below
/// aborts the whole resolution; no partial expansion is ever executed.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("circular alias reference: {chain} -> {name}")]
    CircularReference { name: String, chain: String },

    #[error("alias '{alias}' references config key '{key}', which is not set")]
    MissingConfigKey { alias: String, key: String },

    #[error("malformed alias '{name}': {reason}")]
    MalformedAliasBody { name: String, reason: String },

    #[error("maximum expansion depth ({limit}) exceeded while expanding '{name}'")]
    RecursionLimitExceeded { name: String, limit: u32 },
}

impl ResolveError {
    pub fn malformed(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedAliasBody {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
