// src/constants.rs

/// The name of the per-user configuration directory (under the platform
/// config root, e.g. ~/.config/balias/).
pub const APP_CONFIG_DIR: &str = "balias";

/// The name of the aliases file, in both the system and user config dirs.
pub const ALIASES_FILENAME: &str = "aliases";

/// The name of the runtime context file (service, connection, values).
pub const CONTEXT_FILENAME: &str = "config.toml";

/// The system-wide configuration directory.
pub const SYSTEM_CONFIG_DIR: &str = "/etc/balias";

/// The section identifier of the global fallback scope.
pub const DEFAULT_SECTION: &str = "DEFAULT";

/// Default worker count for `xargs`-style concurrent meta-aliases.
pub const DEFAULT_XARGS_JOBS: usize = 4;
