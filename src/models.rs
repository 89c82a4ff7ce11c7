// src/models.rs

use serde::Deserialize;
use std::collections::HashMap;

// --- ALIAS DEFINITIONS (What is read from the aliases file) ---

/// Which layer of configuration a section was loaded from. User definitions
/// shadow system definitions within the same section identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    System,
    User,
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::User => write!(f, "user"),
        }
    }
}

/// How an alias body is expanded once it has been resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliasKind {
    /// The body is shell-split and prepended to the remaining arguments.
    Simple,
    /// A `!`-prefixed body: a command template rendered with the remaining
    /// arguments appended (quoted) and dispatched as a single argv.
    ShellFunction,
    /// A `*`-prefixed name: the body names an iteration strategy applied to
    /// the first remaining argument, which is itself a command name.
    Meta,
}

/// A single named alias. The stored body has its `!` marker and any symmetric
/// surrounding quotes already stripped; `kind` preserves what they meant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasDefinition {
    pub name: String,
    pub body: String,
    pub kind: AliasKind,
}

/// One `[section]` of an aliases file: an ordered name -> definition map.
///
/// Sections are small (a handful of entries), so lookups scan in insertion
/// order rather than paying for a map.
#[derive(Debug, Clone, Default)]
pub struct AliasSection {
    pub id: String,
    entries: Vec<AliasDefinition>,
}

impl AliasSection {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            entries: Vec::new(),
        }
    }

    /// Inserts a definition, replacing any existing entry with the same name.
    /// This is what lets a later configuration layer shadow an earlier one.
    pub fn insert(&mut self, def: AliasDefinition) {
        if let Some(existing) = self.entries.iter_mut().find(|e| e.name == def.name) {
            *existing = def;
        } else {
            self.entries.push(def);
        }
    }

    pub fn get(&self, name: &str) -> Option<&AliasDefinition> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AliasDefinition> {
        self.entries.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The (origin, section) pair that satisfied a lookup. Carried alongside
/// resolved definitions so failures can name the tier that produced them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeTier {
    pub origin: Origin,
    pub section: String,
}

impl std::fmt::Display for ScopeTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}]", self.origin, self.section)
    }
}

// --- PLACEHOLDERS ---

/// A `%{...}` reference inside an alias body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placeholder {
    /// `%{name}`: substitute another alias's fully expanded body.
    AliasRef(String),
    /// `%{CONFIG:key}`: substitute a value from the runtime context.
    ConfigRef(String),
}

impl Placeholder {
    /// Parses the content between `%{` and `}`. Returns the reason on failure.
    pub fn parse(content: &str) -> Result<Self, String> {
        if content.is_empty() {
            return Err("empty placeholder".to_string());
        }
        match content.split_once(':') {
            Some(("CONFIG", key)) if !key.is_empty() => Ok(Self::ConfigRef(key.to_string())),
            Some(("CONFIG", _)) => Err("CONFIG reference is missing a key".to_string()),
            Some(_) => Err(format!("unknown placeholder namespace in '{content}'")),
            None => Ok(Self::AliasRef(content.to_string())),
        }
    }
}

// --- EXPANSION OUTPUT ---

/// The iteration strategy of a meta-alias, parsed from its body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaStrategy {
    /// One sequential invocation per remaining argument, in input order.
    Loop,
    /// Split one data argument on whitespace and loop over the values.
    Sloop,
    /// Split one data argument on commas and loop over the values.
    Cloop,
    /// One concurrent invocation per remaining argument. `jobs` bounds the
    /// worker count; `None` uses the default pool size.
    Parallel { jobs: Option<usize> },
    /// Like `Parallel` but with an xargs-style fixed default worker count.
    Xargs { jobs: usize },
}

impl MetaStrategy {
    pub fn is_concurrent(self) -> bool {
        matches!(self, Self::Parallel { .. } | Self::Xargs { .. })
    }

    pub fn jobs(self) -> Option<usize> {
        match self {
            Self::Parallel { jobs } => jobs,
            Self::Xargs { jobs } => Some(jobs),
            _ => None,
        }
    }
}

/// A single, fully rendered unit of work for the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub argv: Vec<String>,
}

impl Invocation {
    pub fn new(argv: Vec<String>) -> Self {
        Self { argv }
    }

    /// A shell-quoted rendering, for logging and `--dry-run` output.
    pub fn display(&self) -> String {
        shlex::try_join(self.argv.iter().map(String::as_str))
            .unwrap_or_else(|_| self.argv.join(" "))
    }
}

/// The terminal state of an expansion, ready to hand to the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedCommand {
    /// No alias matched; the input argv is dispatched literally.
    Passthrough(Vec<String>),
    Single(Invocation),
    /// A meta-alias fan-out: every invocation is already fully expanded.
    Batch {
        strategy: MetaStrategy,
        invocations: Vec<Invocation>,
    },
}

// --- RUNTIME CONTEXT (What the surrounding CLI supplies) ---

/// The active service/connection identifiers and the key/value map backing
/// `%{CONFIG:key}` substitution. Immutable for the life of a resolution.
#[derive(Debug, Clone, Default)]
pub struct RuntimeContext {
    pub service: Option<String>,
    pub connection: Option<String>,
    pub values: HashMap<String, String>,
}

impl RuntimeContext {
    pub fn value(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

/// Deserialized shape of the runtime context TOML file.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct ContextFile {
    #[serde(default)]
    pub context: ContextTable,
    #[serde(default)]
    pub values: HashMap<String, String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct ContextTable {
    pub service: Option<String>,
    pub connection: Option<String>,
}

impl From<ContextFile> for RuntimeContext {
    fn from(file: ContextFile) -> Self {
        Self {
            service: file.context.service,
            connection: file.context.connection,
            values: file.values,
        }
    }
}
