// src/cli/mod.rs

use crate::{
    CancellationToken,
    constants::{ALIASES_FILENAME, APP_CONFIG_DIR, CONTEXT_FILENAME, SYSTEM_CONFIG_DIR},
    core::{config_loader, expander::Expander, resolver::AliasResolver, store::ConfigStore, task_executor},
    models::{ContextFile, Origin, ResolvedCommand, RuntimeContext},
    system::executor::SystemDispatcher,
};
use anyhow::{Context, Result, anyhow};
use clap::Parser;
use colored::*;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(
    name = "balias",
    version,
    about = "Resolves scoped tracker-client aliases into executable commands."
)]
pub struct Cli {
    /// The active connection name (selects a [connection] alias section).
    #[arg(long, short = 'c')]
    pub connection: Option<String>,

    /// The active service name, e.g. "bugzilla5.0-jsonrpc".
    #[arg(long, short = 's')]
    pub service: Option<String>,

    /// An extra aliases file, loaded on top of the user layer.
    #[arg(long)]
    pub aliases_file: Option<String>,

    /// Path to the runtime context file. Defaults to config.toml in the
    /// user config directory, if present.
    #[arg(long)]
    pub config: Option<String>,

    /// An extra context value for %{CONFIG:key} interpolation ("KEY=VALUE").
    /// May be given multiple times.
    #[arg(long)]
    pub define: Vec<String>,

    /// Print the expansion instead of executing it.
    #[arg(long)]
    pub dry_run: bool,

    /// List the aliases visible in the active scope chain and exit.
    #[arg(long)]
    pub list: bool,

    /// The command line to resolve.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

/// The main entry point after argument parsing: loads configuration, builds
/// the resolution pipeline, and either prints or executes the result.
pub fn run(cli: Cli, cancellation_token: &CancellationToken) -> Result<()> {
    log::debug!("CLI args parsed: {:?}", cli);

    let context = load_context(&cli)?;
    let store = load_store(&cli)?;
    let resolver = AliasResolver::new(&store, context.service.as_deref(), context.connection.as_deref());

    if cli.list {
        list_aliases(&resolver);
        return Ok(());
    }

    if cli.command.is_empty() {
        return Err(anyhow!("no command given; see --help"));
    }

    let expander = Expander::new(&resolver, &context);
    let resolved = expander
        .expand(&cli.command)
        .with_context(|| format!("failed resolving '{}'", cli.command.join(" ")))?;

    if cli.dry_run {
        print_expansion(&resolved);
        return Ok(());
    }

    let dispatcher = SystemDispatcher::new(cancellation_token.clone());
    task_executor::execute(&resolved, &dispatcher)
}

/// Builds the runtime context: context file first, CLI flags on top.
fn load_context(cli: &Cli) -> Result<RuntimeContext> {
    let path = match &cli.config {
        Some(p) => Some(expand_path(p)),
        None => user_config_dir().map(|d| d.join(CONTEXT_FILENAME)).filter(|p| p.exists()),
    };

    let mut context = match path {
        Some(path) => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("cannot read context file '{}'", path.display()))?;
            let file: ContextFile = toml::from_str(&text)
                .with_context(|| format!("invalid context file '{}'", path.display()))?;
            RuntimeContext::from(file)
        }
        None => RuntimeContext::default(),
    };

    if cli.service.is_some() {
        context.service = cli.service.clone();
    }
    if cli.connection.is_some() {
        context.connection = cli.connection.clone();
    }
    for pair in &cli.define {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| anyhow!("--define expects KEY=VALUE, got '{pair}'"))?;
        context.values.insert(key.to_string(), value.to_string());
    }
    Ok(context)
}

/// Loads alias layers in precedence order: system file, user file, then any
/// explicitly supplied file on top of the user layer.
fn load_store(cli: &Cli) -> Result<ConfigStore> {
    let mut store = ConfigStore::new();

    let system_path = Path::new(SYSTEM_CONFIG_DIR).join(ALIASES_FILENAME);
    if system_path.exists() {
        store.add_sections(Origin::System, config_loader::load_file(&system_path)?);
    }

    if let Some(user_path) = user_config_dir().map(|d| d.join(ALIASES_FILENAME))
        && user_path.exists()
    {
        store.add_sections(Origin::User, config_loader::load_file(&user_path)?);
    }

    if let Some(extra) = &cli.aliases_file {
        let path = expand_path(extra);
        store.add_sections(Origin::User, config_loader::load_file(&path)?);
    }

    Ok(store)
}

fn user_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_CONFIG_DIR))
}

fn expand_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).into_owned())
}

fn list_aliases(resolver: &AliasResolver<'_>) {
    let visible = resolver.store().visible(resolver.chain().sections());
    for (tier, def) in visible {
        println!(
            "{} {}: {}",
            format!("({tier})").dimmed(),
            def.name.cyan(),
            def.body
        );
    }
}

fn print_expansion(resolved: &ResolvedCommand) {
    match resolved {
        ResolvedCommand::Passthrough(argv) => {
            println!("{} {}", "→".blue(), argv.join(" ").green());
        }
        ResolvedCommand::Single(invocation) => {
            println!("{} {}", "→".blue(), invocation.display().green());
        }
        ResolvedCommand::Batch {
            strategy,
            invocations,
        } => {
            println!(
                "{}",
                format!("┌─ {} invocation(s), strategy {:?}", invocations.len(), strategy).dimmed()
            );
            for invocation in invocations {
                println!("{} {}", "├─>".dimmed(), invocation.display().green());
            }
            println!("{}", "└─ End batch.".dimmed());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_define_value_may_contain_commas() {
        let cli =
            Cli::try_parse_from(["balias", "--define", "msg=a,b", "--dry-run", "x"]).unwrap();
        assert_eq!(cli.define, vec!["msg=a,b"]);
    }

    #[test]
    fn test_repeated_defines_accumulate() {
        let cli = Cli::try_parse_from(["balias", "--define", "a=1", "--define", "b=2", "x"])
            .unwrap();
        assert_eq!(cli.define, vec!["a=1", "b=2"]);
    }
}
