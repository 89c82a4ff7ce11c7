//! # Expander
//!
//! Turns a raw command line into a `ResolvedCommand`. Per invocation the
//! state machine is:
//!
//! - unknown leading token -> `Passthrough` (the argv is dispatched as-is);
//! - simple alias -> interpolated body shell-split and prepended to the
//!   remaining arguments;
//! - shell template (`!` body) -> interpolated body rendered with the
//!   remaining arguments appended, quoted, as one argv;
//! - meta-alias (`*` name) -> the first remaining argument names the target
//!   command; the strategy in the alias body fans the rest out into a batch,
//!   each sub-invocation expanded recursively through the resolver.

use crate::{
    constants::DEFAULT_XARGS_JOBS,
    core::{errors::ResolveError, interpolator::Interpolator, resolver::AliasResolver},
    models::{AliasKind, Invocation, MetaStrategy, ResolvedCommand, RuntimeContext},
};

pub struct Expander<'a> {
    resolver: &'a AliasResolver<'a>,
    context: &'a RuntimeContext,
}

impl<'a> Expander<'a> {
    pub fn new(resolver: &'a AliasResolver<'a>, context: &'a RuntimeContext) -> Self {
        Self { resolver, context }
    }

    /// Expands a full command line. The first element is the candidate alias
    /// token; everything after it is passed through to the expansion.
    pub fn expand(&self, argv: &[String]) -> Result<ResolvedCommand, ResolveError> {
        let Some((token, rest)) = argv.split_first() else {
            return Ok(ResolvedCommand::Passthrough(Vec::new()));
        };

        let Some((def, tier)) = self.resolver.resolve(token) else {
            return Ok(ResolvedCommand::Passthrough(argv.to_vec()));
        };
        log::debug!("Expanding '{}' ({:?}) from {tier}", def.name, def.kind);

        match def.kind {
            AliasKind::Simple => {
                let body = self.interpolate(&def.name, &def.body)?;
                let mut parts = shell_split(&def.name, &body)?;
                parts.extend(rest.iter().cloned());
                Ok(ResolvedCommand::Single(Invocation::new(parts)))
            }
            AliasKind::ShellFunction => {
                // A command template, not an exported shell function: the
                // remaining arguments are appended quoted and the rendered
                // line is dispatched as a single argv.
                let body = self.interpolate(&def.name, &def.body)?;
                let mut rendered = body.trim().to_string();
                for arg in rest {
                    let quoted = shlex::try_quote(arg).map_err(|_| {
                        ResolveError::malformed(&def.name, format!("argument '{arg}' cannot be quoted"))
                    })?;
                    rendered.push(' ');
                    rendered.push_str(&quoted);
                }
                let parts = shell_split(&def.name, &rendered)?;
                Ok(ResolvedCommand::Single(Invocation::new(parts)))
            }
            AliasKind::Meta => self.expand_meta(&def.name, &def.body, rest),
        }
    }

    fn interpolate(&self, name: &str, body: &str) -> Result<String, ResolveError> {
        Interpolator::new(self.resolver, self.context, name).interpolate(body)
    }

    fn expand_meta(
        &self,
        name: &str,
        body: &str,
        rest: &[String],
    ) -> Result<ResolvedCommand, ResolveError> {
        let strategy = parse_strategy(name, body)?;
        let Some((target, data)) = rest.split_first() else {
            return Err(ResolveError::malformed(
                name,
                "meta-alias requires a target command as its first argument",
            ));
        };
        if data.is_empty() {
            return Err(ResolveError::malformed(name, "meta-alias has no data arguments"));
        }

        // Each item is the per-invocation argument list appended to the target.
        let items: Vec<Vec<String>> = match strategy {
            MetaStrategy::Loop | MetaStrategy::Parallel { .. } | MetaStrategy::Xargs { .. } => {
                data.iter().map(|arg| vec![arg.clone()]).collect()
            }
            MetaStrategy::Sloop | MetaStrategy::Cloop => {
                let (list_arg, trailing) = data
                    .split_first()
                    .unwrap_or_else(|| unreachable!("data checked non-empty"));
                let values: Vec<&str> = if matches!(strategy, MetaStrategy::Cloop) {
                    list_arg.split(',').filter(|v| !v.is_empty()).collect()
                } else {
                    list_arg.split_whitespace().collect()
                };
                if values.is_empty() {
                    return Err(ResolveError::malformed(name, "empty value list"));
                }
                values
                    .into_iter()
                    .map(|value| {
                        let mut item = vec![value.to_string()];
                        item.extend(trailing.iter().cloned());
                        item
                    })
                    .collect()
            }
        };

        let mut invocations = Vec::with_capacity(items.len());
        for item in items {
            let mut sub_argv = vec![target.clone()];
            sub_argv.extend(item);
            // The target may itself be an alias; resolve it all the way down.
            match self.expand(&sub_argv)? {
                ResolvedCommand::Passthrough(argv) => invocations.push(Invocation::new(argv)),
                ResolvedCommand::Single(invocation) => invocations.push(invocation),
                ResolvedCommand::Batch { .. } => {
                    return Err(ResolveError::malformed(
                        name,
                        format!("target '{target}' expands to another meta-alias"),
                    ));
                }
            }
        }

        Ok(ResolvedCommand::Batch {
            strategy,
            invocations,
        })
    }
}

fn shell_split(name: &str, body: &str) -> Result<Vec<String>, ResolveError> {
    shlex::split(body)
        .ok_or_else(|| ResolveError::malformed(name, format!("unparseable body '{body}'")))
}

/// Parses a meta-alias body: a strategy name, optionally followed by
/// `-j N` (or a bare integer) to bound the worker count.
fn parse_strategy(name: &str, body: &str) -> Result<MetaStrategy, ResolveError> {
    let tokens = shlex::split(body)
        .ok_or_else(|| ResolveError::malformed(name, format!("unparseable body '{body}'")))?;
    let Some((strategy, opts)) = tokens.split_first() else {
        return Err(ResolveError::malformed(name, "empty meta-alias body"));
    };

    let jobs = parse_jobs(name, opts)?;
    match strategy.as_str() {
        "loop" => Ok(MetaStrategy::Loop),
        "sloop" => Ok(MetaStrategy::Sloop),
        "cloop" => Ok(MetaStrategy::Cloop),
        "parallel" => Ok(MetaStrategy::Parallel { jobs }),
        "xargs" => Ok(MetaStrategy::Xargs {
            jobs: jobs.unwrap_or(DEFAULT_XARGS_JOBS),
        }),
        other => Err(ResolveError::malformed(
            name,
            format!("unknown meta strategy '{other}'"),
        )),
    }
}

fn parse_jobs(name: &str, opts: &[String]) -> Result<Option<usize>, ResolveError> {
    let mut jobs = None;
    let mut iter = opts.iter();
    while let Some(opt) = iter.next() {
        let value = if opt == "-j" || opt == "--jobs" {
            iter.next().cloned()
        } else if let Some(v) = opt.strip_prefix("-j") {
            Some(v.to_string())
        } else {
            Some(opt.clone())
        };
        let parsed = value.as_deref().and_then(|v| v.parse::<usize>().ok());
        match parsed {
            Some(n) if n > 0 => jobs = Some(n),
            _ => {
                return Err(ResolveError::malformed(
                    name,
                    format!("invalid job count '{}'", value.unwrap_or_default()),
                ));
            }
        }
    }
    Ok(jobs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        core::store::ConfigStore,
        models::{AliasDefinition, AliasSection, Origin},
    };

    fn store_from(defs: &[(&str, &str, AliasKind)]) -> ConfigStore {
        let mut section = AliasSection::new("DEFAULT");
        for (name, body, kind) in defs {
            section.insert(AliasDefinition {
                name: (*name).to_string(),
                body: (*body).to_string(),
                kind: *kind,
            });
        }
        let mut store = ConfigStore::new();
        store.add_sections(Origin::User, vec![section]);
        store
    }

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    fn expand(store: &ConfigStore, parts: &[&str]) -> Result<ResolvedCommand, ResolveError> {
        let resolver = AliasResolver::new(store, None, None);
        let context = RuntimeContext::default();
        Expander::new(&resolver, &context).expand(&argv(parts))
    }

    #[test]
    fn test_unknown_token_passes_through_unchanged() {
        let store = ConfigStore::new();
        let result = expand(&store, &["frobnicate", "--flag", "x"]).unwrap();
        assert_eq!(
            result,
            ResolvedCommand::Passthrough(argv(&["frobnicate", "--flag", "x"]))
        );
    }

    #[test]
    fn test_simple_alias_prepends_body_tokens() {
        let store = store_from(&[("kde", "search --component kde", AliasKind::Simple)]);
        let result = expand(&store, &["kde", "--terms", "crash"]).unwrap();
        match result {
            ResolvedCommand::Single(inv) => assert_eq!(
                inv.argv,
                argv(&["search", "--component", "kde", "--terms", "crash"])
            ),
            other => panic!("unexpected expansion: {other:?}"),
        }
    }

    #[test]
    fn test_shell_template_quotes_appended_args() {
        let store = store_from(&[("grep-log", "journal show --grep", AliasKind::ShellFunction)]);
        let result = expand(&store, &["grep-log", "two words"]).unwrap();
        match result {
            ResolvedCommand::Single(inv) => {
                assert_eq!(inv.argv, argv(&["journal", "show", "--grep", "two words"]));
            }
            other => panic!("unexpected expansion: {other:?}"),
        }
    }

    #[test]
    fn test_loop_preserves_argument_order() {
        let store = ConfigStore::new();
        let result = expand(&store, &["loop", "g", "1", "2", "3"]).unwrap();
        match result {
            ResolvedCommand::Batch {
                strategy,
                invocations,
            } => {
                assert_eq!(strategy, MetaStrategy::Loop);
                let argvs: Vec<_> = invocations.iter().map(|i| i.argv.clone()).collect();
                assert_eq!(argvs, vec![argv(&["g", "1"]), argv(&["g", "2"]), argv(&["g", "3"])]);
            }
            other => panic!("unexpected expansion: {other:?}"),
        }
    }

    #[test]
    fn test_cloop_splits_on_commas_and_passes_trailing_args() {
        let store = ConfigStore::new();
        let result = expand(&store, &["cloop", "g", "1,2,3", "--flag"]).unwrap();
        match result {
            ResolvedCommand::Batch { invocations, .. } => {
                let argvs: Vec<_> = invocations.iter().map(|i| i.argv.clone()).collect();
                assert_eq!(
                    argvs,
                    vec![
                        argv(&["g", "1", "--flag"]),
                        argv(&["g", "2", "--flag"]),
                        argv(&["g", "3", "--flag"]),
                    ]
                );
            }
            other => panic!("unexpected expansion: {other:?}"),
        }
    }

    #[test]
    fn test_sloop_splits_on_whitespace() {
        let store = ConfigStore::new();
        let result = expand(&store, &["sloop", "g", "a b  c"]).unwrap();
        match result {
            ResolvedCommand::Batch { invocations, .. } => {
                assert_eq!(invocations.len(), 3);
                assert_eq!(invocations[0].argv, argv(&["g", "a"]));
                assert_eq!(invocations[2].argv, argv(&["g", "c"]));
            }
            other => panic!("unexpected expansion: {other:?}"),
        }
    }

    #[test]
    fn test_meta_target_is_expanded_through_aliases() {
        let store = store_from(&[("get", "fetch --id", AliasKind::Simple)]);
        let result = expand(&store, &["loop", "get", "7", "8"]).unwrap();
        match result {
            ResolvedCommand::Batch { invocations, .. } => {
                assert_eq!(invocations[0].argv, argv(&["fetch", "--id", "7"]));
                assert_eq!(invocations[1].argv, argv(&["fetch", "--id", "8"]));
            }
            other => panic!("unexpected expansion: {other:?}"),
        }
    }

    #[test]
    fn test_xargs_dispatches_one_invocation_per_argument() {
        let store = ConfigStore::new();
        let result = expand(&store, &["xargs", "g", "a", "b", "c", "d", "e"]).unwrap();
        match result {
            ResolvedCommand::Batch {
                strategy,
                invocations,
            } => {
                assert_eq!(strategy, MetaStrategy::Xargs { jobs: DEFAULT_XARGS_JOBS });
                assert_eq!(invocations.len(), 5);
            }
            other => panic!("unexpected expansion: {other:?}"),
        }
    }

    #[test]
    fn test_meta_without_target_is_malformed() {
        let store = ConfigStore::new();
        let err = expand(&store, &["loop"]).unwrap_err();
        assert!(matches!(err, ResolveError::MalformedAliasBody { .. }));
    }

    #[test]
    fn test_meta_without_data_is_malformed() {
        let store = ConfigStore::new();
        let err = expand(&store, &["loop", "g"]).unwrap_err();
        assert!(matches!(err, ResolveError::MalformedAliasBody { ref name, .. } if name == "loop"));
    }

    #[test]
    fn test_meta_targeting_meta_is_malformed() {
        let store = ConfigStore::new();
        let err = expand(&store, &["loop", "xargs", "g", "1"]).unwrap_err();
        assert!(matches!(err, ResolveError::MalformedAliasBody { .. }));
    }

    #[test]
    fn test_custom_meta_with_job_bound() {
        let store = store_from(&[("fanout", "parallel -j 2", AliasKind::Meta)]);
        let result = expand(&store, &["fanout", "g", "1", "2", "3"]).unwrap();
        match result {
            ResolvedCommand::Batch { strategy, .. } => {
                assert_eq!(strategy, MetaStrategy::Parallel { jobs: Some(2) });
            }
            other => panic!("unexpected expansion: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_strategy_is_malformed() {
        let store = store_from(&[("weird", "zigzag", AliasKind::Meta)]);
        let err = expand(&store, &["weird", "g", "1"]).unwrap_err();
        assert!(matches!(err, ResolveError::MalformedAliasBody { .. }));
    }

    #[test]
    fn test_empty_command_line() {
        let store = ConfigStore::new();
        let result = expand(&store, &[]).unwrap();
        assert_eq!(result, ResolvedCommand::Passthrough(Vec::new()));
    }
}
