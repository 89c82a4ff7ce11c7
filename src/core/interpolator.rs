//! # Interpolator
//!
//! Expands `%{...}` placeholders inside alias bodies. `%{CONFIG:key}` pulls a
//! value from the runtime context; `%{name}` substitutes the fully expanded
//! body of another alias, resolved through the active scope chain. `%%` is a
//! literal percent. Substitution is by value, never by live reference.

use crate::{
    core::{errors::ResolveError, resolver::AliasResolver},
    models::{Placeholder, RuntimeContext},
};

/// Depth bound for placeholder chains. The expansion chain catches direct
/// cycles; this catches pathological configs that dodge the visited-set with
/// non-identical but equivalent names.
pub const MAX_RECURSION_DEPTH: u32 = 32;

pub struct Interpolator<'a> {
    resolver: &'a AliasResolver<'a>,
    context: &'a RuntimeContext,
    // Alias names along the current expansion chain, root first.
    chain: Vec<String>,
    depth: u32,
}

impl<'a> Interpolator<'a> {
    pub fn new(resolver: &'a AliasResolver<'a>, context: &'a RuntimeContext, root: &str) -> Self {
        Self {
            resolver,
            context,
            chain: vec![root.to_string()],
            depth: 0,
        }
    }

    /// Creates an interpolator for a nested alias reference.
    fn child(&self, name: &str) -> Self {
        let mut chain = self.chain.clone();
        chain.push(name.to_string());
        Self {
            resolver: self.resolver,
            context: self.context,
            chain,
            depth: self.depth + 1,
        }
    }

    fn current_name(&self) -> &str {
        self.chain.last().map(String::as_str).unwrap_or("")
    }

    /// Expands every placeholder in `body`. The result contains no remaining
    /// `%{...}` tokens.
    pub fn interpolate(&mut self, body: &str) -> Result<String, ResolveError> {
        if self.depth >= MAX_RECURSION_DEPTH {
            return Err(ResolveError::RecursionLimitExceeded {
                name: self.current_name().to_string(),
                limit: MAX_RECURSION_DEPTH,
            });
        }
        let alias = self.current_name().to_string();

        let mut out = String::with_capacity(body.len());
        let mut rest = body;
        while let Some(pos) = rest.find('%') {
            out.push_str(&rest[..pos]);
            rest = &rest[pos..];

            if let Some(after) = rest.strip_prefix("%%") {
                out.push('%');
                rest = after;
                continue;
            }

            if let Some(after) = rest.strip_prefix("%{") {
                let Some(end) = after.find('}') else {
                    return Err(ResolveError::malformed(
                        &alias,
                        "unterminated '%{' placeholder",
                    ));
                };
                let content = &after[..end];
                rest = &after[end + 1..];

                let placeholder = Placeholder::parse(content)
                    .map_err(|reason| ResolveError::malformed(&alias, reason))?;
                match placeholder {
                    Placeholder::ConfigRef(key) => match self.context.value(&key) {
                        Some(value) => out.push_str(value),
                        None => {
                            return Err(ResolveError::MissingConfigKey { alias, key });
                        }
                    },
                    Placeholder::AliasRef(name) => {
                        out.push_str(&self.expand_alias_ref(&name)?);
                    }
                }
                continue;
            }

            return Err(ResolveError::malformed(
                &alias,
                "'%' must be followed by '%' or '{'",
            ));
        }
        out.push_str(rest);
        Ok(out)
    }

    fn expand_alias_ref(&self, name: &str) -> Result<String, ResolveError> {
        if self.chain.iter().any(|n| n == name) {
            return Err(ResolveError::CircularReference {
                name: name.to_string(),
                chain: self.chain.join(" -> "),
            });
        }
        let Some((def, tier)) = self.resolver.resolve(name) else {
            return Err(ResolveError::malformed(
                self.current_name(),
                format!("reference to unknown alias '%{{{name}}}'"),
            ));
        };
        log::trace!("Interpolating '%{{{name}}}' from {tier}");
        // The stored body already has its '!' marker stripped, so shell
        // templates interpolate as plain command text.
        self.child(name).interpolate(&def.body)
    }
}
