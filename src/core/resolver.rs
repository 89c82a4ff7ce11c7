//! # Alias Resolver
//!
//! The sole authority on alias precedence. A resolver owns an explicit,
//! ordered `ScopeChain` built once from the active connection and service;
//! every lookup walks that chain most-specific first, probing the user layer
//! before the system layer at each section. Nothing here mutates the store.

use crate::{
    constants::DEFAULT_SECTION,
    core::store::ConfigStore,
    models::{AliasDefinition, Origin, ScopeTier},
};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Matches a versioned service name like "bugzilla5.0" and captures the
    // unversioned family ("bugzilla").
    static ref SERVICE_VERSION_RE: Regex = Regex::new(r"^([a-zA-Z]+)[0-9][0-9.]*$").unwrap();
}

/// The ordered list of section identifiers to probe for one resolution,
/// most-specific first, always ending with `DEFAULT`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeChain {
    sections: Vec<String>,
}

impl ScopeChain {
    pub fn build(service: Option<&str>, connection: Option<&str>) -> Self {
        let mut sections = Vec::new();
        if let Some(conn) = connection
            && !conn.is_empty()
        {
            sections.push(conn.to_string());
        }
        if let Some(service) = service {
            sections.extend(service_scopes(service));
        }
        sections.push(DEFAULT_SECTION.to_string());
        Self { sections }
    }

    pub fn sections(&self) -> &[String] {
        &self.sections
    }
}

/// Generates the service section identifiers for a service name, broadest
/// last. A full service name like `bugzilla5.0-jsonrpc` probes:
///
/// `:bugzilla5.0-jsonrpc:` -> `:bugzilla5.0:` -> `:bugzilla:`
pub fn service_scopes(service: &str) -> Vec<String> {
    let mut scopes = Vec::new();
    if service.is_empty() {
        return scopes;
    }
    scopes.push(format!(":{service}:"));

    let versioned = match service.split_once('-') {
        Some((base, _protocol)) if !base.is_empty() => {
            scopes.push(format!(":{base}:"));
            base
        }
        _ => service,
    };

    if let Some(caps) = SERVICE_VERSION_RE.captures(versioned) {
        let family = caps.get(1).map_or("", |m| m.as_str());
        let scope = format!(":{family}:");
        if !scopes.contains(&scope) {
            scopes.push(scope);
        }
    }
    scopes
}

pub struct AliasResolver<'a> {
    store: &'a ConfigStore,
    chain: ScopeChain,
}

impl<'a> AliasResolver<'a> {
    pub fn new(store: &'a ConfigStore, service: Option<&str>, connection: Option<&str>) -> Self {
        let chain = ScopeChain::build(service, connection);
        log::debug!("Scope chain: {:?}", chain.sections());
        Self { store, chain }
    }

    /// Finds the definition for a token, together with the scope tier it came
    /// from. `None` means no section in the chain defines the name; callers
    /// treat that as passthrough, not as an error.
    pub fn resolve(&self, token: &str) -> Option<(&'a AliasDefinition, ScopeTier)> {
        for section in &self.chain.sections {
            for origin in [Origin::User, Origin::System] {
                if let Some(def) = self.store.lookup(token, origin, section) {
                    let tier = ScopeTier {
                        origin,
                        section: section.clone(),
                    };
                    log::debug!("Alias '{token}' matched in {tier}");
                    return Some((def, tier));
                }
                log::trace!("Alias '{token}' not in {origin} [{section}]");
            }
        }
        log::debug!("Alias '{token}' not found in any scope; passing through.");
        None
    }

    pub fn chain(&self) -> &ScopeChain {
        &self.chain
    }

    pub fn store(&self) -> &'a ConfigStore {
        self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AliasKind, AliasSection};

    fn store_with(layers: &[(Origin, &str, &[(&str, &str)])]) -> ConfigStore {
        let mut store = ConfigStore::new();
        for (origin, id, defs) in layers {
            let mut section = AliasSection::new(*id);
            for (name, body) in *defs {
                section.insert(crate::models::AliasDefinition {
                    name: (*name).to_string(),
                    body: (*body).to_string(),
                    kind: AliasKind::Simple,
                });
            }
            store.add_sections(*origin, vec![section]);
        }
        store
    }

    #[test]
    fn test_service_scopes_full_name() {
        assert_eq!(
            service_scopes("bugzilla5.0-jsonrpc"),
            vec![":bugzilla5.0-jsonrpc:", ":bugzilla5.0:", ":bugzilla:"]
        );
    }

    #[test]
    fn test_service_scopes_plain_name() {
        assert_eq!(service_scopes("github"), vec![":github:"]);
        assert_eq!(service_scopes("roundup1.4"), vec![":roundup1.4:", ":roundup:"]);
    }

    #[test]
    fn test_chain_order_connection_then_service_then_default() {
        let chain = ScopeChain::build(Some("bugzilla5.0"), Some("gentoo"));
        assert_eq!(
            chain.sections(),
            &["gentoo", ":bugzilla5.0:", ":bugzilla:", "DEFAULT"]
        );
    }

    #[test]
    fn test_user_shadows_system_in_same_section() {
        let store = store_with(&[
            (Origin::System, "DEFAULT", &[("s", "system-body")]),
            (Origin::User, "DEFAULT", &[("s", "user-body")]),
        ]);
        let resolver = AliasResolver::new(&store, None, None);
        let (def, tier) = resolver.resolve("s").unwrap();
        assert_eq!(def.body, "user-body");
        assert_eq!(tier.origin, Origin::User);
    }

    #[test]
    fn test_connection_shadows_service_shadows_default() {
        let store = store_with(&[
            (Origin::System, "DEFAULT", &[("s", "default")]),
            (Origin::System, ":bugzilla:", &[("s", "service")]),
            (Origin::System, "gentoo", &[("s", "connection")]),
        ]);

        let resolver = AliasResolver::new(&store, Some("bugzilla"), Some("gentoo"));
        assert_eq!(resolver.resolve("s").unwrap().0.body, "connection");

        let resolver = AliasResolver::new(&store, Some("bugzilla"), None);
        assert_eq!(resolver.resolve("s").unwrap().0.body, "service");

        let resolver = AliasResolver::new(&store, None, None);
        assert_eq!(resolver.resolve("s").unwrap().0.body, "default");
    }

    #[test]
    fn test_narrow_system_beats_broad_user() {
        // Specificity outranks origin: a system connection-level alias wins
        // over a user default-level one.
        let store = store_with(&[
            (Origin::System, "gentoo", &[("s", "narrow-system")]),
            (Origin::User, "DEFAULT", &[("s", "broad-user")]),
        ]);
        let resolver = AliasResolver::new(&store, None, Some("gentoo"));
        let (def, tier) = resolver.resolve("s").unwrap();
        assert_eq!(def.body, "narrow-system");
        assert_eq!(tier.section, "gentoo");
    }

    #[test]
    fn test_unknown_token_resolves_to_none() {
        let store = ConfigStore::new();
        let resolver = AliasResolver::new(&store, Some("bugzilla"), Some("gentoo"));
        assert!(resolver.resolve("no-such-alias").is_none());
    }
}
