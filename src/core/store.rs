//! # Config Store
//!
//! Holds every loaded `AliasSection`, partitioned by origin (system vs user).
//! The store is read-only after loading; all precedence decisions live in
//! `core::resolver`, which probes the store with an explicit scope chain.

use crate::{
    constants::DEFAULT_SECTION,
    models::{AliasDefinition, AliasKind, AliasSection, Origin, ScopeTier},
};

/// The built-in meta-aliases seeded into the system `DEFAULT` section so the
/// iteration strategies work without any aliases file present. A user or
/// system definition with the same name shadows them like any other entry.
const BUILTIN_META: &[(&str, &str)] = &[
    ("loop", "loop"),
    ("sloop", "sloop"),
    ("cloop", "cloop"),
    ("parallel", "parallel"),
    ("xargs", "xargs"),
];

#[derive(Debug, Default)]
pub struct ConfigStore {
    system: Vec<AliasSection>,
    user: Vec<AliasSection>,
}

impl ConfigStore {
    /// An empty store with only the built-in meta-aliases.
    pub fn new() -> Self {
        let mut builtins = AliasSection::new(DEFAULT_SECTION);
        for (name, strategy) in BUILTIN_META {
            builtins.insert(AliasDefinition {
                name: (*name).to_string(),
                body: (*strategy).to_string(),
                kind: AliasKind::Meta,
            });
        }
        Self {
            system: vec![builtins],
            user: Vec::new(),
        }
    }

    /// Merges parsed sections into an origin layer. Entries loaded later
    /// shadow same-named entries in the same section loaded earlier, which is
    /// how a connection-level file overrides the shipped defaults.
    pub fn add_sections(&mut self, origin: Origin, sections: Vec<AliasSection>) {
        let layer = self.layer_mut(origin);
        for section in sections {
            if let Some(existing) = layer.iter_mut().find(|s| s.id == section.id) {
                for def in section.iter() {
                    existing.insert(def.clone());
                }
            } else {
                layer.push(section);
            }
        }
    }

    /// Probes the given origin/section for a name. Section identifiers that
    /// were never loaded simply miss.
    pub fn lookup(
        &self,
        name: &str,
        origin: Origin,
        section_id: &str,
    ) -> Option<&AliasDefinition> {
        self.layer(origin)
            .iter()
            .find(|s| s.id == section_id)
            .and_then(|s| s.get(name))
    }

    /// All definitions visible through the given ordered section identifiers,
    /// shadowed entries omitted. Probe order must be most-specific first.
    pub fn visible<'a>(
        &'a self,
        section_ids: &[String],
    ) -> Vec<(ScopeTier, &'a AliasDefinition)> {
        let mut seen: Vec<&str> = Vec::new();
        let mut out = Vec::new();
        for id in section_ids {
            for origin in [Origin::User, Origin::System] {
                let Some(section) = self.layer(origin).iter().find(|s| &s.id == id) else {
                    continue;
                };
                for def in section.iter() {
                    if seen.contains(&def.name.as_str()) {
                        continue;
                    }
                    seen.push(&def.name);
                    out.push((
                        ScopeTier {
                            origin,
                            section: id.clone(),
                        },
                        def,
                    ));
                }
            }
        }
        out
    }

    fn layer(&self, origin: Origin) -> &[AliasSection] {
        match origin {
            Origin::System => &self.system,
            Origin::User => &self.user,
        }
    }

    fn layer_mut(&mut self, origin: Origin) -> &mut Vec<AliasSection> {
        match origin {
            Origin::System => &mut self.system,
            Origin::User => &mut self.user,
        }
    }
}
