//! Identifier normalization and the lookup tables both feeds share.
//!
//! The feeds name resources inconsistently, so matching is centralised
//! here with one fixed precedence:
//!
//! 1. exact normalized id, then key, then name;
//! 2. the same identifiers with a known tool prefix stripped
//!    (`tf-`, `terraform-`, `helm-`, `release-`), matched against the
//!    stripped forms of every identifier the record carried.
//!
//! Normalized means lowercased with everything except ASCII letters and
//! digits removed, so `Net_VPC`, `net-vpc` and `netvpc` all meet.

use std::collections::HashMap;

use crate::graph::ResourceIdents;

use super::model::Progress;

const TOOL_PREFIXES: &[&str] = &["terraform-", "tf-", "helm-", "release-"];

pub fn normalize(raw: &str) -> String {
    raw.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Normalized form with any known tool prefix removed, if one was present.
pub fn stripped(raw: &str) -> Option<String> {
    let lower = raw.trim().to_ascii_lowercase();
    TOOL_PREFIXES
        .iter()
        .find_map(|prefix| lower.strip_prefix(prefix))
        .map(normalize)
        .filter(|s| !s.is_empty())
}

/// Values indexed by all three identifiers of the resource they describe.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentIndex<T> {
    by_id: HashMap<String, T>,
    by_key: HashMap<String, T>,
    by_name: HashMap<String, T>,
    fallback: HashMap<String, T>,
}

impl<T> Default for IdentIndex<T> {
    fn default() -> Self {
        Self {
            by_id: HashMap::new(),
            by_key: HashMap::new(),
            by_name: HashMap::new(),
            fallback: HashMap::new(),
        }
    }
}

/// Per-node progress keyed the way both feeds address resources.
pub type ProgressTable = IdentIndex<Progress>;

impl<T: Clone> IdentIndex<T> {
    /// Later inserts for the same identifier replace earlier ones.
    pub fn insert(&mut self, idents: &ResourceIdents, value: T) {
        let slots = [
            (&mut self.by_id, idents.id.as_deref()),
            (&mut self.by_key, idents.key.as_deref()),
            (&mut self.by_name, idents.name.as_deref()),
        ];
        for (map, ident) in slots {
            let Some(ident) = ident else { continue };
            let key = normalize(ident);
            if !key.is_empty() {
                map.insert(key, value.clone());
            }
        }
        for ident in [&idents.id, &idents.key, &idents.name].into_iter().flatten() {
            let key = stripped(ident).unwrap_or_else(|| normalize(ident));
            if !key.is_empty() {
                self.fallback.insert(key, value.clone());
            }
        }
    }

    pub fn lookup(&self, idents: &ResourceIdents) -> Option<&T> {
        let exact = [
            (&self.by_id, idents.id.as_deref()),
            (&self.by_key, idents.key.as_deref()),
            (&self.by_name, idents.name.as_deref()),
        ];
        for (map, ident) in exact {
            if let Some(hit) = ident.map(normalize).and_then(|k| map.get(&k)) {
                return Some(hit);
            }
        }

        [&idents.id, &idents.key, &idents.name]
            .into_iter()
            .flatten()
            .find_map(|ident| {
                let key = stripped(ident).unwrap_or_else(|| normalize(ident));
                self.fallback.get(&key)
            })
    }

    /// Number of distinct primary entries.
    pub fn len(&self) -> usize {
        self.by_id.len().max(self.by_key.len()).max(self.by_name.len())
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty() && self.by_key.is_empty() && self.by_name.is_empty()
    }
}
