//! Dual-indexed content store.
//!
//! [ContentCache] maps a [ResolvedIdentifier] to a value and, for symbol-backed entries, also
//! maps the symbol's precise key to that identifier, so code holding only a raw key from a
//! relationship record can still reach the entry.

use serde::{Deserialize, Serialize};
use std::collections::{btree_map::Entry, BTreeMap};

use crate::properties::ResolvedIdentifier;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentCache<V> {
    values: BTreeMap<ResolvedIdentifier, V>,
    symbol_keys: BTreeMap<String, ResolvedIdentifier>,
}

impl<V> Default for ContentCache<V> {
    fn default() -> Self {
        ContentCache {
            values: BTreeMap::new(),
            symbol_keys: BTreeMap::new(),
        }
    }
}

impl<V> ContentCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under `reference`, replacing any previous value. When a `symbol_key` is
    /// given it is indexed too; the first identifier registered for a key keeps it.
    pub fn add(&mut self, reference: ResolvedIdentifier, value: V, symbol_key: Option<&str>) -> Option<V> {
        if let Some(key) = symbol_key {
            if let Entry::Vacant(entry) = self.symbol_keys.entry(key.to_string()) {
                entry.insert(reference);
            }
        }
        self.values.insert(reference, value)
    }

    pub fn get(&self, reference: &ResolvedIdentifier) -> Option<&V> {
        self.values.get(reference)
    }

    pub fn get_mut(&mut self, reference: &ResolvedIdentifier) -> Option<&mut V> {
        self.values.get_mut(reference)
    }

    pub fn reference_for_symbol_key(&self, key: &str) -> Option<ResolvedIdentifier> {
        self.symbol_keys.get(key).copied()
    }

    pub fn get_by_symbol_key(&self, key: &str) -> Option<&V> {
        self.reference_for_symbol_key(key)
            .and_then(|reference| self.values.get(&reference))
    }

    pub fn get_by_symbol_key_mut(&mut self, key: &str) -> Option<&mut V> {
        let reference = self.reference_for_symbol_key(key)?;
        self.values.get_mut(&reference)
    }

    pub fn contains(&self, reference: &ResolvedIdentifier) -> bool {
        self.values.contains_key(reference)
    }

    pub fn references(&self) -> impl Iterator<Item = ResolvedIdentifier> + '_ {
        self.values.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ResolvedIdentifier, &V)> {
        self.values.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&ResolvedIdentifier, &mut V)> {
        self.values.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
