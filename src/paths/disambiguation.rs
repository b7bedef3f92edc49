//! Per-name collision resolution.
//!
//! Every child name in the [crate::paths::PathHierarchy] maps to a [DisambiguationTree] holding
//! every node that shares the name, keyed first by declaration kind and then by content hash.
//! Non-symbol nodes (articles, sparse path segments) are stored under `(None, None)`.

use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fmt::{Debug, Display, Formatter},
};

/// One candidate of a collision together with the shortest suffix that selects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisambiguatedCandidate<T> {
    pub node: T,
    pub kind: Option<String>,
    pub hash: Option<String>,
    /// `-kind`, `-hash` or `-kind-hash`; empty when the entry carries no hints at all.
    pub suffix: String,
}

/// More than one entry matched the hints given to [DisambiguationTree::find].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisambiguationCollision<T> {
    pub candidates: Vec<DisambiguatedCandidate<T>>,
}

impl<T> Display for DisambiguationCollision<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let suffixes = self
            .candidates
            .iter()
            .map(|c| c.suffix.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        write!(
            f,
            "{} candidates match; disambiguate with one of [{suffixes}]",
            self.candidates.len()
        )
    }
}

impl<T: Debug> std::error::Error for DisambiguationCollision<T> {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisambiguationTree<T> {
    entries: BTreeMap<Option<String>, BTreeMap<Option<String>, T>>,
}

impl<T> Default for DisambiguationTree<T> {
    fn default() -> Self {
        DisambiguationTree {
            entries: BTreeMap::new(),
        }
    }
}

impl<T: Copy + Eq + Debug> DisambiguationTree<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `node` under `(kind, hash)`. When an entry already exists for that pair the
    /// existing node is returned and left in place; the caller is expected to merge `node` into
    /// it.
    pub fn add(&mut self, kind: Option<&str>, hash: Option<&str>, node: T) -> Option<T> {
        let by_hash = self.entries.entry(kind.map(String::from)).or_default();
        match by_hash.get(&hash.map(String::from)) {
            Some(existing) => Some(*existing),
            None => {
                by_hash.insert(hash.map(String::from), node);
                None
            }
        }
    }

    /// Folds `other` into this tree. Returns `(kept, incoming)` pairs for every key both trees
    /// held, so the caller can merge the two nodes.
    pub fn merge(&mut self, other: DisambiguationTree<T>) -> Vec<(T, T)> {
        let mut to_merge = Vec::new();
        for (kind, by_hash) in other.entries.into_iter() {
            for (hash, node) in by_hash.into_iter() {
                if let Some(existing) = self.add(kind.as_deref(), hash.as_deref(), node) {
                    if existing != node {
                        to_merge.push((existing, node));
                    }
                }
            }
        }
        to_merge
    }

    pub fn remove(&mut self, kind: Option<&str>, hash: Option<&str>) -> Option<T> {
        let kind_key = kind.map(String::from);
        let by_hash = self.entries.get_mut(&kind_key)?;
        let removed = by_hash.remove(&hash.map(String::from));
        if by_hash.is_empty() {
            self.entries.remove(&kind_key);
        }
        removed
    }

    /// Replaces every occurrence of `from` with `to`, used when two nodes were merged.
    pub fn replace(&mut self, from: T, to: T) {
        for by_hash in self.entries.values_mut() {
            for node in by_hash.values_mut() {
                if *node == from {
                    *node = to;
                }
            }
        }
    }

    pub fn get(&self, kind: Option<&str>, hash: Option<&str>) -> Option<T> {
        self.entries
            .get(&kind.map(String::from))
            .and_then(|by_hash| by_hash.get(&hash.map(String::from)))
            .copied()
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(|by_hash| by_hash.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All `(kind, hash, node)` entries in key order.
    pub fn entries(&self) -> impl Iterator<Item = (Option<&str>, Option<&str>, T)> + '_ {
        self.entries.iter().flat_map(|(kind, by_hash)| {
            by_hash
                .iter()
                .map(move |(hash, node)| (kind.as_deref(), hash.as_deref(), *node))
        })
    }

    pub fn nodes(&self) -> impl Iterator<Item = T> + '_ {
        self.entries().map(|(_, _, node)| node)
    }

    /// Finds the single node matching the optional hints.
    ///
    /// - both hints: direct lookup.
    /// - one hint: the candidates carrying that hint must narrow to exactly one.
    /// - no hints: the tree must hold exactly one node.
    ///
    /// `Ok(None)` means nothing matched; several matches are reported as a collision, never
    /// guessed between.
    pub fn find(
        &self,
        kind: Option<&str>,
        hash: Option<&str>,
    ) -> Result<Option<T>, DisambiguationCollision<T>> {
        if kind.is_some() && hash.is_some() {
            return Ok(self.get(kind, hash));
        }
        let remaining = self
            .entries()
            .filter(|(k, h, _)| {
                kind.map(|kind| *k == Some(kind)).unwrap_or(true)
                    && hash.map(|hash| *h == Some(hash)).unwrap_or(true)
            })
            .collect::<Vec<_>>();
        match remaining.len() {
            0 => Ok(None),
            1 => Ok(Some(remaining[0].2)),
            _ => Err(self.collision(remaining)),
        }
    }

    /// Every entry paired with its minimal suffix.
    pub fn all_candidates(&self) -> Vec<DisambiguatedCandidate<T>> {
        self.collision(self.entries().collect()).candidates
    }

    fn collision(&self, remaining: Vec<(Option<&str>, Option<&str>, T)>) -> DisambiguationCollision<T> {
        DisambiguationCollision {
            candidates: remaining
                .into_iter()
                .map(|(kind, hash, node)| DisambiguatedCandidate {
                    node,
                    kind: kind.map(String::from),
                    hash: hash.map(String::from),
                    suffix: self.minimal_suffix(kind, hash),
                })
                .collect(),
        }
    }

    /// The shortest suffix that makes [DisambiguationTree::find] return exactly this entry,
    /// measured against every entry in the tree.
    pub fn minimal_suffix(&self, kind: Option<&str>, hash: Option<&str>) -> String {
        if let Some(kind) = kind {
            if self.entries().filter(|(k, _, _)| *k == Some(kind)).count() == 1 {
                return format!("-{kind}");
            }
        }
        if let Some(hash) = hash {
            if self.entries().filter(|(_, h, _)| *h == Some(hash)).count() == 1 {
                return format!("-{hash}");
            }
        }
        match (kind, hash) {
            (Some(kind), Some(hash)) => format!("-{kind}-{hash}"),
            (Some(kind), None) => format!("-{kind}"),
            (None, Some(hash)) => format!("-{hash}"),
            (None, None) => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value_tree() -> DisambiguationTree<u32> {
        let mut tree = DisambiguationTree::new();
        assert!(tree.add(Some("method"), Some("aaa111"), 1).is_none());
        assert!(tree.add(Some("property"), Some("bbb222"), 2).is_none());
        tree
    }

    #[test]
    fn test_find_without_hints_collides() {
        let tree = value_tree();
        let collision = tree.find(None, None).unwrap_err();
        let mut suffixes = collision
            .candidates
            .iter()
            .map(|c| (c.node, c.suffix.clone()))
            .collect::<Vec<_>>();
        suffixes.sort();
        assert_eq!(
            suffixes,
            vec![(1, "-method".to_string()), (2, "-property".to_string())]
        );
    }

    #[test]
    fn test_find_with_hints() {
        let tree = value_tree();
        assert_eq!(tree.find(Some("method"), None), Ok(Some(1)));
        assert_eq!(tree.find(None, Some("bbb222")), Ok(Some(2)));
        assert_eq!(tree.find(Some("method"), Some("bbb222")), Ok(None));
        assert_eq!(tree.find(Some("class"), None), Ok(None));
    }

    #[test]
    fn test_overloads_need_hash() {
        let mut tree = DisambiguationTree::new();
        tree.add(Some("method"), Some("aaa111"), 1u32);
        tree.add(Some("method"), Some("bbb222"), 2u32);
        tree.add(Some("property"), Some("ccc333"), 3u32);

        let collision = tree.find(Some("method"), None).unwrap_err();
        assert_eq!(collision.candidates.len(), 2);
        for candidate in collision.candidates.iter() {
            let hash = candidate.hash.clone().unwrap();
            assert_eq!(candidate.suffix, format!("-{hash}"));
            assert_eq!(tree.find(None, Some(&hash)), Ok(Some(candidate.node)));
        }
    }

    #[test]
    fn test_kind_and_hash_suffix_when_hash_is_shared() {
        let mut tree = DisambiguationTree::new();
        tree.add(Some("method"), Some("aaa111"), 1u32);
        tree.add(Some("method"), Some("bbb222"), 2u32);
        tree.add(Some("property"), Some("aaa111"), 3u32);
        assert_eq!(tree.minimal_suffix(Some("method"), Some("aaa111")), "-method-aaa111");
        assert_eq!(tree.minimal_suffix(Some("property"), Some("aaa111")), "-property");
    }

    #[test]
    fn test_add_existing_returns_it_and_merge_reports_pairs() {
        let mut tree = value_tree();
        assert_eq!(tree.add(Some("method"), Some("aaa111"), 9), Some(1));
        assert_eq!(tree.len(), 2);

        let mut other = DisambiguationTree::new();
        other.add(Some("method"), Some("aaa111"), 7u32);
        other.add(Some("class"), Some("ddd444"), 8u32);
        let pairs = tree.merge(other);
        assert_eq!(pairs, vec![(1, 7)]);
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.find(Some("class"), None), Ok(Some(8)));
    }

    #[test]
    fn test_remove_and_replace() {
        let mut tree = value_tree();
        tree.replace(1, 5);
        assert_eq!(tree.get(Some("method"), Some("aaa111")), Some(5));
        assert_eq!(tree.remove(Some("method"), Some("aaa111")), Some(5));
        assert_eq!(tree.find(None, None), Ok(Some(2)));
    }
}
