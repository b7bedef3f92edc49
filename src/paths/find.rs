//! Path lookup against a [PathHierarchy].
//!
//! Root selection tries, in order: the `tutorials/` prefix, the articles and tutorials
//! namespaces, an absolute module match, an ascent from the starting node toward its root, and
//! finally the module roots again for relative paths that name a module.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    paths::{
        disambiguation::{DisambiguationCollision, DisambiguationTree},
        hierarchy::{NodeId, PathHierarchy, PathNodeRole},
        path::{parse_path, ParsedPath, PathComponent, PathPrefix},
    },
    properties::ResolvedIdentifier,
};

/// One candidate of an unresolved collision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollisionCandidate {
    /// `None` for candidates that are not pages of their own (sparse path segments).
    pub identifier: Option<ResolvedIdentifier>,
    pub suffix: String,
    /// The component spelled with its minimal suffix, e.g. `value-method`.
    pub disambiguated: String,
}

fn joined(parts: &[String], separator: &str) -> String {
    parts.join(separator)
}

fn candidate_names(collisions: &[CollisionCandidate]) -> String {
    collisions
        .iter()
        .map(|c| c.disambiguated.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum PathLookupError {
    #[error("No match for '{}'. Available: [{}]", joined(.remaining, "/"), joined(.available, ", "))]
    NotFound {
        remaining: Vec<String>,
        available: Vec<String>,
    },
    #[error(
        "Matched '{}' but not '{}'. Available: [{}]",
        joined(.matched, "/"),
        joined(.remaining, "/"),
        joined(.available, ", ")
    )]
    PartialResult {
        partial: Option<ResolvedIdentifier>,
        matched: Vec<String>,
        remaining: Vec<String>,
        available: Vec<String>,
    },
    #[error(
        "'{}' is ambiguous. Candidates: [{}]",
        joined(.remaining, "/"),
        candidate_names(.collisions)
    )]
    LookupCollision {
        partial: Option<ResolvedIdentifier>,
        matched: Vec<String>,
        remaining: Vec<String>,
        collisions: Vec<CollisionCandidate>,
    },
}

impl PathLookupError {
    /// How far the lookup got, used to keep the innermost failure while ascending.
    fn depth(&self) -> usize {
        match self {
            PathLookupError::NotFound { .. } => 0,
            PathLookupError::PartialResult { matched, .. }
            | PathLookupError::LookupCollision { matched, .. } => matched.len() + 1,
        }
    }
}

fn keep_innermost(innermost: &mut Option<PathLookupError>, err: PathLookupError) {
    if innermost
        .as_ref()
        .map(|kept| err.depth() > kept.depth())
        .unwrap_or(true)
    {
        *innermost = Some(err);
    }
}

impl PathHierarchy {
    /// Resolves `path` to an identifier.
    ///
    /// Relative paths are looked up from `parent`, then from each of its ancestors.
    /// `only_find_symbols` skips the articles and tutorials namespaces.
    pub fn find(
        &self,
        path: &str,
        parent: Option<ResolvedIdentifier>,
        only_find_symbols: bool,
    ) -> Result<ResolvedIdentifier, PathLookupError> {
        self.find_parsed(&parse_path(path), parent, only_find_symbols)
    }

    pub fn find_parsed(
        &self,
        parsed: &ParsedPath,
        parent: Option<ResolvedIdentifier>,
        only_find_symbols: bool,
    ) -> Result<ResolvedIdentifier, PathLookupError> {
        let components = parsed.components.as_slice();
        let Some(first) = components.first() else {
            return Err(PathLookupError::NotFound {
                remaining: Vec::new(),
                available: self.modules.keys().cloned().collect(),
            });
        };

        if parsed.prefix == Some(PathPrefix::Tutorials) {
            if only_find_symbols {
                return Err(PathLookupError::NotFound {
                    remaining: parsed.component_strings(),
                    available: Vec::new(),
                });
            }
            return self.find_in_tutorials(components);
        }

        if !only_find_symbols {
            if let Some(found) = self.find_in_articles(components) {
                return Ok(found);
            }
            if parsed.prefix.is_none() && self.child_tree(self.tutorials_root, first).is_some() {
                if let Ok(found) = self.find_in_tutorials(components) {
                    return Ok(found);
                }
            }
        }

        if parsed.is_absolute {
            return match self.module_root(first) {
                Some(module) => {
                    self.descend(module, &components[1..], vec![first.full.clone()])
                }
                None => Err(PathLookupError::NotFound {
                    remaining: parsed.component_strings(),
                    available: self.modules.keys().cloned().collect(),
                }),
            };
        }

        let mut innermost: Option<PathLookupError> = None;
        if let Some(start) = parent.and_then(|p| self.node_id(p)) {
            let mut current = Some(start);
            let mut top = start;
            while let Some(node) = current {
                if self.child_tree(node, first).is_some() {
                    match self.descend(node, components, Vec::new()) {
                        Ok(found) => return Ok(found),
                        Err(err) => keep_innermost(&mut innermost, err),
                    }
                }
                top = node;
                current = self.arena_node(node).parent_node();
            }

            // Articles and tutorials live outside the modules; their relative links continue
            // in the module namespaces.
            if top == self.articles_root || top == self.tutorials_root {
                for module in self.document_modules() {
                    if self.child_tree(module, first).is_some() {
                        match self.descend(module, components, Vec::new()) {
                            Ok(found) => return Ok(found),
                            Err(err) => keep_innermost(&mut innermost, err),
                        }
                    }
                }
            }
        }

        if let Some(module) = self.module_root(first) {
            match self.descend(module, &components[1..], vec![first.full.clone()]) {
                Ok(found) => return Ok(found),
                Err(err) => keep_innermost(&mut innermost, err),
            }
        }

        Err(innermost.unwrap_or_else(|| {
            let available = match parent.and_then(|p| self.node_id(p)) {
                Some(start) => self.arena_node(start).child_names(),
                None => self.modules.keys().cloned().collect(),
            };
            PathLookupError::NotFound {
                remaining: parsed.component_strings(),
                available,
            }
        }))
    }

    /// Module roots searched from articles and tutorials. The module the articles namespace is
    /// named after comes first, then the others by name.
    fn document_modules(&self) -> Vec<NodeId> {
        let articles_name = self.arena_node(self.articles_root).name();
        let mut modules = Vec::with_capacity(self.modules.len());
        if let Some(named) = self.modules.get(articles_name) {
            modules.push(*named);
        }
        modules.extend(
            self.modules
                .iter()
                .filter(|(name, _)| name.as_str() != articles_name)
                .map(|(_, id)| *id),
        );
        modules
    }

    fn module_root(&self, component: &PathComponent) -> Option<NodeId> {
        self.modules
            .get(&component.full)
            .or_else(|| self.modules.get(&component.name))
            .copied()
    }

    /// Articles are reachable as `<articles root>/<article>` or directly as `<article>`.
    fn find_in_articles(&self, components: &[PathComponent]) -> Option<ResolvedIdentifier> {
        let root_name = self.articles_root_name();
        if components.len() > 1
            && components[0].full == root_name
            && self.child_tree(self.articles_root, &components[1]).is_some()
        {
            if let Ok(found) = self.descend(
                self.articles_root,
                &components[1..],
                vec![root_name.to_string()],
            ) {
                return Some(found);
            }
        }
        if self.child_tree(self.articles_root, &components[0]).is_some() {
            return self
                .descend(self.articles_root, components, Vec::new())
                .ok();
        }
        None
    }

    /// Tutorials are flat under the tutorials root; a leading table-of-contents name is optional.
    fn find_in_tutorials(
        &self,
        components: &[PathComponent],
    ) -> Result<ResolvedIdentifier, PathLookupError> {
        if components.len() > 1 {
            if let Ok(found) = self.descend(self.tutorials_root, &components[1..], Vec::new()) {
                return Ok(found);
            }
        }
        self.descend(self.tutorials_root, components, Vec::new())
    }

    /// The disambiguation tree matching `component` under `node`: the exact authored spelling
    /// first, then the name with its suffix removed.
    fn child_tree(
        &self,
        node: NodeId,
        component: &PathComponent,
    ) -> Option<(&DisambiguationTree<NodeId>, bool)> {
        let children = self.arena_node(node).children();
        if let Some(tree) = children.get(&component.full) {
            return Some((tree, false));
        }
        if component.has_disambiguation() {
            return children.get(&component.name).map(|tree| (tree, true));
        }
        None
    }

    fn descend(
        &self,
        start: NodeId,
        components: &[PathComponent],
        mut matched: Vec<String>,
    ) -> Result<ResolvedIdentifier, PathLookupError> {
        let mut current = start;
        for (idx, component) in components.iter().enumerate() {
            let remaining = || {
                components[idx..]
                    .iter()
                    .map(|c| c.full.clone())
                    .collect::<Vec<_>>()
            };
            let Some((tree, use_hints)) = self.child_tree(current, component) else {
                return Err(self.missing(current, matched, remaining()));
            };
            let (kind, hash) = if use_hints {
                (component.kind.as_deref(), component.hash.as_deref())
            } else {
                (None, None)
            };
            let next = match tree.find(kind, hash) {
                Ok(Some(next)) => next,
                Ok(None) => {
                    let available = tree
                        .all_candidates()
                        .into_iter()
                        .map(|c| format!("{}{}", component.name, c.suffix))
                        .collect();
                    return Err(if matched.is_empty() {
                        PathLookupError::NotFound {
                            remaining: remaining(),
                            available,
                        }
                    } else {
                        PathLookupError::PartialResult {
                            partial: self.arena_node(current).identifier(),
                            matched,
                            remaining: remaining(),
                            available,
                        }
                    });
                }
                Err(collision) => {
                    match self.break_collision(&collision, components.get(idx + 1)) {
                        Some(next) => next,
                        None => {
                            return Err(PathLookupError::LookupCollision {
                                partial: self.arena_node(current).identifier(),
                                matched,
                                remaining: remaining(),
                                collisions: collision
                                    .candidates
                                    .iter()
                                    .map(|c| CollisionCandidate {
                                        identifier: self.arena_node(c.node).identifier(),
                                        suffix: c.suffix.clone(),
                                        disambiguated: format!("{}{}", component.name, c.suffix),
                                    })
                                    .collect(),
                            })
                        }
                    }
                }
            };
            matched.push(component.full.clone());
            current = next;
        }

        match self.arena_node(current).identifier() {
            Some(identifier) => Ok(identifier),
            None => {
                // Sparse segments and the synthetic roots are not pages.
                let mut remaining = Vec::new();
                if let Some(last) = matched.pop() {
                    remaining.push(last);
                }
                Err(PathLookupError::NotFound {
                    remaining,
                    available: self.arena_node(current).child_names(),
                })
            }
        }
    }

    fn missing(
        &self,
        current: NodeId,
        matched: Vec<String>,
        remaining: Vec<String>,
    ) -> PathLookupError {
        let available = self.arena_node(current).child_names();
        if matched.is_empty() {
            PathLookupError::NotFound {
                remaining,
                available,
            }
        } else {
            PathLookupError::PartialResult {
                partial: self.arena_node(current).identifier(),
                matched,
                remaining,
                available,
            }
        }
    }

    /// Picks one candidate when the collision can be settled without guessing: exactly one
    /// candidate has a child named like the next component, or every candidate is the same
    /// symbol in different language variants and one of them is in the canonical language.
    fn break_collision(
        &self,
        collision: &DisambiguationCollision<NodeId>,
        next: Option<&PathComponent>,
    ) -> Option<NodeId> {
        if let Some(next) = next {
            let with_child = collision
                .candidates
                .iter()
                .filter(|c| self.child_tree(c.node, next).is_some())
                .map(|c| c.node)
                .collect::<Vec<_>>();
            if with_child.len() == 1 {
                return Some(with_child[0]);
            }
        }
        let precise_keys = collision
            .candidates
            .iter()
            .map(|c| {
                let node = self.arena_node(c.node);
                match node.role() {
                    PathNodeRole::Symbol => node.symbol().map(|s| s.precise.as_str()),
                    _ => None,
                }
            })
            .collect::<Vec<_>>();
        let first = precise_keys.first().copied().flatten()?;
        if precise_keys.iter().all(|key| *key == Some(first)) {
            return collision
                .candidates
                .iter()
                .find(|c| {
                    self.arena_node(c.node)
                        .languages()
                        .contains(self.canonical_language)
                })
                .map(|c| c.node);
        }
        None
    }
}
