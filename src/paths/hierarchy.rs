/// Defines [PathHierarchy], the namespace every authored link is resolved against.
///
/// Nodes live in an arena (`Vec<PathNode>`) and refer to each other by [NodeId]. Children are
/// owned through their parent's child map; the `parent` field is a plain index back-reference.
/// Each child name maps to a [DisambiguationTree], never to a single node.
///
/// # Construction
///
/// [PathHierarchy::build] merges any number of [SymbolGraph] batches:
///
/// 1. batches are sorted by [SymbolGraph::merge_key] so the result does not depend on input order,
/// 2. one node is created per `(precise key, kind)`; the same declaration seen in several batches
///    merges into that node (first batch wins on conflicting content, the conflict is reported),
/// 3. structural relationships (`memberOf`, `requirementOf`, ...) attach nodes to their parents,
/// 4. anything left unattached is placed by its path components, synthesizing sparse nodes for
///    segments with no symbol of their own; a sparse node is folded into a symbol of the same
///    name as soon as one is placed,
/// 5. identifiers are minted breadth-first from the sorted roots.
use enumset::EnumSet;
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, BTreeSet, VecDeque},
    fmt,
};

use crate::{
    error::DocweaveError,
    paths::disambiguation::DisambiguationTree,
    paths::path::{DOCUMENTATION_PREFIX, TUTORIALS_PREFIX},
    properties::{NodeKind, ResolvedIdentifier, SourceLanguage, SymbolKind},
    symbolgraph::{RelationshipRecord, SymbolGraph, SymbolRecord},
};

/// Arena index of a [PathNode]. Only meaningful for the hierarchy that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    fn idx(&self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PathNodeRole {
    Module,
    Symbol,
    /// Stand-in for a path segment that no symbol claimed.
    Sparse,
    ArticlesRoot,
    Article,
    TechnologyRoot,
    TutorialsRoot,
    TutorialTableOfContents,
    Tutorial,
}

impl PathNodeRole {
    /// Topic graph kind for roles that become pages. Sparse nodes and the synthetic roots never
    /// do.
    pub fn node_kind(&self) -> Option<NodeKind> {
        match self {
            PathNodeRole::Module => Some(NodeKind::Module),
            PathNodeRole::Symbol => Some(NodeKind::Symbol),
            PathNodeRole::Article => Some(NodeKind::Article),
            PathNodeRole::TechnologyRoot => Some(NodeKind::TechnologyRoot),
            PathNodeRole::TutorialTableOfContents => Some(NodeKind::TutorialTableOfContents),
            PathNodeRole::Tutorial => Some(NodeKind::Tutorial),
            PathNodeRole::Sparse | PathNodeRole::ArticlesRoot | PathNodeRole::TutorialsRoot => {
                None
            }
        }
    }
}

/// Declaration payload of a symbol-backed node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolPayload {
    pub precise: String,
    pub kind: SymbolKind,
    pub hash: String,
    pub module: String,
    pub path_components: Vec<String>,
    pub declaration: Option<String>,
    pub doc_comment: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathNode {
    name: String,
    role: PathNodeRole,
    symbol: Option<SymbolPayload>,
    languages: EnumSet<SourceLanguage>,
    platforms: BTreeSet<String>,
    children: BTreeMap<String, DisambiguationTree<NodeId>>,
    parent: Option<NodeId>,
    identifier: Option<ResolvedIdentifier>,
    /// Set when this node was folded into another one.
    merged_into: Option<NodeId>,
    /// Set when the node could not be placed without clobbering another declaration.
    detached: bool,
}

impl PathNode {
    fn new(name: &str, role: PathNodeRole) -> PathNode {
        PathNode {
            name: name.to_string(),
            role,
            symbol: None,
            languages: EnumSet::new(),
            platforms: BTreeSet::new(),
            children: BTreeMap::new(),
            parent: None,
            identifier: None,
            merged_into: None,
            detached: false,
        }
    }

    fn from_record(
        record: &SymbolRecord,
        module: &str,
        language: SourceLanguage,
        platform: Option<&str>,
    ) -> PathNode {
        let mut node = PathNode::new(record.name(), PathNodeRole::Symbol);
        node.symbol = Some(SymbolPayload {
            precise: record.precise().to_string(),
            kind: record.symbol_kind(),
            hash: record.hash(),
            module: module.to_string(),
            path_components: record.path_components.clone(),
            declaration: record.declaration.clone(),
            doc_comment: record.doc_comment.clone(),
            location: record.location.clone(),
        });
        node.languages.insert(record.language().unwrap_or(language));
        if let Some(platform) = platform {
            node.platforms.insert(platform.to_string());
        }
        node
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> PathNodeRole {
        self.role
    }

    pub fn symbol(&self) -> Option<&SymbolPayload> {
        self.symbol.as_ref()
    }

    pub fn languages(&self) -> EnumSet<SourceLanguage> {
        self.languages
    }

    pub fn platforms(&self) -> &BTreeSet<String> {
        &self.platforms
    }

    pub fn identifier(&self) -> Option<ResolvedIdentifier> {
        self.identifier
    }

    pub fn child_names(&self) -> Vec<String> {
        self.children.keys().cloned().collect()
    }

    pub(crate) fn children(&self) -> &BTreeMap<String, DisambiguationTree<NodeId>> {
        &self.children
    }

    pub(crate) fn parent_node(&self) -> Option<NodeId> {
        self.parent
    }

    /// `(kind, hash)` this node is filed under in its parent's [DisambiguationTree].
    fn disambiguation_key(&self) -> (Option<String>, Option<String>) {
        match &self.symbol {
            Some(payload) => (
                Some(payload.kind.identifier().to_string()),
                Some(payload.hash.clone()),
            ),
            None => (None, None),
        }
    }

    fn is_live(&self) -> bool {
        self.merged_into.is_none() && !self.detached
    }
}

/// Two batches disagreed about one declaration. The first registered batch wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeConflict {
    pub precise: String,
    pub detail: MergeConflictDetail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MergeConflictDetail {
    Name { kept: String, rejected: String },
    Declaration { kept: String, rejected: String },
    Parent { kept: String, rejected: String },
    /// Two different precise keys produced the same `(name, kind, hash)` under one parent.
    HashCollision { kept: String, hash: String },
}

impl fmt::Display for MergeConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            MergeConflictDetail::Name { kept, rejected } => write!(
                f,
                "'{}' is named '{kept}' and '{rejected}' by different symbol graphs; keeping '{kept}'",
                self.precise
            ),
            MergeConflictDetail::Declaration { kept, rejected } => write!(
                f,
                "'{}' has conflicting declarations '{kept}' and '{rejected}'; keeping the first",
                self.precise
            ),
            MergeConflictDetail::Parent { kept, rejected } => write!(
                f,
                "'{}' is a member of both '{kept}' and '{rejected}'; keeping '{kept}'",
                self.precise
            ),
            MergeConflictDetail::HashCollision { kept, hash } => write!(
                f,
                "'{}' collides with '{kept}' on hash '{hash}' and was not placed",
                self.precise
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathHierarchy {
    pub(super) nodes: Vec<PathNode>,
    /// Top level roots by name: modules and technology roots.
    pub(super) modules: BTreeMap<String, NodeId>,
    pub(super) articles_root: NodeId,
    pub(super) tutorials_root: NodeId,
    /// Identifier index to arena index.
    pub(super) lookup: Vec<NodeId>,
    pub(super) canonical_language: SourceLanguage,
    by_precise: BTreeMap<String, Vec<NodeId>>,
}

impl PathHierarchy {
    /// An empty hierarchy holding only the synthetic articles and tutorials roots.
    pub fn new(articles_root_name: &str, canonical_language: SourceLanguage) -> PathHierarchy {
        let mut hierarchy = PathHierarchy {
            nodes: Vec::new(),
            modules: BTreeMap::new(),
            articles_root: NodeId(0),
            tutorials_root: NodeId(1),
            lookup: Vec::new(),
            canonical_language,
            by_precise: BTreeMap::new(),
        };
        hierarchy.articles_root =
            hierarchy.push(PathNode::new(articles_root_name, PathNodeRole::ArticlesRoot));
        hierarchy.tutorials_root =
            hierarchy.push(PathNode::new(TUTORIALS_PREFIX, PathNodeRole::TutorialsRoot));
        hierarchy
    }

    /// Merges `graphs` into one hierarchy. Fails only when a batch violates the input contract;
    /// disagreements between batches are returned as [MergeConflict]s.
    #[tracing::instrument(skip(graphs))]
    pub fn build(
        graphs: &[SymbolGraph],
        articles_root_name: &str,
        canonical_language: SourceLanguage,
    ) -> Result<(PathHierarchy, Vec<MergeConflict>), DocweaveError> {
        for graph in graphs.iter() {
            graph.validate()?;
        }
        let mut sorted = graphs.iter().collect::<Vec<_>>();
        sorted.sort_by_cached_key(|graph| graph.merge_key());

        let mut hierarchy = PathHierarchy::new(articles_root_name, canonical_language);
        let mut conflicts = Vec::new();
        // Module each node was first seen in, used when placing by path components.
        let mut home_module = BTreeMap::<NodeId, NodeId>::new();

        for graph in sorted.iter() {
            let language = graph.language();
            let platform = graph.module.platform.as_deref();
            let module = hierarchy.module_node(&graph.module.name);
            {
                let node = &mut hierarchy.nodes[module.idx()];
                node.languages.insert(language);
                if let Some(platform) = platform {
                    node.platforms.insert(platform.to_string());
                }
            }
            for record in graph.symbols.iter() {
                if record.symbol_kind() == SymbolKind::Module {
                    let ids = hierarchy
                        .by_precise
                        .entry(record.precise().to_string())
                        .or_default();
                    if !ids.contains(&module) {
                        ids.push(module);
                    }
                    continue;
                }
                let id = hierarchy.symbol_node(
                    record,
                    &graph.module.name,
                    language,
                    platform,
                    &mut conflicts,
                );
                home_module.entry(id).or_insert(module);
            }
        }

        for graph in sorted.iter() {
            for relationship in graph
                .relationships
                .iter()
                .filter(|r| r.kind.is_structural())
            {
                hierarchy.attach_by_relationship(relationship, &mut conflicts);
            }
        }

        let unplaced = home_module
            .iter()
            .filter(|(id, _)| {
                let node = &hierarchy.nodes[id.idx()];
                node.parent.is_none() && node.is_live()
            })
            .map(|(id, module)| (*id, *module))
            .collect::<Vec<_>>();
        for (id, module) in unplaced {
            // Placing an earlier node may have folded this one already.
            if hierarchy.nodes[id.idx()].parent.is_none() && hierarchy.nodes[id.idx()].is_live() {
                hierarchy.place_by_path(id, module, &mut conflicts);
            }
        }

        hierarchy.assign_identifiers();
        tracing::debug!(
            "Built path hierarchy: {} modules, {} identifiers, {} merge conflicts",
            hierarchy.modules.len(),
            hierarchy.lookup.len(),
            conflicts.len()
        );
        Ok((hierarchy, conflicts))
    }

    fn push(&mut self, node: PathNode) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    fn module_node(&mut self, name: &str) -> NodeId {
        if let Some(id) = self.modules.get(name) {
            return *id;
        }
        let id = self.push(PathNode::new(name, PathNodeRole::Module));
        self.modules.insert(name.to_string(), id);
        id
    }

    fn symbol_node(
        &mut self,
        record: &SymbolRecord,
        module: &str,
        language: SourceLanguage,
        platform: Option<&str>,
        conflicts: &mut Vec<MergeConflict>,
    ) -> NodeId {
        let kind = record.symbol_kind();
        let existing = self.by_precise.get(record.precise()).and_then(|ids| {
            ids.iter().copied().find(|id| {
                self.nodes[id.idx()]
                    .symbol
                    .as_ref()
                    .map(|payload| payload.kind == kind)
                    .unwrap_or(false)
            })
        });
        match existing {
            Some(id) => {
                self.merge_record(id, record, language, platform, conflicts);
                id
            }
            None => {
                let id = self.push(PathNode::from_record(record, module, language, platform));
                self.by_precise
                    .entry(record.precise().to_string())
                    .or_default()
                    .push(id);
                id
            }
        }
    }

    /// Folds a later batch's view of a declaration into the node created by an earlier one.
    /// Languages and platforms are unioned; for everything else the first batch wins.
    fn merge_record(
        &mut self,
        id: NodeId,
        record: &SymbolRecord,
        language: SourceLanguage,
        platform: Option<&str>,
        conflicts: &mut Vec<MergeConflict>,
    ) {
        let node = &mut self.nodes[id.idx()];
        node.languages.insert(record.language().unwrap_or(language));
        if let Some(platform) = platform {
            node.platforms.insert(platform.to_string());
        }
        if node.name != record.name() {
            conflicts.push(MergeConflict {
                precise: record.precise().to_string(),
                detail: MergeConflictDetail::Name {
                    kept: node.name.clone(),
                    rejected: record.name().to_string(),
                },
            });
        }
        let Some(payload) = node.symbol.as_mut() else {
            return;
        };
        match (&payload.declaration, &record.declaration) {
            (Some(kept), Some(rejected)) if kept != rejected => {
                conflicts.push(MergeConflict {
                    precise: record.precise().to_string(),
                    detail: MergeConflictDetail::Declaration {
                        kept: kept.clone(),
                        rejected: rejected.clone(),
                    },
                });
            }
            (None, Some(declaration)) => payload.declaration = Some(declaration.clone()),
            _ => {}
        }
        if payload.doc_comment.is_none() {
            payload.doc_comment = record.doc_comment.clone();
        }
        if payload.location.is_none() {
            payload.location = record.location.clone();
        }
        if payload.path_components.is_empty() {
            payload.path_components = record.path_components.clone();
        }
    }

    fn attach_by_relationship(
        &mut self,
        relationship: &RelationshipRecord,
        conflicts: &mut Vec<MergeConflict>,
    ) {
        let Some(targets) = self.by_precise.get(&relationship.target).cloned() else {
            return;
        };
        let Some(sources) = self.by_precise.get(&relationship.source).cloned() else {
            return;
        };
        for source in sources {
            if !matches!(self.nodes[source.idx()].role, PathNodeRole::Symbol)
                || !self.nodes[source.idx()].is_live()
            {
                continue;
            }
            let target = self.preferred_target(source, &targets);
            if target == source || self.is_ancestor(source, target) {
                tracing::debug!(
                    "Ignoring cyclic {:?} relationship {} -> {}",
                    relationship.kind,
                    relationship.source,
                    relationship.target
                );
                continue;
            }
            match self.nodes[source.idx()].parent {
                Some(existing) if existing == target => {}
                Some(existing) => conflicts.push(MergeConflict {
                    precise: relationship.source.clone(),
                    detail: MergeConflictDetail::Parent {
                        kept: self.nodes[existing.idx()].name.clone(),
                        rejected: self.nodes[target.idx()].name.clone(),
                    },
                }),
                None => {
                    self.attach(target, source, conflicts);
                }
            }
        }
    }

    /// Among the nodes sharing a precise key, the one sharing a language with `source`.
    fn preferred_target(&self, source: NodeId, targets: &[NodeId]) -> NodeId {
        let languages = self.nodes[source.idx()].languages;
        targets
            .iter()
            .copied()
            .find(|target| !self.nodes[target.idx()].languages.is_disjoint(languages))
            .unwrap_or(targets[0])
    }

    /// True when `candidate` is `node` or one of its ancestors.
    fn is_ancestor(&self, candidate: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == candidate {
                return true;
            }
            current = self.nodes[id.idx()].parent;
        }
        false
    }

    /// Files `child` under `parent`. Returns false when the slot is taken by a different
    /// declaration, in which case `child` is left detached.
    fn attach(
        &mut self,
        parent: NodeId,
        child: NodeId,
        conflicts: &mut Vec<MergeConflict>,
    ) -> bool {
        let name = self.nodes[child.idx()].name.clone();
        let (kind, hash) = self.nodes[child.idx()].disambiguation_key();
        self.nodes[child.idx()].parent = Some(parent);
        let existing = self.nodes[parent.idx()]
            .children
            .entry(name.clone())
            .or_default()
            .add(kind.as_deref(), hash.as_deref(), child);
        match existing {
            None => {
                self.collapse_sparse(parent, &name, Some(child));
                true
            }
            Some(existing) if existing == child => true,
            Some(existing) => {
                let both_sparse = self.nodes[existing.idx()].role == PathNodeRole::Sparse
                    && self.nodes[child.idx()].role == PathNodeRole::Sparse;
                if both_sparse {
                    self.absorb(existing, child);
                    return true;
                }
                let child_node = &mut self.nodes[child.idx()];
                child_node.parent = None;
                child_node.detached = true;
                let precise = child_node
                    .symbol
                    .as_ref()
                    .map(|p| p.precise.clone())
                    .unwrap_or_else(|| name.clone());
                let kept = self.nodes[existing.idx()]
                    .symbol
                    .as_ref()
                    .map(|p| p.precise.clone())
                    .unwrap_or_else(|| name.clone());
                tracing::warn!("Hash collision placing '{precise}' beside '{kept}'");
                conflicts.push(MergeConflict {
                    precise,
                    detail: MergeConflictDetail::HashCollision {
                        kept,
                        hash: hash.unwrap_or_default(),
                    },
                });
                false
            }
        }
    }

    /// When `name` under `parent` holds both a sparse node and at least one declaration, fold the
    /// sparse node into `preferred` (or the first declaration in key order).
    fn collapse_sparse(&mut self, parent: NodeId, name: &str, preferred: Option<NodeId>) {
        let Some(tree) = self.nodes[parent.idx()].children.get(name) else {
            return;
        };
        let Some(sparse) = tree.get(None, None) else {
            return;
        };
        if self.nodes[sparse.idx()].role != PathNodeRole::Sparse {
            return;
        }
        let into = preferred
            .filter(|p| *p != sparse && self.nodes[p.idx()].symbol.is_some())
            .or_else(|| tree.nodes().find(|n| *n != sparse));
        let Some(into) = into else {
            return;
        };
        if let Some(tree) = self.nodes[parent.idx()].children.get_mut(name) {
            tree.remove(None, None);
        }
        self.absorb(into, sparse);
    }

    /// Moves every child of `source` under `target` and marks `source` as merged.
    fn absorb(&mut self, target: NodeId, source: NodeId) {
        self.nodes[source.idx()].merged_into = Some(target);
        self.nodes[source.idx()].parent = None;
        let children = std::mem::take(&mut self.nodes[source.idx()].children);
        for (name, tree) in children.into_iter() {
            for node in tree.nodes() {
                self.nodes[node.idx()].parent = Some(target);
            }
            let pairs = self.nodes[target.idx()]
                .children
                .entry(name.clone())
                .or_default()
                .merge(tree);
            for (kept, incoming) in pairs {
                self.absorb(kept, incoming);
            }
            self.collapse_sparse(target, &name, None);
        }
    }

    fn place_by_path(&mut self, id: NodeId, module: NodeId, conflicts: &mut Vec<MergeConflict>) {
        let components = self.nodes[id.idx()]
            .symbol
            .as_ref()
            .map(|p| p.path_components.clone())
            .unwrap_or_default();
        let mut parent = module;
        if components.len() > 1 {
            for component in components[..components.len() - 1].iter() {
                let next = self.child_or_sparse(parent, component, conflicts);
                if next == id || self.is_ancestor(id, next) {
                    break;
                }
                parent = next;
            }
        }
        self.attach(parent, id, conflicts);
    }

    fn child_or_sparse(
        &mut self,
        parent: NodeId,
        name: &str,
        conflicts: &mut Vec<MergeConflict>,
    ) -> NodeId {
        if let Some(tree) = self.nodes[parent.idx()].children.get(name) {
            let found = match tree.find(None, None) {
                Ok(found) => found,
                Err(collision) => {
                    // Members are placed under the declaration that can hold them.
                    let chosen = collision
                        .candidates
                        .iter()
                        .find(|c| {
                            self.nodes[c.node.idx()]
                                .symbol
                                .as_ref()
                                .is_some_and(|symbol| symbol.kind.is_container())
                        })
                        .or_else(|| collision.candidates.first())
                        .map(|c| c.node);
                    tracing::debug!(
                        "Path component '{name}' is ambiguous ({collision}); placing under {}",
                        chosen
                            .and_then(|id| self.nodes[id.idx()].symbol.as_ref())
                            .map(|symbol| symbol.precise.as_str())
                            .unwrap_or("<none>")
                    );
                    chosen
                }
            };
            if let Some(found) = found {
                return found;
            }
        }
        let sparse = self.push(PathNode::new(name, PathNodeRole::Sparse));
        self.attach(parent, sparse, conflicts);
        sparse
    }

    fn mint(&mut self, id: NodeId) -> ResolvedIdentifier {
        if let Some(identifier) = self.nodes[id.idx()].identifier {
            return identifier;
        }
        let identifier = ResolvedIdentifier::local(self.lookup.len() as u32);
        self.lookup.push(id);
        self.nodes[id.idx()].identifier = Some(identifier);
        identifier
    }

    /// Breadth-first from the sorted roots so identifiers do not depend on batch order.
    fn assign_identifiers(&mut self) {
        let mut queue = self.modules.values().copied().collect::<VecDeque<_>>();
        queue.push_back(self.articles_root);
        queue.push_back(self.tutorials_root);
        while let Some(id) = queue.pop_front() {
            let node = &self.nodes[id.idx()];
            if !node.is_live() {
                continue;
            }
            if node.role.node_kind().is_some() {
                self.mint(id);
            }
            let children = self.nodes[id.idx()]
                .children
                .values()
                .flat_map(|tree| tree.nodes().collect::<Vec<_>>())
                .collect::<Vec<_>>();
            queue.extend(children);
        }
    }

    fn add_named(
        &mut self,
        parent: NodeId,
        name: &str,
        role: PathNodeRole,
    ) -> Result<ResolvedIdentifier, ResolvedIdentifier> {
        if let Some(existing) = self.nodes[parent.idx()]
            .children
            .get(name)
            .and_then(|tree| tree.get(None, None))
        {
            return match self.nodes[existing.idx()].identifier {
                Some(identifier) => Err(identifier),
                None => Ok(self.mint(existing)),
            };
        }
        let id = self.push(PathNode::new(name, role));
        self.nodes[id.idx()].parent = Some(parent);
        self.nodes[parent.idx()]
            .children
            .entry(name.to_string())
            .or_default()
            .add(None, None, id);
        Ok(self.mint(id))
    }

    /// Registers an article under the articles root. A second article with the same name gets
    /// `Err` carrying the first one's identifier.
    pub fn add_article(&mut self, name: &str) -> Result<ResolvedIdentifier, ResolvedIdentifier> {
        self.add_named(self.articles_root, name, PathNodeRole::Article)
    }

    pub fn add_tutorial(&mut self, name: &str) -> Result<ResolvedIdentifier, ResolvedIdentifier> {
        self.add_named(self.tutorials_root, name, PathNodeRole::Tutorial)
    }

    pub fn add_tutorial_table_of_contents(
        &mut self,
        name: &str,
    ) -> Result<ResolvedIdentifier, ResolvedIdentifier> {
        self.add_named(
            self.tutorials_root,
            name,
            PathNodeRole::TutorialTableOfContents,
        )
    }

    /// Registers an article that heads its own hierarchy. It sits beside the modules and is
    /// rejected when a module of the same name exists.
    pub fn add_technology_root(
        &mut self,
        name: &str,
    ) -> Result<ResolvedIdentifier, ResolvedIdentifier> {
        if let Some(existing) = self.modules.get(name).copied() {
            return Err(self.mint(existing));
        }
        let id = self.push(PathNode::new(name, PathNodeRole::TechnologyRoot));
        self.modules.insert(name.to_string(), id);
        Ok(self.mint(id))
    }

    pub(crate) fn node_id(&self, identifier: ResolvedIdentifier) -> Option<NodeId> {
        if identifier.is_external() {
            return None;
        }
        self.lookup.get(identifier.index()).copied()
    }

    pub(crate) fn arena_node(&self, id: NodeId) -> &PathNode {
        &self.nodes[id.idx()]
    }

    pub fn node(&self, identifier: ResolvedIdentifier) -> Option<&PathNode> {
        self.node_id(identifier).map(|id| &self.nodes[id.idx()])
    }

    pub fn articles_root_name(&self) -> &str {
        &self.nodes[self.articles_root.idx()].name
    }

    pub fn canonical_language(&self) -> SourceLanguage {
        self.canonical_language
    }

    /// Every identifier minted so far, in minting order.
    pub fn identifiers(&self) -> impl Iterator<Item = ResolvedIdentifier> + '_ {
        self.lookup
            .iter()
            .filter_map(|id| self.nodes[id.idx()].identifier)
    }

    pub fn len(&self) -> usize {
        self.lookup.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lookup.is_empty()
    }

    pub fn module_identifiers(&self) -> Vec<ResolvedIdentifier> {
        self.modules
            .values()
            .filter(|id| self.nodes[id.idx()].role == PathNodeRole::Module)
            .filter_map(|id| self.nodes[id.idx()].identifier)
            .collect()
    }

    /// Identifiers of every node built for `precise`, one per distinct kind.
    pub fn identifiers_for_precise(&self, precise: &str) -> Vec<ResolvedIdentifier> {
        self.by_precise
            .get(precise)
            .map(|ids| {
                ids.iter()
                    .filter(|id| self.nodes[id.idx()].is_live())
                    .filter_map(|id| self.nodes[id.idx()].identifier)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Nearest ancestor that has an identifier, skipping sparse segments.
    pub fn parent(&self, identifier: ResolvedIdentifier) -> Option<ResolvedIdentifier> {
        let mut current = self.nodes[self.node_id(identifier)?.idx()].parent;
        while let Some(id) = current {
            let node = &self.nodes[id.idx()];
            if let Some(parent) = node.identifier {
                return Some(parent);
            }
            current = node.parent;
        }
        None
    }

    /// The path component naming `child` inside `parent`, suffixed only when the name is shared.
    pub(crate) fn path_component(&self, parent: NodeId, child: NodeId) -> String {
        let node = &self.nodes[child.idx()];
        let Some(tree) = self.nodes[parent.idx()].children.get(&node.name) else {
            return node.name.clone();
        };
        if tree.len() <= 1 {
            return node.name.clone();
        }
        let (kind, hash) = node.disambiguation_key();
        format!(
            "{}{}",
            node.name,
            tree.minimal_suffix(kind.as_deref(), hash.as_deref())
        )
    }

    /// Absolute, fully disambiguated path such as `documentation/MyKit/Foo/value-method`.
    pub fn absolute_path(&self, identifier: ResolvedIdentifier) -> Option<String> {
        let mut id = self.node_id(identifier)?;
        let mut parts = Vec::new();
        let prefix = loop {
            let node = &self.nodes[id.idx()];
            match node.parent {
                Some(parent) => {
                    parts.push(self.path_component(parent, id));
                    id = parent;
                }
                None if id == self.tutorials_root => break TUTORIALS_PREFIX,
                None => {
                    parts.push(node.name.clone());
                    break DOCUMENTATION_PREFIX;
                }
            }
        };
        parts.push(prefix.to_string());
        parts.reverse();
        Some(parts.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolgraph::{
        KindRecord, ModuleRecord, NamesRecord, RelationshipKind, SymbolIdentifier,
    };

    fn symbol(precise: &str, kind: &str, path: &[&str]) -> SymbolRecord {
        SymbolRecord {
            identifier: SymbolIdentifier {
                precise: precise.to_string(),
                interface_language: "swift".to_string(),
            },
            kind: KindRecord {
                identifier: format!("swift.{kind}"),
                display_name: kind.to_string(),
            },
            names: NamesRecord {
                title: path.last().unwrap().to_string(),
            },
            path_components: path.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    fn member(source: &str, target: &str) -> RelationshipRecord {
        RelationshipRecord {
            source: source.to_string(),
            target: target.to_string(),
            kind: RelationshipKind::MemberOf,
            target_fallback: None,
        }
    }

    fn graph(platform: &str, symbols: Vec<SymbolRecord>, relationships: Vec<RelationshipRecord>) -> SymbolGraph {
        SymbolGraph {
            module: ModuleRecord {
                name: "MyKit".to_string(),
                platform: Some(platform.to_string()),
            },
            symbols,
            relationships,
        }
    }

    #[test]
    fn test_build_places_members_and_sparse_nodes() {
        let batch = graph(
            "macOS",
            vec![
                symbol("s:Foo", "struct", &["Foo"]),
                symbol("s:Foo.bar", "method", &["Foo", "bar()"]),
                symbol("s:Outer.Inner.baz", "property", &["Outer", "Inner", "baz"]),
            ],
            vec![member("s:Foo.bar", "s:Foo")],
        );
        let (hierarchy, conflicts) =
            PathHierarchy::build(&[batch], "MyKit", SourceLanguage::Swift).unwrap();
        assert!(conflicts.is_empty());

        let bar = hierarchy.identifiers_for_precise("s:Foo.bar")[0];
        assert_eq!(
            hierarchy.absolute_path(bar).unwrap(),
            "documentation/MyKit/Foo/bar()"
        );
        let foo = hierarchy.identifiers_for_precise("s:Foo")[0];
        assert_eq!(hierarchy.parent(bar), Some(foo));

        let baz = hierarchy.identifiers_for_precise("s:Outer.Inner.baz")[0];
        assert_eq!(
            hierarchy.absolute_path(baz).unwrap(),
            "documentation/MyKit/Outer/Inner/baz"
        );
        // Sparse segments have no identifier, so the nearest identified ancestor is the module.
        assert_eq!(hierarchy.parent(baz), hierarchy.module_identifiers().first().copied());
    }

    #[test]
    fn test_sparse_node_folds_into_later_symbol() {
        let batch = graph(
            "macOS",
            vec![
                symbol("s:Outer.child", "property", &["Outer", "child"]),
                symbol("s:Outer", "class", &["Outer"]),
            ],
            vec![],
        );
        let (hierarchy, _) = PathHierarchy::build(&[batch], "MyKit", SourceLanguage::Swift).unwrap();
        let outer = hierarchy.identifiers_for_precise("s:Outer")[0];
        let child = hierarchy.identifiers_for_precise("s:Outer.child")[0];
        assert_eq!(hierarchy.parent(child), Some(outer));
    }

    #[test]
    fn test_platform_batches_merge_into_one_node() {
        let mac = graph("macOS", vec![symbol("s:Foo", "struct", &["Foo"])], vec![]);
        let ios = graph("iOS", vec![symbol("s:Foo", "struct", &["Foo"])], vec![]);
        let (hierarchy, conflicts) =
            PathHierarchy::build(&[mac, ios], "MyKit", SourceLanguage::Swift).unwrap();
        assert!(conflicts.is_empty());
        let ids = hierarchy.identifiers_for_precise("s:Foo");
        assert_eq!(ids.len(), 1);
        let platforms = hierarchy.node(ids[0]).unwrap().platforms();
        assert!(platforms.contains("macOS") && platforms.contains("iOS"));
    }

    #[test]
    fn test_conflicting_declarations_keep_first_batch() {
        let mut first = symbol("s:Foo", "struct", &["Foo"]);
        first.declaration = Some("struct Foo".to_string());
        let mut second = symbol("s:Foo", "struct", &["Foo"]);
        second.declaration = Some("struct Foo: Sendable".to_string());
        // "iOS" sorts before "macOS", so the iOS batch registers first.
        let ios = graph("iOS", vec![first], vec![]);
        let mac = graph("macOS", vec![second], vec![]);
        let (hierarchy, conflicts) =
            PathHierarchy::build(&[mac, ios], "MyKit", SourceLanguage::Swift).unwrap();
        assert_eq!(conflicts.len(), 1);
        assert!(matches!(
            conflicts[0].detail,
            MergeConflictDetail::Declaration { .. }
        ));
        let id = hierarchy.identifiers_for_precise("s:Foo")[0];
        assert_eq!(
            hierarchy.node(id).unwrap().symbol().unwrap().declaration.as_deref(),
            Some("struct Foo")
        );
    }

    #[test]
    fn test_duplicate_article_is_rejected() {
        let mut hierarchy = PathHierarchy::new("MyKit", SourceLanguage::Swift);
        let first = hierarchy.add_article("GettingStarted").unwrap();
        assert_eq!(hierarchy.add_article("GettingStarted"), Err(first));
        assert_eq!(
            hierarchy.absolute_path(first).unwrap(),
            "documentation/MyKit/GettingStarted"
        );
        let tutorial = hierarchy.add_tutorial("Creating-Views").unwrap();
        assert_eq!(
            hierarchy.absolute_path(tutorial).unwrap(),
            "tutorials/Creating-Views"
        );
    }
}
