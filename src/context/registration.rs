//! Discovery, import, relationship and link resolution phases of a registration.
//!
//! A [Registration] stages everything one build produces. It is only handed to the
//! [super::DocumentationContext] once every phase ran, so a cancelled build never leaves partial
//! state behind.
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

use crate::{
    cache::ContentCache,
    config::ContextConfiguration,
    context::{BundleInputs, CancellationFlag},
    diagnostic::{Diagnostic, DiagnosticEngine, UnresolvedReference},
    document::{
        analyze_doc_comment, analyze_document, AnalyzedDocument, ArticleContent, DocumentKind,
        DocumentationNode, Markup, ReferenceState, Resource, Semantic, SymbolContent,
        SymbolRelationships, TutorialContent, TutorialTableOfContentsContent,
    },
    error::DocweaveError,
    paths::{PathHierarchy, PathNode, PathNodeRole},
    properties::{NodeKind, ResolvedIdentifier, SymbolKind},
    resolve::{AuthoredLink, LinkResolver, ReferenceOutcome, ResolutionScope},
    symbolgraph::{RelationshipKind, RelationshipRecord, SymbolGraph},
    topicgraph::{ContentSource, TopicGraph, TopicGraphNode},
};

pub(crate) struct Registration<'a> {
    pub(super) config: &'a ContextConfiguration,
    pub(super) cancel: &'a CancellationFlag,
    pub(super) pool: rayon::ThreadPool,
    pub(super) hierarchy: PathHierarchy,
    pub(super) documentation_cache: ContentCache<DocumentationNode>,
    pub(super) topic_graph: TopicGraph,
    pub(super) resolver: LinkResolver,
    pub(super) anchors: BTreeMap<ResolvedIdentifier, BTreeSet<String>>,
    pub(super) resources: BTreeMap<String, Resource>,
    pub(super) diagnostics: DiagnosticEngine,
    /// Analyzed documents waiting for import, sorted by path.
    documents: Vec<AnalyzedDocument>,
    /// Documentation extensions waiting for their target symbol.
    extensions: Vec<AnalyzedDocument>,
    /// Sorted by [SymbolGraph::merge_key], the order [PathHierarchy::build] merges them in.
    symbol_graphs: Vec<SymbolGraph>,
    pub(super) reported_cycles: BTreeSet<(ResolvedIdentifier, ResolvedIdentifier)>,
}

impl<'a> Registration<'a> {
    /// Builds the path hierarchy and analyzes every document side by side on the worker pool.
    #[tracing::instrument(skip_all)]
    pub(super) fn discover(
        config: &'a ContextConfiguration,
        cancel: &'a CancellationFlag,
        resolver: LinkResolver,
        inputs: BundleInputs,
    ) -> Result<Registration<'a>, DocweaveError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.worker_count)
            .thread_name(|index| format!("docweave-worker-{index}"))
            .build()?;
        let BundleInputs {
            mut symbol_graphs,
            documents,
            resources,
        } = inputs;
        symbol_graphs.sort_by_cached_key(|graph| graph.merge_key());

        let (built, analyses) = pool.install(|| {
            rayon::join(
                || {
                    PathHierarchy::build(
                        &symbol_graphs,
                        &config.bundle_display_name,
                        config.canonical_language,
                    )
                },
                || {
                    documents
                        .par_iter()
                        .filter(|_| !cancel.is_cancelled())
                        .map(analyze_document)
                        .collect::<Vec<_>>()
                },
            )
        });
        let (hierarchy, conflicts) = built?;

        let diagnostics = DiagnosticEngine::new();
        diagnostics.emit_all(conflicts.into_iter().map(Diagnostic::MergeConflict));

        let mut analyzed = Vec::new();
        for analysis in analyses {
            match analysis {
                Ok(document) => analyzed.push(document),
                Err(e) => diagnostics.emit(Diagnostic::parse_error(e.path(), e.to_string())),
            }
        }
        analyzed.sort_by(|a, b| a.path.cmp(&b.path));

        let mut resource_map = BTreeMap::new();
        for resource in resources {
            if resource_map.contains_key(&resource.name) {
                diagnostics.emit(Diagnostic::warning(format!(
                    "Resource '{}' is registered more than once; keeping the first",
                    resource.name
                )));
                continue;
            }
            resource_map.insert(resource.name.clone(), resource);
        }

        tracing::debug!(
            "Discovered {} symbol graphs, {} documents and {} resources",
            symbol_graphs.len(),
            analyzed.len(),
            resource_map.len()
        );

        Ok(Registration {
            config,
            cancel,
            pool,
            hierarchy,
            documentation_cache: ContentCache::new(),
            topic_graph: TopicGraph::new(),
            resolver,
            anchors: BTreeMap::new(),
            resources: resource_map,
            diagnostics,
            documents: analyzed,
            extensions: Vec::new(),
            symbol_graphs,
            reported_cycles: BTreeSet::new(),
        })
    }

    pub(super) fn scope(&self) -> ResolutionScope<'_> {
        ResolutionScope {
            hierarchy: &self.hierarchy,
            anchors: &self.anchors,
        }
    }

    /// Creates topic graph nodes and cache entries for every symbol and every document.
    ///
    /// Articles get a node but no edge; where they belong is decided during curation.
    #[tracing::instrument(skip_all)]
    pub(super) fn import(&mut self) {
        let identifiers = self.hierarchy.identifiers().collect::<Vec<_>>();
        let hierarchy = &self.hierarchy;
        let cancel = self.cancel;
        let mut comments = self.pool.install(|| {
            identifiers
                .par_iter()
                .filter(|_| !cancel.is_cancelled())
                .filter_map(|identifier| {
                    let comment = hierarchy.node(*identifier)?.symbol()?.doc_comment.as_deref()?;
                    Some((*identifier, analyze_doc_comment(comment)))
                })
                .collect::<BTreeMap<_, _>>()
        });

        for identifier in identifiers {
            let Some(node) = self.hierarchy.node(identifier) else {
                continue;
            };
            let markup = comments.remove(&identifier).unwrap_or_default();
            let Some((kind, source, content)) = symbol_page(node, markup) else {
                continue;
            };
            let title = node.name().to_string();
            let precise = content.precise.clone();
            self.add_page(
                identifier,
                kind,
                title,
                source,
                Semantic::Symbol(Box::new(content)),
                Some(&precise),
            );
        }

        let documents = std::mem::take(&mut self.documents);
        for document in documents {
            self.import_document(document);
        }
        self.check_resources();
        self.rebuild_anchors();
    }

    fn import_document(&mut self, document: AnalyzedDocument) {
        let (registered, kind, semantic) = match document.kind {
            DocumentKind::DocumentationExtension => {
                self.extensions.push(document);
                return;
            }
            DocumentKind::Article => (
                self.hierarchy.add_article(&document.name),
                NodeKind::Article,
                Semantic::Article(ArticleContent {
                    markup: document.markup,
                    is_technology_root: false,
                }),
            ),
            DocumentKind::TechnologyRoot => (
                self.hierarchy.add_technology_root(&document.name),
                NodeKind::TechnologyRoot,
                Semantic::Article(ArticleContent {
                    markup: document.markup,
                    is_technology_root: true,
                }),
            ),
            DocumentKind::Tutorial => (
                self.hierarchy.add_tutorial(&document.name),
                NodeKind::Tutorial,
                Semantic::Tutorial(TutorialContent {
                    markup: document.markup,
                }),
            ),
            DocumentKind::TutorialTableOfContents => (
                self.hierarchy.add_tutorial_table_of_contents(&document.name),
                NodeKind::TutorialTableOfContents,
                Semantic::TutorialTableOfContents(TutorialTableOfContentsContent {
                    markup: document.markup,
                    tutorials: document.tutorial_references,
                }),
            ),
        };
        match registered {
            Ok(identifier) => {
                let source = ContentSource::File {
                    path: document.path,
                };
                self.add_page(identifier, kind, document.title, source, semantic, None);
            }
            Err(existing) => self.diagnostics.emit(Diagnostic::DuplicateDocument {
                path: document.path,
                existing,
            }),
        }
    }

    fn add_page(
        &mut self,
        reference: ResolvedIdentifier,
        kind: NodeKind,
        title: String,
        source: ContentSource,
        semantic: Semantic,
        symbol_key: Option<&str>,
    ) {
        self.topic_graph.add_node(TopicGraphNode::new(
            reference,
            kind,
            source.clone(),
            title.as_str(),
        ));
        let node = DocumentationNode {
            reference,
            kind,
            title,
            source,
            semantic,
        };
        self.documentation_cache.add(reference, node, symbol_key);
    }

    fn check_resources(&self) {
        let known = |name: &str| {
            self.resources.contains_key(name)
                || self
                    .resources
                    .keys()
                    .any(|resource| file_stem(resource) == file_stem(name))
        };
        let pages = self
            .documentation_cache
            .iter()
            .map(|(_, node)| (node.source.to_string(), node.semantic.markup()));
        let extensions = self
            .extensions
            .iter()
            .map(|extension| (extension.path.clone(), &extension.markup));
        for (source_path, markup) in pages.chain(extensions) {
            for image in markup.images.iter() {
                if image.contains("://") || known(image) {
                    continue;
                }
                self.diagnostics.emit(Diagnostic::UnknownResource {
                    source_path: source_path.clone(),
                    name: image.clone(),
                });
            }
        }
    }

    pub(super) fn rebuild_anchors(&mut self) {
        self.anchors = self
            .documentation_cache
            .iter()
            .map(|(reference, node)| (*reference, node.semantic.markup().anchors.clone()))
            .collect();
    }

    /// Merges documentation extensions into their symbols, then applies every relationship
    /// record. Returns `false` when cancelled part way.
    #[tracing::instrument(skip_all)]
    pub(super) fn build_relationships(&mut self) -> bool {
        self.merge_extensions();
        let graphs = std::mem::take(&mut self.symbol_graphs);
        for graph in graphs.iter() {
            if self.cancel.is_cancelled() {
                return false;
            }
            for relationship in graph.relationships.iter() {
                self.apply_relationship(relationship);
            }
        }
        self.rebuild_anchors();
        true
    }

    fn merge_extensions(&mut self) {
        let extensions = std::mem::take(&mut self.extensions);
        let modules = self.hierarchy.module_identifiers();
        for extension in extensions {
            let Some(link) = extension.extension_target.clone() else {
                continue;
            };
            let reference = match self.resolve_extension_target(&link, &modules) {
                Ok(reference) => reference,
                Err(failure) => {
                    self.diagnostics.emit(Diagnostic::UnresolvedReference(
                        UnresolvedReference::new(&extension.path, link, failure)
                            .with_location(Some((1, 1))),
                    ));
                    continue;
                }
            };
            let Some(symbol) = self
                .documentation_cache
                .get_mut(&reference.identifier)
                .and_then(|node| node.semantic.as_symbol_mut())
            else {
                self.diagnostics.emit(Diagnostic::warning(format!(
                    "{}: '{link}' does not name a symbol; the extension is ignored",
                    extension.path
                )));
                continue;
            };
            if let Some(previous) = symbol.extension_source.as_deref() {
                let message = format!(
                    "{}: '{link}' is already extended by {previous}; the extension is ignored",
                    extension.path
                );
                self.diagnostics.emit(Diagnostic::warning(message));
                continue;
            }
            symbol.markup.merge(extension.markup);
            symbol
                .alternate_representations
                .extend(extension.alternate_representations);
            symbol.extension_source = Some(extension.path);
        }
    }

    /// Extension headings name their symbol absolutely or relative to a module.
    fn resolve_extension_target(
        &self,
        link: &AuthoredLink,
        modules: &[ResolvedIdentifier],
    ) -> ReferenceOutcome {
        let scope = self.scope();
        let mut outcome = self.resolver.resolve(scope, link, None);
        for module in modules {
            if outcome.is_ok() {
                break;
            }
            outcome = self.resolver.resolve(scope, link, Some(*module));
        }
        outcome
    }

    fn local_symbol(&self, precise: &str) -> Option<ResolvedIdentifier> {
        self.hierarchy.identifiers_for_precise(precise).first().copied()
    }

    fn update_relationships<F>(&mut self, reference: ResolvedIdentifier, update: F)
    where
        F: FnOnce(&mut SymbolRelationships),
    {
        if let Some(symbol) = self
            .documentation_cache
            .get_mut(&reference)
            .and_then(|node| node.semantic.as_symbol_mut())
        {
            update(&mut symbol.relationships);
        }
    }

    fn apply_relationship(&mut self, relationship: &RelationshipRecord) {
        let Some(source) = self.local_symbol(&relationship.source) else {
            tracing::debug!(
                "Dropping {:?} relationship from unknown symbol '{}'",
                relationship.kind,
                relationship.source
            );
            return;
        };
        let target = match self.local_symbol(&relationship.target) {
            Some(target) => target,
            None => match self.resolver.resolve_external_symbol(&relationship.target) {
                Some(target) => target,
                None => {
                    tracing::debug!(
                        "Dropping {:?} relationship to unknown symbol '{}'",
                        relationship.kind,
                        relationship.target
                    );
                    return;
                }
            },
        };
        use SymbolRelationships as R;
        match relationship.kind {
            RelationshipKind::ConformsTo => {
                self.update_relationships(source, |r| R::push_unique(&mut r.conforms_to, target));
                self.update_relationships(target, |r| {
                    R::push_unique(&mut r.conforming_types, source)
                });
            }
            RelationshipKind::InheritsFrom => {
                self.update_relationships(source, |r| {
                    R::push_unique(&mut r.inherits_from, target)
                });
                self.update_relationships(target, |r| R::push_unique(&mut r.inherited_by, source));
            }
            RelationshipKind::DefaultImplementationOf => {
                self.update_relationships(target, |r| {
                    R::push_unique(&mut r.default_implementations, source)
                });
            }
            RelationshipKind::RequirementOf | RelationshipKind::OptionalRequirementOf => {
                let optional = relationship.kind == RelationshipKind::OptionalRequirementOf;
                self.update_relationships(target, |r| R::push_unique(&mut r.requirements, source));
                self.update_relationships(source, |r| r.is_optional_requirement = optional);
            }
            RelationshipKind::OverloadOf => {
                self.update_relationships(source, |r| R::push_unique(&mut r.overloads, target));
                self.update_relationships(target, |r| R::push_unique(&mut r.overloads, source));
            }
            RelationshipKind::MemberOf | RelationshipKind::OptionalMemberOf => {
                self.update_relationships(target, |r| R::push_unique(&mut r.members, source));
            }
            RelationshipKind::ExtensionTo => {
                self.update_relationships(target, |r| R::push_unique(&mut r.extended_by, source));
            }
            RelationshipKind::HttpParameterOf => {
                self.update_relationships(target, |r| {
                    R::push_unique(&mut r.http_parameters, source)
                });
            }
            RelationshipKind::HttpBodyOf => {
                self.update_relationships(target, |r| r.http_body = Some(source));
            }
            RelationshipKind::HttpResponseOf => {
                self.update_relationships(target, |r| {
                    R::push_unique(&mut r.http_responses, source)
                });
            }
            RelationshipKind::Other => {}
        }
    }

    /// Resolves every pending reference, each page relative to itself.
    #[tracing::instrument(skip_all)]
    pub(super) fn resolve_links(&mut self) {
        let scope = ResolutionScope {
            hierarchy: &self.hierarchy,
            anchors: &self.anchors,
        };
        let resolver = &self.resolver;
        let cancel = self.cancel;
        let pages = self.documentation_cache.iter_mut().collect::<Vec<_>>();
        self.pool.install(|| {
            pages.into_par_iter().for_each(|(reference, node)| {
                if cancel.is_cancelled() {
                    return;
                }
                for topic_reference in node.semantic.references_mut() {
                    if topic_reference.is_pending() {
                        let outcome = resolver.resolve(scope, &topic_reference.link, Some(*reference));
                        topic_reference.apply(outcome);
                    }
                }
            })
        });
        tracing::debug!("{} resolution outcomes cached", self.resolver.cached_outcomes());
    }

    /// Retries failed relative links of articles against the page that curates them.
    #[tracing::instrument(skip_all)]
    pub(super) fn resolve_links_in_curation_context(&mut self) {
        let parents = self
            .topic_graph
            .nodes()
            .filter(|node| node.kind == NodeKind::Article)
            .filter_map(|node| {
                let parent = self.topic_graph.reverse_edges(node.reference).first().copied()?;
                Some((node.reference, parent))
            })
            .collect::<BTreeMap<_, _>>();
        if parents.is_empty() {
            return;
        }
        let scope = ResolutionScope {
            hierarchy: &self.hierarchy,
            anchors: &self.anchors,
        };
        let resolver = &self.resolver;
        let cancel = self.cancel;
        let pages = self
            .documentation_cache
            .iter_mut()
            .filter_map(|(reference, node)| Some((*parents.get(reference)?, node)))
            .collect::<Vec<_>>();
        self.pool.install(|| {
            pages.into_par_iter().for_each(|(parent, node)| {
                if cancel.is_cancelled() {
                    return;
                }
                for topic_reference in node.semantic.references_mut() {
                    if !matches!(topic_reference.state, ReferenceState::Failed(_))
                        || topic_reference.link.is_absolute()
                    {
                        continue;
                    }
                    let outcome = resolver.resolve(scope, &topic_reference.link, Some(parent));
                    if outcome.is_ok() {
                        topic_reference.apply(outcome);
                    }
                }
            })
        });
    }

    /// One diagnostic per reference still failing once all resolution passes ran.
    pub(super) fn diagnose_unresolved_references(&self) {
        for (_, node) in self.documentation_cache.iter() {
            let source_path = match node.semantic.as_symbol() {
                Some(SymbolContent {
                    extension_source: Some(path),
                    ..
                }) => path.clone(),
                _ => node.source.to_string(),
            };
            for reference in node.semantic.references() {
                if let ReferenceState::Failed(failure) = &reference.state {
                    self.diagnostics.emit(Diagnostic::UnresolvedReference(
                        UnresolvedReference::new(
                            source_path.as_str(),
                            reference.link.clone(),
                            failure.clone(),
                        )
                        .with_location(reference.location),
                    ));
                }
            }
        }
    }
}

fn file_stem(name: &str) -> &str {
    let base = name.rsplit('/').next().unwrap_or(name);
    base.split('.').next().unwrap_or(base)
}

/// Page data for a module or symbol node; `None` for every other role.
fn symbol_page(node: &PathNode, markup: Markup) -> Option<(NodeKind, ContentSource, SymbolContent)> {
    match node.role() {
        PathNodeRole::Module => Some((
            NodeKind::Module,
            ContentSource::File {
                path: node.name().to_string(),
            },
            SymbolContent {
                precise: node.name().to_string(),
                kind: SymbolKind::Module,
                module: node.name().to_string(),
                declaration: None,
                languages: node.languages(),
                platforms: node.platforms().clone(),
                markup,
                relationships: SymbolRelationships::default(),
                alternate_representations: Vec::new(),
                extension_source: None,
            },
        )),
        PathNodeRole::Symbol => {
            let payload = node.symbol()?;
            let source = ContentSource::File {
                path: payload
                    .location
                    .clone()
                    .unwrap_or_else(|| payload.module.clone()),
            };
            Some((
                NodeKind::Symbol,
                source,
                SymbolContent {
                    precise: payload.precise.clone(),
                    kind: payload.kind,
                    module: payload.module.clone(),
                    declaration: payload.declaration.clone(),
                    languages: node.languages(),
                    platforms: node.platforms().clone(),
                    markup,
                    relationships: SymbolRelationships::default(),
                    alternate_representations: Vec::new(),
                    extension_source: None,
                },
            ))
        }
        PathNodeRole::Sparse
        | PathNodeRole::ArticlesRoot
        | PathNodeRole::Article
        | PathNodeRole::TechnologyRoot
        | PathNodeRole::TutorialsRoot
        | PathNodeRole::TutorialTableOfContents
        | PathNodeRole::Tutorial => None,
    }
}
