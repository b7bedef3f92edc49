//! The orchestrating documentation context.
//!
//! [DocumentationContext::register] runs one registration per call, in strictly ordered phases:
//!
//! 1. **Discovery**: the path hierarchy is built from the symbol graphs while documents are
//!    analyzed and classified.
//! 2. **Import**: topic graph nodes and content cache entries for every symbol and document.
//! 3. **Relationships**: documentation extensions are merged into their symbols and symbol
//!    relationships recorded on both ends.
//! 4. **Link resolution**: every authored reference becomes a resolved identity or a typed
//!    failure.
//! 5. **Curation**: Topics sections are crawled, the rest is curated automatically and links
//!    that depend on curation are resolved again.
//! 6. **Analysis**: external curation targets are confirmed, uncurated pages and invalid
//!    alternate representations are diagnosed.
//!
//! Each phase runs on a bounded worker pool. A [CancellationFlag] is checked between phases;
//! once it is set no further phase starts and the context keeps its previous state.
mod analysis;
mod cancel;
mod curation;
mod registration;

use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    sync::Arc,
};

use crate::{
    cache::ContentCache,
    config::ContextConfiguration,
    diagnostic::Diagnostic,
    document::{DocumentSource, DocumentationNode, Resource, TopicReference},
    error::DocweaveError,
    paths::PathHierarchy,
    properties::ResolvedIdentifier,
    resolve::{
        AuthoredLink, ExternalDocumentationSource, ExternalEntity, ExternalSymbolResolver,
        LinkResolver, ReferenceOutcome, ResolutionScope,
    },
    symbolgraph::SymbolGraph,
    topicgraph::TopicGraph,
};

pub use cancel::CancellationFlag;
use registration::Registration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RegistrationPhase {
    Discovery,
    Import,
    Relationships,
    LinkResolution,
    Curation,
    Analysis,
}

impl fmt::Display for RegistrationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RegistrationPhase::Discovery => "discovery",
            RegistrationPhase::Import => "import",
            RegistrationPhase::Relationships => "relationships",
            RegistrationPhase::LinkResolution => "link resolution",
            RegistrationPhase::Curation => "curation",
            RegistrationPhase::Analysis => "analysis",
        };
        write!(f, "{name}")
    }
}

/// How a registration ended. Cancellation is a regular outcome, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistrationOutcome {
    Completed,
    /// The flag was observed before `phase` started; nothing was committed.
    Cancelled { phase: RegistrationPhase },
}

impl RegistrationOutcome {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RegistrationOutcome::Cancelled { .. })
    }
}

/// Everything one bundle registration consumes.
#[derive(Debug, Clone, Default)]
pub struct BundleInputs {
    pub symbol_graphs: Vec<SymbolGraph>,
    pub documents: Vec<DocumentSource>,
    pub resources: Vec<Resource>,
}

impl BundleInputs {
    pub fn new() -> BundleInputs {
        BundleInputs::default()
    }

    pub fn with_symbol_graph(mut self, graph: SymbolGraph) -> Self {
        self.symbol_graphs.push(graph);
        self
    }

    pub fn with_document(mut self, document: DocumentSource) -> Self {
        self.documents.push(document);
        self
    }

    pub fn with_resource(mut self, resource: Resource) -> Self {
        self.resources.push(resource);
        self
    }
}

/// Registered state of one documentation bundle.
pub struct DocumentationContext {
    config: ContextConfiguration,
    external_sources: Vec<Arc<dyn ExternalDocumentationSource>>,
    symbol_resolver: Option<Arc<dyn ExternalSymbolResolver>>,
    hierarchy: PathHierarchy,
    documentation_cache: ContentCache<DocumentationNode>,
    topic_graph: TopicGraph,
    resolver: LinkResolver,
    anchors: BTreeMap<ResolvedIdentifier, BTreeSet<String>>,
    resources: BTreeMap<String, Resource>,
    diagnostics: Vec<Diagnostic>,
}

impl DocumentationContext {
    pub fn new(config: ContextConfiguration) -> DocumentationContext {
        let hierarchy =
            PathHierarchy::new(&config.bundle_display_name, config.canonical_language);
        let resolver = LinkResolver::new(config.bundle_identifier.clone());
        DocumentationContext {
            config,
            external_sources: Vec::new(),
            symbol_resolver: None,
            hierarchy,
            documentation_cache: ContentCache::new(),
            topic_graph: TopicGraph::new(),
            resolver,
            anchors: BTreeMap::new(),
            resources: BTreeMap::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Registers a resolver for `doc://` links into another bundle.
    pub fn with_external_source(mut self, source: Arc<dyn ExternalDocumentationSource>) -> Self {
        self.external_sources.push(source);
        self
    }

    pub fn with_external_symbol_resolver(
        mut self,
        resolver: Arc<dyn ExternalSymbolResolver>,
    ) -> Self {
        self.symbol_resolver = Some(resolver);
        self
    }

    /// Registers a bundle, replacing whatever a previous registration produced.
    ///
    /// Structurally invalid symbol graphs abort with [DocweaveError::InvalidSymbolGraph].
    /// Everything else that goes wrong is reported through [DocumentationContext::diagnostics].
    #[tracing::instrument(skip_all)]
    pub fn register(
        &mut self,
        inputs: BundleInputs,
        cancel: &CancellationFlag,
    ) -> Result<RegistrationOutcome, DocweaveError> {
        for graph in inputs.symbol_graphs.iter() {
            graph.validate()?;
        }
        let config = self.config.clone();
        let checkpoint = |phase: RegistrationPhase| {
            if cancel.is_cancelled() {
                tracing::info!("Registration cancelled before {phase}");
                Some(RegistrationOutcome::Cancelled { phase })
            } else {
                None
            }
        };

        if let Some(cancelled) = checkpoint(RegistrationPhase::Discovery) {
            return Ok(cancelled);
        }
        let resolver = LinkResolver::new(config.bundle_identifier.clone())
            .with_sources(self.external_sources.iter().cloned())
            .with_symbol_resolver(self.symbol_resolver.clone());
        let mut registration = Registration::discover(&config, cancel, resolver, inputs)?;

        if let Some(cancelled) = checkpoint(RegistrationPhase::Import) {
            return Ok(cancelled);
        }
        registration.import();

        if let Some(cancelled) = checkpoint(RegistrationPhase::Relationships) {
            return Ok(cancelled);
        }
        if !registration.build_relationships() {
            return Ok(RegistrationOutcome::Cancelled {
                phase: RegistrationPhase::Relationships,
            });
        }

        if let Some(cancelled) = checkpoint(RegistrationPhase::LinkResolution) {
            return Ok(cancelled);
        }
        registration.resolve_links();

        if let Some(cancelled) = checkpoint(RegistrationPhase::Curation) {
            return Ok(cancelled);
        }
        registration.curate();

        if let Some(cancelled) = checkpoint(RegistrationPhase::Analysis) {
            return Ok(cancelled);
        }
        registration.analyze();

        self.commit(registration);
        tracing::info!(
            "Registered {} pages ({} curation edges, {} diagnostics)",
            self.documentation_cache.len(),
            self.topic_graph.edge_count(),
            self.diagnostics.len()
        );
        Ok(RegistrationOutcome::Completed)
    }

    fn commit(&mut self, registration: Registration<'_>) {
        let Registration {
            hierarchy,
            documentation_cache,
            topic_graph,
            resolver,
            anchors,
            resources,
            diagnostics,
            ..
        } = registration;
        self.hierarchy = hierarchy;
        self.documentation_cache = documentation_cache;
        self.topic_graph = topic_graph;
        self.resolver = resolver;
        self.anchors = anchors;
        self.resources = resources;
        self.diagnostics = diagnostics.into_diagnostics();
    }

    pub fn configuration(&self) -> &ContextConfiguration {
        &self.config
    }

    pub fn hierarchy(&self) -> &PathHierarchy {
        &self.hierarchy
    }

    pub fn topic_graph(&self) -> &TopicGraph {
        &self.topic_graph
    }

    pub fn documentation_cache(&self) -> &ContentCache<DocumentationNode> {
        &self.documentation_cache
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn resources(&self) -> &BTreeMap<String, Resource> {
        &self.resources
    }

    /// The external entities resolved during the last registration.
    pub fn external_entities(&self) -> ContentCache<ExternalEntity> {
        self.resolver.external_entities()
    }

    pub fn entity(&self, reference: &ResolvedIdentifier) -> Option<&DocumentationNode> {
        self.documentation_cache.get(reference)
    }

    /// Looks a symbol page up by its precise identifier.
    pub fn entity_by_symbol_key(&self, precise: &str) -> Option<&DocumentationNode> {
        self.documentation_cache.get_by_symbol_key(precise)
    }

    pub fn absolute_path(&self, reference: ResolvedIdentifier) -> Option<String> {
        self.hierarchy.absolute_path(reference)
    }

    /// Resolves `link` as if it were written on the page `context`.
    pub fn resolve(
        &self,
        link: &AuthoredLink,
        context: Option<ResolvedIdentifier>,
    ) -> ReferenceOutcome {
        let scope = ResolutionScope {
            hierarchy: &self.hierarchy,
            anchors: &self.anchors,
        };
        self.resolver.resolve(scope, link, context)
    }

    /// Every authored reference on `page` together with its resolution state.
    pub fn reference_outcomes(&self, page: &ResolvedIdentifier) -> Vec<&TopicReference> {
        self.documentation_cache
            .get(page)
            .map(|node| node.semantic.references())
            .unwrap_or_default()
    }
}
