//! Curation: manual Topics crawling, automatic curation and its retraction.
use std::collections::{BTreeSet, VecDeque};

use crate::{
    context::registration::Registration,
    diagnostic::Diagnostic,
    document::Semantic,
    properties::{permitted_root_kinds, NodeKind, ResolvedIdentifier, SymbolKind},
    topicgraph::{CurationOrigin, TopicGraphError},
};

impl Registration<'_> {
    /// Runs the whole curation phase.
    ///
    /// Manual curation is crawled once before and once after the links that only resolve
    /// relative to a curation parent get their second chance, so Topics sections of articles
    /// that were placed automatically are honored as well.
    #[tracing::instrument(skip_all)]
    pub(super) fn curate(&mut self) {
        self.crawl();
        if self.config.features.auto_curate_articles_under_single_module {
            self.curate_articles_under_single_module();
        }
        self.auto_curate_symbols();
        if self.config.features.resolve_relative_to_curation_parent {
            self.resolve_links_in_curation_context();
        }
        self.diagnose_unresolved_references();
        self.crawl();
        self.retract_automatic_curation();
        if self.config.features.trim_empty_extension_containers {
            self.trim_extension_containers();
        }
        tracing::debug!(
            "Curated {} pages with {} edges",
            self.topic_graph.len(),
            self.topic_graph.edge_count()
        );
    }

    fn roots(&self) -> Vec<ResolvedIdentifier> {
        let permitted = permitted_root_kinds();
        self.topic_graph
            .nodes()
            .filter(|node| permitted.contains(node.kind))
            .map(|node| node.reference)
            .collect()
    }

    /// Breadth-first walk from the root pages, adding a manual edge for every resolved Topics
    /// entry of every page reached.
    fn crawl(&mut self) {
        let roots = self.roots();
        let mut seen = roots.iter().copied().collect::<BTreeSet<_>>();
        let mut queue = VecDeque::from(roots);
        while let Some(page) = queue.pop_front() {
            let targets = self
                .documentation_cache
                .get(&page)
                .map(|node| {
                    node.semantic
                        .curation_references()
                        .into_iter()
                        .filter_map(|reference| reference.resolved())
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default();
            for target in targets {
                self.add_manual_curation(page, target);
            }
            for child in self.topic_graph.edges(page) {
                if seen.insert(child) {
                    queue.push_back(child);
                }
            }
        }
    }

    fn add_manual_curation(&mut self, source: ResolvedIdentifier, target: ResolvedIdentifier) {
        if target.is_external() {
            // Confirmed or dropped during global analysis.
            self.topic_graph
                .unsafely_add_edge(source, target, CurationOrigin::Manual);
            return;
        }
        match self
            .topic_graph
            .add_edge(source, target, CurationOrigin::Manual)
        {
            Ok(_) | Err(TopicGraphError::SelfEdge(_)) => {}
            Err(TopicGraphError::WouldCreateCycle { curator, target }) => {
                if self.reported_cycles.insert((curator, target)) {
                    self.diagnostics.emit(Diagnostic::CurationCycle {
                        source: curator,
                        target,
                    });
                }
            }
            Err(TopicGraphError::UnknownNode(reference)) => {
                tracing::debug!("Not curating {reference}: it is not a page");
            }
        }
    }

    /// With exactly one module, every article nothing curates goes under it.
    fn curate_articles_under_single_module(&mut self) {
        let modules = self.hierarchy.module_identifiers();
        let [module] = modules.as_slice() else {
            return;
        };
        let articles = self
            .topic_graph
            .nodes()
            .filter(|node| node.kind == NodeKind::Article)
            .map(|node| node.reference)
            .filter(|article| self.topic_graph.reverse_edges(*article).is_empty())
            .collect::<Vec<_>>();
        for article in articles {
            if let Err(e) = self
                .topic_graph
                .add_edge(*module, article, CurationOrigin::Automatic)
            {
                tracing::debug!("Could not curate article {article} under {module}: {e}");
            }
        }
    }

    /// Symbols nothing curates go under their nearest structural parent.
    fn auto_curate_symbols(&mut self) {
        let symbols = self
            .topic_graph
            .nodes()
            .filter(|node| {
                node.kind == NodeKind::Symbol && node.should_auto_curate_in_canonical_location
            })
            .map(|node| node.reference)
            .collect::<Vec<_>>();
        for symbol in symbols {
            if !self.topic_graph.reverse_edges(symbol).is_empty() {
                continue;
            }
            let Some(parent) = self.hierarchy.parent(symbol) else {
                continue;
            };
            if !self.topic_graph.contains(&parent) {
                continue;
            }
            if let Err(e) = self
                .topic_graph
                .add_edge(parent, symbol, CurationOrigin::Automatic)
            {
                tracing::debug!("Could not curate {symbol} under {parent}: {e}");
            }
        }
    }

    /// A page with at least one manual parent loses its automatic parents.
    fn retract_automatic_curation(&mut self) {
        let references = self
            .topic_graph
            .nodes()
            .map(|node| node.reference)
            .collect::<Vec<_>>();
        for reference in references {
            if self.topic_graph.manual_parents(reference).is_empty() {
                continue;
            }
            for parent in self.topic_graph.reverse_edges(reference) {
                if self.topic_graph.edge_origin(parent, reference) == Some(CurationOrigin::Automatic)
                {
                    tracing::debug!("Retracting automatic curation of {reference} under {parent}");
                    self.topic_graph.remove_edge(parent, reference);
                }
            }
        }
    }

    /// Extension containers left without children only exist to hold the path; they stay in the
    /// graph as virtual nodes.
    fn trim_extension_containers(&mut self) {
        let containers = self
            .documentation_cache
            .iter()
            .filter(|(_, node)| {
                matches!(&node.semantic, Semantic::Symbol(symbol) if symbol.kind == SymbolKind::Extension)
            })
            .map(|(reference, _)| *reference)
            .collect::<Vec<_>>();
        for container in containers {
            if !self.topic_graph.edges(container).is_empty() {
                continue;
            }
            let Some(node) = self.topic_graph.node(&container) else {
                continue;
            };
            if node.is_virtual {
                continue;
            }
            let replacement = node.clone().with_virtual(true);
            if let Err(e) = self.topic_graph.replace_node(container, replacement) {
                tracing::warn!("Could not trim extension container {container}: {e}");
            }
        }
    }
}
