//! Global analysis once the topic graph is final.
use enumset::EnumSet;
use std::collections::BTreeSet;

use crate::{
    context::registration::Registration,
    diagnostic::Diagnostic,
    document::{ReferenceState, Semantic},
    properties::{permitted_root_kinds, NodeKind, SourceLanguage},
    topicgraph::{ContentSource, TopicGraphNode},
};

impl Registration<'_> {
    #[tracing::instrument(skip_all)]
    pub(super) fn analyze(&mut self) {
        self.confirm_external_nodes();
        self.diagnose_uncurated();
        if self.config.features.validate_alternate_representations {
            self.validate_alternate_representations();
        }
    }

    /// Gives every external curation target a node, or drops the edge when the resolver no
    /// longer knows the target.
    fn confirm_external_nodes(&mut self) {
        for (source, target) in self.topic_graph.dangling_edges() {
            if self.topic_graph.contains(&target) {
                continue;
            }
            match self.resolver.external_entity(&target) {
                Some(entity) => {
                    self.topic_graph.add_node(TopicGraphNode::new(
                        target,
                        NodeKind::External,
                        ContentSource::External,
                        entity.title,
                    ));
                }
                None => {
                    tracing::debug!("Dropping curation of unknown {target} under {source}");
                    self.topic_graph.remove_edge(source, target);
                }
            }
        }
    }

    fn diagnose_uncurated(&self) {
        let permitted = permitted_root_kinds();
        for reference in self.topic_graph.roots() {
            let Some(node) = self.topic_graph.node(&reference) else {
                continue;
            };
            if permitted.contains(node.kind) || node.kind == NodeKind::External {
                continue;
            }
            self.diagnostics.emit(Diagnostic::Uncurated {
                reference,
                title: node.title.clone(),
            });
        }
    }

    /// An alternate representation must name another symbol, in languages neither the symbol
    /// nor its other alternates already cover.
    fn validate_alternate_representations(&self) {
        for (reference, node) in self.documentation_cache.iter() {
            let Semantic::Symbol(symbol) = &node.semantic else {
                continue;
            };
            let source_path = symbol
                .extension_source
                .clone()
                .unwrap_or_else(|| node.source.to_string());
            let mut claimed: EnumSet<SourceLanguage> = symbol.languages;
            let mut seen = BTreeSet::new();
            for alternate in symbol.alternate_representations.iter() {
                let ReferenceState::Resolved(resolved) = &alternate.state else {
                    continue;
                };
                let reason = if resolved.identifier == *reference {
                    Some("a symbol cannot be its own alternate representation".to_string())
                } else if !seen.insert(resolved.identifier) {
                    Some("the alternate representation is listed more than once".to_string())
                } else {
                    match self
                        .documentation_cache
                        .get(&resolved.identifier)
                        .and_then(|target| target.semantic.as_symbol())
                    {
                        None => Some("the alternate representation is not a symbol".to_string()),
                        Some(target) if !target.languages.is_disjoint(symbol.languages) => {
                            Some(format!(
                                "'{}' shares a source language with the documented symbol",
                                target.precise
                            ))
                        }
                        Some(target) if !target.languages.is_disjoint(claimed) => Some(format!(
                            "'{}' covers a source language another alternate representation already covers",
                            target.precise
                        )),
                        Some(target) => {
                            claimed.insert_all(target.languages);
                            None
                        }
                    }
                };
                if let Some(reason) = reason {
                    self.diagnostics
                        .emit(Diagnostic::InvalidAlternateRepresentation {
                            source_path: source_path.clone(),
                            link: alternate.link.clone(),
                            reason,
                        });
                }
            }
        }
    }
}
