use serde::{Deserialize, Serialize};
use std::fmt;

use crate::properties::{NodeKind, ResolvedIdentifier};

/// Where a page's content came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentSource {
    File { path: String },
    /// A byte range inside a file, e.g. a symbol's in-source documentation comment.
    Range { path: String, start: usize, end: usize },
    External,
}

impl ContentSource {
    pub fn path(&self) -> Option<&str> {
        match self {
            ContentSource::File { path } | ContentSource::Range { path, .. } => Some(path),
            ContentSource::External => None,
        }
    }
}

impl fmt::Display for ContentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentSource::File { path } => write!(f, "{path}"),
            ContentSource::Range { path, start, end } => write!(f, "{path}[{start}..{end}]"),
            ContentSource::External => write!(f, "<external>"),
        }
    }
}

/// One page-equivalent entity in the [crate::topicgraph::TopicGraph].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicGraphNode {
    pub reference: ResolvedIdentifier,
    pub kind: NodeKind,
    pub source: ContentSource,
    pub title: String,
    /// Present for structure only; never rendered as its own page.
    pub is_virtual: bool,
    pub is_resolvable: bool,
    /// Takes part in automatic curation unless a manual curation overrides it.
    pub should_auto_curate_in_canonical_location: bool,
}

impl TopicGraphNode {
    pub fn new(
        reference: ResolvedIdentifier,
        kind: NodeKind,
        source: ContentSource,
        title: impl Into<String>,
    ) -> TopicGraphNode {
        TopicGraphNode {
            reference,
            kind,
            source,
            title: title.into(),
            is_virtual: false,
            is_resolvable: true,
            should_auto_curate_in_canonical_location: true,
        }
    }

    pub fn with_virtual(mut self, is_virtual: bool) -> Self {
        self.is_virtual = is_virtual;
        self
    }
}

impl fmt::Display for TopicGraphNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}' ({})", self.kind, self.title, self.reference)
    }
}

/// Whether a curation edge was authored in a Topics section or added by auto-curation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CurationOrigin {
    Manual,
    Automatic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurationEdge {
    pub origin: CurationOrigin,
    /// Insertion order; children are listed in this order.
    pub(crate) sequence: u64,
}
