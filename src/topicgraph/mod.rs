//! The curation graph built over resolved identities.
//!
//! Unlike the [crate::paths::PathHierarchy], where every node has exactly one owning parent, a
//! page in the [TopicGraph] may be curated under any number of other pages.
pub mod graph;
pub mod node;

pub use graph::{TopicGraph, TopicGraphError, Traversal};
pub use node::{ContentSource, CurationEdge, CurationOrigin, TopicGraphNode};
