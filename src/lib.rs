//! # docweave-core
//!
//! Builds a disambiguated, cross-referenced documentation model from compiler-emitted symbol
//! graphs and authored markdown documents.
//!
//! ## Overview
//!
//! A documentation bundle is a set of symbol graphs (one per module, platform and source
//! language), free-form articles, tutorials and resources. docweave-core turns that bundle into:
//!
//! - a **[`paths::PathHierarchy`]**: the unambiguous namespace. Every page has exactly one owning
//!   parent and a path string such as `MyKit/Widget/value-method` that can be written in a link,
//!   with `-kind` and `-hash` suffixes wherever sibling names collide.
//! - a **[`topicgraph::TopicGraph`]**: where pages are presented. Pages are curated under any
//!   number of other pages, manually through `## Topics` sections or automatically under their
//!   structural parent.
//! - a **[`cache::ContentCache`]** of analyzed pages, addressable by resolved identity and, for
//!   symbols, by their precise identifier.
//!
//! Every authored link is resolved against the hierarchy, or against an external documentation
//! source registered for the link's bundle identifier, and whatever could not be resolved is
//! reported as a [`diagnostic::Diagnostic`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docweave_core::{
//!     config::ContextConfiguration,
//!     context::{BundleInputs, CancellationFlag, DocumentationContext},
//!     document::DocumentSource,
//!     symbolgraph::SymbolGraph,
//! };
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let graph = SymbolGraph::from_json(&std::fs::read_to_string("MyKit.symbols.json")?)?;
//!     let inputs = BundleInputs::new()
//!         .with_symbol_graph(graph)
//!         .with_document(DocumentSource::new("GettingStarted.md", "# Getting Started\n"));
//!
//!     let mut context = DocumentationContext::new(ContextConfiguration::new("com.example.MyKit", "MyKit"));
//!     context.register(inputs, &CancellationFlag::new())?;
//!
//!     for diagnostic in context.diagnostics() {
//!         println!("{diagnostic}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Cancellation
//!
//! [`context::DocumentationContext::register`] polls a [`context::CancellationFlag`] between
//! phases and inside its parallel work. A cancelled registration returns
//! [`context::RegistrationOutcome::Cancelled`] and leaves the context as it was.

pub mod cache;
pub mod config;
pub mod context;
pub mod diagnostic;
pub mod document;
pub mod error;
pub mod paths;
pub mod properties;
pub mod resolve;
pub mod symbolgraph;
#[cfg(test)]
mod tests;
pub mod topicgraph;

pub use error::*;

pub use context::{
    BundleInputs, CancellationFlag, DocumentationContext, RegistrationOutcome, RegistrationPhase,
};
pub use properties::ResolvedIdentifier;
