//! Shared test utilities for integration tests.
//!
//! Import from integration test files as:
//! ```ignore
//! mod common;
//! ```

use docweave_core::{
    config::ContextConfiguration,
    context::{BundleInputs, CancellationFlag, DocumentationContext, RegistrationOutcome},
    diagnostic::Diagnostic,
    document::DocumentationNode,
    symbolgraph::SymbolGraph,
    ResolvedIdentifier,
};
use serde_json::json;

/// Initialize tracing for tests, respecting RUST_LOG env var.
///
/// Safe to call multiple times; subsequent calls are no-ops.
#[allow(dead_code)]
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

/// Configuration for the `MyKit` bundle with a small worker pool.
#[allow(dead_code)]
pub fn config() -> ContextConfiguration {
    let mut config = ContextConfiguration::new("com.example.MyKit", "MyKit");
    config.worker_count = 2;
    config
}

/// One symbol in symbol graph JSON form. `kind` carries its language prefix.
#[allow(dead_code)]
pub fn symbol_json(precise: &str, kind: &str, path: &[&str]) -> serde_json::Value {
    let language = kind.split('.').next().unwrap_or("swift");
    json!({
        "identifier": { "precise": precise, "interfaceLanguage": language },
        "kind": { "identifier": kind, "displayName": "" },
        "names": { "title": path.last().copied().unwrap_or_default() },
        "pathComponents": path,
    })
}

#[allow(dead_code)]
pub fn relationship_json(source: &str, target: &str, kind: &str) -> serde_json::Value {
    json!({ "source": source, "target": target, "kind": kind })
}

#[allow(dead_code)]
pub fn symbol_graph(
    module: &str,
    platform: &str,
    symbols: Vec<serde_json::Value>,
    relationships: Vec<serde_json::Value>,
) -> SymbolGraph {
    let value = json!({
        "module": { "name": module, "platform": platform },
        "symbols": symbols,
        "relationships": relationships,
    });
    SymbolGraph::from_json(&value.to_string()).unwrap()
}

/// `MyKit` for one platform: a `Widget` struct whose method and property are both named
/// `value`, a `Style` enum and a `Gadget` class.
#[allow(dead_code)]
pub fn widget_graph(platform: &str) -> SymbolGraph {
    symbol_graph(
        "MyKit",
        platform,
        vec![
            symbol_json("s:Widget", "swift.struct", &["Widget"]),
            symbol_json("s:Widget.value.m", "swift.method", &["Widget", "value"]),
            symbol_json("s:Widget.value.p", "swift.property", &["Widget", "value"]),
            symbol_json("s:Widget.Style", "swift.enum", &["Widget", "Style"]),
            symbol_json("s:Gadget", "swift.class", &["Gadget"]),
        ],
        vec![
            relationship_json("s:Widget.value.m", "s:Widget", "memberOf"),
            relationship_json("s:Widget.value.p", "s:Widget", "memberOf"),
            relationship_json("s:Widget.Style", "s:Widget", "memberOf"),
        ],
    )
}

/// Registers `inputs` into a fresh context and expects the registration to complete.
#[allow(dead_code)]
pub fn register(inputs: BundleInputs) -> DocumentationContext {
    register_with(DocumentationContext::new(config()), inputs)
}

#[allow(dead_code)]
pub fn register_with(mut context: DocumentationContext, inputs: BundleInputs) -> DocumentationContext {
    let outcome = context
        .register(inputs, &CancellationFlag::new())
        .expect("registration failed");
    assert_eq!(outcome, RegistrationOutcome::Completed);
    context
}

#[allow(dead_code)]
pub fn symbol_page<'a>(context: &'a DocumentationContext, precise: &str) -> &'a DocumentationNode {
    context
        .entity_by_symbol_key(precise)
        .unwrap_or_else(|| panic!("no page for '{precise}'"))
}

#[allow(dead_code)]
pub fn symbol_id(context: &DocumentationContext, precise: &str) -> ResolvedIdentifier {
    symbol_page(context, precise).reference
}

/// The page registered for the document at `path`.
#[allow(dead_code)]
pub fn document_id(context: &DocumentationContext, path: &str) -> ResolvedIdentifier {
    context
        .documentation_cache()
        .iter()
        .find(|(_, node)| node.source.path() == Some(path))
        .map(|(reference, _)| *reference)
        .unwrap_or_else(|| panic!("no page for document '{path}'"))
}

#[allow(dead_code)]
pub fn count_diagnostics<F>(context: &DocumentationContext, predicate: F) -> usize
where
    F: Fn(&Diagnostic) -> bool,
{
    context.diagnostics().iter().filter(|d| predicate(d)).count()
}
