//! Shared test utilities for building symbol graphs

use crate::{
    paths::PathHierarchy,
    properties::SourceLanguage,
    symbolgraph::{
        KindRecord, ModuleRecord, NamesRecord, RelationshipKind, RelationshipRecord, SymbolGraph,
        SymbolIdentifier, SymbolRecord,
    },
};

/// A symbol record. `kind` is a full symbol graph kind identifier such as `swift.method`; the
/// interface language is taken from its prefix.
pub fn symbol(precise: &str, kind: &str, path: &[&str]) -> SymbolRecord {
    let language = kind.split('.').next().unwrap_or("swift");
    SymbolRecord {
        identifier: SymbolIdentifier {
            precise: precise.to_string(),
            interface_language: language.to_string(),
        },
        kind: KindRecord {
            identifier: kind.to_string(),
            display_name: String::new(),
        },
        names: NamesRecord {
            title: path.last().unwrap().to_string(),
        },
        path_components: path.iter().map(|s| s.to_string()).collect(),
        ..Default::default()
    }
}

pub fn relationship(source: &str, target: &str, kind: RelationshipKind) -> RelationshipRecord {
    RelationshipRecord {
        source: source.to_string(),
        target: target.to_string(),
        kind,
        target_fallback: None,
    }
}

pub fn member(source: &str, target: &str) -> RelationshipRecord {
    relationship(source, target, RelationshipKind::MemberOf)
}

pub fn graph(
    module: &str,
    platform: &str,
    symbols: Vec<SymbolRecord>,
    relationships: Vec<RelationshipRecord>,
) -> SymbolGraph {
    SymbolGraph {
        module: ModuleRecord {
            name: module.to_string(),
            platform: Some(platform.to_string()),
        },
        symbols,
        relationships,
    }
}

/// `Widget` with a method and a property both named `value`, two `run` overloads and a nested
/// type, as seen on one platform.
pub fn widget_graph(platform: &str) -> SymbolGraph {
    graph(
        "MyKit",
        platform,
        vec![
            symbol("s:Widget", "swift.struct", &["Widget"]),
            symbol("s:Widget.value.m", "swift.method", &["Widget", "value"]),
            symbol("s:Widget.value.p", "swift.property", &["Widget", "value"]),
            symbol("s:Widget.run.a", "swift.method", &["Widget", "run"]),
            symbol("s:Widget.run.b", "swift.method", &["Widget", "run"]),
            symbol("s:Widget.Style", "swift.enum", &["Widget", "Style"]),
            symbol("s:Widget.Style.plain", "swift.enum.case", &["Widget", "Style", "plain"]),
            symbol("s:Loose.Group.item", "swift.var", &["Loose", "Group", "item"]),
        ],
        vec![
            member("s:Widget.value.m", "s:Widget"),
            member("s:Widget.value.p", "s:Widget"),
            member("s:Widget.run.a", "s:Widget"),
            member("s:Widget.run.b", "s:Widget"),
            member("s:Widget.Style", "s:Widget"),
            member("s:Widget.Style.plain", "s:Widget.Style"),
        ],
    )
}

/// A hierarchy over [widget_graph] for macOS and iOS, with one article and one tutorial.
pub fn widget_hierarchy() -> PathHierarchy {
    let (mut hierarchy, conflicts) = PathHierarchy::build(
        &[widget_graph("macOS"), widget_graph("iOS")],
        "MyKit",
        SourceLanguage::Swift,
    )
    .unwrap();
    assert!(conflicts.is_empty(), "unexpected conflicts: {conflicts:?}");
    hierarchy.add_article("GettingStarted").unwrap();
    hierarchy.add_tutorial("Building-A-Widget").unwrap();
    hierarchy
}
