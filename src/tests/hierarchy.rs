//! Tests for path hierarchy construction and lookup over whole symbol graphs

use super::helpers::*;
use crate::{
    paths::{PathHierarchy, PathLookupError},
    properties::{content_hash, SourceLanguage},
};
use std::collections::BTreeSet;
use test_log::test;

fn paths_by_precise(hierarchy: &PathHierarchy) -> BTreeSet<(String, String)> {
    hierarchy
        .identifiers()
        .filter_map(|identifier| {
            let node = hierarchy.node(identifier)?;
            let precise = node
                .symbol()
                .map(|payload| payload.precise.clone())
                .unwrap_or_else(|| node.name().to_string());
            Some((precise, hierarchy.absolute_path(identifier)?))
        })
        .collect()
}

#[test]
fn test_batch_order_does_not_change_the_hierarchy() {
    let (forward, _) = PathHierarchy::build(
        &[widget_graph("macOS"), widget_graph("iOS")],
        "MyKit",
        SourceLanguage::Swift,
    )
    .unwrap();
    let (backward, _) = PathHierarchy::build(
        &[widget_graph("iOS"), widget_graph("macOS")],
        "MyKit",
        SourceLanguage::Swift,
    )
    .unwrap();
    assert_eq!(
        forward.identifiers().collect::<Vec<_>>(),
        backward.identifiers().collect::<Vec<_>>()
    );
    assert_eq!(paths_by_precise(&forward), paths_by_precise(&backward));
}

#[test]
fn test_symbol_order_within_a_batch_does_not_change_paths() {
    let mut reversed = widget_graph("macOS");
    reversed.symbols.reverse();
    reversed.relationships.reverse();
    let (forward, _) =
        PathHierarchy::build(&[widget_graph("macOS")], "MyKit", SourceLanguage::Swift).unwrap();
    let (backward, _) = PathHierarchy::build(&[reversed], "MyKit", SourceLanguage::Swift).unwrap();
    assert_eq!(paths_by_precise(&forward), paths_by_precise(&backward));
}

#[test]
fn test_every_absolute_path_resolves_to_its_identifier() {
    let hierarchy = widget_hierarchy();
    for identifier in hierarchy.identifiers() {
        let path = hierarchy.absolute_path(identifier).unwrap();
        assert_eq!(
            hierarchy.find(&path, None, false),
            Ok(identifier),
            "'{path}' did not resolve back"
        );
    }
}

#[test]
fn test_overloads_are_disambiguated_by_hash() {
    let hierarchy = widget_hierarchy();
    let err = hierarchy.find("MyKit/Widget/run", None, true).unwrap_err();
    let PathLookupError::LookupCollision { collisions, .. } = err else {
        panic!("expected a collision, got {err:?}");
    };
    let mut suffixes = collisions
        .iter()
        .map(|candidate| candidate.suffix.clone())
        .collect::<Vec<_>>();
    suffixes.sort();
    let mut expected = vec![
        format!("-{}", content_hash("s:Widget.run.a")),
        format!("-{}", content_hash("s:Widget.run.b")),
    ];
    expected.sort();
    assert_eq!(suffixes, expected);

    for candidate in collisions {
        let path = format!("MyKit/Widget/{}", candidate.disambiguated);
        assert_eq!(hierarchy.find(&path, None, true).ok(), candidate.identifier);
    }
}

#[test]
fn test_sparse_segments_are_not_pages() {
    let hierarchy = widget_hierarchy();
    let item = hierarchy.identifiers_for_precise("s:Loose.Group.item")[0];
    assert_eq!(
        hierarchy.absolute_path(item).unwrap(),
        "documentation/MyKit/Loose/Group/item"
    );
    assert!(matches!(
        hierarchy.find("MyKit/Loose/Group", None, true),
        Err(PathLookupError::NotFound { .. })
    ));
    assert_eq!(hierarchy.find("Group/item", Some(item), true), Ok(item));
}

#[test]
fn test_member_relationships_win_over_path_components() {
    let mut batch = widget_graph("macOS");
    // Path components claim a different parent; the memberOf relationship decides.
    batch.symbols.push(symbol(
        "s:Widget.Style.fancy",
        "swift.enum.case",
        &["Elsewhere", "fancy"],
    ));
    batch
        .relationships
        .push(member("s:Widget.Style.fancy", "s:Widget.Style"));
    let (hierarchy, _) = PathHierarchy::build(&[batch], "MyKit", SourceLanguage::Swift).unwrap();
    let fancy = hierarchy.identifiers_for_precise("s:Widget.Style.fancy")[0];
    assert_eq!(
        hierarchy.absolute_path(fancy).unwrap(),
        "documentation/MyKit/Widget/Style/fancy"
    );
}

#[test]
fn test_path_placement_prefers_containers_on_collision() {
    let (hierarchy, _) = PathHierarchy::build(
        &[graph(
            "MyKit",
            "macOS",
            vec![
                symbol("s:Widget", "swift.struct", &["Widget"]),
                symbol("s:WidgetValue", "swift.property", &["Widget"]),
                symbol("s:Widget.size", "swift.property", &["Widget", "size"]),
            ],
            vec![],
        )],
        "MyKit",
        SourceLanguage::Swift,
    )
    .unwrap();
    let size = hierarchy.identifiers_for_precise("s:Widget.size")[0];
    assert_eq!(
        hierarchy.find("MyKit/Widget-struct/size", None, true),
        Ok(size)
    );
    assert!(hierarchy.find("MyKit/Widget-property/size", None, true).is_err());
}
