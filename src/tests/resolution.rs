//! Tests for link resolution against a hierarchy built from symbol graphs

use super::helpers::*;
use crate::{
    paths::PathLookupError,
    properties::ResolvedIdentifier,
    resolve::{AuthoredLink, LinkResolver, ResolutionFailure, ResolutionScope},
};
use std::collections::{BTreeMap, BTreeSet};
use test_log::test;

fn link(raw: &str) -> AuthoredLink {
    raw.parse().unwrap()
}

#[test]
fn test_symbol_links_resolve_relative_to_their_page() {
    let hierarchy = widget_hierarchy();
    let anchors = BTreeMap::new();
    let scope = ResolutionScope {
        hierarchy: &hierarchy,
        anchors: &anchors,
    };
    let resolver = LinkResolver::new("com.example.MyKit");
    let method = hierarchy.identifiers_for_precise("s:Widget.value.m")[0];
    let plain = hierarchy.identifiers_for_precise("s:Widget.Style.plain")[0];

    let resolved = resolver
        .resolve(scope, &link("``Style/plain``"), Some(method))
        .unwrap();
    assert_eq!(resolved.identifier, plain);
    assert_eq!(
        resolved.url,
        "doc://com.example.MyKit/documentation/MyKit/Widget/Style/plain"
    );

    // Without a page to start from, the module has to be named.
    assert!(resolver
        .resolve(scope, &link("``Style/plain``"), None)
        .is_err());
    assert_eq!(
        resolver
            .resolve(scope, &link("``MyKit/Widget/Style/plain``"), None)
            .unwrap()
            .identifier,
        plain
    );
}

#[test]
fn test_symbol_links_skip_articles() {
    let hierarchy = widget_hierarchy();
    let anchors = BTreeMap::new();
    let scope = ResolutionScope {
        hierarchy: &hierarchy,
        anchors: &anchors,
    };
    let resolver = LinkResolver::new("com.example.MyKit");

    assert!(resolver
        .resolve(scope, &link("doc:GettingStarted"), None)
        .is_ok());
    assert!(matches!(
        resolver.resolve(scope, &link("``GettingStarted``"), None),
        Err(ResolutionFailure::Path(PathLookupError::NotFound { .. }))
    ));
}

#[test]
fn test_local_bundle_urls_resolve_through_the_hierarchy() {
    let hierarchy = widget_hierarchy();
    let anchors = BTreeMap::new();
    let scope = ResolutionScope {
        hierarchy: &hierarchy,
        anchors: &anchors,
    };
    let resolver = LinkResolver::new("com.example.MyKit");
    let widget = hierarchy.identifiers_for_precise("s:Widget")[0];

    let resolved = resolver
        .resolve(
            scope,
            &link("doc://com.example.MyKit/documentation/MyKit/Widget"),
            None,
        )
        .unwrap();
    assert_eq!(resolved.identifier, widget);
    assert!(!resolved.identifier.is_external());
}

#[test]
fn test_collisions_surface_as_path_failures() {
    let hierarchy = widget_hierarchy();
    let anchors = BTreeMap::new();
    let scope = ResolutionScope {
        hierarchy: &hierarchy,
        anchors: &anchors,
    };
    let resolver = LinkResolver::new("com.example.MyKit");
    let widget = hierarchy.identifiers_for_precise("s:Widget")[0];

    match resolver.resolve(scope, &link("``value``"), Some(widget)) {
        Err(ResolutionFailure::Path(PathLookupError::LookupCollision {
            partial,
            collisions,
            ..
        })) => {
            assert_eq!(partial, Some(widget));
            assert_eq!(collisions.len(), 2);
        }
        other => panic!("expected a collision, got {other:?}"),
    }
    assert_eq!(
        resolver
            .resolve(scope, &link("``value-property``"), Some(widget))
            .unwrap()
            .identifier,
        hierarchy.identifiers_for_precise("s:Widget.value.p")[0]
    );
}

#[test]
fn test_outcomes_are_cached_per_link_and_context() {
    let hierarchy = widget_hierarchy();
    let anchors: BTreeMap<ResolvedIdentifier, BTreeSet<String>> = BTreeMap::new();
    let scope = ResolutionScope {
        hierarchy: &hierarchy,
        anchors: &anchors,
    };
    let resolver = LinkResolver::new("com.example.MyKit");
    let widget = hierarchy.identifiers_for_precise("s:Widget")[0];
    let style = hierarchy.identifiers_for_precise("s:Widget.Style")[0];

    let relative = link("``Style``");
    let first = resolver.resolve(scope, &relative, Some(widget));
    let second = resolver.resolve(scope, &relative, Some(widget));
    assert_eq!(first, second);
    assert_eq!(resolver.cached_outcomes(), 1);

    resolver.resolve(scope, &relative, Some(style)).unwrap();
    assert_eq!(resolver.cached_outcomes(), 2);

    // Absolute links share one entry whatever the context.
    let absolute = link("doc:/documentation/MyKit/Widget");
    resolver.resolve(scope, &absolute, Some(widget)).unwrap();
    resolver.resolve(scope, &absolute, Some(style)).unwrap();
    assert_eq!(resolver.cached_outcomes(), 3);
}
