use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    sync::Arc,
};

use crate::{
    cache::ContentCache,
    paths::{PathHierarchy, PathLookupError},
    properties::ResolvedIdentifier,
    resolve::{
        external::{ExternalDocumentationSource, ExternalEntity, ExternalSymbolResolver},
        link::{normalized_url, AuthoredLink, LinkForm},
        ResolutionFailure,
    },
};

/// A successfully resolved reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedReference {
    pub identifier: ResolvedIdentifier,
    /// Normalized `doc://` URL of the target.
    pub url: String,
    pub fragment: Option<String>,
}

pub type ReferenceOutcome = Result<ResolvedReference, ResolutionFailure>;

/// Read-only build state a lookup needs.
#[derive(Clone, Copy)]
pub struct ResolutionScope<'a> {
    pub hierarchy: &'a PathHierarchy,
    /// Heading anchors per page, for fragment validation.
    pub anchors: &'a BTreeMap<ResolvedIdentifier, BTreeSet<String>>,
}

type CacheKey = (AuthoredLink, Option<ResolvedIdentifier>);

#[derive(Default)]
struct ExternalState {
    entities: ContentCache<ExternalEntity>,
    by_url: BTreeMap<String, ResolvedIdentifier>,
    outcomes: HashMap<AuthoredLink, ReferenceOutcome>,
    symbol_lookups: BTreeMap<String, Option<ResolvedIdentifier>>,
}

/// Resolves authored links and remembers every outcome.
///
/// Shared by the parallel resolution passes. Outcomes are cached per `(link, context)`; absolute
/// links are cached without a context. External sources are called under the external-state
/// lock, so each distinct external link is sent to its source at most once per build.
pub struct LinkResolver {
    bundle_identifier: String,
    sources: BTreeMap<String, Arc<dyn ExternalDocumentationSource>>,
    symbol_resolver: Option<Arc<dyn ExternalSymbolResolver>>,
    cache: RwLock<HashMap<CacheKey, ReferenceOutcome>>,
    urls: RwLock<HashMap<String, ResolvedIdentifier>>,
    external: Mutex<ExternalState>,
}

impl LinkResolver {
    pub fn new(bundle_identifier: impl Into<String>) -> LinkResolver {
        LinkResolver {
            bundle_identifier: bundle_identifier.into(),
            sources: BTreeMap::new(),
            symbol_resolver: None,
            cache: RwLock::new(HashMap::new()),
            urls: RwLock::new(HashMap::new()),
            external: Mutex::new(ExternalState::default()),
        }
    }

    pub fn with_sources(
        mut self,
        sources: impl IntoIterator<Item = Arc<dyn ExternalDocumentationSource>>,
    ) -> Self {
        for source in sources {
            self.sources
                .insert(source.bundle_identifier().to_string(), source);
        }
        self
    }

    pub fn with_symbol_resolver(mut self, resolver: Option<Arc<dyn ExternalSymbolResolver>>) -> Self {
        self.symbol_resolver = resolver;
        self
    }

    pub fn bundle_identifier(&self) -> &str {
        &self.bundle_identifier
    }

    /// Resolves `link` as written on the page identified by `context`.
    pub fn resolve(
        &self,
        scope: ResolutionScope<'_>,
        link: &AuthoredLink,
        context: Option<ResolvedIdentifier>,
    ) -> ReferenceOutcome {
        let key = (
            link.clone(),
            if link.is_absolute() { None } else { context },
        );
        if let Some(outcome) = self.cache.read().get(&key) {
            return outcome.clone();
        }
        let outcome = match link.bundle.as_deref() {
            Some(bundle) if bundle != self.bundle_identifier => self.resolve_external(bundle, link),
            _ => self.resolve_local(scope, link, key.1),
        };
        if let Err(failure) = &outcome {
            tracing::debug!("Could not resolve '{link}': {failure}");
        }
        self.cache.write().entry(key).or_insert(outcome).clone()
    }

    fn resolve_local(
        &self,
        scope: ResolutionScope<'_>,
        link: &AuthoredLink,
        context: Option<ResolvedIdentifier>,
    ) -> ReferenceOutcome {
        if link.form == LinkForm::DocUrl {
            if let Some(identifier) = self.urls.read().get(&link.raw) {
                return Ok(ResolvedReference {
                    identifier: *identifier,
                    url: link.raw.clone(),
                    fragment: link.fragment.clone(),
                });
            }
        }
        let parsed = link.parsed_path();
        let identifier = scope
            .hierarchy
            .find_parsed(&parsed, context, link.only_symbols())?;
        if let Some(fragment) = parsed.fragment.as_deref() {
            let anchors = scope.anchors.get(&identifier);
            if !anchors.map(|a| a.contains(fragment)).unwrap_or(false) {
                return Err(ResolutionFailure::Path(PathLookupError::PartialResult {
                    partial: Some(identifier),
                    matched: parsed.component_strings(),
                    remaining: vec![format!("#{fragment}")],
                    available: anchors
                        .map(|a| a.iter().cloned().collect())
                        .unwrap_or_default(),
                }));
            }
        }
        let absolute_path = scope
            .hierarchy
            .absolute_path(identifier)
            .unwrap_or_else(|| parsed.component_strings().join("/"));
        let url = normalized_url(
            &self.bundle_identifier,
            &absolute_path,
            parsed.fragment.as_deref(),
        );
        self.urls.write().entry(url.clone()).or_insert(identifier);
        Ok(ResolvedReference {
            identifier,
            url,
            fragment: parsed.fragment,
        })
    }

    fn resolve_external(&self, bundle: &str, link: &AuthoredLink) -> ReferenceOutcome {
        let mut state = self.external.lock();
        if let Some(outcome) = state.outcomes.get(link) {
            return outcome.clone();
        }
        let outcome = match self.sources.get(bundle) {
            None => Err(ResolutionFailure::UnknownBundle(bundle.to_string())),
            Some(source) => match source.resolve(link) {
                Ok(entity) => {
                    let url = entity.url.clone();
                    let identifier = Self::register_external(&mut state, entity);
                    Ok(ResolvedReference {
                        identifier,
                        url,
                        fragment: link.fragment.clone(),
                    })
                }
                Err(message) => Err(ResolutionFailure::External {
                    bundle: bundle.to_string(),
                    message,
                }),
            },
        };
        state.outcomes.insert(link.clone(), outcome.clone());
        outcome
    }

    fn register_external(state: &mut ExternalState, entity: ExternalEntity) -> ResolvedIdentifier {
        if let Some(identifier) = state.by_url.get(&entity.url) {
            return *identifier;
        }
        let identifier = ResolvedIdentifier::external(state.entities.len() as u32);
        state.by_url.insert(entity.url.clone(), identifier);
        let precise = entity.precise.clone();
        state.entities.add(identifier, entity, precise.as_deref());
        identifier
    }

    /// Looks up a relationship target no symbol graph declared. Each key is asked once.
    pub fn resolve_external_symbol(&self, precise: &str) -> Option<ResolvedIdentifier> {
        let resolver = self.symbol_resolver.as_ref()?;
        let mut state = self.external.lock();
        if let Some(known) = state.symbol_lookups.get(precise) {
            return *known;
        }
        let found = resolver.resolve_symbol(precise).map(|mut entity| {
            if entity.precise.is_none() {
                entity.precise = Some(precise.to_string());
            }
            Self::register_external(&mut state, entity)
        });
        state.symbol_lookups.insert(precise.to_string(), found);
        found
    }

    pub fn external_entity(&self, identifier: &ResolvedIdentifier) -> Option<ExternalEntity> {
        self.external.lock().entities.get(identifier).cloned()
    }

    /// Copy of the external-entity table.
    pub fn external_entities(&self) -> ContentCache<ExternalEntity> {
        self.external.lock().entities.clone()
    }

    pub fn cached_outcomes(&self) -> usize {
        self.cache.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{properties::SourceLanguage, resolve::link::AuthoredLink};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        calls: AtomicUsize,
    }

    impl ExternalDocumentationSource for CountingSource {
        fn bundle_identifier(&self) -> &str {
            "org.swift.stdlib"
        }

        fn resolve(&self, link: &AuthoredLink) -> Result<ExternalEntity, String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if link.path.ends_with("Missing") {
                return Err("no such page".to_string());
            }
            Ok(ExternalEntity::new(link.raw.clone(), "Array"))
        }
    }

    fn scope_parts() -> (PathHierarchy, BTreeMap<ResolvedIdentifier, BTreeSet<String>>) {
        let mut hierarchy = PathHierarchy::new("MyKit", SourceLanguage::Swift);
        let article = hierarchy.add_article("GettingStarted").unwrap();
        let mut anchors = BTreeMap::new();
        anchors.insert(article, BTreeSet::from(["overview".to_string()]));
        (hierarchy, anchors)
    }

    #[test]
    fn test_external_links_resolve_once() {
        let (hierarchy, anchors) = scope_parts();
        let scope = ResolutionScope {
            hierarchy: &hierarchy,
            anchors: &anchors,
        };
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
        });
        let resolver = LinkResolver::new("com.example.MyKit")
            .with_sources([source.clone() as Arc<dyn ExternalDocumentationSource>]);
        let link: AuthoredLink = "doc://org.swift.stdlib/documentation/Swift/Array"
            .parse()
            .unwrap();

        let first = resolver.resolve(scope, &link, None).unwrap();
        let second = resolver
            .resolve(scope, &link, Some(ResolvedIdentifier::local(0)))
            .unwrap();
        assert_eq!(first, second);
        assert!(first.identifier.is_external());
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            resolver.external_entity(&first.identifier).unwrap().title,
            "Array"
        );

        let missing: AuthoredLink = "doc://org.swift.stdlib/documentation/Swift/Missing"
            .parse()
            .unwrap();
        assert!(matches!(
            resolver.resolve(scope, &missing, None),
            Err(ResolutionFailure::External { .. })
        ));
        let unknown: AuthoredLink = "doc://org.other/documentation/Other".parse().unwrap();
        assert_eq!(
            resolver.resolve(scope, &unknown, None),
            Err(ResolutionFailure::UnknownBundle("org.other".to_string()))
        );
    }

    #[test]
    fn test_local_fragment_validation_and_normalized_url() {
        let (hierarchy, anchors) = scope_parts();
        let scope = ResolutionScope {
            hierarchy: &hierarchy,
            anchors: &anchors,
        };
        let resolver = LinkResolver::new("com.example.MyKit");

        let link: AuthoredLink = "doc:GettingStarted#overview".parse().unwrap();
        let resolved = resolver.resolve(scope, &link, None).unwrap();
        assert_eq!(
            resolved.url,
            "doc://com.example.MyKit/documentation/MyKit/GettingStarted#overview"
        );

        let by_url: AuthoredLink = resolved.url.parse().unwrap();
        assert_eq!(
            resolver.resolve(scope, &by_url, None).unwrap().identifier,
            resolved.identifier
        );

        let bad_anchor: AuthoredLink = "doc:GettingStarted#nowhere".parse().unwrap();
        match resolver.resolve(scope, &bad_anchor, None) {
            Err(ResolutionFailure::Path(PathLookupError::PartialResult {
                partial,
                available,
                ..
            })) => {
                assert_eq!(partial, Some(resolved.identifier));
                assert_eq!(available, vec!["overview".to_string()]);
            }
            other => panic!("expected a partial result, got {other:?}"),
        }
    }
}
