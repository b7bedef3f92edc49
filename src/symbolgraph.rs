//! Raw symbol batch input.
//!
//! A [SymbolGraph] is one producer's description of a module for one language and platform: a
//! list of symbol records plus typed relationship records between their precise keys. Several
//! graphs may describe the same logical module (one per platform or language variant); the
//! [crate::paths::PathHierarchy] merges them.

use serde::{Deserialize, Serialize};

use crate::{
    error::DocweaveError,
    properties::{content_hash, SourceLanguage, SymbolKind},
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolGraph {
    pub module: ModuleRecord,
    #[serde(default)]
    pub symbols: Vec<SymbolRecord>,
    #[serde(default)]
    pub relationships: Vec<RelationshipRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleRecord {
    pub name: String,
    #[serde(default)]
    pub platform: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolIdentifier {
    pub precise: String,
    pub interface_language: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KindRecord {
    pub identifier: String,
    #[serde(default)]
    pub display_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamesRecord {
    pub title: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolRecord {
    pub identifier: SymbolIdentifier,
    pub kind: KindRecord,
    pub names: NamesRecord,
    #[serde(default)]
    pub path_components: Vec<String>,
    /// Declaration text; two batches disagreeing on it for one declaration is a merge conflict.
    #[serde(default)]
    pub declaration: Option<String>,
    /// In-source documentation comment, markdown.
    #[serde(default)]
    pub doc_comment: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

impl SymbolRecord {
    pub fn precise(&self) -> &str {
        &self.identifier.precise
    }

    pub fn symbol_kind(&self) -> SymbolKind {
        SymbolKind::from_identifier(&self.kind.identifier)
    }

    pub fn language(&self) -> Option<SourceLanguage> {
        SourceLanguage::from_identifier(&self.identifier.interface_language)
    }

    pub fn hash(&self) -> String {
        content_hash(self.precise())
    }

    /// Name of the node this record creates: its title, falling back to the last path component.
    pub fn name(&self) -> &str {
        if !self.names.title.is_empty() {
            &self.names.title
        } else {
            self.path_components
                .last()
                .map(|s| s.as_str())
                .unwrap_or_default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RelationshipKind {
    MemberOf,
    OptionalMemberOf,
    RequirementOf,
    OptionalRequirementOf,
    ConformsTo,
    InheritsFrom,
    DefaultImplementationOf,
    OverloadOf,
    ExtensionTo,
    HttpParameterOf,
    HttpBodyOf,
    HttpResponseOf,
    #[serde(other)]
    Other,
}

impl RelationshipKind {
    /// Relationships that place their source underneath their target in the path hierarchy.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            RelationshipKind::MemberOf
                | RelationshipKind::OptionalMemberOf
                | RelationshipKind::RequirementOf
                | RelationshipKind::OptionalRequirementOf
                | RelationshipKind::ExtensionTo
                | RelationshipKind::HttpParameterOf
                | RelationshipKind::HttpBodyOf
                | RelationshipKind::HttpResponseOf
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipRecord {
    pub source: String,
    pub target: String,
    pub kind: RelationshipKind,
    /// Human readable name of the target, present when the target lives in another module.
    #[serde(default)]
    pub target_fallback: Option<String>,
}

/// See [SymbolGraph::merge_key].
pub type MergeKey = (
    (String, SourceLanguage, String),
    Vec<String>,
    Vec<(String, String, RelationshipKind)>,
);

impl SymbolGraph {
    pub fn from_json(content: &str) -> Result<SymbolGraph, DocweaveError> {
        let graph: SymbolGraph = serde_json::from_str(content)?;
        graph.validate()?;
        Ok(graph)
    }

    /// The language this batch was emitted for, taken from its first symbol with a known
    /// interface language.
    pub fn language(&self) -> SourceLanguage {
        self.symbols
            .iter()
            .find_map(|s| s.language())
            .unwrap_or_default()
    }

    /// Stable key used to order batches before merging them.
    pub fn sort_key(&self) -> (String, SourceLanguage, String) {
        (
            self.module.name.clone(),
            self.language(),
            self.module.platform.clone().unwrap_or_default(),
        )
    }

    /// Total order over batches: [SymbolGraph::sort_key], then the declared symbols and
    /// relationships. Batches that tie on this key are interchangeable.
    pub fn merge_key(&self) -> MergeKey {
        (
            self.sort_key(),
            self.symbols.iter().map(|s| s.precise().to_string()).collect(),
            self.relationships
                .iter()
                .map(|r| (r.source.clone(), r.target.clone(), r.kind))
                .collect(),
        )
    }

    /// Checks the fields every later phase relies on. A violation means the producer broke the
    /// input contract and the build cannot proceed.
    pub fn validate(&self) -> Result<(), DocweaveError> {
        let graph_name = if self.module.name.is_empty() {
            "<unnamed>".to_string()
        } else {
            self.module.name.clone()
        };
        if self.module.name.trim().is_empty() {
            return Err(DocweaveError::invalid_graph(graph_name, "module name is empty"));
        }
        for (idx, symbol) in self.symbols.iter().enumerate() {
            if symbol.precise().trim().is_empty() {
                return Err(DocweaveError::invalid_graph(
                    graph_name,
                    format!("symbol #{idx} has no precise identifier"),
                ));
            }
            if symbol.name().is_empty() {
                return Err(DocweaveError::invalid_graph(
                    graph_name,
                    format!("symbol '{}' has neither a title nor path components", symbol.precise()),
                ));
            }
        }
        for relationship in self.relationships.iter() {
            if relationship.source.is_empty() || relationship.target.is_empty() {
                return Err(DocweaveError::invalid_graph(
                    graph_name,
                    format!("{:?} relationship with an empty endpoint", relationship.kind),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GRAPH: &str = r#"{
        "module": { "name": "MyKit", "platform": "macOS" },
        "symbols": [
            {
                "identifier": { "precise": "s:5MyKit3FooV", "interfaceLanguage": "swift" },
                "kind": { "identifier": "swift.struct", "displayName": "Structure" },
                "names": { "title": "Foo" },
                "pathComponents": ["Foo"]
            }
        ],
        "relationships": [
            { "source": "s:5MyKit3FooV", "target": "s:s8HashableP", "kind": "conformsTo", "targetFallback": "Swift.Hashable" },
            { "source": "a", "target": "b", "kind": "somethingNew" }
        ]
    }"#;

    #[test]
    fn test_decode_symbol_graph() {
        let graph = SymbolGraph::from_json(GRAPH).unwrap();
        assert_eq!(graph.module.name, "MyKit");
        assert_eq!(graph.language(), SourceLanguage::Swift);
        assert_eq!(graph.symbols[0].symbol_kind(), SymbolKind::Struct);
        assert_eq!(graph.relationships[0].kind, RelationshipKind::ConformsTo);
        assert_eq!(graph.relationships[1].kind, RelationshipKind::Other);
    }

    #[test]
    fn test_merge_key_breaks_sort_key_ties() {
        let graph = SymbolGraph::from_json(GRAPH).unwrap();
        let mut other = graph.clone();
        other.symbols[0].identifier.precise = "s:5MyKit3BarV".to_string();
        assert_eq!(graph.sort_key(), other.sort_key());
        assert!(other.merge_key() < graph.merge_key());

        let mut fewer_relationships = graph.clone();
        fewer_relationships.relationships.pop();
        assert!(fewer_relationships.merge_key() < graph.merge_key());
    }

    #[test]
    fn test_missing_precise_identifier_is_structural_error() {
        let mut graph = SymbolGraph::from_json(GRAPH).unwrap();
        graph.symbols[0].identifier.precise.clear();
        assert!(matches!(
            graph.validate(),
            Err(DocweaveError::InvalidSymbolGraph { .. })
        ));
    }

    #[test]
    fn test_missing_field_fails_to_decode() {
        let res = SymbolGraph::from_json(r#"{ "symbols": [] }"#);
        assert!(matches!(res, Err(DocweaveError::Serialization(_))));
    }
}
