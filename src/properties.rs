/// [crate::properties] contains the basic building blocks shared by the path hierarchy, the topic
/// graph and the registration pipeline: identities, declaration kinds and source languages.
pub use enumset::EnumSet;
use enumset::*;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};

/// Number of digest bytes kept for a symbol's disambiguation hash.
const CONTENT_HASH_BYTES: usize = 3;

/// Which table minted a [ResolvedIdentifier].
#[derive(Clone, Copy, Debug, Serialize, Deserialize, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum IdentifierOrigin {
    /// Minted by the [crate::paths::PathHierarchy] lookup table.
    Local,
    /// Minted by the external-entity table of the link resolver.
    External,
}

/// Opaque handle for one documentation entity once it has a confirmed place in the namespace.
///
/// Identities are never reused: two identifiers compare equal only when they came from the same
/// mint in the same table.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct ResolvedIdentifier {
    origin: IdentifierOrigin,
    index: u32,
}

impl ResolvedIdentifier {
    pub(crate) fn local(index: u32) -> Self {
        ResolvedIdentifier {
            origin: IdentifierOrigin::Local,
            index,
        }
    }

    pub(crate) fn external(index: u32) -> Self {
        ResolvedIdentifier {
            origin: IdentifierOrigin::External,
            index,
        }
    }

    pub fn origin(&self) -> IdentifierOrigin {
        self.origin
    }

    pub fn is_external(&self) -> bool {
        self.origin == IdentifierOrigin::External
    }

    pub(crate) fn index(&self) -> usize {
        self.index as usize
    }
}

impl Display for ResolvedIdentifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.origin {
            IdentifierOrigin::Local => write!(f, "local:{}", self.index),
            IdentifierOrigin::External => write!(f, "external:{}", self.index),
        }
    }
}

/// The language a symbol batch was emitted for. A merged node records every language it was seen
/// in as an [EnumSet].
#[derive(Debug, Default, Serialize, Deserialize, PartialOrd, Ord, Hash, EnumSetType)]
#[enumset(serialize_repr = "list")]
pub enum SourceLanguage {
    #[default]
    Swift,
    ObjectiveC,
    Data,
    JavaScript,
    Metal,
}

impl SourceLanguage {
    /// Maps a symbol graph `interfaceLanguage` (or kind prefix) to a language.
    pub fn from_identifier(identifier: &str) -> Option<SourceLanguage> {
        match identifier.trim().to_lowercase().as_str() {
            "swift" => Some(SourceLanguage::Swift),
            "objc" | "occ" | "objective-c" | "c" | "c++" => Some(SourceLanguage::ObjectiveC),
            "data" => Some(SourceLanguage::Data),
            "javascript" | "js" => Some(SourceLanguage::JavaScript),
            "metal" => Some(SourceLanguage::Metal),
            _ => None,
        }
    }

    pub fn identifier(&self) -> &'static str {
        match self {
            SourceLanguage::Swift => "swift",
            SourceLanguage::ObjectiveC => "occ",
            SourceLanguage::Data => "data",
            SourceLanguage::JavaScript => "javascript",
            SourceLanguage::Metal => "metal",
        }
    }
}

impl Display for SourceLanguage {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

impl FromStr for SourceLanguage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SourceLanguage::from_identifier(s).ok_or_else(|| format!("unknown source language '{s}'"))
    }
}

/// Declaration kind of a symbol, stripped of its language prefix (`swift.method` becomes
/// [SymbolKind::Method]). The [SymbolKind::identifier] string is what path components use as
/// their `-kind` disambiguation suffix.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SymbolKind {
    Module,
    Class,
    Struct,
    Enum,
    Case,
    Protocol,
    TypeAlias,
    AssociatedType,
    Function,
    Method,
    TypeMethod,
    Initializer,
    Deinitializer,
    Property,
    TypeProperty,
    Variable,
    Subscript,
    TypeSubscript,
    Operator,
    Macro,
    Extension,
    Dictionary,
    HttpRequest,
    HttpParameter,
    HttpBody,
    HttpResponse,
    #[default]
    Unknown,
}

const SYMBOL_KINDS: [SymbolKind; 26] = [
    SymbolKind::Module,
    SymbolKind::Class,
    SymbolKind::Struct,
    SymbolKind::Enum,
    SymbolKind::Case,
    SymbolKind::Protocol,
    SymbolKind::TypeAlias,
    SymbolKind::AssociatedType,
    SymbolKind::Function,
    SymbolKind::Method,
    SymbolKind::TypeMethod,
    SymbolKind::Initializer,
    SymbolKind::Deinitializer,
    SymbolKind::Property,
    SymbolKind::TypeProperty,
    SymbolKind::Variable,
    SymbolKind::Subscript,
    SymbolKind::TypeSubscript,
    SymbolKind::Operator,
    SymbolKind::Macro,
    SymbolKind::Extension,
    SymbolKind::Dictionary,
    SymbolKind::HttpRequest,
    SymbolKind::HttpParameter,
    SymbolKind::HttpBody,
    SymbolKind::HttpResponse,
];

impl SymbolKind {
    pub fn identifier(&self) -> &'static str {
        match self {
            SymbolKind::Module => "module",
            SymbolKind::Class => "class",
            SymbolKind::Struct => "struct",
            SymbolKind::Enum => "enum",
            SymbolKind::Case => "case",
            SymbolKind::Protocol => "protocol",
            SymbolKind::TypeAlias => "typealias",
            SymbolKind::AssociatedType => "associatedtype",
            SymbolKind::Function => "func",
            SymbolKind::Method => "method",
            SymbolKind::TypeMethod => "type.method",
            SymbolKind::Initializer => "init",
            SymbolKind::Deinitializer => "deinit",
            SymbolKind::Property => "property",
            SymbolKind::TypeProperty => "type.property",
            SymbolKind::Variable => "var",
            SymbolKind::Subscript => "subscript",
            SymbolKind::TypeSubscript => "type.subscript",
            SymbolKind::Operator => "func.op",
            SymbolKind::Macro => "macro",
            SymbolKind::Extension => "extension",
            SymbolKind::Dictionary => "dictionary",
            SymbolKind::HttpRequest => "httpRequest",
            SymbolKind::HttpParameter => "httpParameter",
            SymbolKind::HttpBody => "httpBody",
            SymbolKind::HttpResponse => "httpResponse",
            SymbolKind::Unknown => "unknown",
        }
    }

    /// Parses a symbol graph kind identifier such as `swift.type.method` or `method`.
    pub fn from_identifier(identifier: &str) -> SymbolKind {
        let trimmed = identifier.trim();
        let unprefixed = match trimmed.split_once('.') {
            Some((prefix, rest)) if SourceLanguage::from_identifier(prefix).is_some() => rest,
            _ => trimmed,
        };
        match unprefixed {
            "enum.case" => SymbolKind::Case,
            "ivar" => SymbolKind::Property,
            other => SymbolKind::from_disambiguation(other).unwrap_or(SymbolKind::Unknown),
        }
    }

    /// Matches a path component `-kind` suffix exactly.
    pub fn from_disambiguation(suffix: &str) -> Option<SymbolKind> {
        SYMBOL_KINDS
            .iter()
            .find(|kind| kind.identifier() == suffix)
            .copied()
    }

    pub fn is_known_disambiguation(suffix: &str) -> bool {
        SymbolKind::from_disambiguation(suffix).is_some()
    }

    /// Kinds that declare members of their own.
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            SymbolKind::Module
                | SymbolKind::Class
                | SymbolKind::Struct
                | SymbolKind::Enum
                | SymbolKind::Protocol
                | SymbolKind::Extension
                | SymbolKind::Dictionary
                | SymbolKind::HttpRequest
        )
    }
}

impl Display for SymbolKind {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

/// The kind of page a topic graph node stands for.
#[derive(Debug, Default, Serialize, Deserialize, PartialOrd, Ord, Hash, EnumSetType)]
#[enumset(serialize_repr = "list")]
pub enum NodeKind {
    Module,
    #[default]
    Symbol,
    Article,
    /// An article declaring `@TechnologyRoot`; it heads its own hierarchy.
    TechnologyRoot,
    Tutorial,
    TutorialTableOfContents,
    External,
}

impl Display for NodeKind {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Kinds allowed to have no curating parent once the topic graph is final.
pub fn permitted_root_kinds() -> EnumSet<NodeKind> {
    NodeKind::Module | NodeKind::TechnologyRoot | NodeKind::TutorialTableOfContents
}

/// Stable short hash of a precise symbol key, used as the `-hash` disambiguation suffix.
pub fn content_hash(precise: &str) -> String {
    let digest = Sha256::digest(precise.as_bytes());
    hex::encode(&digest[..CONTENT_HASH_BYTES])
}

/// Heuristic used when splitting a path component: hashes are short lowercase alphanumerics.
pub fn looks_like_hash(candidate: &str) -> bool {
    !candidate.is_empty()
        && candidate.len() <= 8
        && candidate
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_kind_strips_language_prefix() {
        assert_eq!(SymbolKind::from_identifier("swift.method"), SymbolKind::Method);
        assert_eq!(
            SymbolKind::from_identifier("swift.type.method"),
            SymbolKind::TypeMethod
        );
        assert_eq!(SymbolKind::from_identifier("c.struct"), SymbolKind::Struct);
        assert_eq!(SymbolKind::from_identifier("property"), SymbolKind::Property);
        assert_eq!(SymbolKind::from_identifier("swift.enum.case"), SymbolKind::Case);
        assert_eq!(SymbolKind::from_identifier("swift.mystery"), SymbolKind::Unknown);
    }

    #[test]
    fn test_content_hash_is_stable_and_short() {
        let a = content_hash("s:5MyKit3FooV");
        assert_eq!(a, content_hash("s:5MyKit3FooV"));
        assert_eq!(a.len(), CONTENT_HASH_BYTES * 2);
        assert!(looks_like_hash(&a));
        assert_ne!(a, content_hash("s:5MyKit3BarV"));
    }

    #[test]
    fn test_permitted_roots() {
        let roots = permitted_root_kinds();
        assert!(roots.contains(NodeKind::Module));
        assert!(!roots.contains(NodeKind::Article));
        assert!(!roots.contains(NodeKind::Symbol));
    }

    #[test]
    fn test_identifiers_are_distinct_per_origin() {
        assert_ne!(ResolvedIdentifier::local(0), ResolvedIdentifier::external(0));
        assert_eq!(ResolvedIdentifier::local(3).to_string(), "local:3");
    }
}
