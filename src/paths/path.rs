use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::properties::{looks_like_hash, SourceLanguage, SymbolKind};

pub const DOCUMENTATION_PREFIX: &str = "documentation";
pub const TUTORIALS_PREFIX: &str = "tutorials";

/// Fragment a heading is addressed by in `Page#fragment` links: the trimmed title lowercased,
/// whitespace replaced by `-`, and anything other than alphanumerics and `-` dropped.
/// `## Getting Started!` is reachable as `#getting-started`.
pub fn to_anchor(title: &str) -> String {
    title
        .trim()
        .to_lowercase()
        .replace(char::is_whitespace, "-")
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '-')
        .collect()
}

/// One `/`-delimited piece of a path: `name[-kind][-hash]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathComponent {
    /// The component exactly as authored, suffixes included.
    pub full: String,
    /// The component with any recognized disambiguation suffix removed.
    pub name: String,
    pub kind: Option<String>,
    pub hash: Option<String>,
}

/// Accepts a bare kind (`method`) or a language-qualified one (`swift.method`).
fn kind_suffix(suffix: &str) -> Option<String> {
    if SymbolKind::is_known_disambiguation(suffix) {
        return Some(suffix.to_string());
    }
    match suffix.split_once('.') {
        Some((language, rest))
            if SourceLanguage::from_identifier(language).is_some()
                && SymbolKind::is_known_disambiguation(rest) =>
        {
            Some(rest.to_string())
        }
        _ => None,
    }
}

impl PathComponent {
    pub fn parse(full: &str) -> PathComponent {
        let plain = PathComponent {
            full: full.to_string(),
            name: full.to_string(),
            kind: None,
            hash: None,
        };
        let Some((base, suffix)) = full.rsplit_once('-') else {
            return plain;
        };
        if base.is_empty() {
            return plain;
        }
        if let Some(kind) = kind_suffix(suffix) {
            return PathComponent {
                name: base.to_string(),
                kind: Some(kind),
                ..plain
            };
        }
        if !looks_like_hash(suffix) {
            return plain;
        }
        match base.rsplit_once('-') {
            Some((name, kind)) if !name.is_empty() => match kind_suffix(kind) {
                Some(kind) => PathComponent {
                    name: name.to_string(),
                    kind: Some(kind),
                    hash: Some(suffix.to_string()),
                    ..plain
                },
                None => PathComponent {
                    name: base.to_string(),
                    hash: Some(suffix.to_string()),
                    ..plain
                },
            },
            _ => PathComponent {
                name: base.to_string(),
                hash: Some(suffix.to_string()),
                ..plain
            },
        }
    }

    pub fn has_disambiguation(&self) -> bool {
        self.kind.is_some() || self.hash.is_some()
    }
}

impl Display for PathComponent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.full)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PathPrefix {
    Documentation,
    Tutorials,
}

impl PathPrefix {
    pub fn as_str(&self) -> &'static str {
        match self {
            PathPrefix::Documentation => DOCUMENTATION_PREFIX,
            PathPrefix::Tutorials => TUTORIALS_PREFIX,
        }
    }
}

/// A parsed link path. See [parse_path].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedPath {
    pub components: Vec<PathComponent>,
    pub fragment: Option<String>,
    pub is_absolute: bool,
    pub prefix: Option<PathPrefix>,
}

impl ParsedPath {
    pub fn component_strings(&self) -> Vec<String> {
        self.components.iter().map(|c| c.full.clone()).collect()
    }
}

/// Split on `/`, ignoring slashes nested in parentheses (`f(_:/:)`) and treating a doubled
/// slash as the start of an operator name (`Type//(_:_:)`).
fn split_components(path: &str) -> Vec<String> {
    let mut components = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut previous_was_separator = false;
    for c in path.chars() {
        match c {
            '(' => {
                depth += 1;
                current.push(c);
                previous_was_separator = false;
            }
            ')' => {
                depth = depth.saturating_sub(1);
                current.push(c);
                previous_was_separator = false;
            }
            '/' if depth == 0 => {
                if current.is_empty() && previous_was_separator {
                    current.push(c);
                    previous_was_separator = false;
                } else {
                    if !current.is_empty() {
                        components.push(std::mem::take(&mut current));
                    }
                    previous_was_separator = true;
                }
            }
            _ => {
                current.push(c);
                previous_was_separator = false;
            }
        }
    }
    if !current.is_empty() {
        components.push(current);
    }
    components
}

/// Parse `["documentation/"|"tutorials/"]component{"/"component}["#"fragment]`.
///
/// A leading `/` or a leading `documentation/` / `tutorials/` segment marks the path absolute.
pub fn parse_path(path: &str) -> ParsedPath {
    let trimmed = path.trim();
    let (path_part, fragment) = match trimmed.split_once('#') {
        Some((p, f)) => (p, (!f.is_empty()).then(|| f.to_string())),
        None => (trimmed, None),
    };
    let mut is_absolute = path_part.starts_with('/');
    let raw = split_components(path_part.trim_start_matches('/'));
    let mut prefix = None;
    let mut start = 0;
    if let Some(first) = raw.first() {
        let candidate = match first.as_str() {
            DOCUMENTATION_PREFIX => Some(PathPrefix::Documentation),
            TUTORIALS_PREFIX => Some(PathPrefix::Tutorials),
            _ => None,
        };
        if let Some(candidate) = candidate {
            if raw.len() > 1 || is_absolute {
                prefix = Some(candidate);
                is_absolute = true;
                start = 1;
            }
        }
    }
    ParsedPath {
        components: raw[start..]
            .iter()
            .map(|c| PathComponent::parse(c))
            .collect(),
        fragment,
        is_absolute,
        prefix,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_suffixes() {
        let c = PathComponent::parse("value-method");
        assert_eq!(c.name, "value");
        assert_eq!(c.kind.as_deref(), Some("method"));
        assert_eq!(c.hash, None);

        let c = PathComponent::parse("value-1a2b3c");
        assert_eq!(c.name, "value");
        assert_eq!(c.kind, None);
        assert_eq!(c.hash.as_deref(), Some("1a2b3c"));

        let c = PathComponent::parse("value-type.method-1a2b3c");
        assert_eq!(c.name, "value");
        assert_eq!(c.kind.as_deref(), Some("type.method"));
        assert_eq!(c.hash.as_deref(), Some("1a2b3c"));

        let c = PathComponent::parse("value-swift.property");
        assert_eq!(c.kind.as_deref(), Some("property"));
    }

    #[test]
    fn test_component_without_suffix() {
        let c = PathComponent::parse("-(_:_:)");
        assert_eq!(c.name, "-(_:_:)");
        assert!(!c.has_disambiguation());

        let c = PathComponent::parse("Getting-Started");
        assert_eq!(c.full, "Getting-Started");
        assert_eq!(c.name, "Getting-Started");
    }

    #[test]
    fn test_parse_absolute_and_relative() {
        let p = parse_path("documentation/MyKit/Foo/value-method#discussion");
        assert!(p.is_absolute);
        assert_eq!(p.prefix, Some(PathPrefix::Documentation));
        assert_eq!(p.component_strings(), vec!["MyKit", "Foo", "value-method"]);
        assert_eq!(p.fragment.as_deref(), Some("discussion"));

        let p = parse_path("/MyKit/Foo");
        assert!(p.is_absolute);
        assert_eq!(p.prefix, None);

        let p = parse_path("Foo/bar");
        assert!(!p.is_absolute);
        assert_eq!(p.components.len(), 2);

        let p = parse_path("tutorials/SwiftUI/Creating-Views");
        assert_eq!(p.prefix, Some(PathPrefix::Tutorials));
        assert_eq!(p.components.len(), 2);
    }

    #[test]
    fn test_parse_operator_and_nested_slash() {
        let p = parse_path("Vector//(_:_:)");
        assert_eq!(p.component_strings(), vec!["Vector", "/(_:_:)"]);

        let p = parse_path("Foo/divide(_:by/:)");
        assert_eq!(p.component_strings(), vec!["Foo", "divide(_:by/:)"]);
    }

    #[test]
    fn test_to_anchor() {
        assert_eq!(to_anchor("  Getting Started! "), "getting-started");
    }
}
