//! Diagnostics collected while registering a bundle.
//!
//! Diagnostics are non-fatal: registration keeps going and the findings are reported together
//! once the bundle is registered.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::{
    paths::{MergeConflict, PathLookupError},
    properties::ResolvedIdentifier,
    resolve::{AuthoredLink, ResolutionFailure},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// A link that did not resolve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnresolvedReference {
    /// Path of the document containing the link.
    pub source_path: String,
    pub link: AuthoredLink,
    pub failure: ResolutionFailure,
    /// 1-based (line, column) of the link, when known.
    pub location: Option<(usize, usize)>,
    /// Replacement paths that would resolve.
    pub solutions: Vec<String>,
}

impl UnresolvedReference {
    pub fn new(
        source_path: impl Into<String>,
        link: AuthoredLink,
        failure: ResolutionFailure,
    ) -> UnresolvedReference {
        let solutions = solutions_for(&link, &failure);
        UnresolvedReference {
            source_path: source_path.into(),
            link,
            failure,
            location: None,
            solutions,
        }
    }

    pub fn with_location(mut self, location: Option<(usize, usize)>) -> Self {
        self.location = location;
        self
    }
}

/// For a collision, each candidate's disambiguated spelling in place of the ambiguous component.
fn solutions_for(link: &AuthoredLink, failure: &ResolutionFailure) -> Vec<String> {
    let ResolutionFailure::Path(PathLookupError::LookupCollision {
        matched,
        remaining,
        collisions,
        ..
    }) = failure
    else {
        return Vec::new();
    };
    let parsed = link.parsed_path();
    let lead = if parsed.is_absolute { "/" } else { "" };
    collisions
        .iter()
        .map(|candidate| {
            let mut parts = Vec::new();
            if let Some(prefix) = parsed.prefix {
                parts.push(prefix.as_str().to_string());
            }
            parts.extend(matched.iter().cloned());
            parts.push(candidate.disambiguated.clone());
            parts.extend(remaining.iter().skip(1).cloned());
            format!("{lead}{}", parts.join("/"))
        })
        .collect()
}

#[allow(clippy::large_enum_variant)]
/// Diagnostic information produced during registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Diagnostic {
    UnresolvedReference(UnresolvedReference),

    /// Two symbol graphs disagree about a symbol they share.
    MergeConflict(MergeConflict),

    /// A page that no other page curates.
    Uncurated {
        reference: ResolvedIdentifier,
        title: String,
    },

    /// A document that could not be registered because its identity is already taken.
    DuplicateDocument {
        path: String,
        existing: ResolvedIdentifier,
    },

    /// A manual curation that would close a cycle; the edge was not added.
    CurationCycle {
        source: ResolvedIdentifier,
        target: ResolvedIdentifier,
    },

    /// An image or other resource reference naming no registered resource.
    UnknownResource { source_path: String, name: String },

    InvalidAlternateRepresentation {
        source_path: String,
        link: AuthoredLink,
        reason: String,
    },

    /// A document that failed analysis, e.g. one with no title.
    ParseError { path: String, message: String },

    Warning(String),

    Info(String),
}

impl Diagnostic {
    pub fn parse_error(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ParseError {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::Warning(message.into())
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::Info(message.into())
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::UnresolvedReference(_)
            | Self::MergeConflict(_)
            | Self::DuplicateDocument { .. }
            | Self::CurationCycle { .. }
            | Self::UnknownResource { .. }
            | Self::InvalidAlternateRepresentation { .. }
            | Self::Warning(_) => Severity::Warning,
            Self::ParseError { .. } => Severity::Error,
            Self::Uncurated { .. } | Self::Info(_) => Severity::Info,
        }
    }

    pub fn is_unresolved_reference(&self) -> bool {
        matches!(self, Self::UnresolvedReference(_))
    }

    pub fn as_unresolved_reference(&self) -> Option<&UnresolvedReference> {
        match self {
            Self::UnresolvedReference(unresolved) => Some(unresolved),
            _ => None,
        }
    }

    pub fn is_uncurated(&self) -> bool {
        matches!(self, Self::Uncurated { .. })
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnresolvedReference(unresolved) => {
                let location = unresolved
                    .location
                    .map(|(line, column)| format!(":{line}:{column}"))
                    .unwrap_or_default();
                write!(
                    f,
                    "{}{location}: unresolved reference '{}': {}",
                    unresolved.source_path, unresolved.link, unresolved.failure
                )?;
                if !unresolved.solutions.is_empty() {
                    write!(f, " (try: {})", unresolved.solutions.join(", "))?;
                }
                Ok(())
            }
            Self::MergeConflict(conflict) => write!(f, "Merge conflict: {conflict}"),
            Self::Uncurated { reference, title } => {
                write!(f, "'{title}' ({reference}) is not curated by any page")
            }
            Self::DuplicateDocument { path, existing } => {
                write!(f, "{path}: a page named like this already exists ({existing})")
            }
            Self::CurationCycle { source, target } => {
                write!(f, "Curating {target} under {source} would create a cycle")
            }
            Self::UnknownResource { source_path, name } => {
                write!(f, "{source_path}: resource '{name}' not found")
            }
            Self::InvalidAlternateRepresentation {
                source_path,
                link,
                reason,
            } => write!(
                f,
                "{source_path}: invalid alternate representation '{link}': {reason}"
            ),
            Self::ParseError { path, message } => write!(f, "Parse error in {path}: {message}"),
            Self::Warning(msg) => write!(f, "Warning: {msg}"),
            Self::Info(msg) => write!(f, "Info: {msg}"),
        }
    }
}

/// Thread-safe diagnostic sink. Every emitted diagnostic is also logged at its severity.
#[derive(Debug, Default)]
pub struct DiagnosticEngine {
    diagnostics: Mutex<Vec<Diagnostic>>,
}

impl DiagnosticEngine {
    pub fn new() -> DiagnosticEngine {
        DiagnosticEngine::default()
    }

    pub fn emit(&self, diagnostic: Diagnostic) {
        match diagnostic.severity() {
            Severity::Error => tracing::error!("{diagnostic}"),
            Severity::Warning => tracing::warn!("{diagnostic}"),
            Severity::Info => tracing::info!("{diagnostic}"),
        }
        self.diagnostics.lock().push(diagnostic);
    }

    pub fn emit_all(&self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        for diagnostic in diagnostics {
            self.emit(diagnostic);
        }
    }

    pub fn len(&self) -> usize {
        self.diagnostics.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.lock().is_empty()
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths::CollisionCandidate;

    #[test]
    fn test_collision_solutions() {
        let link: AuthoredLink = "doc:MyKit/Foo/value".parse().unwrap();
        let failure = ResolutionFailure::Path(PathLookupError::LookupCollision {
            partial: None,
            matched: vec!["MyKit".to_string(), "Foo".to_string()],
            remaining: vec!["value".to_string()],
            collisions: vec![
                CollisionCandidate {
                    identifier: Some(ResolvedIdentifier::local(3)),
                    suffix: "-method".to_string(),
                    disambiguated: "value-method".to_string(),
                },
                CollisionCandidate {
                    identifier: Some(ResolvedIdentifier::local(4)),
                    suffix: "-property".to_string(),
                    disambiguated: "value-property".to_string(),
                },
            ],
        });
        let unresolved = UnresolvedReference::new("Foo.md", link, failure).with_location(Some((4, 3)));
        assert_eq!(
            unresolved.solutions,
            vec!["MyKit/Foo/value-method", "MyKit/Foo/value-property"]
        );
        let diagnostic = Diagnostic::UnresolvedReference(unresolved);
        assert_eq!(diagnostic.severity(), Severity::Warning);
        assert!(diagnostic.to_string().starts_with("Foo.md:4:3: unresolved reference"));
    }

    #[test]
    fn test_engine_collects() {
        let engine = DiagnosticEngine::new();
        engine.emit(Diagnostic::info("registered"));
        engine.emit_all(vec![
            Diagnostic::warning("odd"),
            Diagnostic::parse_error("Empty.md", "document has no title"),
        ]);
        assert_eq!(engine.len(), 3);
        let diagnostics = engine.into_diagnostics();
        assert_eq!(diagnostics[2].severity(), Severity::Error);
        assert!(!diagnostics[0].is_unresolved_reference());
    }
}
