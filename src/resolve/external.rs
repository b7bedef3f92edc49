//! Seams for documentation that lives outside the bundle being built.

use serde::{Deserialize, Serialize};

use crate::{
    properties::{NodeKind, SourceLanguage},
    resolve::link::AuthoredLink,
};

/// What an external resolver knows about an entity it resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalEntity {
    /// Canonical URL of the entity; two resolutions with the same URL share one identifier.
    pub url: String,
    pub title: String,
    pub kind: NodeKind,
    pub language: Option<SourceLanguage>,
    pub precise: Option<String>,
    pub abstract_text: Option<String>,
}

impl ExternalEntity {
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> ExternalEntity {
        ExternalEntity {
            url: url.into(),
            title: title.into(),
            kind: NodeKind::External,
            language: None,
            precise: None,
            abstract_text: None,
        }
    }
}

/// Resolves `doc://` links whose bundle identifier is not the local bundle. Each source owns
/// the address space of one bundle identifier.
///
/// Calls are ordinary blocking calls; a source backed by another process should apply its own
/// timeout.
pub trait ExternalDocumentationSource: Send + Sync {
    fn bundle_identifier(&self) -> &str;

    /// Returns a human readable reason on failure.
    fn resolve(&self, link: &AuthoredLink) -> Result<ExternalEntity, String>;
}

/// Looks up relationship targets that no symbol graph in the build declares.
pub trait ExternalSymbolResolver: Send + Sync {
    fn resolve_symbol(&self, precise: &str) -> Option<ExternalEntity>;
}
