//! Authored link resolution: local lookups in the [crate::paths::PathHierarchy] first, then the
//! external documentation source registered for the link's bundle identifier.
pub mod external;
pub mod link;
pub mod resolver;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::paths::PathLookupError;

pub use external::{ExternalDocumentationSource, ExternalEntity, ExternalSymbolResolver};
pub use link::{normalized_url, AuthoredLink, LinkForm};
pub use resolver::{LinkResolver, ReferenceOutcome, ResolutionScope, ResolvedReference};

/// Why an authored link did not resolve. Recoverable: the pipeline records a diagnostic and
/// keeps the failure in place of the reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum ResolutionFailure {
    #[error(transparent)]
    Path(#[from] PathLookupError),
    #[error("External resolution in '{bundle}' failed: {message}")]
    External { bundle: String, message: String },
    #[error("No documentation source is registered for bundle '{0}'")]
    UnknownBundle(String),
    #[error("Invalid link: {0}")]
    InvalidLink(String),
}
