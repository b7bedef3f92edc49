use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use url::Url;

use crate::{
    paths::{parse_path, ParsedPath},
    resolve::ResolutionFailure,
};

pub const DOC_SCHEME: &str = "doc";

/// How a link was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LinkForm {
    /// `doc://bundle.id/documentation/Path#fragment`
    DocUrl,
    /// `doc:Path#fragment`, also written as the autolink `<doc:Path>`.
    DocPath,
    /// ``` ``Path`` ```; only symbols may match.
    Symbol,
}

/// A reference exactly as a document author wrote it, before resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AuthoredLink {
    pub raw: String,
    pub form: LinkForm,
    /// Bundle identifier named by a `doc://` link.
    pub bundle: Option<String>,
    /// Path portion, without scheme, bundle or fragment.
    pub path: String,
    pub fragment: Option<String>,
}

impl AuthoredLink {
    /// A double-backtick symbol link.
    pub fn symbol(path: &str) -> AuthoredLink {
        let (path_part, fragment) = split_fragment(path.trim());
        AuthoredLink {
            raw: format!("``{}``", path.trim()),
            form: LinkForm::Symbol,
            bundle: None,
            path: path_part.to_string(),
            fragment,
        }
    }

    pub fn only_symbols(&self) -> bool {
        self.form == LinkForm::Symbol
    }

    /// Absolute links resolve the same from every page.
    pub fn is_absolute(&self) -> bool {
        self.bundle.is_some() || self.parsed_path().is_absolute
    }

    pub fn parsed_path(&self) -> ParsedPath {
        let mut parsed = parse_path(&self.path);
        if parsed.fragment.is_none() {
            parsed.fragment = self.fragment.clone();
        }
        parsed
    }
}

fn split_fragment(s: &str) -> (&str, Option<String>) {
    match s.split_once('#') {
        Some((path, fragment)) => (path, (!fragment.is_empty()).then(|| fragment.to_string())),
        None => (s, None),
    }
}

impl FromStr for AuthoredLink {
    type Err = ResolutionFailure;

    /// Parses `doc://bundle/path#frag`, `doc:path#frag` or ``` ``path`` ```.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ResolutionFailure::InvalidLink(
                "empty link destination".to_string(),
            ));
        }
        if let Some(inner) = trimmed
            .strip_prefix("``")
            .and_then(|rest| rest.strip_suffix("``"))
        {
            return Ok(AuthoredLink::symbol(inner));
        }
        if let Some(rest) = trimmed.strip_prefix("doc://") {
            let url = Url::parse(trimmed)
                .map_err(|e| ResolutionFailure::InvalidLink(format!("'{trimmed}': {e}")))?;
            let bundle = url
                .host_str()
                .filter(|host| !host.is_empty())
                .ok_or_else(|| {
                    ResolutionFailure::InvalidLink(format!("'{trimmed}' names no bundle"))
                })?
                .to_string();
            // The url crate percent-encodes the path; keep the authored spelling instead.
            let after_host = rest.get(bundle.len()..).unwrap_or_default();
            let (path, fragment) = split_fragment(after_host);
            return Ok(AuthoredLink {
                raw: trimmed.to_string(),
                form: LinkForm::DocUrl,
                bundle: Some(bundle),
                path: path.to_string(),
                fragment,
            });
        }
        let Some(rest) = trimmed.strip_prefix("doc:") else {
            return Err(ResolutionFailure::InvalidLink(format!(
                "'{trimmed}' is not a documentation link"
            )));
        };
        let (path, fragment) = split_fragment(rest);
        if path.is_empty() && fragment.is_none() {
            return Err(ResolutionFailure::InvalidLink(format!(
                "'{trimmed}' has no path"
            )));
        }
        Ok(AuthoredLink {
            raw: trimmed.to_string(),
            form: LinkForm::DocPath,
            bundle: None,
            path: path.to_string(),
            fragment,
        })
    }
}

impl fmt::Display for AuthoredLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// `doc://<bundle>/<absolute path>[#fragment]`
pub fn normalized_url(bundle: &str, absolute_path: &str, fragment: Option<&str>) -> String {
    match fragment {
        Some(fragment) => format!("{DOC_SCHEME}://{bundle}/{absolute_path}#{fragment}"),
        None => format!("{DOC_SCHEME}://{bundle}/{absolute_path}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_link_forms() {
        let link: AuthoredLink = "doc://com.example.MyKit/documentation/MyKit/Foo#overview"
            .parse()
            .unwrap();
        assert_eq!(link.form, LinkForm::DocUrl);
        assert_eq!(link.bundle.as_deref(), Some("com.example.MyKit"));
        assert_eq!(link.path, "/documentation/MyKit/Foo");
        assert_eq!(link.fragment.as_deref(), Some("overview"));
        assert!(link.is_absolute());

        let link: AuthoredLink = "doc:GettingStarted".parse().unwrap();
        assert_eq!(link.form, LinkForm::DocPath);
        assert_eq!(link.path, "GettingStarted");
        assert!(!link.is_absolute());

        let link: AuthoredLink = "``Foo/<(_:_:)``".parse().unwrap();
        assert_eq!(link.form, LinkForm::Symbol);
        assert_eq!(link.path, "Foo/<(_:_:)");
        assert!(link.only_symbols());
    }

    #[test]
    fn test_invalid_links() {
        assert!(matches!(
            "https://example.com".parse::<AuthoredLink>(),
            Err(ResolutionFailure::InvalidLink(_))
        ));
        assert!("doc:".parse::<AuthoredLink>().is_err());
        assert!("".parse::<AuthoredLink>().is_err());
    }

    #[test]
    fn test_normalized_url() {
        assert_eq!(
            normalized_url("com.example", "documentation/MyKit/Foo", Some("topics")),
            "doc://com.example/documentation/MyKit/Foo#topics"
        );
    }
}
