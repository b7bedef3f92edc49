//! Documentation content model.
//!
//! Every page's semantic content is one variant of the closed [Semantic] enum and is matched
//! exhaustively wherever kind-specific behavior is needed.
pub mod markup;

use enumset::EnumSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::{
    properties::{NodeKind, ResolvedIdentifier, SourceLanguage, SymbolKind},
    resolve::{AuthoredLink, ReferenceOutcome, ResolutionFailure, ResolvedReference},
    topicgraph::ContentSource,
};

pub use markup::{analyze_doc_comment, analyze_document};

/// A free-form document handed to the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSource {
    pub path: String,
    pub content: String,
}

impl DocumentSource {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> DocumentSource {
        DocumentSource {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// A binary asset referenced by documents, e.g. an image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub name: String,
    pub data: Vec<u8>,
}

/// Document classification, decided by structure rather than file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentKind {
    Article,
    /// An article declaring `@TechnologyRoot`.
    TechnologyRoot,
    /// An article whose H1 is a symbol link; its content is merged into that symbol.
    DocumentationExtension,
    Tutorial,
    TutorialTableOfContents,
}

/// Resolution state of one authored reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReferenceState {
    Unresolved,
    Resolved(ResolvedReference),
    Failed(ResolutionFailure),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicReference {
    pub link: AuthoredLink,
    /// 1-based (line, column) in the source document.
    pub location: Option<(usize, usize)>,
    pub state: ReferenceState,
}

impl TopicReference {
    pub fn new(link: AuthoredLink, location: Option<(usize, usize)>) -> TopicReference {
        TopicReference {
            link,
            location,
            state: ReferenceState::Unresolved,
        }
    }

    pub fn resolved(&self) -> Option<ResolvedIdentifier> {
        match &self.state {
            ReferenceState::Resolved(reference) => Some(reference.identifier),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, ReferenceState::Unresolved)
    }

    pub fn apply(&mut self, outcome: ReferenceOutcome) {
        self.state = match outcome {
            Ok(reference) => ReferenceState::Resolved(reference),
            Err(failure) => ReferenceState::Failed(failure),
        };
    }
}

/// A `###` group inside a `## Topics` or `## See Also` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicGroup {
    pub title: String,
    pub references: Vec<TopicReference>,
}

/// Markup-derived content shared by every page kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Markup {
    pub abstract_text: Option<String>,
    pub anchors: BTreeSet<String>,
    /// Inline references outside Topics and See Also.
    pub links: Vec<TopicReference>,
    pub topics: Vec<TopicGroup>,
    pub see_also: Vec<TopicGroup>,
    pub images: Vec<String>,
}

impl Markup {
    /// Appends everything in `other`. An abstract in `other` replaces this one.
    pub fn merge(&mut self, other: Markup) {
        if other.abstract_text.is_some() {
            self.abstract_text = other.abstract_text;
        }
        self.anchors.extend(other.anchors);
        self.links.extend(other.links);
        self.topics.extend(other.topics);
        self.see_also.extend(other.see_also);
        self.images.extend(other.images);
    }

    pub fn references(&self) -> impl Iterator<Item = &TopicReference> {
        self.links.iter().chain(
            self.topics
                .iter()
                .chain(self.see_also.iter())
                .flat_map(|group| group.references.iter()),
        )
    }

    pub fn references_mut(&mut self) -> impl Iterator<Item = &mut TopicReference> {
        self.links.iter_mut().chain(
            self.topics
                .iter_mut()
                .chain(self.see_also.iter_mut())
                .flat_map(|group| group.references.iter_mut()),
        )
    }

    /// Topics references in authored order.
    pub fn curated_references(&self) -> impl Iterator<Item = &TopicReference> {
        self.topics.iter().flat_map(|group| group.references.iter())
    }
}

/// The result of analyzing one [DocumentSource].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzedDocument {
    pub path: String,
    pub kind: DocumentKind,
    pub title: String,
    /// Path component the page is registered under.
    pub name: String,
    pub markup: Markup,
    /// Symbol named by a documentation extension's H1.
    pub extension_target: Option<AuthoredLink>,
    /// `@TutorialReference` entries of a tutorial table of contents.
    pub tutorial_references: Vec<TopicReference>,
    /// `@AlternateRepresentation` entries of a documentation extension.
    pub alternate_representations: Vec<TopicReference>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolRelationships {
    pub conforms_to: Vec<ResolvedIdentifier>,
    pub conforming_types: Vec<ResolvedIdentifier>,
    pub inherits_from: Vec<ResolvedIdentifier>,
    pub inherited_by: Vec<ResolvedIdentifier>,
    /// On a requirement: the implementations that satisfy it by default.
    pub default_implementations: Vec<ResolvedIdentifier>,
    /// On a protocol: its requirements.
    pub requirements: Vec<ResolvedIdentifier>,
    /// On a requirement: whether it is optional.
    pub is_optional_requirement: bool,
    pub overloads: Vec<ResolvedIdentifier>,
    pub members: Vec<ResolvedIdentifier>,
    pub extended_by: Vec<ResolvedIdentifier>,
    pub http_parameters: Vec<ResolvedIdentifier>,
    pub http_body: Option<ResolvedIdentifier>,
    pub http_responses: Vec<ResolvedIdentifier>,
}

impl SymbolRelationships {
    /// Adds `target` to `list` once.
    pub(crate) fn push_unique(list: &mut Vec<ResolvedIdentifier>, target: ResolvedIdentifier) {
        if !list.contains(&target) {
            list.push(target);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolContent {
    pub precise: String,
    pub kind: SymbolKind,
    pub module: String,
    pub declaration: Option<String>,
    pub languages: EnumSet<SourceLanguage>,
    pub platforms: BTreeSet<String>,
    pub markup: Markup,
    pub relationships: SymbolRelationships,
    pub alternate_representations: Vec<TopicReference>,
    /// Path of the documentation extension merged into this symbol, if any.
    pub extension_source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleContent {
    pub markup: Markup,
    pub is_technology_root: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TutorialContent {
    pub markup: Markup,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TutorialTableOfContentsContent {
    pub markup: Markup,
    pub tutorials: Vec<TopicReference>,
}

/// Semantic content of a page, one variant per page kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Semantic {
    Symbol(Box<SymbolContent>),
    Article(ArticleContent),
    Tutorial(TutorialContent),
    TutorialTableOfContents(TutorialTableOfContentsContent),
}

impl Semantic {
    pub fn markup(&self) -> &Markup {
        match self {
            Semantic::Symbol(symbol) => &symbol.markup,
            Semantic::Article(article) => &article.markup,
            Semantic::Tutorial(tutorial) => &tutorial.markup,
            Semantic::TutorialTableOfContents(toc) => &toc.markup,
        }
    }

    pub fn markup_mut(&mut self) -> &mut Markup {
        match self {
            Semantic::Symbol(symbol) => &mut symbol.markup,
            Semantic::Article(article) => &mut article.markup,
            Semantic::Tutorial(tutorial) => &mut tutorial.markup,
            Semantic::TutorialTableOfContents(toc) => &mut toc.markup,
        }
    }

    /// References curating children of this page: Topics entries, plus a table of contents'
    /// tutorial references.
    pub fn curation_references(&self) -> Vec<&TopicReference> {
        let mut references = self.markup().curated_references().collect::<Vec<_>>();
        if let Semantic::TutorialTableOfContents(toc) = self {
            references.extend(toc.tutorials.iter());
        }
        references
    }

    pub fn references(&self) -> Vec<&TopicReference> {
        let mut references = self.markup().references().collect::<Vec<_>>();
        match self {
            Semantic::Symbol(symbol) => references.extend(symbol.alternate_representations.iter()),
            Semantic::TutorialTableOfContents(toc) => references.extend(toc.tutorials.iter()),
            Semantic::Article(_) | Semantic::Tutorial(_) => {}
        }
        references
    }

    /// Every reference on the page, for the resolution passes.
    pub fn references_mut(&mut self) -> Vec<&mut TopicReference> {
        match self {
            Semantic::Symbol(symbol) => {
                let SymbolContent {
                    markup,
                    alternate_representations,
                    ..
                } = symbol.as_mut();
                markup
                    .references_mut()
                    .chain(alternate_representations.iter_mut())
                    .collect()
            }
            Semantic::Article(article) => article.markup.references_mut().collect(),
            Semantic::Tutorial(tutorial) => tutorial.markup.references_mut().collect(),
            Semantic::TutorialTableOfContents(toc) => {
                let TutorialTableOfContentsContent { markup, tutorials } = toc;
                markup
                    .references_mut()
                    .chain(tutorials.iter_mut())
                    .collect()
            }
        }
    }

    pub fn as_symbol(&self) -> Option<&SymbolContent> {
        match self {
            Semantic::Symbol(symbol) => Some(symbol),
            _ => None,
        }
    }

    pub fn as_symbol_mut(&mut self) -> Option<&mut SymbolContent> {
        match self {
            Semantic::Symbol(symbol) => Some(symbol),
            _ => None,
        }
    }
}

/// A fully analyzed page, stored in the content cache under its identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentationNode {
    pub reference: ResolvedIdentifier,
    pub kind: NodeKind,
    pub title: String,
    pub source: ContentSource,
    pub semantic: Semantic,
}
