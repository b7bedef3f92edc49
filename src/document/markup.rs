//! Markdown analysis: titles, abstracts, curation sections, links and block directives.
use once_cell::sync::Lazy;
use pulldown_cmark::{
    Event as MdEvent, HeadingLevel, Options, Parser as MdParser, Tag as MdTag, TagEnd as MdTagEnd,
};
use regex::Regex;
use std::{ops::Range, path::Path};
use thiserror::Error;

use crate::{
    document::{AnalyzedDocument, DocumentKind, DocumentSource, Markup, TopicGroup, TopicReference},
    paths::to_anchor,
    resolve::AuthoredLink,
};

static DIRECTIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*@([A-Za-z]+)\s*(?:\((.*)\))?").expect("directive pattern is valid")
});

static DIRECTIVE_ARGUMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(\w+)\s*:\s*"([^"]*)""#).expect("directive argument pattern is valid")
});

pub fn markdown_options() -> Options {
    let mut md_options = Options::empty();
    md_options.insert(Options::ENABLE_FOOTNOTES);
    md_options.insert(Options::ENABLE_GFM);
    md_options.insert(Options::ENABLE_STRIKETHROUGH);
    md_options.insert(Options::ENABLE_TABLES);
    md_options
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    #[error("{path}: document has no title")]
    MissingTitle { path: String },
    #[error("{path}: document has no usable name")]
    MissingName { path: String },
}

impl AnalysisError {
    pub fn path(&self) -> &str {
        match self {
            AnalysisError::MissingTitle { path } | AnalysisError::MissingName { path } => path,
        }
    }
}

/// A block directive line such as `@Tutorials(name: "SlothCreator") {`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Directive {
    name: String,
    arguments: String,
    line: usize,
}

impl Directive {
    fn named_argument(&self, name: &str) -> Option<String> {
        DIRECTIVE_ARGUMENT
            .captures_iter(&self.arguments)
            .find(|captures| &captures[1] == name)
            .map(|captures| captures[2].to_string())
    }
}

/// Directive lines outside fenced code blocks.
fn scan_directives(content: &str) -> Vec<Directive> {
    let mut directives = Vec::new();
    let mut in_fence = false;
    for (index, line) in content.lines().enumerate() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }
        if let Some(captures) = DIRECTIVE.captures(line) {
            directives.push(Directive {
                name: captures[1].to_string(),
                arguments: captures
                    .get(2)
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_default(),
                line: index + 1,
            });
        }
    }
    directives
}

/// 1-based line and column of a byte offset.
pub fn line_column(content: &str, offset: usize) -> (usize, usize) {
    let before = &content[..offset.min(content.len())];
    let line = before.matches('\n').count() + 1;
    let column = match before.rfind('\n') {
        Some(newline) => offset - newline,
        None => offset + 1,
    };
    (line, column)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Preamble,
    Topics,
    SeeAlso,
    Other,
}

#[derive(Debug, Default)]
struct Heading {
    text: String,
    /// Text outside of links, used to tell a link-only heading apart.
    plain_text: String,
    links: Vec<AuthoredLink>,
}

struct Walker<'a> {
    content: &'a str,
    markup: Markup,
    title: Option<Heading>,
    heading: Option<(HeadingLevel, Heading)>,
    section: Section,
    paragraph: Option<String>,
    item_depth: usize,
    quote_depth: usize,
    link_depth: usize,
}

impl<'a> Walker<'a> {
    fn new(content: &'a str) -> Walker<'a> {
        Walker {
            content,
            markup: Markup::default(),
            title: None,
            heading: None,
            section: Section::Preamble,
            paragraph: None,
            item_depth: 0,
            quote_depth: 0,
            link_depth: 0,
        }
    }

    fn walk(mut self) -> (Option<Heading>, Markup) {
        let content = self.content;
        for (event, range) in MdParser::new_ext(content, markdown_options()).into_offset_iter() {
            self.visit(event, range);
        }
        (self.title, self.markup)
    }

    fn visit(&mut self, event: MdEvent<'_>, range: Range<usize>) {
        match event {
            MdEvent::Start(MdTag::Heading { level, .. }) => {
                self.heading = Some((level, Heading::default()));
            }
            MdEvent::End(MdTagEnd::Heading(_)) => {
                if let Some((level, heading)) = self.heading.take() {
                    self.finish_heading(level, heading);
                }
            }
            MdEvent::Start(MdTag::Paragraph) => {
                let source = self.content[range].trim_start();
                if self.markup.abstract_text.is_none()
                    && self.section == Section::Preamble
                    && self.item_depth == 0
                    && self.quote_depth == 0
                    && !source.starts_with('@')
                    && !source.starts_with('}')
                {
                    self.paragraph = Some(String::new());
                }
            }
            MdEvent::End(MdTagEnd::Paragraph) => {
                if let Some(text) = self.paragraph.take() {
                    let text = text.trim();
                    if !text.is_empty() {
                        self.markup.abstract_text = Some(text.to_string());
                    }
                }
            }
            MdEvent::Start(MdTag::Item) => self.item_depth += 1,
            MdEvent::End(MdTagEnd::Item) => self.item_depth = self.item_depth.saturating_sub(1),
            MdEvent::Start(MdTag::BlockQuote(_)) => self.quote_depth += 1,
            MdEvent::End(MdTagEnd::BlockQuote(_)) => {
                self.quote_depth = self.quote_depth.saturating_sub(1)
            }
            MdEvent::Start(MdTag::Link { dest_url, .. }) => {
                self.link_depth += 1;
                if dest_url.starts_with("doc:") {
                    match dest_url.parse::<AuthoredLink>() {
                        Ok(link) => self.add_link(link, range.start),
                        Err(e) => tracing::debug!("Skipping malformed link '{dest_url}': {e}"),
                    }
                }
            }
            MdEvent::End(MdTagEnd::Link) => self.link_depth = self.link_depth.saturating_sub(1),
            MdEvent::Start(MdTag::Image { dest_url, .. }) => {
                self.markup.images.push(dest_url.to_string());
            }
            MdEvent::Text(text) => {
                self.push_text(&text, self.link_depth == 0);
            }
            MdEvent::Code(code) => {
                let is_symbol_link = self.content[range.clone()].starts_with("``");
                self.push_text(&code, !is_symbol_link && self.link_depth == 0);
                if is_symbol_link {
                    self.add_link(AuthoredLink::symbol(&code), range.start);
                }
            }
            MdEvent::SoftBreak | MdEvent::HardBreak => {
                if let Some(paragraph) = self.paragraph.as_mut() {
                    paragraph.push(' ');
                }
            }
            _ => {}
        }
    }

    fn push_text(&mut self, text: &str, plain: bool) {
        if let Some((_, heading)) = self.heading.as_mut() {
            heading.text.push_str(text);
            if plain {
                heading.plain_text.push_str(text);
            }
        }
        if let Some(paragraph) = self.paragraph.as_mut() {
            paragraph.push_str(text);
        }
    }

    fn finish_heading(&mut self, level: HeadingLevel, heading: Heading) {
        let text = heading.text.trim().to_string();
        match level {
            HeadingLevel::H1 if self.title.is_none() => {
                self.title = Some(heading);
            }
            HeadingLevel::H2 => {
                self.section = match text.as_str() {
                    "Topics" => Section::Topics,
                    "See Also" => Section::SeeAlso,
                    _ => Section::Other,
                };
                self.markup.anchors.insert(to_anchor(&text));
            }
            HeadingLevel::H3 if matches!(self.section, Section::Topics | Section::SeeAlso) => {
                self.markup.anchors.insert(to_anchor(&text));
                let group = TopicGroup {
                    title: text,
                    references: Vec::new(),
                };
                match self.section {
                    Section::Topics => self.markup.topics.push(group),
                    _ => self.markup.see_also.push(group),
                }
            }
            _ => {
                if !text.is_empty() {
                    self.markup.anchors.insert(to_anchor(&text));
                }
            }
        }
    }

    fn add_link(&mut self, link: AuthoredLink, offset: usize) {
        if let Some((_, heading)) = self.heading.as_mut() {
            heading.links.push(link);
            return;
        }
        let reference = TopicReference::new(link, Some(line_column(self.content, offset)));
        let groups = match self.section {
            Section::Topics if self.item_depth > 0 => &mut self.markup.topics,
            Section::SeeAlso if self.item_depth > 0 => &mut self.markup.see_also,
            _ => {
                self.markup.links.push(reference);
                return;
            }
        };
        if groups.is_empty() {
            groups.push(TopicGroup::default());
        }
        if let Some(group) = groups.last_mut() {
            group.references.push(reference);
        }
    }
}

/// Analyzes an in-source documentation comment. Comments carry no title.
pub fn analyze_doc_comment(text: &str) -> Markup {
    let (_, markup) = Walker::new(text).walk();
    markup
}

fn directive_link(directive: &Directive, value: &str) -> Option<TopicReference> {
    match value.parse::<AuthoredLink>() {
        Ok(link) => Some(TopicReference::new(link, Some((directive.line, 1)))),
        Err(e) => {
            tracing::debug!("Ignoring @{} argument '{value}': {e}", directive.name);
            None
        }
    }
}

/// Classifies and analyzes one free-form document.
///
/// Classification is structural: a `@Tutorials` directive makes a tutorial table of contents, a
/// `@Tutorial` directive a tutorial, an H1 consisting of a single link a documentation
/// extension, and `@TechnologyRoot` a technology root. Anything else is an article.
#[tracing::instrument(skip(source), fields(path = %source.path))]
pub fn analyze_document(source: &DocumentSource) -> Result<AnalyzedDocument, AnalysisError> {
    let directives = scan_directives(&source.content);
    let find = |name: &str| directives.iter().find(|directive| directive.name == name);
    let (heading, markup) = Walker::new(&source.content).walk();

    let name = Path::new(&source.path)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .ok_or_else(|| AnalysisError::MissingName {
            path: source.path.clone(),
        })?
        .to_string();

    let heading_title = heading
        .as_ref()
        .map(|heading| heading.text.trim().to_string())
        .filter(|title| !title.is_empty());
    let extension_target = heading.and_then(|heading| {
        (heading.plain_text.trim().is_empty() && heading.links.len() == 1)
            .then(|| heading.links.into_iter().next())
            .flatten()
    });

    let (kind, title) = if let Some(toc) = find("Tutorials") {
        (
            DocumentKind::TutorialTableOfContents,
            toc.named_argument("name").or(heading_title),
        )
    } else if find("Tutorial").is_some() {
        let intro_title = find("Intro").and_then(|intro| intro.named_argument("title"));
        (DocumentKind::Tutorial, intro_title.or(heading_title))
    } else if extension_target.is_some() {
        (DocumentKind::DocumentationExtension, heading_title)
    } else if find("TechnologyRoot").is_some() {
        (DocumentKind::TechnologyRoot, heading_title)
    } else {
        (DocumentKind::Article, heading_title)
    };
    let title = title.ok_or_else(|| AnalysisError::MissingTitle {
        path: source.path.clone(),
    })?;

    let tutorial_references = match kind {
        DocumentKind::TutorialTableOfContents => directives
            .iter()
            .filter(|directive| directive.name == "TutorialReference")
            .filter_map(|directive| {
                let value = directive.named_argument("tutorial")?;
                directive_link(directive, &value)
            })
            .collect(),
        _ => Vec::new(),
    };
    let alternate_representations = match kind {
        DocumentKind::DocumentationExtension => directives
            .iter()
            .filter(|directive| directive.name == "AlternateRepresentation")
            .filter_map(|directive| directive_link(directive, directive.arguments.trim()))
            .collect(),
        _ => Vec::new(),
    };

    Ok(AnalyzedDocument {
        path: source.path.clone(),
        kind,
        title,
        name,
        markup,
        extension_target: extension_target.filter(|_| kind == DocumentKind::DocumentationExtension),
        tutorial_references,
        alternate_representations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::LinkForm;

    fn analyze(path: &str, content: &str) -> AnalyzedDocument {
        analyze_document(&DocumentSource::new(path, content)).unwrap()
    }

    #[test]
    fn test_article_sections() {
        let doc = analyze(
            "GettingStarted.md",
            "# Getting Started\n\
             \n\
             Learn how to use ``MyKit/Foo`` in your app.\n\
             \n\
             ## Overview\n\
             \n\
             See <doc:Advanced> for more.\n\
             \n\
             ## Topics\n\
             \n\
             ### Essentials\n\
             \n\
             - ``Foo``\n\
             - <doc:Advanced>\n\
             \n\
             ## See Also\n\
             \n\
             - [Bar](doc:Bar)\n",
        );
        assert_eq!(doc.kind, DocumentKind::Article);
        assert_eq!(doc.title, "Getting Started");
        assert_eq!(doc.name, "GettingStarted");
        assert_eq!(
            doc.markup.abstract_text.as_deref(),
            Some("Learn how to use MyKit/Foo in your app.")
        );
        assert!(doc.markup.anchors.contains("overview"));
        assert!(doc.markup.anchors.contains("essentials"));

        let inline = doc
            .markup
            .links
            .iter()
            .map(|reference| reference.link.raw.as_str())
            .collect::<Vec<_>>();
        assert_eq!(inline, vec!["``MyKit/Foo``", "doc:Advanced"]);

        assert_eq!(doc.markup.topics.len(), 1);
        assert_eq!(doc.markup.topics[0].title, "Essentials");
        let curated = doc
            .markup
            .curated_references()
            .map(|reference| reference.link.form)
            .collect::<Vec<_>>();
        assert_eq!(curated, vec![LinkForm::Symbol, LinkForm::DocPath]);
        assert_eq!(doc.markup.topics[0].references[0].location, Some((13, 3)));

        assert_eq!(doc.markup.see_also.len(), 1);
        assert_eq!(doc.markup.see_also[0].references[0].link.path, "Bar");
    }

    #[test]
    fn test_documentation_extension() {
        let doc = analyze(
            "Foo.md",
            "# ``MyKit/Foo``\n\nAn extended abstract.\n\n@AlternateRepresentation(``MyKit/Bar``)\n",
        );
        assert_eq!(doc.kind, DocumentKind::DocumentationExtension);
        let target = doc.extension_target.unwrap();
        assert_eq!(target.path, "MyKit/Foo");
        assert_eq!(doc.title, "MyKit/Foo");
        assert_eq!(
            doc.markup.abstract_text.as_deref(),
            Some("An extended abstract.")
        );
        assert_eq!(doc.alternate_representations.len(), 1);
        assert_eq!(doc.alternate_representations[0].link.path, "MyKit/Bar");
    }

    #[test]
    fn test_heading_with_text_is_not_an_extension() {
        let doc = analyze("Using.md", "# Using ``Foo``\n\nBody.\n");
        assert_eq!(doc.kind, DocumentKind::Article);
        assert_eq!(doc.title, "Using Foo");
        assert!(doc.extension_target.is_none());
    }

    #[test]
    fn test_tutorial_documents() {
        let toc = analyze(
            "MyKitTutorials.tutorial",
            "@Tutorials(name: \"MyKit Tutorials\") {\n\
             \x20\x20@Chapter(name: \"Basics\") {\n\
             \x20\x20\x20\x20@TutorialReference(tutorial: \"doc:BuildingAnApp\")\n\
             \x20\x20}\n\
             }\n",
        );
        assert_eq!(toc.kind, DocumentKind::TutorialTableOfContents);
        assert_eq!(toc.title, "MyKit Tutorials");
        assert_eq!(toc.tutorial_references.len(), 1);
        assert_eq!(toc.tutorial_references[0].link.path, "BuildingAnApp");
        assert_eq!(toc.tutorial_references[0].location, Some((3, 1)));

        let tutorial = analyze(
            "BuildingAnApp.tutorial",
            "@Tutorial(time: 20) {\n\
             \x20\x20@Intro(title: \"Building an App\") {\n\
             \x20\x20\x20\x20Make something.\n\
             \x20\x20}\n\
             }\n",
        );
        assert_eq!(tutorial.kind, DocumentKind::Tutorial);
        assert_eq!(tutorial.title, "Building an App");
        assert_eq!(tutorial.name, "BuildingAnApp");
    }

    #[test]
    fn test_technology_root_and_fenced_directives() {
        let root = analyze(
            "MyKit.md",
            "# MyKit\n\n@Metadata {\n  @TechnologyRoot\n}\n\nAll about MyKit.\n",
        );
        assert_eq!(root.kind, DocumentKind::TechnologyRoot);
        assert_eq!(root.markup.abstract_text.as_deref(), Some("All about MyKit."));

        let article = analyze(
            "Directives.md",
            "# Directives\n\n```\n@TechnologyRoot\n```\n",
        );
        assert_eq!(article.kind, DocumentKind::Article);
    }

    #[test]
    fn test_missing_title() {
        let result = analyze_document(&DocumentSource::new("Empty.md", "Just text.\n"));
        assert_eq!(
            result,
            Err(AnalysisError::MissingTitle {
                path: "Empty.md".to_string()
            })
        );
    }

    #[test]
    fn test_doc_comment() {
        let markup = analyze_doc_comment(
            "Creates a value.\n\n## Topics\n\n- ``value()``\n\nSee ``Bar``.\n",
        );
        assert_eq!(markup.abstract_text.as_deref(), Some("Creates a value."));
        assert_eq!(markup.curated_references().count(), 1);
        assert_eq!(markup.links.len(), 1);
    }

    #[test]
    fn test_line_column() {
        let content = "ab\ncd\nef";
        assert_eq!(line_column(content, 0), (1, 1));
        assert_eq!(line_column(content, 4), (2, 2));
        assert_eq!(line_column(content, 6), (3, 1));
    }
}
