//! Tolerant markup parser.
//!
//! Parsing runs in four passes over a decoded string:
//!
//! 1. **Tokenizing** splits the input into tags, comments, declarations and
//!    text, and decides whether the document is XML, HTML, or both. Anything
//!    that fails every tag grammar is kept as text.
//! 2. **Reducing** pairs start and end tags over the whole open stack. End
//!    tags that close nothing become bogus end tags; elements never closed
//!    stay open to the end of their parent.
//! 3. **Structure fixing** applies the HTML content models to elements
//!    without end tags, so `<p>a<p>b` yields siblings. XML input matches
//!    the model names case-sensitively.
//! 4. **Building** turns the balanced skeleton into [`Node`]s, resolving
//!    namespaces and validating each construct.
//!
//! Every pass is iterative. Nesting depth is limited by
//! [`ParseOptions::max_depth`].
//!
//! [`Node`]: crate::tree::Node

mod builder;
mod grammar;
pub(crate) mod input;
mod reducer;
mod tokenizer;

use std::sync::Arc;

use crate::encoding::Charset;
use crate::error::{ParseDiagnostic, Result};
use crate::namespace::Context;
use crate::tree::Document;
use crate::util::intern::Interner;

use builder::Builder;
use input::{LineIndex, DEFAULT_MAX_DEPTH};

/// Parse options.
///
/// ```
/// use tagmend::parser::ParseOptions;
///
/// let opts = ParseOptions::default().force_xml(true).max_depth(64);
/// assert!(opts.force_xml);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    /// Maximum element nesting depth (default: 1024).
    pub max_depth: usize,
    /// Treat the input as XML regardless of what it looks like.
    pub force_xml: bool,
    /// Characters this charset cannot encode stay as character references
    /// in text (default: UTF-8, so every reference is decoded).
    pub internal_charset: Charset,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            force_xml: false,
            internal_charset: Charset::utf8(),
        }
    }
}

impl ParseOptions {
    /// Sets the maximum element nesting depth.
    #[must_use]
    pub fn max_depth(mut self, max: usize) -> Self {
        self.max_depth = max;
        self
    }

    /// Forces XML mode.
    #[must_use]
    pub fn force_xml(mut self, yes: bool) -> Self {
        self.force_xml = yes;
        self
    }

    /// Sets the internal charset for character reference normalization.
    #[must_use]
    pub fn internal_charset(mut self, charset: Charset) -> Self {
        self.internal_charset = charset;
        self
    }
}

/// A parsed document with what the parser learned along the way.
#[derive(Debug, Clone)]
pub struct Parsed {
    /// The document tree.
    pub document: Document,
    /// Whether the input was treated as XML.
    pub is_xml: bool,
    /// Whether the input was recognised as HTML.
    pub is_html: bool,
    /// Repairs made while balancing tags, in source order.
    pub diagnostics: Vec<ParseDiagnostic>,
}

/// Parses markup with default options.
///
/// ```
/// let doc = tagmend::parse("<p>one<p>two").unwrap();
/// assert_eq!(doc.children().len(), 2);
/// ```
///
/// # Errors
///
/// See [`parse_with_options`].
pub fn parse(text: &str) -> Result<Document> {
    parse_with_options(text, &ParseOptions::default(), &mut Interner::new()).map(|p| p.document)
}

/// Parses markup in XML mode: names keep their case and no HTML structure
/// rules apply.
///
/// # Errors
///
/// See [`parse_with_options`].
pub fn parse_xml(text: &str) -> Result<Document> {
    let options = ParseOptions::default().force_xml(true);
    parse_with_options(text, &options, &mut Interner::new()).map(|p| p.document)
}

/// Parses markup, sharing names and namespace contexts through `interner`.
///
/// Unbalanced tags never fail a parse; they are repaired and reported in
/// [`Parsed::diagnostics`].
///
/// # Errors
///
/// - [`Error::MalformedConstruct`] for a comment, processing instruction,
///   declaration or document type that violates its grammar.
/// - [`Error::UnrecognizedConstruct`] for a start tag that no tag grammar
///   accepts as a whole.
/// - Namespace errors from [`StartTag::build`].
/// - [`Error::DepthExceeded`] when elements nest deeper than
///   [`ParseOptions::max_depth`].
///
/// [`Error::MalformedConstruct`]: crate::Error::MalformedConstruct
/// [`Error::UnrecognizedConstruct`]: crate::Error::UnrecognizedConstruct
/// [`Error::DepthExceeded`]: crate::Error::DepthExceeded
/// [`StartTag::build`]: crate::tree::StartTag::build
pub fn parse_with_options(
    text: &str,
    options: &ParseOptions,
    interner: &mut Interner,
) -> Result<Parsed> {
    let tokens = tokenizer::tokenize(text, options.force_xml);
    let index = LineIndex::new(text);
    let mut diagnostics = Vec::new();
    let mut skeleton = reducer::reduce(&tokens, &index, &mut diagnostics);
    reducer::fix_structure(&mut skeleton, tokens.is_xml, &index, &mut diagnostics);
    log::debug!(
        "parsed {} tokens (xml: {}, html: {}, {} repairs)",
        tokens.tokens.len(),
        tokens.is_xml,
        tokens.is_html,
        diagnostics.len()
    );

    let context = if tokens.is_html {
        Context::html()
    } else {
        Context::new()
    };
    let mut builder = Builder {
        source: Arc::from(text),
        index: &index,
        internal: options.internal_charset,
        is_xml: tokens.is_xml,
        fold_case: !tokens.is_xml && tokens.is_html,
        max_depth: options.max_depth,
        interner,
    };
    let document = builder.build(&skeleton, context)?;
    Ok(Parsed {
        document,
        is_xml: tokens.is_xml,
        is_html: tokens.is_html,
        diagnostics,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::{ConstructKind, Error};
    use crate::tree::Node;

    fn names(doc: &Document) -> Vec<String> {
        doc.children()
            .iter()
            .flat_map(Node::descendants)
            .filter_map(Node::as_element)
            .map(|e| e.name().qualified_name())
            .collect()
    }

    #[test]
    fn test_html_detection_and_namespace() {
        let parsed = parse_with_options(
            "<HTML><Body>x</Body></HTML>",
            &ParseOptions::default(),
            &mut Interner::new(),
        )
        .unwrap();
        assert!(parsed.is_html);
        assert!(!parsed.is_xml);
        let root = parsed.document.root().unwrap();
        assert_eq!(root.name().qualified_name(), "html");
        assert_eq!(root.name().namespace_uri(), Some("http://www.w3.org/1999/xhtml"));
    }

    #[test]
    fn test_xml_keeps_case() {
        let doc = parse_xml("<Root><Child/></Root>").unwrap();
        assert_eq!(names(&doc), ["Root", "Child"]);
    }

    #[test]
    fn test_xml_declaration_switches_mode() {
        let parsed = parse_with_options(
            "<?xml version=\"1.0\"?><p>a<p>b</p></p>",
            &ParseOptions::default(),
            &mut Interner::new(),
        )
        .unwrap();
        assert!(parsed.is_xml);
        assert!(parsed.document.has_xml_declaration());
        let p = parsed.document.root().unwrap();
        assert_eq!(p.children().len(), 2);
    }

    #[test]
    fn test_paragraphs_become_siblings() {
        let doc = parse("<body><p>one<p>two</body>").unwrap();
        let body = doc.root().unwrap();
        assert_eq!(body.children().len(), 2);
    }

    #[test]
    fn test_diagnostics_report_repairs() {
        let parsed = parse_with_options(
            "<div>x</span></div>",
            &ParseOptions::default(),
            &mut Interner::new(),
        )
        .unwrap();
        assert_eq!(parsed.diagnostics.len(), 1);
        assert_eq!(parsed.diagnostics[0].location.column, 7);
        let div = parsed.document.root().unwrap();
        assert!(matches!(div.children()[1], Node::BogusEndTag(_)));
    }

    #[test]
    fn test_bad_comment_is_an_error_with_location() {
        let err = parse("a\n<!-- x -- y -->").unwrap_err();
        match err {
            Error::MalformedConstruct {
                kind: ConstructKind::Comment,
                location: Some(loc),
                ..
            } => assert_eq!((loc.line, loc.column), (2, 1)),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_bad_xml_declaration() {
        assert!(matches!(
            parse("<?xml encoding=\"UTF-8\"?><a/>"),
            Err(Error::MalformedConstruct {
                kind: ConstructKind::XmlDeclaration,
                ..
            })
        ));
    }

    #[test]
    fn test_depth_limit() {
        let deep = "<d>".repeat(20);
        let options = ParseOptions::default().max_depth(10).force_xml(true);
        assert!(matches!(
            parse_with_options(&deep, &options, &mut Interner::new()),
            Err(Error::DepthExceeded { limit: 10 })
        ));
        let options = ParseOptions::default().max_depth(20).force_xml(true);
        assert!(parse_with_options(&deep, &options, &mut Interner::new()).is_ok());
    }

    #[test]
    fn test_omitted_attribute_name() {
        let doc = parse("<html><input type=checkbox checked></html>").unwrap();
        let input = Node::from(doc).find_element(&["input"]).cloned().unwrap();
        assert_eq!(input.attribute_value("checked").as_deref(), Some("checked"));
    }

    #[test]
    fn test_script_body_is_literal() {
        let doc = parse("<script>if (a < b) { x = '</p>'; }</script>").unwrap();
        let script = doc.root().unwrap();
        assert_eq!(
            script.children()[0].as_text().unwrap().to_plain_string(),
            "if (a < b) { x = '</p>'; }"
        );
    }

    #[test]
    fn test_doctype_root_downcased() {
        let doc = parse("<!DOCTYPE HTML><html></html>").unwrap();
        match &doc.children()[0] {
            Node::DocType(dt) => assert_eq!(dt.root_element_name(), "html"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_interner_shares_names() {
        let mut interner = Interner::new();
        let a = parse_with_options("<a/>", &ParseOptions::default(), &mut interner).unwrap();
        let b = parse_with_options("<a/>", &ParseOptions::default(), &mut interner).unwrap();
        assert_eq!(a.document, b.document);
        assert!(!interner.is_empty());
    }
}
