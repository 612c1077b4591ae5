//! Leaf node types and raw source spans.
//!
//! Each leaf validates its fields on construction and rejects invalid syntax
//! with [`Error::MalformedConstruct`].

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use crate::error::{ConstructKind, Error, Result};
use crate::parser::input::{is_pubid_char, is_valid_encoding_name, is_valid_version};
use crate::util::qname::is_name;

/// A slice of the parsed source, kept so unchanged constructs can be written
/// back byte for byte.
#[derive(Clone)]
pub struct RawSpan {
    source: Arc<str>,
    range: Range<usize>,
}

impl RawSpan {
    pub(crate) fn new(source: &Arc<str>, start: usize, end: usize) -> Self {
        Self {
            source: Arc::clone(source),
            range: start..end,
        }
    }

    /// The original text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source[self.range.clone()]
    }

    /// Byte offset of the span in the parsed input.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.range.start
    }
}

impl fmt::Debug for RawSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RawSpan({:?} @ {})", self.as_str(), self.range.start)
    }
}

fn malformed(kind: ConstructKind, raw: String) -> Error {
    Error::MalformedConstruct {
        kind,
        raw,
        location: None,
    }
}

/// A comment, `<!--content-->`.
#[derive(Debug, Clone)]
pub struct Comment {
    content: String,
    pub(crate) raw: Option<RawSpan>,
}

impl Comment {
    /// Creates a comment.
    ///
    /// # Errors
    ///
    /// Fails if `content` contains `--` or ends with `-`.
    pub fn new(content: &str) -> Result<Self> {
        if content.contains("--") || content.ends_with('-') {
            return Err(malformed(ConstructKind::Comment, format!("<!--{content}-->")));
        }
        Ok(Self {
            content: content.to_string(),
            raw: None,
        })
    }

    /// The text between `<!--` and `-->`.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }
}

/// A processing instruction, `<?target content?>`.
#[derive(Debug, Clone)]
pub struct ProcIns {
    target: String,
    content: String,
    pub(crate) raw: Option<RawSpan>,
}

impl ProcIns {
    /// Creates a processing instruction.
    ///
    /// # Errors
    ///
    /// Fails if `target` is not a name or `content` contains `?>`.
    pub fn new(target: &str, content: &str) -> Result<Self> {
        if !is_name(target) || content.contains("?>") {
            return Err(malformed(
                ConstructKind::ProcessingInstruction,
                format!("<?{target} {content}?>"),
            ));
        }
        Ok(Self {
            target: target.to_string(),
            content: content.to_string(),
            raw: None,
        })
    }

    /// The target name.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Everything after the target and its separating whitespace.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }
}

/// A document type declaration.
#[derive(Debug, Clone)]
pub struct DocType {
    root_element_name: String,
    public_identifier: Option<String>,
    system_identifier: Option<String>,
    pub(crate) raw: Option<RawSpan>,
}

impl DocType {
    /// Creates a document type declaration.
    ///
    /// # Errors
    ///
    /// Fails if the root name is not a name, the public identifier holds a
    /// character outside `PubidChar`, or the system identifier contains both
    /// kinds of quote.
    pub fn new(
        root_element_name: &str,
        public_identifier: Option<&str>,
        system_identifier: Option<&str>,
    ) -> Result<Self> {
        let bad_public = public_identifier.is_some_and(|p| !p.chars().all(is_pubid_char));
        let bad_system = system_identifier.is_some_and(|s| s.contains('"') && s.contains('\''));
        if !is_name(root_element_name) || bad_public || bad_system {
            return Err(malformed(
                ConstructKind::DocType,
                format!(
                    "<!DOCTYPE {root_element_name} {} {}>",
                    public_identifier.unwrap_or_default(),
                    system_identifier.unwrap_or_default()
                ),
            ));
        }
        Ok(Self {
            root_element_name: root_element_name.to_string(),
            public_identifier: public_identifier.map(str::to_string),
            system_identifier: system_identifier.map(str::to_string),
            raw: None,
        })
    }

    /// The declared root element name.
    #[must_use]
    pub fn root_element_name(&self) -> &str {
        &self.root_element_name
    }

    /// The `PUBLIC` identifier.
    #[must_use]
    pub fn public_identifier(&self) -> Option<&str> {
        self.public_identifier.as_deref()
    }

    /// The system identifier.
    #[must_use]
    pub fn system_identifier(&self) -> Option<&str> {
        self.system_identifier.as_deref()
    }
}

/// An XML declaration, `<?xml version="1.0" ...?>`.
#[derive(Debug, Clone)]
pub struct XmlDecl {
    version: String,
    encoding: Option<String>,
    standalone: Option<bool>,
    pub(crate) raw: Option<RawSpan>,
}

impl XmlDecl {
    /// Creates an XML declaration.
    ///
    /// # Errors
    ///
    /// Fails if `version` is not `[A-Za-z0-9_.:-]+` or `encoding` is not
    /// `[A-Za-z][A-Za-z0-9._-]*`.
    pub fn new(version: &str, encoding: Option<&str>, standalone: Option<bool>) -> Result<Self> {
        if !is_valid_version(version) || encoding.is_some_and(|e| !is_valid_encoding_name(e)) {
            return Err(malformed(
                ConstructKind::XmlDeclaration,
                format!(
                    "<?xml version=\"{version}\" encoding=\"{}\"?>",
                    encoding.unwrap_or_default()
                ),
            ));
        }
        Ok(Self {
            version: version.to_string(),
            encoding: encoding.map(str::to_string),
            standalone,
            raw: None,
        })
    }

    /// The `version` pseudo-attribute.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// The `encoding` pseudo-attribute.
    #[must_use]
    pub fn encoding(&self) -> Option<&str> {
        self.encoding.as_deref()
    }

    /// The `standalone` pseudo-attribute.
    #[must_use]
    pub fn standalone(&self) -> Option<bool> {
        self.standalone
    }
}

/// An end tag that closed nothing. Kept in the tree, never serialized.
#[derive(Debug, Clone)]
pub struct BogusEndTag {
    qualified_name: String,
    pub(crate) raw: Option<RawSpan>,
}

impl BogusEndTag {
    /// Records a stray end tag.
    #[must_use]
    pub fn new(qualified_name: &str) -> Self {
        Self {
            qualified_name: qualified_name.to_string(),
            raw: None,
        }
    }

    /// The name the end tag carried.
    #[must_use]
    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }
}

macro_rules! structural_eq {
    ($ty:ty, $($field:ident),+) => {
        impl PartialEq for $ty {
            fn eq(&self, other: &Self) -> bool {
                $(self.$field == other.$field)&&+
            }
        }
        impl Eq for $ty {}
    };
}

structural_eq!(Comment, content);
structural_eq!(ProcIns, target, content);
structural_eq!(DocType, root_element_name, public_identifier, system_identifier);
structural_eq!(XmlDecl, version, encoding, standalone);
structural_eq!(BogusEndTag, qualified_name);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_comment_validation() {
        assert!(Comment::new(" ok ").is_ok());
        assert!(matches!(
            Comment::new("a--b"),
            Err(Error::MalformedConstruct {
                kind: ConstructKind::Comment,
                ..
            })
        ));
        assert!(Comment::new("trailing-").is_err());
    }

    #[test]
    fn test_proc_ins_validation() {
        assert!(ProcIns::new("php", "echo 1").is_ok());
        assert!(ProcIns::new("php", "a ?> b").is_err());
        assert!(ProcIns::new("1x", "").is_err());
    }

    #[test]
    fn test_doctype_validation() {
        assert!(DocType::new("html", Some("-//W3C//DTD HTML 4.01//EN"), None).is_ok());
        assert!(DocType::new("html", Some("bad{id}"), None).is_err());
        assert!(DocType::new("html", None, Some("a'b\"c")).is_err());
    }

    #[test]
    fn test_xml_decl_validation() {
        assert!(XmlDecl::new("1.0", Some("UTF-8"), Some(true)).is_ok());
        assert!(XmlDecl::new("1 0", None, None).is_err());
        assert!(XmlDecl::new("1.0", Some("8bit"), None).is_err());
    }

    #[test]
    fn test_raw_span() {
        let source: Arc<str> = Arc::from("abc<!--x-->def");
        let span = RawSpan::new(&source, 3, 11);
        assert_eq!(span.as_str(), "<!--x-->");
        assert_eq!(span.offset(), 3);
    }

    #[test]
    fn test_equality_ignores_raw() {
        let source: Arc<str> = Arc::from("<!--x-->");
        let mut parsed = Comment::new("x").unwrap();
        parsed.raw = Some(RawSpan::new(&source, 0, 8));
        assert_eq!(parsed, Comment::new("x").unwrap());
    }
}
