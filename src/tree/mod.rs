//! Persistent document tree.
//!
//! Nodes are immutable and shared through [`Arc`]. An edit never changes a
//! node in place: it builds new nodes along the edited paths and shares every
//! untouched subtree with the original, which stays valid and unchanged.
//!
//! Nodes built by the parser remember the slice of input they came from
//! ([`RawSpan`]) so the serializer can reproduce unchanged constructs
//! exactly. Rebuilt nodes carry no span.
//!
//! # Examples
//!
//! ```
//! use tagmend::tree::{Node, Replacement, Step};
//!
//! let doc = Node::from(tagmend::parse("<p>a<b>b</b></p>").unwrap());
//! let edited = doc
//!     .subst(vec![(vec![Step::Child(0), Step::Child(1)], Replacement::Delete)])
//!     .unwrap();
//! assert_eq!(edited.extract_text().to_plain_string(), "a");
//! assert_eq!(doc.extract_text().to_plain_string(), "ab");
//! ```

mod element;
mod location;
mod node;
mod subst;
mod text;
mod traverse;

pub use element::{Element, NameArg, StartTag};
pub use location::Location;
pub use node::{BogusEndTag, Comment, DocType, ProcIns, RawSpan, XmlDecl};
pub use subst::{Replacement, Step};
pub use text::Text;
pub use traverse::Descendants;

use std::sync::Arc;

use crate::error::{Error, Result};
use element::{check_children, splice_children};

/// Any node of the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// A whole document.
    Document(Arc<Document>),
    /// An element.
    Element(Arc<Element>),
    /// Character data.
    Text(Text),
    /// A comment.
    Comment(Arc<Comment>),
    /// A processing instruction.
    ProcIns(Arc<ProcIns>),
    /// A document type declaration.
    DocType(Arc<DocType>),
    /// An XML declaration.
    XmlDecl(Arc<XmlDecl>),
    /// An end tag that matched no open element.
    BogusEndTag(Arc<BogusEndTag>),
}

impl Node {
    /// Child nodes; empty for leaves.
    #[must_use]
    pub fn children(&self) -> &[Node] {
        match self {
            Self::Document(d) => &d.children,
            Self::Element(e) => e.children(),
            _ => &[],
        }
    }

    /// The element, if this is one.
    #[must_use]
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Self::Element(e) => Some(e),
            _ => None,
        }
    }

    /// The text, if this is text.
    #[must_use]
    pub fn as_text(&self) -> Option<&Text> {
        match self {
            Self::Text(t) => Some(t),
            _ => None,
        }
    }

    /// All character data below this node, in document order.
    #[must_use]
    pub fn extract_text(&self) -> Text {
        Text::concat(self.traverse_text())
    }

    /// The node one step down: a child by index, or an attribute value.
    #[must_use]
    pub fn subnode(&self, step: &Step) -> Option<Node> {
        match step {
            Step::Child(i) => usize::try_from(*i)
                .ok()
                .and_then(|i| self.children().get(i))
                .cloned(),
            Step::Attribute(name) => self.as_element().and_then(|e| {
                e.stag()
                    .attributes()
                    .iter()
                    .find(|(n, _)| n.universal_eq(name))
                    .map(|(_, v)| Node::Text(v.clone()))
            }),
        }
    }

    /// Applies one level of substitutions to a document or element.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidSubstitution`] for leaves, and as described for
    /// [`Element::subst_subnode`] and [`Document::subst_subnode`].
    pub fn subst_subnode(&self, pairs: Vec<(Step, Replacement)>) -> Result<Node> {
        match self {
            Self::Document(d) => Ok(Self::from(d.subst_subnode(pairs)?)),
            Self::Element(e) => Ok(Self::from(e.subst_subnode(pairs)?)),
            _ => Err(Error::InvalidSubstitution {
                reason: "cannot address beneath a leaf node".to_string(),
            }),
        }
    }
}

impl From<Document> for Node {
    fn from(d: Document) -> Self {
        Self::Document(Arc::new(d))
    }
}

impl From<Element> for Node {
    fn from(e: Element) -> Self {
        Self::Element(Arc::new(e))
    }
}

impl From<Text> for Node {
    fn from(t: Text) -> Self {
        Self::Text(t)
    }
}

impl From<&str> for Node {
    fn from(plain: &str) -> Self {
        Self::Text(Text::new(plain))
    }
}

impl From<Comment> for Node {
    fn from(c: Comment) -> Self {
        Self::Comment(Arc::new(c))
    }
}

impl From<ProcIns> for Node {
    fn from(p: ProcIns) -> Self {
        Self::ProcIns(Arc::new(p))
    }
}

impl From<DocType> for Node {
    fn from(d: DocType) -> Self {
        Self::DocType(Arc::new(d))
    }
}

impl From<XmlDecl> for Node {
    fn from(x: XmlDecl) -> Self {
        Self::XmlDecl(Arc::new(x))
    }
}

impl From<BogusEndTag> for Node {
    fn from(b: BogusEndTag) -> Self {
        Self::BogusEndTag(Arc::new(b))
    }
}

/// A document: the top of a parsed tree.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Document {
    children: Vec<Node>,
}

impl Document {
    /// Creates a document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSubstitution`] if a child is itself a
    /// document.
    pub fn new(children: Vec<Node>) -> Result<Self> {
        check_children(&children)?;
        Ok(Self { children })
    }

    /// The top-level nodes.
    #[must_use]
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// The first top-level element.
    #[must_use]
    pub fn root(&self) -> Option<&Element> {
        self.children.iter().find_map(Node::as_element)
    }

    /// The text of the first `title` element, in any namespace.
    #[must_use]
    pub fn title(&self) -> Option<Text> {
        self.children
            .iter()
            .flat_map(Node::descendants)
            .filter_map(Node::as_element)
            .find(|e| e.name().local_name() == Some("title"))
            .map(|e| Text::concat(e.children().iter().flat_map(Node::traverse_text)))
    }

    /// Returns `true` if an XML declaration appears at the top level.
    #[must_use]
    pub fn has_xml_declaration(&self) -> bool {
        self.children.iter().any(|c| matches!(c, Node::XmlDecl(_)))
    }

    /// Applies one level of child substitutions.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidSubstitution`] for attribute steps, and for
    /// replacements that are documents.
    pub fn subst_subnode(&self, pairs: Vec<(Step, Replacement)>) -> Result<Self> {
        let mut edits = Vec::with_capacity(pairs.len());
        for (step, replacement) in pairs {
            match step {
                Step::Child(i) => edits.push((i, replacement)),
                Step::Attribute(name) => {
                    return Err(Error::InvalidSubstitution {
                        reason: format!("a document has no attribute {name}"),
                    })
                }
            }
        }
        Self::new(splice_children(&self.children, edits))
    }
}
