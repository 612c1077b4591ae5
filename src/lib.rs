//! # tagmend
//!
//! Tolerant HTML/XML ingestion. `tagmend` turns arbitrary, possibly
//! malformed markup into a well-formed, immutable document tree, edits that
//! tree through addressable locations, and serializes it back in any
//! charset without ever failing on an unrepresentable character.
//!
//! - Tag balancing never fails: stray end tags are kept as
//!   [`BogusEndTag`](tree::BogusEndTag) nodes and unclosed elements are
//!   closed, guided by HTML content models for non-XML input.
//! - Malformed individual constructs (a comment containing `--`, a broken
//!   XML declaration) are rejected with [`Error::MalformedConstruct`].
//! - Trees are persistent: edits return a new tree sharing every untouched
//!   subtree with the old one.
//!
//! ## Quick Start
//!
//! ```
//! use tagmend::serial::{serialize_to_string, SerializeOptions};
//! use tagmend::tree::{Location, Node, Step};
//!
//! let doc = tagmend::parse("<html><title>Hi</title><p>one<p>two</html>").unwrap();
//! assert_eq!(doc.title().unwrap().to_plain_string(), "Hi");
//!
//! let top = Location::new(Node::from(doc));
//! let second = top.get_subnode(Step::Child(0)).get_subnode(Step::Child(2));
//! assert_eq!(second.path(), "doc()/html/p[2]");
//!
//! let edited = second.subst_itself(Node::from("2")).unwrap();
//! let html = serialize_to_string(
//!     edited.top().node().unwrap(),
//!     &SerializeOptions::default().html_output(true),
//! );
//! assert_eq!(html, "<html><title>Hi</title><p>one</p>2</html>");
//! ```

pub mod encoding;
pub mod error;
pub mod html;
pub mod namespace;
pub mod parser;
pub mod serial;
pub mod tree;
pub mod util;

pub use error::{Error, Result};
pub use namespace::{Context, Name};
pub use parser::{parse, parse_with_options, parse_xml, ParseOptions, Parsed};
pub use serial::{serialize, serialize_to_string, SerializeOptions};
pub use tree::{Document, Element, Node, Text};
pub use util::intern::Interner;
