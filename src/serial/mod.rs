//! Serialization.
//!
//! [`serialize`] writes any node back to markup in a chosen charset.
//! Characters the charset cannot hold never fail the write: in text and
//! attribute values they become decimal character references, in markup
//! they become `?`.
//!
//! # Examples
//!
//! ```
//! use tagmend::serial::{serialize, SerializeOptions};
//! use tagmend::tree::Node;
//!
//! let doc = Node::from(tagmend::parse_xml("<p>caf\u{e9} &amp; cr\u{e8}me</p>").unwrap());
//! let bytes = serialize(&doc, &SerializeOptions::default().charset("US-ASCII")).unwrap();
//! assert_eq!(bytes, b"<p>caf&#233; &amp; cr&#232;me</p>");
//! ```

mod html;
mod xml;

use crate::encoding::{Charset, Encoder};
use crate::error::Result;
use crate::tree::Node;

/// Options controlling serialization output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializeOptions {
    /// Output charset label (default: `UTF-8`).
    pub charset: String,
    /// Write HTML: the XHTML namespace is implied, `EMPTY` elements are bare
    /// start tags, and `script`/`style` bodies are unescaped.
    pub html_output: bool,
    /// Prefix an XML declaration naming the minimal sufficient charset.
    /// Declarations in the tree are then dropped.
    pub xml_declaration: bool,
    /// Reuse the recorded source text of parsed constructs.
    pub preserve_raw: bool,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            charset: "UTF-8".to_string(),
            html_output: false,
            xml_declaration: false,
            preserve_raw: false,
        }
    }
}

impl SerializeOptions {
    /// Sets the output charset label.
    #[must_use]
    pub fn charset(mut self, label: &str) -> Self {
        self.charset = label.to_string();
        self
    }

    /// Enables or disables HTML output.
    #[must_use]
    pub fn html_output(mut self, yes: bool) -> Self {
        self.html_output = yes;
        self
    }

    /// Enables or disables the synthesized XML declaration.
    #[must_use]
    pub fn xml_declaration(mut self, yes: bool) -> Self {
        self.xml_declaration = yes;
        self
    }

    /// Enables or disables reuse of recorded source text.
    #[must_use]
    pub fn preserve_raw(mut self, yes: bool) -> Self {
        self.preserve_raw = yes;
        self
    }
}

/// Serializes a node to bytes in `options.charset`.
///
/// # Errors
///
/// Returns [`Error::UnsupportedCharset`](crate::Error::UnsupportedCharset)
/// if no encoder exists for the charset label.
pub fn serialize(node: &Node, options: &SerializeOptions) -> Result<Vec<u8>> {
    let encoder = Encoder::for_label(&options.charset)?;
    let bytes = write(encoder, node, options);
    log::debug!("serialized {} bytes as {}", bytes.len(), options.charset);
    Ok(bytes)
}

/// Serializes a node to a UTF-8 string, ignoring `options.charset`.
///
/// ```
/// use tagmend::serial::{serialize_to_string, SerializeOptions};
/// use tagmend::tree::Node;
///
/// let doc = Node::from(tagmend::parse("<html><br><p></p></html>").unwrap());
/// let html = serialize_to_string(&doc, &SerializeOptions::default().html_output(true));
/// assert_eq!(html, "<html><br><p></p></html>");
/// ```
#[must_use]
pub fn serialize_to_string(node: &Node, options: &SerializeOptions) -> String {
    let bytes = write(Encoder::new(Charset::utf8()), node, options);
    String::from_utf8(bytes).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}

fn write(encoder: Encoder, node: &Node, options: &SerializeOptions) -> Vec<u8> {
    let mut writer = xml::Writer::new(encoder, options);
    writer.write(node);
    writer.finish()
}
