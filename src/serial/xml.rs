//! Tree writer.
//!
//! Walks a tree with an explicit stack and writes it through an
//! [`Encoder`]: markup with [`Encoder::output_string`], character data with
//! [`Encoder::output_text`].

use super::html::{empty_form, raw_empty_tag_fits, raw_text_body, EmptyForm};
use super::SerializeOptions;
use crate::encoding::reference::escape_ampersands;
use crate::encoding::Encoder;
use crate::namespace::{Context, XHTML_NAMESPACE};
use crate::tree::{DocType, Element, Node, ProcIns, Text, XmlDecl};

/// Escapes normalized text for output.
///
/// The stored `&#38;` is written as `&amp;`; every other reference in
/// normalized text is already well formed and passes through.
pub(super) fn escape(normalized: &str, attribute: bool) -> String {
    let mut out = String::with_capacity(normalized.len() + 8);
    let mut rest = normalized;
    while let Some(c) = rest.chars().next() {
        if let Some(after) = rest.strip_prefix("&#38;") {
            out.push_str("&amp;");
            rest = after;
            continue;
        }
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(c),
        }
        rest = &rest[c.len_utf8()..];
    }
    out
}

enum Work<'a> {
    Node(&'a Node, &'a Context),
    Close(&'a Element),
}

pub(super) struct Writer<'o> {
    enc: Encoder,
    options: &'o SerializeOptions,
    prolog_written: bool,
}

impl<'o> Writer<'o> {
    pub(super) fn new(enc: Encoder, options: &'o SerializeOptions) -> Self {
        Self {
            enc,
            options,
            prolog_written: false,
        }
    }

    pub(super) fn finish(self) -> Vec<u8> {
        if self.options.xml_declaration {
            self.enc.finish_with_xmldecl()
        } else {
            self.enc.finish()
        }
    }

    pub(super) fn write(&mut self, node: &Node) {
        let base = if self.options.html_output {
            Context::html()
        } else {
            Context::new()
        };
        let mut stack = vec![Work::Node(node, &base)];
        while let Some(work) = stack.pop() {
            match work {
                Work::Close(element) => self.close(element),
                Work::Node(node, inherited) => match node {
                    Node::Document(doc) => {
                        stack.extend(doc.children().iter().rev().map(|c| Work::Node(c, inherited)));
                    }
                    Node::Element(element) => {
                        if self.open(element, inherited) {
                            stack.push(Work::Close(element));
                            let context = element.context();
                            stack.extend(
                                element.children().iter().rev().map(|c| Work::Node(c, context)),
                            );
                        }
                    }
                    Node::Text(text) => self.text(text),
                    Node::Comment(comment) => match (&comment.raw, self.options.preserve_raw) {
                        (Some(raw), true) => self.enc.output_string(raw.as_str()),
                        _ => {
                            self.enc.output_string("<!--");
                            self.enc.output_string(comment.content());
                            self.enc.output_string("-->");
                        }
                    },
                    Node::ProcIns(pi) => self.proc_ins(pi),
                    Node::DocType(doctype) => self.doctype(doctype),
                    Node::XmlDecl(decl) => self.xml_decl(decl),
                    Node::BogusEndTag(_) => {}
                },
            }
        }
    }

    fn text(&mut self, text: &Text) {
        match (text.raw(), self.options.preserve_raw) {
            (Some(raw), true) => self.enc.output_text(raw.as_str()),
            _ => self.enc.output_text(&escape(text.as_normalized(), false)),
        }
    }

    /// Writes a start tag and, for elements written whole here, everything
    /// else. Returns `true` if children and an end tag still have to follow.
    fn open(&mut self, element: &Element, inherited: &Context) -> bool {
        let html = self.options.html_output;
        let raw = element
            .stag()
            .raw
            .as_ref()
            .filter(|_| self.options.preserve_raw)
            .map(|r| r.as_str())
            .filter(|r| !element.is_empty() || raw_empty_tag_fits(element, r, html));
        if let Some(raw) = raw {
            self.enc.output_text(raw);
            if element.is_empty() {
                return false;
            }
        } else {
            self.start_tag(element, inherited);
            if element.is_empty() {
                match empty_form(element, html) {
                    EmptyForm::SelfClosing => self.enc.output_string("/>"),
                    EmptyForm::Void => self.enc.output_string(">"),
                    EmptyForm::Pair => {
                        self.enc.output_string(">");
                        self.end_tag(element);
                    }
                }
                return false;
            }
            self.enc.output_string(">");
        }
        if html {
            if let Some(body) = raw_text_body(element) {
                self.enc.output_text(&body);
                self.close(element);
                return false;
            }
        }
        true
    }

    /// `<name attr="v" xmlns:p="uri"`, without the closing `>`.
    fn start_tag(&mut self, element: &Element, inherited: &Context) {
        self.enc.output_string("<");
        self.enc.output_string(&element.name().qualified_name());
        for (name, value) in element.stag().attributes() {
            if name.is_xmlns() {
                continue;
            }
            self.enc.output_string(" ");
            self.enc.output_string(&name.qualified_name());
            self.enc.output_string("=\"");
            self.enc.output_text(&escape(value.as_normalized(), true));
            self.enc.output_string("\"");
        }
        let inherited_default = inherited.namespace_uri(None).unwrap_or("");
        let implied = self.options.html_output && inherited_default == XHTML_NAMESPACE;
        for (prefix, uri) in element.context().namespaces() {
            if inherited.namespace_uri(prefix).unwrap_or("") == uri
                || (prefix.is_none() && uri.is_empty() && implied)
            {
                continue;
            }
            self.enc.output_string(" xmlns");
            if let Some(prefix) = prefix {
                self.enc.output_string(":");
                self.enc.output_string(prefix);
            }
            self.enc.output_string("=\"");
            self.enc.output_text(&escape(&escape_ampersands(uri), true));
            self.enc.output_string("\"");
        }
        if element.context().namespace_uri(None).is_none()
            && !inherited_default.is_empty()
            && !implied
        {
            self.enc.output_string(" xmlns=\"\"");
        }
    }

    fn end_tag(&mut self, element: &Element) {
        self.enc.output_string("</");
        self.enc.output_string(&element.name().qualified_name());
        self.enc.output_string(">");
    }

    fn close(&mut self, element: &Element) {
        match (&element.etag, self.options.preserve_raw) {
            (Some(raw), true) => self.enc.output_string(raw.as_str()),
            _ => self.end_tag(element),
        }
    }

    fn proc_ins(&mut self, pi: &ProcIns) {
        if let (Some(raw), true) = (&pi.raw, self.options.preserve_raw) {
            self.enc.output_string(raw.as_str());
            return;
        }
        self.enc.output_string("<?");
        self.enc.output_string(pi.target());
        if !pi.content().is_empty() {
            self.enc.output_string(" ");
            self.enc.output_string(pi.content());
        }
        self.enc.output_string("?>");
    }

    fn doctype(&mut self, doctype: &DocType) {
        if let (Some(raw), true) = (&doctype.raw, self.options.preserve_raw) {
            self.enc.output_string(raw.as_str());
            return;
        }
        self.enc.output_string("<!DOCTYPE ");
        self.enc.output_string(doctype.root_element_name());
        match (doctype.public_identifier(), doctype.system_identifier()) {
            (Some(public), system) => {
                self.enc.output_string(" PUBLIC \"");
                self.enc.output_string(public);
                self.enc.output_string("\"");
                if let Some(system) = system {
                    self.system_literal(system);
                }
            }
            (None, Some(system)) => {
                self.enc.output_string(" SYSTEM");
                self.system_literal(system);
            }
            (None, None) => {}
        }
        self.enc.output_string(">");
    }

    fn system_literal(&mut self, system: &str) {
        let quote = if system.contains('"') { "'" } else { "\"" };
        self.enc.output_string(" ");
        self.enc.output_string(quote);
        self.enc.output_string(system);
        self.enc.output_string(quote);
    }

    /// The first declaration becomes the prolog; later ones and all of them
    /// under a synthesized declaration are dropped.
    fn xml_decl(&mut self, decl: &XmlDecl) {
        if self.prolog_written || self.options.xml_declaration {
            return;
        }
        self.prolog_written = true;
        self.enc.output_string("<?xml version=\"");
        self.enc.output_string(decl.version());
        self.enc.output_string("\"");
        if decl.encoding().is_some() {
            let name = self.enc.charset().name();
            self.enc.output_string(" encoding=\"");
            self.enc.output_string(name);
            self.enc.output_string("\"");
        }
        if let Some(standalone) = decl.standalone() {
            self.enc.output_string(" standalone=\"");
            self.enc.output_string(if standalone { "yes" } else { "no" });
            self.enc.output_string("\"");
        }
        self.enc.output_string("?>");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_text() {
        assert_eq!(escape("A &#38; B", false), "A &amp; B");
        assert_eq!(escape("1 < 2 > 0", false), "1 &lt; 2 &gt; 0");
        assert_eq!(escape("say \"hi\"", false), "say \"hi\"");
        assert_eq!(escape("say \"hi\"", true), "say &quot;hi&quot;");
        assert_eq!(escape("&#233;", false), "&#233;");
    }
}
