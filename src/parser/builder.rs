//! Turns a balanced skeleton into typed tree nodes.

use std::sync::Arc;

use super::grammar::{match_cdata, match_comment, match_doctype, match_proc_ins, match_xml_decl, parse_tag};
use super::input::{LineIndex, Scanner};
use super::reducer::{tag_name, Skel, Skeleton};
use super::tokenizer::{Token, TokenKind};
use crate::encoding::Charset;
use crate::error::{ConstructKind, Error, Result};
use crate::html::omitted_attribute_name;
use crate::namespace::Context;
use crate::tree::{
    BogusEndTag, Comment, DocType, Document, Element, NameArg, Node, ProcIns, RawSpan, StartTag,
    Text, XmlDecl,
};
use crate::util::intern::Interner;

pub(crate) struct Builder<'b> {
    pub source: Arc<str>,
    pub index: &'b LineIndex<'b>,
    pub internal: Charset,
    pub is_xml: bool,
    pub fold_case: bool,
    pub max_depth: usize,
    pub interner: &'b mut Interner,
}

struct Open<'k> {
    children: &'k [usize],
    next: usize,
    built: Vec<Node>,
    element: Option<(StartTag, Option<RawSpan>)>,
    context: Context,
}

/// `version`, `encoding` and `standalone` from the text between `<?xml`
/// and `?>`.
fn parse_xml_decl(body: &str) -> Option<(&str, Option<&str>, Option<bool>)> {
    fn pseudo_attr<'a>(s: &mut Scanner<'a>, name: &[u8]) -> Option<&'a str> {
        let saved = s.save_position();
        if s.skip_whitespace() && s.eat(name) {
            s.skip_whitespace();
            if s.eat(b"=") {
                s.skip_whitespace();
                if let Some(value) = s.quoted(|_| true) {
                    return Some(value);
                }
            }
        }
        s.restore_position(saved);
        None
    }
    let mut s = Scanner::new(body);
    let version = pseudo_attr(&mut s, b"version")?;
    let encoding = pseudo_attr(&mut s, b"encoding");
    let standalone = match pseudo_attr(&mut s, b"standalone") {
        Some("yes") => Some(true),
        Some("no") => Some(false),
        Some(_) => return None,
        None => None,
    };
    s.skip_whitespace();
    s.at_end().then_some((version, encoding, standalone))
}

impl Builder<'_> {
    fn span(&self, token: &Token<'_>) -> RawSpan {
        RawSpan::new(&self.source, token.offset, token.offset + token.raw.len())
    }

    /// Attaches the token's source location to construct errors.
    fn located(&self, error: Error, token: &Token<'_>) -> Error {
        let here = Some(self.index.locate(token.offset));
        match error {
            Error::MalformedConstruct {
                kind,
                location: None,
                ..
            } => Error::MalformedConstruct {
                kind,
                raw: token.raw.to_string(),
                location: here,
            },
            Error::UnrecognizedConstruct { location: None, .. } => Error::UnrecognizedConstruct {
                raw: token.raw.to_string(),
                location: here,
            },
            other => other,
        }
    }

    fn malformed(&self, kind: ConstructKind, token: &Token<'_>) -> Error {
        Error::MalformedConstruct {
            kind,
            raw: token.raw.to_string(),
            location: Some(self.index.locate(token.offset)),
        }
    }

    fn fold(&self, name: &str) -> String {
        if self.fold_case {
            name.to_ascii_lowercase()
        } else {
            name.to_string()
        }
    }

    fn leaf(&self, token: &Token<'_>) -> Result<Node> {
        let span = self.span(token);
        let node = match token.kind {
            TokenKind::Text => Node::Text(Text::parse(token.raw, self.internal).with_raw(span)),
            TokenKind::RawText => Node::Text(Text::new(token.raw).with_raw(span)),
            TokenKind::CData => {
                let (body, _) = match_cdata(token.raw)
                    .ok_or_else(|| self.unrecognized(token))?;
                Node::Text(Text::new(body).with_raw(span))
            }
            TokenKind::Comment => {
                let (body, _) = match_comment(token.raw)
                    .ok_or_else(|| self.malformed(ConstructKind::Comment, token))?;
                let mut comment = Comment::new(body).map_err(|e| self.located(e, token))?;
                comment.raw = Some(span);
                Node::from(comment)
            }
            TokenKind::ProcIns => {
                let pi = match_proc_ins(token.raw)
                    .ok_or_else(|| self.malformed(ConstructKind::ProcessingInstruction, token))?;
                let mut pi = ProcIns::new(pi.target, pi.content).map_err(|e| self.located(e, token))?;
                pi.raw = Some(span);
                Node::from(pi)
            }
            TokenKind::XmlDecl => {
                let (version, encoding, standalone) = match_xml_decl(token.raw)
                    .and_then(|(body, _)| parse_xml_decl(body))
                    .ok_or_else(|| self.malformed(ConstructKind::XmlDeclaration, token))?;
                let mut decl =
                    XmlDecl::new(version, encoding, standalone).map_err(|e| self.located(e, token))?;
                decl.raw = Some(span);
                Node::from(decl)
            }
            TokenKind::DocType => {
                let dt = match_doctype(token.raw)
                    .ok_or_else(|| self.malformed(ConstructKind::DocType, token))?;
                let root = if self.is_xml {
                    dt.root.to_string()
                } else {
                    dt.root.to_ascii_lowercase()
                };
                let mut doctype = DocType::new(&root, dt.public_id, dt.system_id)
                    .map_err(|e| self.located(e, token))?;
                doctype.raw = Some(span);
                Node::from(doctype)
            }
            TokenKind::EndTag => {
                let mut bogus = BogusEndTag::new(&self.fold(tag_name(token)));
                bogus.raw = Some(span);
                Node::from(bogus)
            }
            TokenKind::StartTag | TokenKind::EmptyTag => return Err(self.unrecognized(token)),
        };
        Ok(node)
    }

    fn unrecognized(&self, token: &Token<'_>) -> Error {
        Error::UnrecognizedConstruct {
            raw: token.raw.to_string(),
            location: Some(self.index.locate(token.offset)),
        }
    }

    fn start_tag(&mut self, token: &Token<'_>, inherited: &Context) -> Result<StartTag> {
        let tag = parse_tag(token.raw).map_err(|e| self.located(e, token))?;
        let element = tag.name.to_ascii_lowercase();
        let mut attributes = Vec::with_capacity(tag.attrs.len());
        for attr in &tag.attrs {
            let name = match attr.name {
                Some(name) => self.fold(name),
                None => omitted_attribute_name(&element, &attr.value.to_ascii_lowercase())
                    .map_or_else(|| self.fold(attr.value), str::to_string),
            };
            attributes.push((NameArg::Text(name), Text::parse(attr.value, self.internal)));
        }
        let name = NameArg::Text(self.fold(tag.name));
        let mut stag = StartTag::build(name, attributes, inherited, self.interner)
            .map_err(|e| self.located(e, token))?;
        stag.raw = Some(self.span(token));
        Ok(stag)
    }

    /// Builds the document bottom-up with an explicit stack.
    pub fn build(&mut self, skeleton: &Skeleton<'_>, context: Context) -> Result<Document> {
        let mut stack = vec![Open {
            children: &skeleton.top,
            next: 0,
            built: Vec::with_capacity(skeleton.top.len()),
            element: None,
            context,
        }];
        loop {
            let Some(top) = stack.last_mut() else {
                return Ok(Document::default());
            };
            if top.next == top.children.len() {
                let Some(done) = stack.pop() else { continue };
                let Some((stag, etag)) = done.element else {
                    return Document::new(done.built);
                };
                let element = Element::from_parts(stag, done.built, etag)?;
                if let Some(parent) = stack.last_mut() {
                    parent.built.push(Node::from(element));
                }
                continue;
            }
            let id = top.children[top.next];
            top.next += 1;
            match &skeleton.nodes[id] {
                Skel::Leaf(token) | Skel::BogusEndTag(token) => {
                    let node = self.leaf(token)?;
                    if let Some(top) = stack.last_mut() {
                        top.built.push(node);
                    }
                }
                Skel::Element {
                    start,
                    children,
                    end,
                } => {
                    let inherited = top.context.clone();
                    if stack.len() > self.max_depth {
                        return Err(Error::DepthExceeded {
                            limit: self.max_depth,
                        });
                    }
                    let stag = self.start_tag(start, &inherited)?;
                    let etag = end.as_ref().map(|t| self.span(t));
                    stack.push(Open {
                        children,
                        next: 0,
                        built: Vec::with_capacity(children.len()),
                        context: stag.context().clone(),
                        element: Some((stag, etag)),
                    });
                }
            }
        }
    }
}
