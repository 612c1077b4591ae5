//! Tag balancing.
//!
//! [`reduce`] pairs start and end tags with an explicit frame stack and
//! produces a skeleton: an arena of elements and leaves that refer to the
//! raw tokens. [`fix_structure`] then moves children an element's content
//! model does not permit out to follow the element.
//!
//! Both passes are loops over explicit stacks, so nesting depth costs heap,
//! not native stack. Neither pass can fail; every repair is recorded as a
//! [`ParseDiagnostic`].

use std::collections::VecDeque;

use super::input::{LineIndex, Scanner};
use super::tokenizer::{Token, TokenKind, Tokens};
use crate::error::{ErrorSeverity, ParseDiagnostic};
use crate::html::{content_model, exclusions, inclusions, is_cdata_element, ContentModel};

/// A node of the balanced skeleton. Elements refer to their children by
/// arena index.
#[derive(Debug)]
pub(crate) enum Skel<'a> {
    /// A start tag or empty tag, its children, and its end tag if one was
    /// paired with it.
    Element {
        start: Token<'a>,
        children: Vec<usize>,
        end: Option<Token<'a>>,
    },
    /// Text, comments and every other construct without children.
    Leaf(Token<'a>),
    /// An end tag no open element matched.
    BogusEndTag(Token<'a>),
}

/// The balanced skeleton of a document.
#[derive(Debug, Default)]
pub(crate) struct Skeleton<'a> {
    pub nodes: Vec<Skel<'a>>,
    pub top: Vec<usize>,
}

/// The element name of a start, empty or end tag token.
pub(crate) fn tag_name<'a>(token: &Token<'a>) -> &'a str {
    let skip = if token.kind == TokenKind::EndTag { 2 } else { 1 };
    Scanner::at(token.raw, skip).name().unwrap_or_default()
}

struct Frame {
    key: String,
    element: Option<usize>,
    children: Vec<usize>,
}

struct Reducer<'a, 'i> {
    nodes: Vec<Skel<'a>>,
    stack: Vec<Frame>,
    is_xml: bool,
    fold_case: bool,
    index: &'i LineIndex<'i>,
    diagnostics: &'i mut Vec<ParseDiagnostic>,
}

impl<'a> Reducer<'a, '_> {
    fn key(&self, name: &str) -> String {
        if self.fold_case {
            name.to_ascii_lowercase()
        } else {
            name.to_string()
        }
    }

    /// `script` and `style` close case-insensitively outside XML, whatever
    /// the detected mode, since literal mode found their end tag that way.
    fn closes(&self, frame: &Frame, key: &str) -> bool {
        frame.key == key
            || (!self.is_xml
                && frame.key.eq_ignore_ascii_case(key)
                && is_cdata_element(&frame.key.to_ascii_lowercase()))
    }

    fn warn(&mut self, offset: usize, message: String) {
        log::debug!("{message}");
        self.diagnostics.push(ParseDiagnostic {
            severity: ErrorSeverity::Warning,
            message,
            location: self.index.locate(offset),
        });
    }

    fn add(&mut self, node: Skel<'a>) {
        let id = self.nodes.len();
        self.nodes.push(node);
        if let Some(top) = self.stack.last_mut() {
            top.children.push(id);
        }
    }

    /// Pops the top frame, attaching its element to the new top.
    fn close(&mut self, end: Option<Token<'a>>) {
        let Some(frame) = self.stack.pop() else {
            return;
        };
        let Some(id) = frame.element else {
            return;
        };
        if let Skel::Element {
            children, end: e, ..
        } = &mut self.nodes[id]
        {
            *children = frame.children;
            *e = end;
        }
        if let Some(parent) = self.stack.last_mut() {
            parent.children.push(id);
        }
    }

    fn start(&mut self, token: Token<'a>) {
        let key = self.key(tag_name(&token));
        let id = self.nodes.len();
        self.nodes.push(Skel::Element {
            start: token,
            children: Vec::new(),
            end: None,
        });
        self.stack.push(Frame {
            key,
            element: Some(id),
            children: Vec::new(),
        });
    }

    fn end(&mut self, token: Token<'a>) {
        let key = self.key(tag_name(&token));
        let found = self
            .stack
            .iter()
            .skip(1)
            .rposition(|f| self.closes(f, &key))
            .map(|i| i + 1);
        match found {
            Some(depth) => {
                while self.stack.len() > depth + 1 {
                    let inner = self.stack.last().map(|f| f.key.clone()).unwrap_or_default();
                    self.warn(
                        token.offset,
                        format!("<{inner}> implicitly closed by {}", token.raw),
                    );
                    self.close(None);
                }
                self.close(Some(token));
            }
            None => {
                self.warn(
                    token.offset,
                    format!("stray end tag {} kept as a bogus end tag", token.raw),
                );
                self.add(Skel::BogusEndTag(token));
            }
        }
    }

    fn finish(mut self, end_offset: usize) -> Skeleton<'a> {
        while self.stack.len() > 1 {
            let inner = self.stack.last().map(|f| f.key.clone()).unwrap_or_default();
            self.warn(end_offset, format!("<{inner}> not closed before end of input"));
            self.close(None);
        }
        let top = self.stack.pop().map(|f| f.children).unwrap_or_default();
        Skeleton {
            nodes: self.nodes,
            top,
        }
    }
}

/// Balances the token stream into a skeleton.
///
/// An end tag closes the nearest open element of the same name anywhere on
/// the stack, implicitly closing every element opened after it. An end tag
/// matching no open element becomes a [`Skel::BogusEndTag`]. Elements still
/// open at the end of input are closed without an end tag.
///
/// Names are compared case-insensitively for HTML that is not XML.
pub(crate) fn reduce<'a>(
    tokens: &Tokens<'a>,
    index: &LineIndex<'_>,
    diagnostics: &mut Vec<ParseDiagnostic>,
) -> Skeleton<'a> {
    let mut reducer = Reducer {
        nodes: Vec::with_capacity(tokens.tokens.len()),
        stack: vec![Frame {
            key: String::new(),
            element: None,
            children: Vec::new(),
        }],
        is_xml: tokens.is_xml,
        fold_case: !tokens.is_xml && tokens.is_html,
        index,
        diagnostics,
    };
    for &token in &tokens.tokens {
        match token.kind {
            TokenKind::StartTag => reducer.start(token),
            TokenKind::EndTag => reducer.end(token),
            TokenKind::EmptyTag => reducer.add(Skel::Element {
                start: token,
                children: Vec::new(),
                end: None,
            }),
            _ => reducer.add(Skel::Leaf(token)),
        }
    }
    let end_offset = tokens.tokens.last().map_or(0, |t| t.offset + t.raw.len());
    reducer.finish(end_offset)
}

struct FixFrame {
    element: Option<usize>,
    name: String,
    /// `Some` for elements without an end tag, whose content the model
    /// constrains.
    model: Option<Option<ContentModel>>,
    queue: VecDeque<usize>,
    out: Vec<usize>,
    excluded: Vec<&'static str>,
    included: Vec<&'static str>,
}

impl FixFrame {
    fn accepts(&self, child: &str) -> bool {
        let Some(model) = self.model else {
            return true;
        };
        if self.excluded.contains(&child) {
            return false;
        }
        match model {
            None => true,
            Some(m) => {
                content_model(child).is_none() || m.allows(child) || self.included.contains(&child)
            }
        }
    }
}

fn element_parts<'s, 'a>(skel: &'s Skel<'a>) -> Option<(&'s Token<'a>, bool)> {
    match skel {
        Skel::Element { start, end, .. } => Some((start, end.is_some())),
        _ => None,
    }
}

/// Applies the HTML content models to a skeleton.
///
/// Elements closed by an explicit end tag keep every child. For an element
/// without an end tag, the first child its model does not permit ends it:
/// that child and everything after it move out to follow the element, where
/// the enclosing element gets to judge them. Children of an `EMPTY` element
/// always move out. Exclusions and inclusions accumulate across elements
/// without end tags and reset at an element with one.
///
/// With `case_sensitive` (XML input) only lower-case names find a model.
pub(crate) fn fix_structure(
    skeleton: &mut Skeleton<'_>,
    case_sensitive: bool,
    index: &LineIndex<'_>,
    diagnostics: &mut Vec<ParseDiagnostic>,
) {
    let nodes = &mut skeleton.nodes;
    let mut stack = vec![FixFrame {
        element: None,
        name: String::new(),
        model: None,
        queue: std::mem::take(&mut skeleton.top).into(),
        out: Vec::new(),
        excluded: Vec::new(),
        included: Vec::new(),
    }];
    let mut warn = |offset: usize, message: String| {
        log::debug!("{message}");
        diagnostics.push(ParseDiagnostic {
            severity: ErrorSeverity::Warning,
            message,
            location: index.locate(offset),
        });
    };

    while let Some(top) = stack.last_mut() {
        let Some(id) = top.queue.pop_front() else {
            let Some(frame) = stack.pop() else { break };
            match (frame.element, stack.last_mut()) {
                (Some(element), Some(parent)) => {
                    if let Skel::Element { children, .. } = &mut nodes[element] {
                        *children = frame.out;
                    }
                    parent.out.push(element);
                }
                _ => skeleton.top = frame.out,
            }
            continue;
        };
        let Some((start, has_end)) = element_parts(&nodes[id]) else {
            top.out.push(id);
            continue;
        };
        let offset = start.offset;
        let name = if case_sensitive {
            tag_name(start).to_string()
        } else {
            tag_name(start).to_ascii_lowercase()
        };

        if !top.accepts(&name) {
            warn(
                offset,
                format!("<{name}> is not allowed in <{}>; moved after it", top.name),
            );
            top.queue.push_front(id);
            let Some(frame) = stack.pop() else { break };
            let Some(parent) = stack.last_mut() else { break };
            if let Some(element) = frame.element {
                if let Skel::Element { children, .. } = &mut nodes[element] {
                    *children = frame.out;
                }
                parent.out.push(element);
            }
            for moved in frame.queue.into_iter().rev() {
                parent.queue.push_front(moved);
            }
            continue;
        }

        let model = content_model(&name);
        let children = match &mut nodes[id] {
            Skel::Element { children, .. } => std::mem::take(children),
            _ => Vec::new(),
        };
        if !has_end && model == Some(ContentModel::Empty) {
            if !children.is_empty() {
                warn(offset, format!("content of empty element <{name}> moved after it"));
            }
            top.out.push(id);
            for child in children.into_iter().rev() {
                top.queue.push_front(child);
            }
            continue;
        }
        let (excluded, included) = if has_end {
            (Vec::new(), Vec::new())
        } else {
            let mut excluded = top.excluded.clone();
            excluded.extend_from_slice(exclusions(&name));
            let mut included = top.included.clone();
            included.extend_from_slice(inclusions(&name));
            (excluded, included)
        };
        stack.push(FixFrame {
            element: Some(id),
            name,
            model: (!has_end).then_some(model),
            queue: children.into(),
            out: Vec::new(),
            excluded,
            included,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::tokenizer::tokenize;

    /// Renders a skeleton as `name(children)` with `/name` for end tags.
    fn render(skeleton: &Skeleton<'_>) -> String {
        fn walk(skeleton: &Skeleton<'_>, ids: &[usize], out: &mut String) {
            for &id in ids {
                match &skeleton.nodes[id] {
                    Skel::Element {
                        start,
                        children,
                        end,
                    } => {
                        out.push_str(tag_name(start));
                        out.push('(');
                        walk(skeleton, children, out);
                        out.push(')');
                        if end.is_some() {
                            out.push('/');
                        }
                    }
                    Skel::Leaf(t) => out.push_str(t.raw),
                    Skel::BogusEndTag(t) => {
                        out.push('!');
                        out.push_str(t.raw);
                    }
                }
            }
        }
        let mut out = String::new();
        walk(skeleton, &skeleton.top, &mut out);
        out
    }

    fn reduced(input: &str) -> (String, Vec<ParseDiagnostic>) {
        let tokens = tokenize(input, false);
        let index = LineIndex::new(input);
        let mut diagnostics = Vec::new();
        let skeleton = reduce(&tokens, &index, &mut diagnostics);
        (render(&skeleton), diagnostics)
    }

    fn fixed_as(input: &str, xml: bool) -> String {
        let tokens = tokenize(input, xml);
        let index = LineIndex::new(input);
        let mut diagnostics = Vec::new();
        let mut skeleton = reduce(&tokens, &index, &mut diagnostics);
        fix_structure(&mut skeleton, tokens.is_xml, &index, &mut diagnostics);
        render(&skeleton)
    }

    fn fixed(input: &str) -> String {
        fixed_as(input, false)
    }

    #[test]
    fn test_balanced() {
        let (out, diagnostics) = reduced("<a><b>x</b></a>");
        assert_eq!(out, "a(b(x)/)/");
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_outer_end_tag_closes_inner() {
        let (out, diagnostics) = reduced("<a><b></a>");
        assert_eq!(out, "a(b())/");
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("implicitly closed"));
    }

    #[test]
    fn test_stray_end_tag() {
        let (out, diagnostics) = reduced("<a></z>");
        assert_eq!(out, "a(!</z>)");
        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics[0].location.column, 4);
    }

    #[test]
    fn test_case_folding_in_html() {
        let (out, _) = reduced("<html><P>x</p></HTML>");
        assert_eq!(out, "html(P(x)/)/");
    }

    #[test]
    fn test_case_sensitive_without_html() {
        let (out, _) = reduced("<doc><A></a></doc>");
        assert_eq!(out, "doc(A(!</a>))/");
    }

    #[test]
    fn test_unclosed_paragraphs_become_siblings() {
        assert_eq!(fixed("<p>a<p>b<p>c"), "p(a)p(b)p(c)");
    }

    #[test]
    fn test_explicitly_closed_element_keeps_children() {
        assert_eq!(fixed("<p><div>x</div></p>"), "p(div(x)/)/");
    }

    #[test]
    fn test_list_items() {
        assert_eq!(fixed("<ul><li>a<li>b</ul>"), "ul(li(a)li(b))/");
    }

    #[test]
    fn test_xml_models_match_case_sensitively() {
        assert_eq!(fixed_as("<ul><li>a<li>b</ul>", true), "ul(li(a)li(b))/");
        assert_eq!(fixed_as("<UL><LI>a<LI>b</UL>", true), "UL(LI(aLI(b)))/");
    }

    #[test]
    fn test_empty_element_children_move_out() {
        assert_eq!(fixed("<br>x<hr>"), "br()xhr()");
    }

    #[test]
    fn test_exclusion_propagates() {
        assert_eq!(fixed("<a href=1>x<a href=2>y"), "a(x)a(y)");
    }

    #[test]
    fn test_unknown_tags_are_contained() {
        assert_eq!(fixed("<p><custom>x"), "p(custom(x))");
    }

    #[test]
    fn test_table_rows() {
        assert_eq!(
            fixed("<table><tr><td>1<td>2<tr><td>3</table>"),
            "table(tr(td(1)td(2))tr(td(3)))/"
        );
    }

    #[test]
    fn test_deep_unclosed_nesting_is_flattened() {
        let input = "<p>".repeat(5000);
        let out = fixed(&input);
        assert_eq!(out, "p()".repeat(5000));
    }
}
