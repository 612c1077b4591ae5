//! Single-pass tokenizer with HTML/XML detection.
//!
//! The scan looks for `<` and tries each construct grammar in priority
//! order. Text between recognized constructs, including any `<` that starts
//! nothing, becomes one [`TokenKind::Text`] token.

use super::grammar::{
    match_cdata, match_comment, match_doctype_with, match_empty_tag, match_end_tag,
    match_proc_ins, match_quoted_empty_tag, match_quoted_start_tag, match_start_tag,
    match_xml_decl,
};
use super::input::Scanner;
use crate::html::{is_cdata_element, is_signature_tag};

/// The kind of a raw token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TokenKind {
    XmlDecl,
    DocType,
    ProcIns,
    StartTag,
    EndTag,
    EmptyTag,
    Comment,
    CData,
    Text,
    /// Literal content of a CDATA-content element such as `script`.
    RawText,
}

/// A raw slice of the input and where it starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Token<'a> {
    pub kind: TokenKind,
    pub raw: &'a str,
    pub offset: usize,
}

/// The token stream plus the detection flags.
#[derive(Debug)]
pub(crate) struct Tokens<'a> {
    pub tokens: Vec<Token<'a>>,
    pub is_xml: bool,
    pub is_html: bool,
}

const XHTML_PUBLIC_PREFIX: &str = "-//W3C//DTD XHTML";

/// Remembers where a terminator was last searched for and found.
///
/// A search from `from` is answered from the last result when it started at
/// or before `from` and found nothing before `from`, so every unterminated
/// construct costs one scan of the input in total.
struct Terminator {
    needle: &'static str,
    searched_from: usize,
    found: Option<usize>,
}

impl Terminator {
    const fn new(needle: &'static str) -> Self {
        Self {
            needle,
            searched_from: usize::MAX,
            found: None,
        }
    }

    /// Offset of the first `needle` at or after `from`.
    fn next(&mut self, input: &str, from: usize) -> Option<usize> {
        let stale = from < self.searched_from || self.found.is_some_and(|f| f < from);
        if stale {
            self.searched_from = from;
            self.found = input.get(from..).and_then(|rest| rest.find(self.needle)).map(|i| from + i);
        }
        self.found
    }
}

struct Tokenizer<'a> {
    input: &'a str,
    tokens: Vec<Token<'a>>,
    is_xml: bool,
    is_html: bool,
    seen_element: bool,
    pi_end: Terminator,
    comment_end: Terminator,
    cdata_end: Terminator,
    subset_end: Terminator,
}

impl<'a> Tokenizer<'a> {
    fn push(&mut self, kind: TokenKind, start: usize, end: usize) {
        if start < end {
            self.tokens.push(Token {
                kind,
                raw: &self.input[start..end],
                offset: start,
            });
        }
    }

    fn saw_element(&mut self, name: &str) {
        if !self.seen_element {
            self.seen_element = true;
            if is_signature_tag(name) {
                self.is_html = true;
            }
        }
    }

    /// Tries every construct at `at` (which holds `<`). Returns the token
    /// kind, its length, and for start tags the element name.
    fn construct(&mut self, at: usize) -> Option<(TokenKind, usize, Option<&'a str>)> {
        let input = self.input;
        let s = &input[at..];
        let pi_closed = s.starts_with("<?") && self.pi_end.next(input, at + 2).is_some();
        if pi_closed {
            if let Some((_, len)) = match_xml_decl(s) {
                self.is_xml = true;
                return Some((TokenKind::XmlDecl, len, None));
            }
        }
        let subset_end = &mut self.subset_end;
        let doctype = match_doctype_with(s, |from| {
            subset_end.next(input, at + from).map(|end| end - at)
        });
        if let Some(dt) = doctype {
            if dt.root.eq_ignore_ascii_case("html") {
                self.is_html = true;
            }
            if dt.public_id.is_some_and(|p| p.starts_with(XHTML_PUBLIC_PREFIX)) {
                self.is_xml = true;
            }
            return Some((TokenKind::DocType, dt.len, None));
        }
        if pi_closed {
            if let Some(pi) = match_proc_ins(s) {
                return Some((TokenKind::ProcIns, pi.len, None));
            }
        }
        if let Some(tag) = match_quoted_start_tag(s) {
            self.saw_element(tag.name);
            return Some((TokenKind::StartTag, tag.len, Some(tag.name)));
        }
        if let Some(tag) = match_quoted_empty_tag(s) {
            self.saw_element(tag.name);
            return Some((TokenKind::EmptyTag, tag.len, None));
        }
        if let Some(tag) = match_start_tag(s) {
            self.saw_element(tag.name);
            return Some((TokenKind::StartTag, tag.len, Some(tag.name)));
        }
        if let Some((_, len)) = match_end_tag(s) {
            return Some((TokenKind::EndTag, len, None));
        }
        if let Some(tag) = match_empty_tag(s) {
            self.saw_element(tag.name);
            return Some((TokenKind::EmptyTag, tag.len, None));
        }
        if s.starts_with("<!--") && self.comment_end.next(input, at + 4).is_some() {
            if let Some((_, len)) = match_comment(s) {
                return Some((TokenKind::Comment, len, None));
            }
        }
        if s.starts_with("<![CDATA[") && self.cdata_end.next(input, at + 9).is_some() {
            if let Some((_, len)) = match_cdata(s) {
                return Some((TokenKind::CData, len, None));
            }
        }
        None
    }

    /// Emits the literal body of a CDATA-content element starting at `pos`
    /// and its end tag. Returns the position after the end tag, or the end
    /// of input when the element is never closed.
    fn literal(&mut self, pos: usize, name: &str) -> usize {
        let mut search = pos;
        while let Some(found) = self.input[search..].find("</") {
            let lt = search + found;
            let mut s = Scanner::at(self.input, lt + 2);
            if s.eat_ci(name.as_bytes()) {
                s.skip_whitespace();
                if s.eat(b">") {
                    self.push(TokenKind::RawText, pos, lt);
                    self.push(TokenKind::EndTag, lt, s.pos());
                    return s.pos();
                }
            }
            search = lt + 2;
        }
        log::debug!("<{name}> is not closed; its content runs to the end of input");
        self.push(TokenKind::RawText, pos, self.input.len());
        self.input.len()
    }

    fn run(&mut self) {
        let mut text_start = 0;
        let mut search = 0;
        while let Some(found) = self.input[search..].find('<') {
            let lt = search + found;
            let Some((kind, len, start_name)) = self.construct(lt) else {
                search = lt + 1;
                continue;
            };
            self.push(TokenKind::Text, text_start, lt);
            self.push(kind, lt, lt + len);
            let mut next = lt + len;
            if let Some(name) = start_name {
                if !self.is_xml && is_cdata_element(&name.to_ascii_lowercase()) {
                    next = self.literal(next, name);
                }
            }
            text_start = next;
            search = next;
        }
        self.push(TokenKind::Text, text_start, self.input.len());
    }
}

/// Splits `input` into tokens and detects whether it looks like XML or HTML.
///
/// `force_xml` sets the XML flag before scanning, which also disables
/// literal mode for `script` and `style`.
pub(crate) fn tokenize(input: &str, force_xml: bool) -> Tokens<'_> {
    let mut t = Tokenizer {
        input,
        tokens: Vec::new(),
        is_xml: force_xml,
        is_html: false,
        seen_element: false,
        pi_end: Terminator::new("?>"),
        comment_end: Terminator::new("-->"),
        cdata_end: Terminator::new("]]>"),
        subset_end: Terminator::new("]"),
    };
    t.run();
    log::trace!(
        "tokenized {} bytes into {} tokens (xml: {}, html: {})",
        input.len(),
        t.tokens.len(),
        t.is_xml,
        t.is_html
    );
    Tokens {
        tokens: t.tokens,
        is_xml: t.is_xml,
        is_html: t.is_html,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<(TokenKind, &str)> {
        tokenize(input, false)
            .tokens
            .into_iter()
            .map(|t| (t.kind, t.raw))
            .collect()
    }

    #[test]
    fn test_basic_stream() {
        use TokenKind::*;
        assert_eq!(
            kinds("a<p class=x>b<br/></p><!--c-->"),
            vec![
                (Text, "a"),
                (StartTag, "<p class=x>"),
                (Text, "b"),
                (EmptyTag, "<br/>"),
                (EndTag, "</p>"),
                (Comment, "<!--c-->"),
            ]
        );
    }

    #[test]
    fn test_stray_lt_is_text() {
        assert_eq!(kinds("1 < 2 <3"), vec![(TokenKind::Text, "1 < 2 <3")]);
    }

    #[test]
    fn test_offsets() {
        let tokens = tokenize("ab<i>", false).tokens;
        assert_eq!(tokens[1].offset, 2);
    }

    #[test]
    fn test_xml_decl_detection() {
        let t = tokenize("<?xml version=\"1.0\"?><r/>", false);
        assert!(t.is_xml);
        assert!(!t.is_html);
        assert_eq!(t.tokens[0].kind, TokenKind::XmlDecl);
    }

    #[test]
    fn test_doctype_detection() {
        assert!(tokenize("<!DOCTYPE HTML><p>", false).is_html);
        let t = tokenize(
            "<!DOCTYPE html PUBLIC \"-//W3C//DTD XHTML 1.0 Strict//EN\" \"x\">",
            false,
        );
        assert!(t.is_xml);
        assert!(t.is_html);
    }

    #[test]
    fn test_signature_tag_only_counts_first() {
        assert!(tokenize("<HTML><body>", false).is_html);
        assert!(!tokenize("<doc><html>", false).is_html);
    }

    #[test]
    fn test_script_literal_mode() {
        use TokenKind::*;
        assert_eq!(
            kinds("<script>if (a<b) x='</p>';</SCRIPT >z"),
            vec![
                (StartTag, "<script>"),
                (RawText, "if (a<b) x='</p>';"),
                (EndTag, "</SCRIPT >"),
                (Text, "z"),
            ]
        );
    }

    #[test]
    fn test_unclosed_script_runs_to_end() {
        use TokenKind::*;
        assert_eq!(
            kinds("<style>p { }"),
            vec![(StartTag, "<style>"), (RawText, "p { }")]
        );
    }

    #[test]
    fn test_no_literal_mode_in_xml() {
        let t = tokenize("<script><a/></script>", true);
        assert_eq!(t.tokens[1].kind, TokenKind::EmptyTag);
    }

    #[test]
    fn test_unterminated_constructs_are_text() {
        let input = "<!--a<?p x<![CDATA[b<!DOCTYPE d [c";
        assert_eq!(kinds(input), vec![(TokenKind::Text, input)]);
    }

    #[test]
    fn test_terminator_search_is_reused() {
        let input = "<!--a-->x<!--b";
        let mut end = Terminator::new("-->");
        assert_eq!(end.next(input, 4), Some(5));
        assert_eq!(end.next(input, 13), None);
        assert_eq!(end.next(input, 14), None);
        assert_eq!(kinds("<!--a--><!--b<!--c-->").len(), 2);
    }

    #[test]
    fn test_pi_and_cdata() {
        use TokenKind::*;
        assert_eq!(
            kinds("<?php x ?><![CDATA[<y>]]>"),
            vec![(ProcIns, "<?php x ?>"), (CData, "<![CDATA[<y>]]>")]
        );
    }
}
