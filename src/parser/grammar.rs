//! Lexical grammars for the markup constructs the tokenizer recognizes.
//!
//! Start and empty tags have three grammars, tried in order:
//!
//! 1. *quoted*: every attribute is `name="value"` or `name='value'`;
//! 2. *valid*: values may also be bare name characters, and an attribute
//!    may be a lone name token (`<td nowrap>`);
//! 3. *invalid*: values are anything up to whitespace or a quote,
//!    attributes need only a word boundary between them, and a start tag
//!    may end inside an unterminated quoted value (`<a href="x>`).
//!
//! Each matcher returns the parsed parts together with the byte length of
//! the match, or `None` if its grammar does not accept the input.

use super::input::{is_space, Scanner};
use crate::error::{Error, Result};
use crate::util::qname::is_name_byte;

/// One attribute as written. `name` is `None` for a lone name token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RawAttr<'a> {
    pub name: Option<&'a str>,
    pub value: &'a str,
}

/// A matched start or empty tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawTag<'a> {
    pub name: &'a str,
    pub attrs: Vec<RawAttr<'a>>,
    pub len: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Grammar {
    Quoted,
    Valid,
    Invalid,
}

fn tag_end(s: &mut Scanner<'_>, empty: bool) -> bool {
    s.skip_whitespace();
    if empty {
        s.eat(b"/>")
    } else {
        s.eat(b">")
    }
}

/// `Name \s* = \s* ("[^"]*" | '[^']*')`
fn quoted_attr<'a>(s: &mut Scanner<'a>) -> Option<RawAttr<'a>> {
    let name = s.name()?;
    s.skip_whitespace();
    if !s.eat(b"=") {
        return None;
    }
    s.skip_whitespace();
    let value = s.quoted(|_| true)?;
    Some(RawAttr {
        name: Some(name),
        value,
    })
}

/// `Name \s* = \s* ("[^"]*" | '[^']*' | NameChar*) | Nmtoken`
fn valid_attr<'a>(s: &mut Scanner<'a>) -> Option<RawAttr<'a>> {
    let saved = s.save_position();
    if let Some(name) = s.name() {
        s.skip_whitespace();
        if s.eat(b"=") {
            s.skip_whitespace();
            let value = match s.quoted(|_| true) {
                Some(v) => v,
                None => s.take_while(is_name_byte),
            };
            return Some(RawAttr {
                name: Some(name),
                value,
            });
        }
        s.restore_position(saved);
    }
    s.nmtoken().map(|token| RawAttr {
        name: None,
        value: token,
    })
}

fn not_markup(b: u8) -> bool {
    b != b'<' && b != b'>'
}

/// `Name \s* = \s* ('[^'<>]*' | "[^"<>]*" | [^\s<>"']*) | Nmtoken`
fn invalid_attr<'a>(s: &mut Scanner<'a>) -> Option<RawAttr<'a>> {
    let saved = s.save_position();
    if let Some(name) = s.name() {
        s.skip_whitespace();
        if s.eat(b"=") {
            s.skip_whitespace();
            let value = match s.quoted(not_markup) {
                Some(v) => v,
                None => s.take_while(|b| !is_space(b) && !matches!(b, b'<' | b'>' | b'"' | b'\'')),
            };
            // A quote here starts an unterminated value; leave it to the
            // unterminated-attribute rule.
            if matches!(s.peek(), Some(b'"' | b'\'')) && value.is_empty() {
                s.restore_position(saved);
                return None;
            }
            return Some(RawAttr {
                name: Some(name),
                value,
            });
        }
        s.restore_position(saved);
    }
    s.nmtoken().map(|token| RawAttr {
        name: None,
        value: token,
    })
}

/// `Name \s* = \s* ('[^'<>]* | "[^"<>]*)`, a value missing its closing quote.
fn unterminated_attr<'a>(s: &mut Scanner<'a>) -> Option<RawAttr<'a>> {
    let name = s.name()?;
    s.skip_whitespace();
    if !s.eat(b"=") {
        return None;
    }
    s.skip_whitespace();
    let quote = s.peek().filter(|&q| q == b'"' || q == b'\'')?;
    s.advance(1);
    let value = s.take_until_byte(quote, not_markup);
    Some(RawAttr {
        name: Some(name),
        value,
    })
}

fn match_tag<'a>(input: &'a str, grammar: Grammar, empty: bool) -> Option<RawTag<'a>> {
    let mut s = Scanner::new(input);
    if !s.eat(b"<") {
        return None;
    }
    let name = s.name()?;
    let mut attrs = Vec::new();
    loop {
        let saved = s.save_position();
        let spaced = s.skip_whitespace();
        let separated = match grammar {
            Grammar::Quoted | Grammar::Valid => spaced,
            Grammar::Invalid => spaced || s.at_word_boundary(),
        };
        let attr = if separated {
            match grammar {
                Grammar::Quoted => quoted_attr(&mut s),
                Grammar::Valid => valid_attr(&mut s),
                Grammar::Invalid => invalid_attr(&mut s),
            }
        } else {
            None
        };
        match attr {
            Some(a) => attrs.push(a),
            None => {
                s.restore_position(saved);
                break;
            }
        }
    }
    if grammar == Grammar::Invalid && !empty {
        let saved = s.save_position();
        let spaced = s.skip_whitespace();
        match (spaced || s.at_word_boundary())
            .then(|| unterminated_attr(&mut s))
            .flatten()
        {
            Some(a) => attrs.push(a),
            None => s.restore_position(saved),
        }
    }
    if !tag_end(&mut s, empty) {
        return None;
    }
    Some(RawTag {
        name,
        attrs,
        len: s.pos(),
    })
}

/// A start tag whose attribute values are all quoted.
pub(crate) fn match_quoted_start_tag(input: &str) -> Option<RawTag<'_>> {
    match_tag(input, Grammar::Quoted, false)
}

/// An empty tag (`<x/>`) whose attribute values are all quoted.
pub(crate) fn match_quoted_empty_tag(input: &str) -> Option<RawTag<'_>> {
    match_tag(input, Grammar::Quoted, true)
}

/// A start tag under the valid grammar, then the invalid one.
pub(crate) fn match_start_tag(input: &str) -> Option<RawTag<'_>> {
    match_tag(input, Grammar::Valid, false).or_else(|| match_tag(input, Grammar::Invalid, false))
}

/// An empty tag under the valid grammar, then the invalid one.
pub(crate) fn match_empty_tag(input: &str) -> Option<RawTag<'_>> {
    match_tag(input, Grammar::Valid, true).or_else(|| match_tag(input, Grammar::Invalid, true))
}

/// Re-parses the raw text of a start or empty tag, trying the strict
/// grammar first and the lenient ones after it.
///
/// # Errors
///
/// Returns [`Error::UnrecognizedConstruct`] if no grammar accepts the whole
/// of `raw`.
pub(crate) fn parse_tag(raw: &str) -> Result<RawTag<'_>> {
    let whole = |t: &RawTag<'_>| t.len == raw.len();
    match_quoted_start_tag(raw)
        .filter(whole)
        .or_else(|| match_quoted_empty_tag(raw).filter(whole))
        .or_else(|| match_start_tag(raw).filter(whole))
        .or_else(|| match_empty_tag(raw).filter(whole))
        .ok_or_else(|| Error::UnrecognizedConstruct {
            raw: raw.to_string(),
            location: None,
        })
}

/// `</Name \s* >`, returning the name and the match length.
pub(crate) fn match_end_tag(input: &str) -> Option<(&str, usize)> {
    let mut s = Scanner::new(input);
    if !s.eat(b"</") {
        return None;
    }
    let name = s.name()?;
    s.skip_whitespace();
    s.eat(b">").then(|| (name, s.pos()))
}

/// `<!-- ... -->`, returning the body and the match length.
pub(crate) fn match_comment(input: &str) -> Option<(&str, usize)> {
    let mut s = Scanner::new(input);
    if !s.eat(b"<!--") {
        return None;
    }
    let body = s.take_through("-->")?;
    Some((body, s.pos()))
}

/// `<![CDATA[ ... ]]>`, returning the body and the match length.
pub(crate) fn match_cdata(input: &str) -> Option<(&str, usize)> {
    let mut s = Scanner::new(input);
    if !s.eat(b"<![CDATA[") {
        return None;
    }
    let body = s.take_through("]]>")?;
    Some((body, s.pos()))
}

/// A processing instruction `<?target content?>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RawProcIns<'a> {
    pub target: &'a str,
    pub content: &'a str,
    pub len: usize,
}

/// `<? Name (\s+ .*?)? ?>`
pub(crate) fn match_proc_ins(input: &str) -> Option<RawProcIns<'_>> {
    let mut s = Scanner::new(input);
    if !s.eat(b"<?") {
        return None;
    }
    let target = s.name()?;
    if s.eat(b"?>") {
        return Some(RawProcIns {
            target,
            content: "",
            len: s.pos(),
        });
    }
    if !s.skip_whitespace() {
        return None;
    }
    let content = s.take_through("?>")?;
    Some(RawProcIns {
        target,
        content,
        len: s.pos(),
    })
}

/// `<?xml \s ... ?>`, returning the text between `<?xml` and `?>`.
pub(crate) fn match_xml_decl(input: &str) -> Option<(&str, usize)> {
    let mut s = Scanner::new(input);
    if !s.eat(b"<?xml") || !s.peek().is_some_and(is_space) {
        return None;
    }
    let body = s.take_through("?>")?;
    Some((body, s.pos()))
}

/// A document type declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RawDocType<'a> {
    pub root: &'a str,
    pub public_id: Option<&'a str>,
    pub system_id: Option<&'a str>,
    pub len: usize,
}

/// `<!DOCTYPE Name (SYSTEM sys | PUBLIC pub sys?)? \s* ([...] \s*)? >`
///
/// Keywords are matched case-insensitively. The internal subset is skipped.
pub(crate) fn match_doctype(input: &str) -> Option<RawDocType<'_>> {
    match_doctype_with(input, |from| input[from..].find(']').map(|i| from + i))
}

/// [`match_doctype`] with the search for the `]` closing the internal
/// subset supplied by the caller: `subset_end(from)` is the offset of the
/// first `]` at or after `from`.
pub(crate) fn match_doctype_with(
    input: &str,
    mut subset_end: impl FnMut(usize) -> Option<usize>,
) -> Option<RawDocType<'_>> {
    let mut s = Scanner::new(input);
    if !s.eat_ci(b"<!DOCTYPE") || !s.skip_whitespace() {
        return None;
    }
    let root = s.name()?;
    let mut public_id = None;
    let mut system_id = None;
    let saved = s.save_position();
    if s.skip_whitespace() {
        if s.eat_ci(b"PUBLIC") {
            if !s.skip_whitespace() {
                return None;
            }
            public_id = Some(s.quoted(|_| true)?);
            let before_system = s.save_position();
            if s.skip_whitespace() {
                match s.quoted(|_| true) {
                    Some(sys) => system_id = Some(sys),
                    None => s.restore_position(before_system),
                }
            }
        } else if s.eat_ci(b"SYSTEM") {
            if !s.skip_whitespace() {
                return None;
            }
            system_id = Some(s.quoted(|_| true)?);
        } else {
            s.restore_position(saved);
        }
    }
    s.skip_whitespace();
    if s.eat(b"[") {
        let end = subset_end(s.pos())?;
        s.advance(end + 1 - s.pos());
        s.skip_whitespace();
    }
    if !s.eat(b">") {
        return None;
    }
    Some(RawDocType {
        root,
        public_id,
        system_id,
        len: s.pos(),
    })
}
